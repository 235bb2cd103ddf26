use glam::{EulerRot, Mat4, Quat, Vec3};

pub const DEFAULT_NEAR: f32 = 0.01;
pub const DEFAULT_FAR: f32 = 100.0;

// Keep the orbit away from the poles so look_at never degenerates
const MAX_PITCH: f32 = 89.0 * std::f32::consts::PI / 180.0;

/// A camera orbiting a target point at a fixed distance.
///
/// Mutations raise a dirty flag; the renderer clears it after pushing the new
/// view/projection matrices.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    distance: f32,
    target: Vec3,
    // x = pitch, y = yaw, z = roll (unused)
    rotation: Vec3,
    dirty: bool,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(16.0 / 9.0, 45.0, 8.0, Vec3::ZERO)
    }
}

impl OrbitCamera {
    pub fn new(aspect_ratio: f32, fov_degrees: f32, distance: f32, target: Vec3) -> Self {
        Self {
            fov: fov_degrees.to_radians(),
            aspect_ratio,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            distance,
            target,
            rotation: Vec3::ZERO,
            dirty: true,
        }
    }

    pub fn add_rotation(&mut self, delta: Vec3) {
        if delta == Vec3::ZERO {
            return;
        }
        self.rotation += delta;
        self.rotation.x = self.rotation.x.clamp(-MAX_PITCH, MAX_PITCH);
        self.dirty = true;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        if self.aspect_ratio != aspect_ratio {
            self.aspect_ratio = aspect_ratio;
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// World-space eye position
    pub fn eye(&self) -> Vec3 {
        let orbit = Quat::from_euler(EulerRot::YXZ, self.rotation.y, self.rotation.x, 0.0);
        self.target + orbit * (Vec3::Z * self.distance)
    }

    pub fn compute_view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    /// Computes the "Projection Matrix" (View -> Clip)
    pub fn compute_projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_eye_sits_on_positive_z() {
        let cam = OrbitCamera::default();
        assert!(cam.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 8.0), 1e-5));
    }

    #[test]
    fn target_maps_to_view_space_negative_z() {
        let cam = OrbitCamera::default();
        let p = cam.compute_view_matrix().transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.0, -8.0), 1e-5));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = OrbitCamera::default();
        cam.set_dirty(false);
        cam.add_rotation(Vec3::new(10.0, 0.0, 0.0));
        assert!(cam.is_dirty());
        assert!(cam.eye().y < 8.0);
        assert!(cam.eye().is_finite());
    }

    #[test]
    fn zero_rotation_keeps_clean() {
        let mut cam = OrbitCamera::default();
        cam.set_dirty(false);
        cam.add_rotation(Vec3::ZERO);
        cam.set_aspect_ratio(16.0 / 9.0);
        assert!(!cam.is_dirty());
    }
}
