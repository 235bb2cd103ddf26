use glam::{EulerRot, Mat4, Vec3};

/// Local transform of a model: position, Euler rotation (radians, x/y/z) and
/// non-uniform scale.
///
/// The dirty flag gates model-matrix recomputation. Setters only raise it when
/// the value actually changes, so re-applying an identical transform is free.
#[derive(Debug, Clone, Copy)]
pub struct ModelTransform {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    dirty: bool,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            // A fresh transform has never been pushed to the GPU
            dirty: true,
        }
    }
}

impl ModelTransform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_position(&mut self, position: Vec3) {
        if self.position != position {
            self.position = position;
            self.dirty = true;
        }
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        if self.rotation != rotation {
            self.rotation = rotation;
            self.dirty = true;
        }
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        if self.scale != scale {
            self.scale = scale;
            self.dirty = true;
        }
    }

    pub fn set_uniform_scale(&mut self, s: f32) {
        self.set_scale(Vec3::splat(s));
    }

    /// Creates the Model Matrix (Local -> World).
    /// Order: translate, then scale, then rotate (yaw, pitch, roll).
    pub fn compute_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_scale(self.scale)
            * Mat4::from_euler(EulerRot::YXZ, self.rotation.y, self.rotation.x, self.rotation.z)
    }

    /// Returns the model matrix and clears the flag if anything changed since
    /// the last call, otherwise `None`.
    pub fn take_dirty_matrix(&mut self) -> Option<Mat4> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.compute_matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_transform_is_dirty_once() {
        let mut t = ModelTransform::default();
        assert!(t.take_dirty_matrix().is_some());
        assert!(t.take_dirty_matrix().is_none());
    }

    #[test]
    fn reapplying_same_values_does_not_dirty() {
        let mut t = ModelTransform::from_position(Vec3::new(0.3, -1.65, 0.0));
        t.take_dirty_matrix();

        t.set_position(Vec3::new(0.3, -1.65, 0.0));
        t.set_rotation(Vec3::ZERO);
        t.set_scale(Vec3::ONE);
        t.set_uniform_scale(1.0);

        assert!(!t.is_dirty());
        assert!(t.take_dirty_matrix().is_none());
    }

    #[test]
    fn changed_value_produces_new_matrix() {
        let mut t = ModelTransform::default();
        t.take_dirty_matrix();

        t.set_uniform_scale(0.1);
        let m = t.take_dirty_matrix().expect("scale change should dirty");
        let p = m.transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(0.1, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn translation_applies_after_scale() {
        let mut t = ModelTransform::from_position(Vec3::new(1.0, 2.0, 3.0));
        t.set_uniform_scale(2.0);
        let p = t.compute_matrix().transform_point3(Vec3::ONE);
        assert!(p.abs_diff_eq(Vec3::new(3.0, 4.0, 5.0), 1e-6));
    }
}
