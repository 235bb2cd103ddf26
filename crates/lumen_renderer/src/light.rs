use glam::{Vec3, Vec4};

/// Fixed size of the shader-side light array
pub const MAX_LIGHTS: usize = 10;

/// Normalized description of any light, as consumed by materials and lighting passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightInfo {
    /// w = 0 for a direction, w = 1 for a position
    pub position: Vec4,
    pub color: Vec3,
    pub intensity: f32,
    pub ambient_coefficient: f32,
    pub attenuation: f32,
    pub enabled: bool,
    // spotlight only
    pub cone_angle: f32,
    pub cone_direction: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    Directional { direction: Vec3 },
    Point { position: Vec3, attenuation: f32 },
    /// Packed with its cone; lighting passes treat it as a point light.
    Spot {
        position: Vec3,
        attenuation: f32,
        cone_angle: f32,
        cone_direction: Vec3,
    },
}

#[derive(Clone, Debug)]
pub struct Light {
    kind: LightKind,
    color: Vec3,
    intensity: f32,
    ambient_coefficient: f32,
    enabled: bool,
}

impl Light {
    /// Lights start disabled; scene setup toggles them on.
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32, ambient_coefficient: f32) -> Self {
        Self {
            kind: LightKind::Directional { direction },
            color,
            intensity,
            ambient_coefficient,
            enabled: false,
        }
    }

    pub fn point(
        position: Vec3,
        color: Vec3,
        intensity: f32,
        ambient_coefficient: f32,
        attenuation: f32,
    ) -> Self {
        Self {
            kind: LightKind::Point {
                position,
                attenuation,
            },
            color,
            intensity,
            ambient_coefficient,
            enabled: false,
        }
    }

    /// The cone is packed for the shaders but not yet used to narrow the light.
    pub fn spot(
        position: Vec3,
        cone_direction: Vec3,
        cone_angle: f32,
        color: Vec3,
        intensity: f32,
        ambient_coefficient: f32,
        attenuation: f32,
    ) -> Self {
        Self {
            kind: LightKind::Spot {
                position,
                attenuation,
                cone_angle,
                cone_direction,
            },
            color,
            intensity,
            ambient_coefficient,
            enabled: false,
        }
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    pub fn info(&self) -> LightInfo {
        let (position, attenuation, cone_angle, cone_direction) = match self.kind {
            // Directions ignore attenuation
            LightKind::Directional { direction } => (direction.extend(0.0), 0.0, 0.0, Vec3::ZERO),
            LightKind::Point {
                position,
                attenuation,
            } => (position.extend(1.0), attenuation, 0.0, Vec3::ZERO),
            LightKind::Spot {
                position,
                attenuation,
                cone_angle,
                cone_direction,
            } => (position.extend(1.0), attenuation, cone_angle, cone_direction),
        };

        LightInfo {
            position,
            color: self.color,
            intensity: self.intensity,
            ambient_coefficient: self.ambient_coefficient,
            attenuation,
            enabled: self.enabled,
            cone_angle,
            cone_direction,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    pub position: [f32; 4],
    pub color: [f32; 3],
    pub intensity: f32,
    pub ambient_coefficient: f32,
    pub attenuation: f32,
    pub enabled: f32,
    pub cone_angle: f32,
    pub cone_direction: [f32; 3],
    pub _padding: f32,
}

impl From<LightInfo> for GpuLight {
    fn from(info: LightInfo) -> Self {
        Self {
            position: info.position.to_array(),
            color: info.color.to_array(),
            intensity: info.intensity,
            ambient_coefficient: info.ambient_coefficient,
            attenuation: info.attenuation,
            enabled: if info.enabled { 1.0 } else { 0.0 },
            cone_angle: info.cone_angle,
            cone_direction: info.cone_direction.to_array(),
            _padding: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniforms {
    pub lights: [GpuLight; MAX_LIGHTS], // Fixed array of 10
    pub count: u32,
    pub _padding: [u32; 3],
}

impl LightUniforms {
    /// Packs the shared light list. Indices stay stable: disabled lights keep
    /// their slot and are skipped by the shader.
    pub fn pack(lights: &[Light]) -> Self {
        if lights.len() > MAX_LIGHTS {
            log::warn!(
                "{} lights in scene, only the first {} are shaded",
                lights.len(),
                MAX_LIGHTS
            );
        }

        let mut uniforms = Self {
            lights: [GpuLight::default(); MAX_LIGHTS],
            count: lights.len().min(MAX_LIGHTS) as u32,
            _padding: [0; 3],
        };

        for (slot, light) in uniforms.lights.iter_mut().zip(lights) {
            *slot = GpuLight::from(light.info());
        }

        uniforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[test]
    fn directional_carries_w_zero_and_no_attenuation() {
        let sun = Light::directional(Vec3::new(-3.0, 1.0, -3.0), Vec3::ONE, 0.5, 0.2);
        let info = sun.info();
        assert_eq!(info.position.w, 0.0);
        assert_eq!(info.attenuation, 0.0);
    }

    #[test]
    fn point_carries_w_one() {
        let lamp = Light::point(Vec3::new(1.0, 1.0, -1.0), Vec3::ONE, 2.0, 0.01, 5.0);
        let info = lamp.info();
        assert_eq!(info.position, Vec4::new(1.0, 1.0, -1.0, 1.0));
        assert_eq!(info.attenuation, 5.0);
    }

    #[test]
    fn toggle_flips_enabled() {
        let mut light = Light::point(Vec3::ZERO, Vec3::ONE, 1.0, 0.0, 1.0);
        assert!(!light.is_enabled());
        light.toggle();
        assert!(light.is_enabled());
        assert_eq!(GpuLight::from(light.info()).enabled, 1.0);
    }

    #[test]
    fn gpu_light_matches_wgsl_stride() {
        // vec4 + vec3/f32 + 4 f32 + vec3/f32
        assert_eq!(std::mem::size_of::<GpuLight>(), 64);
        assert_eq!(std::mem::size_of::<LightUniforms>(), 64 * MAX_LIGHTS + 16);
    }

    #[test]
    fn pack_caps_at_max_lights() {
        let lights: Vec<_> = (0..12)
            .map(|i| Light::point(Vec3::splat(i as f32), Vec3::ONE, 1.0, 0.0, 1.0))
            .collect();
        let packed = LightUniforms::pack(&lights);
        assert_eq!(packed.count, MAX_LIGHTS as u32);
        assert_eq!(packed.lights[9].position[0], 9.0);
    }

    #[test]
    fn spot_packs_position_and_cone() {
        let mut spot = Light::spot(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y, 0.4, Vec3::ONE, 3.0, 0.0, 2.0);
        spot.set_enabled(true);
        let lights = [Light::directional(Vec3::Y, Vec3::ONE, 1.0, 0.0), spot];

        let packed = LightUniforms::pack(&lights);
        assert_eq!(packed.count, 2);
        let gpu = packed.lights[1];
        assert_eq!(gpu.position, [0.0, 2.0, 0.0, 1.0]);
        assert_eq!(gpu.attenuation, 2.0);
        assert_eq!(gpu.cone_angle, 0.4);
        assert_eq!(gpu.cone_direction, [0.0, -1.0, 0.0]);
        assert_eq!(gpu.enabled, 1.0);
        assert_eq!(gpu.intensity, 3.0);
    }

    #[test]
    fn spot_is_shaded_like_a_point_light() {
        let mut spot = Light::spot(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y, 0.4, Vec3::ONE, 3.0, 0.0, 2.0);
        let mut lamp = Light::point(Vec3::new(0.0, 2.0, 0.0), Vec3::ONE, 3.0, 0.0, 2.0);
        spot.set_enabled(true);
        lamp.set_enabled(true);

        let at = Vec3::new(1.0, 0.0, 0.0);
        let spot_term = crate::shading::light_direction(&spot.info(), Mat4::IDENTITY, at);
        let lamp_term = crate::shading::light_direction(&lamp.info(), Mat4::IDENTITY, at);
        assert_eq!(spot_term, lamp_term);
    }
}
