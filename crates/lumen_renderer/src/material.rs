//! Materials.
//!
//! Each variant owns its uniform block and the group 1 bind group pointing at
//! it. Setters push to the GPU immediately. Pipelines live in the programs, one
//! per variant and cull side.

use glam::Vec3;

use crate::texture::uniform_entry;
use crate::uniforms::{UniformBlock, UniformLayout, UniformType};

/// Which pass draws a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialTag {
    Forward,
    Deferred,
    DeferredPbr,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Side {
    #[default]
    Front,
    Back,
    Both,
}

impl Side {
    pub const ALL: [Side; 3] = [Side::Front, Side::Back, Side::Both];

    pub fn cull_mode(self) -> Option<wgpu::Face> {
        match self {
            Side::Front => Some(wgpu::Face::Back),
            Side::Back => Some(wgpu::Face::Front),
            Side::Both => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// One pipeline per cull side.
pub struct SidedPipelines([Option<wgpu::RenderPipeline>; 3]);

impl SidedPipelines {
    pub fn build(mut make: impl FnMut(Side) -> Option<wgpu::RenderPipeline>) -> Self {
        Self(Side::ALL.map(&mut make))
    }

    pub fn get(&self, side: Side) -> Option<&wgpu::RenderPipeline> {
        self.0[side.index()].as_ref()
    }
}

/// (roughness, metalness) presets cycled by the viewer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PbrPreset {
    #[default]
    Metallic,
    Glossy,
    Rough,
    RoughMetal,
}

impl PbrPreset {
    pub fn values(self) -> (f32, f32) {
        match self {
            PbrPreset::Metallic => (0.2, 1.0),
            PbrPreset::Glossy => (0.0, 0.0),
            PbrPreset::Rough => (1.0, 0.0),
            PbrPreset::RoughMetal => (0.6, 1.0),
        }
    }

    pub fn next(self) -> Self {
        match self {
            PbrPreset::Metallic => PbrPreset::Glossy,
            PbrPreset::Glossy => PbrPreset::Rough,
            PbrPreset::Rough => PbrPreset::RoughMetal,
            PbrPreset::RoughMetal => PbrPreset::Metallic,
        }
    }
}

/// Group 1 layout shared by the Blinn-Phong and PBR materials.
pub fn material_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Material Bind Group Layout"),
        entries: &[
            // --- BINDING 0: Material Settings (Uniform Buffer) ---
            uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
        ],
    })
}

fn material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: &UniformBlock,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform.buffer().as_entire_binding(),
        }],
    })
}

pub fn blinn_phong_layout() -> UniformLayout {
    UniformLayout::new(&[
        ("color", UniformType::Vec3),
        ("specular", UniformType::F32),
        ("emissive_color", UniformType::Vec3),
        ("emissive_strength", UniformType::F32),
        ("shininess", UniformType::F32),
        ("emissive_enabled", UniformType::F32),
    ])
}

pub fn pbr_layout() -> UniformLayout {
    UniformLayout::new(&[
        ("albedo", UniformType::Vec3),
        ("roughness", UniformType::F32),
        ("emissive_color", UniformType::Vec3),
        ("emissive_strength", UniformType::F32),
        ("metalness", UniformType::F32),
        ("emissive_enabled", UniformType::F32),
    ])
}

/// Analytic material used by the forward pass and by the deferred Blinn-Phong writer.
pub struct BlinnPhongMaterial {
    uniform: UniformBlock,
    bind_group: wgpu::BindGroup,
    side: Side,
}

impl BlinnPhongMaterial {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        color: Vec3,
        specular: f32,
        shininess: f32,
    ) -> Self {
        let uniform = UniformBlock::new(device, "Blinn-Phong Material", blinn_phong_layout());
        let bind_group = material_bind_group(device, layout, &uniform, "Blinn-Phong Material");

        let mut material = Self {
            uniform,
            bind_group,
            side: Side::Front,
        };
        material.set_color(queue, color);
        material.set_specular(queue, specular);
        material.set_shininess(queue, shininess);
        material.set_emissive_strength(queue, 1.0);
        material
    }

    pub fn set_color(&mut self, queue: &wgpu::Queue, color: Vec3) {
        self.uniform.set_vec3(queue, "color", color);
    }

    pub fn set_specular(&mut self, queue: &wgpu::Queue, specular: f32) {
        self.uniform.set_f32(queue, "specular", specular);
    }

    pub fn set_shininess(&mut self, queue: &wgpu::Queue, shininess: f32) {
        self.uniform.set_f32(queue, "shininess", shininess);
    }

    pub fn set_emissive_color(&mut self, queue: &wgpu::Queue, color: Vec3) {
        self.uniform.set_vec3(queue, "emissive_color", color);
    }

    pub fn set_emissive_strength(&mut self, queue: &wgpu::Queue, strength: f32) {
        self.uniform.set_f32(queue, "emissive_strength", strength);
    }

    pub fn set_emissive_enabled(&mut self, queue: &wgpu::Queue, enabled: bool) {
        self.uniform.set_flag(queue, "emissive_enabled", enabled);
    }

    pub fn set_side(&mut self, side: Side) {
        self.side = side;
    }

    pub fn uniform(&self) -> &UniformBlock {
        &self.uniform
    }
}

/// Roughness/metalness G-Buffer writer.
pub struct PbrMaterial {
    uniform: UniformBlock,
    bind_group: wgpu::BindGroup,
    side: Side,
}

impl PbrMaterial {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        albedo: Vec3,
        roughness: f32,
        metalness: f32,
    ) -> Self {
        let uniform = UniformBlock::new(device, "PBR Material", pbr_layout());
        let bind_group = material_bind_group(device, layout, &uniform, "PBR Material");

        let mut material = Self {
            uniform,
            bind_group,
            side: Side::Front,
        };
        material.set_albedo(queue, albedo);
        material.set_roughness(queue, roughness);
        material.set_metalness(queue, metalness);
        material.set_emissive_strength(queue, 1.0);
        material
    }

    pub fn set_albedo(&mut self, queue: &wgpu::Queue, albedo: Vec3) {
        self.uniform.set_vec3(queue, "albedo", albedo);
    }

    pub fn set_roughness(&mut self, queue: &wgpu::Queue, roughness: f32) {
        self.uniform.set_f32(queue, "roughness", roughness);
    }

    pub fn set_metalness(&mut self, queue: &wgpu::Queue, metalness: f32) {
        self.uniform.set_f32(queue, "metalness", metalness);
    }

    pub fn apply_preset(&mut self, queue: &wgpu::Queue, preset: PbrPreset) {
        let (roughness, metalness) = preset.values();
        self.set_roughness(queue, roughness);
        self.set_metalness(queue, metalness);
    }

    pub fn set_emissive_color(&mut self, queue: &wgpu::Queue, color: Vec3) {
        self.uniform.set_vec3(queue, "emissive_color", color);
    }

    pub fn set_emissive_strength(&mut self, queue: &wgpu::Queue, strength: f32) {
        self.uniform.set_f32(queue, "emissive_strength", strength);
    }

    pub fn set_emissive_enabled(&mut self, queue: &wgpu::Queue, enabled: bool) {
        self.uniform.set_flag(queue, "emissive_enabled", enabled);
    }

    pub fn set_side(&mut self, side: Side) {
        self.side = side;
    }

    pub fn uniform(&self) -> &UniformBlock {
        &self.uniform
    }
}

/// Samples the renderer's environment cubemap; carries no uniforms of its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkyboxMaterial {
    pub side: Side,
}

impl SkyboxMaterial {
    /// Skyboxes are seen from inside the cube.
    pub fn new() -> Self {
        Self { side: Side::Back }
    }
}

pub enum Material {
    Forward(BlinnPhongMaterial),
    Deferred(BlinnPhongMaterial),
    DeferredPbr(PbrMaterial),
    SkyboxForward(SkyboxMaterial),
    SkyboxDeferred(SkyboxMaterial),
}

impl Material {
    pub fn tag(&self) -> MaterialTag {
        match self {
            Material::Forward(_) | Material::SkyboxForward(_) => MaterialTag::Forward,
            Material::Deferred(_) | Material::SkyboxDeferred(_) => MaterialTag::Deferred,
            Material::DeferredPbr(_) => MaterialTag::DeferredPbr,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Material::Forward(m) | Material::Deferred(m) => m.side,
            Material::DeferredPbr(m) => m.side,
            Material::SkyboxForward(m) | Material::SkyboxDeferred(m) => m.side,
        }
    }

    /// Group 1 bind group, absent for skyboxes.
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        match self {
            Material::Forward(m) | Material::Deferred(m) => Some(&m.bind_group),
            Material::DeferredPbr(m) => Some(&m.bind_group),
            Material::SkyboxForward(_) | Material::SkyboxDeferred(_) => None,
        }
    }

    pub fn as_blinn_phong_mut(&mut self) -> Option<&mut BlinnPhongMaterial> {
        match self {
            Material::Forward(m) | Material::Deferred(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_pbr_mut(&mut self) -> Option<&mut PbrMaterial> {
        match self {
            Material::DeferredPbr(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_selects_opposite_cull_face() {
        assert_eq!(Side::Front.cull_mode(), Some(wgpu::Face::Back));
        assert_eq!(Side::Back.cull_mode(), Some(wgpu::Face::Front));
        assert_eq!(Side::Both.cull_mode(), None);
    }

    #[test]
    fn presets_cycle_through_all_four() {
        let mut preset = PbrPreset::default();
        let mut seen = vec![preset.values()];
        for _ in 0..3 {
            preset = preset.next();
            seen.push(preset.values());
        }
        assert_eq!(seen, vec![(0.2, 1.0), (0.0, 0.0), (1.0, 0.0), (0.6, 1.0)]);
        assert_eq!(preset.next(), PbrPreset::Metallic);
    }

    #[test]
    fn material_layouts_match_wgsl_structs() {
        let bp = blinn_phong_layout();
        assert_eq!(bp.offset_of("specular"), Some(12));
        assert_eq!(bp.offset_of("shininess"), Some(32));
        assert_eq!(bp.size(), 48);

        let pbr = pbr_layout();
        assert_eq!(pbr.offset_of("metalness"), Some(32));
        assert_eq!(pbr.offset_of("emissive_enabled"), Some(36));
    }

    #[test]
    fn skybox_defaults_to_inside_faces() {
        let sky = Material::SkyboxDeferred(SkyboxMaterial::new());
        assert_eq!(sky.side(), Side::Back);
        assert_eq!(sky.tag(), MaterialTag::Deferred);
        assert!(sky.bind_group().is_none());
    }
}
