use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use lumen_assets::{Handle, MeshData};
use lumen_renderer::{
    GpuMesh, Light, LightId, Material, MaterialTag, Model, PbrPreset, Renderer, SkyboxMaterial,
};

use crate::config::ViewerConfig;

const BUNNY_COLOR: Vec3 = Vec3::new(0.75164, 0.60648, 0.22648);
const BUNNY_POSITION: Vec3 = Vec3::new(0.3, -1.65, 0.0);
const GOLD: Vec3 = Vec3::new(1.0, 0.71, 0.29);

const SUN_DIRECTIONS: [Vec3; 2] = [Vec3::new(-3.0, 1.0, -3.0), Vec3::new(3.0, 3.0, 1.0)];
const SUN_INTENSITY: f32 = 0.5;
const SUN_AMBIENT: f32 = 0.2;

const LAMP_AMBIENT: f32 = 0.01;
const LAMP_ATTENUATION: f32 = 5.0;
pub const FIRST_LAMP_INTENSITY: u32 = 2;

struct LampDesc {
    position: Vec3,
    color: Vec3,
    intensity: f32,
    scale: f32,
}

const LAMPS: [LampDesc; 4] = [
    LampDesc {
        position: Vec3::new(-1.0, -1.0, -1.0),
        color: Vec3::new(0.8, 0.6, 0.4),
        intensity: FIRST_LAMP_INTENSITY as f32,
        scale: 0.1,
    },
    LampDesc {
        position: Vec3::new(1.0, 1.0, -1.0),
        color: Vec3::new(0.2, 0.9, 0.5),
        intensity: 2.0,
        scale: 0.1,
    },
    LampDesc {
        position: Vec3::new(0.0, 0.1, 1.5),
        color: Vec3::new(0.2, 0.2, 0.9),
        intensity: 4.0,
        scale: 0.2,
    },
    LampDesc {
        position: Vec3::new(-1.0, 1.5, 1.5),
        color: Vec3::new(0.9, 0.2, 0.1),
        intensity: 4.0,
        scale: 0.05,
    },
];

/// Intensity the first lamp takes after `current` when cycled.
pub fn next_lamp_intensity(current: u32) -> u32 {
    (current * 2) % 31
}

/// Loads an OBJ, falling back to a generated sphere so the viewer still opens.
fn load_mesh(renderer: &Renderer, path: &Path, label: &str) -> Arc<GpuMesh> {
    let data = MeshData::from_obj(path).unwrap_or_else(|err| {
        log::error!("{}: {}, using a sphere instead", label, err);
        MeshData::uv_sphere(32, 16)
    });
    renderer.upload_mesh(&data, label)
}

/// An emissive sphere paired with a point light at the same spot.
pub struct Lamp {
    model: Handle<Model>,
    light: LightId,
    active: bool,
}

impl Lamp {
    fn spawn(renderer: &mut Renderer, mesh: Arc<GpuMesh>, desc: &LampDesc) -> Self {
        let mut model = renderer.new_model(mesh);
        model.transform.set_position(desc.position);
        model.transform.set_uniform_scale(desc.scale);
        model
            .add_material(Material::Forward(renderer.blinn_phong_material(desc.color, 0.5, 8.0)))
            .add_material(Material::Deferred(renderer.blinn_phong_material(desc.color, 0.5, 8.0)));
        let model = renderer.add_model(model);

        renderer.edit_model(model, |model, queue| {
            for material in model.materials_mut().filter_map(Material::as_blinn_phong_mut) {
                material.set_emissive_color(queue, desc.color);
                material.set_emissive_strength(queue, desc.intensity);
                material.set_emissive_enabled(queue, true);
            }
        });

        let mut light = Light::point(desc.position, desc.color, desc.intensity, LAMP_AMBIENT, LAMP_ATTENUATION);
        light.set_enabled(true);
        let light = renderer.add_light(light);

        Self {
            model,
            light,
            active: true,
        }
    }

    /// Switches the light and the glow together.
    pub fn toggle(&mut self, renderer: &mut Renderer) {
        self.active = !self.active;
        if let Some(light) = renderer.light_mut(self.light) {
            light.set_enabled(self.active);
        }

        let active = self.active;
        renderer.edit_model(self.model, |model, queue| {
            for material in model.materials_mut().filter_map(Material::as_blinn_phong_mut) {
                material.set_emissive_enabled(queue, active);
            }
        });
    }

    pub fn set_intensity(&self, renderer: &mut Renderer, intensity: f32) {
        if let Some(light) = renderer.light_mut(self.light) {
            light.set_intensity(intensity);
        }
        renderer.edit_model(self.model, |model, queue| {
            for material in model.materials_mut().filter_map(Material::as_blinn_phong_mut) {
                material.set_emissive_strength(queue, intensity);
            }
        });
    }
}

/// The viewer's default scene: two suns, four lamps, the bunny and a skybox.
pub struct Scene {
    suns: [LightId; 2],
    lamps: Vec<Lamp>,
    first_lamp_intensity: u32,
    bunny: Handle<Model>,
    preset: PbrPreset,
}

impl Scene {
    pub fn build(renderer: &mut Renderer, config: &ViewerConfig) -> Self {
        // 1. Suns
        let suns = SUN_DIRECTIONS.map(|direction| {
            let mut sun = Light::directional(direction, Vec3::ONE, SUN_INTENSITY, SUN_AMBIENT);
            sun.set_enabled(true);
            renderer.add_light(sun)
        });

        // 2. Bunny
        let bunny_mesh = load_mesh(renderer, &config.model, "Bunny Mesh");
        let preset = PbrPreset::default();
        let (roughness, metalness) = preset.values();

        let mut bunny = renderer.new_model(bunny_mesh);
        bunny.transform.set_position(BUNNY_POSITION);
        bunny
            .add_material(Material::Forward(renderer.blinn_phong_material(BUNNY_COLOR, 0.5, 64.0)))
            .add_material(Material::Deferred(renderer.blinn_phong_material(BUNNY_COLOR, 0.5, 64.0)))
            .add_material(Material::DeferredPbr(renderer.pbr_material(GOLD, roughness, metalness)));
        let bunny = renderer.add_model(bunny);

        // 3. Skybox
        let cube = renderer.upload_mesh(&MeshData::unit_cube(), "Skybox Mesh");
        let mut skybox = renderer.new_model(cube);
        skybox
            .add_material(Material::SkyboxForward(SkyboxMaterial::new()))
            .add_material(Material::SkyboxDeferred(SkyboxMaterial::new()));
        renderer.add_model(skybox);

        // 4. Lamps
        let lamp_mesh = match &config.lamp_mesh {
            Some(path) => load_mesh(renderer, path, "Lamp Mesh"),
            None => renderer.upload_mesh(&MeshData::uv_sphere(32, 16), "Lamp Mesh"),
        };
        let lamps = LAMPS
            .iter()
            .map(|desc| Lamp::spawn(renderer, lamp_mesh.clone(), desc))
            .collect();

        log::info!("scene ready: 2 suns, {} lamps", LAMPS.len());

        Self {
            suns,
            lamps,
            first_lamp_intensity: FIRST_LAMP_INTENSITY,
            bunny,
            preset,
        }
    }

    pub fn toggle_lamp(&mut self, renderer: &mut Renderer, index: usize) {
        if let Some(lamp) = self.lamps.get_mut(index) {
            lamp.toggle(renderer);
        }
    }

    pub fn toggle_suns(&self, renderer: &mut Renderer) {
        for sun in self.suns {
            if let Some(light) = renderer.light_mut(sun) {
                light.toggle();
            }
        }
    }

    pub fn cycle_first_lamp_intensity(&mut self, renderer: &mut Renderer) {
        self.first_lamp_intensity = next_lamp_intensity(self.first_lamp_intensity);
        if let Some(lamp) = self.lamps.first() {
            lamp.set_intensity(renderer, self.first_lamp_intensity as f32);
        }
        log::info!("lamp 1 intensity: {}", self.first_lamp_intensity);
    }

    pub fn next_pbr_preset(&mut self, renderer: &mut Renderer) {
        self.preset = self.preset.next();
        let preset = self.preset;
        renderer.edit_model(self.bunny, |model, queue| {
            if let Some(material) = model
                .material_mut(MaterialTag::DeferredPbr)
                .and_then(Material::as_pbr_mut)
            {
                material.apply_preset(queue, preset);
            }
        });
        log::info!("PBR preset: {:?}", preset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lamp_intensity_doubles_modulo_31() {
        let mut intensity = FIRST_LAMP_INTENSITY;
        let mut seen = Vec::new();
        for _ in 0..6 {
            intensity = next_lamp_intensity(intensity);
            seen.push(intensity);
        }
        assert_eq!(seen, vec![4, 8, 16, 1, 2, 4]);
    }

    #[test]
    fn first_lamp_starts_at_cycle_seed() {
        assert_eq!(LAMPS[0].intensity, FIRST_LAMP_INTENSITY as f32);
    }
}
