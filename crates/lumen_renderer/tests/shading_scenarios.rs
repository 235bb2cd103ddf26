use std::f32::consts::PI;

use approx::assert_abs_diff_eq;
use glam::{Mat4, Vec3};
use lumen_renderer::{
    FrameConfig, Light, MAX_LIGHTS, RenderPath, RenderToggles,
    light::LightUniforms,
    programs::bloom_program::{BLOOM_RESULT, BLUR_PASSES, BlurInput, blur_step},
    shading::{self, FLAT_AMBIENT, Surface},
};

const BUNNY_ALBEDO: Vec3 = Vec3::new(0.75, 0.60, 0.22);

fn rough_sphere_texel() -> Surface {
    // Eye space, camera looking down -Z at a point whose normal faces both camera and light
    Surface {
        position: Vec3::new(0.0, 0.0, -5.0),
        normal: Vec3::Z,
        albedo: BUNNY_ALBEDO,
        roughness: 1.0,
        metalness: 0.0,
        emissive: Vec3::ZERO,
    }
}

fn sun_towards_camera() -> Light {
    let mut sun = Light::directional(Vec3::Z, Vec3::ONE, 0.5, 0.5);
    sun.set_enabled(true);
    sun
}

#[test]
fn rough_dielectric_is_ambient_plus_diffuse() {
    let surface = rough_sphere_texel();
    let lights = [sun_towards_camera().info()];

    let color = shading::shade_pbr(&surface, &lights, Mat4::IDENTITY, 1.0, None);

    // n = v = l: F = 0.04, so kd = 0.96; GGX at roughness 1 is flat (1/pi)
    let diffuse = 0.96 * BUNNY_ALBEDO / PI * 0.5;
    let specular = Vec3::splat(0.04 / (4.0 * PI) * 0.5);
    let ambient = FLAT_AMBIENT * BUNNY_ALBEDO;
    let expected = ambient + diffuse + specular;

    assert_abs_diff_eq!(color.x, expected.x, epsilon = 1e-4);
    assert_abs_diff_eq!(color.y, expected.y, epsilon = 1e-4);
    assert_abs_diff_eq!(color.z, expected.z, epsilon = 1e-4);
    // Specular is an order of magnitude below diffuse
    assert!(specular.x < diffuse.z * 0.1);
}

#[test]
fn disabled_lights_leave_only_ambient() {
    let surface = rough_sphere_texel();
    let mut sun = sun_towards_camera();
    sun.toggle();

    let color = shading::shade_pbr(&surface, &[sun.info()], Mat4::IDENTITY, 1.0, None);
    assert!((color - FLAT_AMBIENT * BUNNY_ALBEDO).length() < 1e-6);
}

#[test]
fn occlusion_scales_flat_ambient() {
    let surface = rough_sphere_texel();
    let dark = shading::shade_pbr(&surface, &[], Mat4::IDENTITY, 0.0, None);
    assert_eq!(dark, Vec3::ZERO);
}

#[test]
fn extra_lights_are_dropped_but_slots_stay_stable() {
    let mut lights: Vec<Light> = (0..MAX_LIGHTS + 2).map(|_| sun_towards_camera()).collect();
    lights[1].toggle();

    let packed = LightUniforms::pack(&lights);
    assert_eq!(packed.count as usize, MAX_LIGHTS);
    assert_eq!(packed.lights[1].enabled, 0.0);
    assert_eq!(packed.lights[2].enabled, 1.0);
}

#[test]
fn frame_config_follows_toggles() {
    let toggles = RenderToggles::default() - RenderToggles::FXAA;
    let config = FrameConfig::snapshot(RenderPath::Forward, toggles, 5.0);

    assert_eq!(config.path, RenderPath::Forward);
    assert!(!config.fxaa);
    assert!(config.msaa && config.bloom && config.ibl);
    assert_eq!(config.exposure, 5.0);
}

#[test]
fn bloom_chain_alternates_and_ends_in_result() {
    let mut last_output = None;
    for i in 0..BLUR_PASSES {
        let step = blur_step(i);
        if let Some(previous) = last_output {
            assert_eq!(step.input, BlurInput::PingPong(previous));
        }
        last_output = Some(step.output);
    }
    assert_eq!(last_output, Some(BLOOM_RESULT));
}

#[test]
fn composite_without_effects_is_identity() {
    let scene = Vec3::new(0.2, 0.4, 0.8);
    assert_eq!(shading::composite(scene, Vec3::ONE, false, false, false, 1.0), scene);
}
