//! CPU twins of the WGSL lighting kernels.
//!
//! The shaders in `programs/` and `ibl/` evaluate exactly these formulas. They
//! are kept here so the numerics can be checked without a GPU.

use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3};

use crate::light::LightInfo;
use crate::programs::fxaa_program::{FXAA_ITERATIONS, fxaa_quality, is_edge};

/// Base reflectance of dielectrics.
pub const F0_DIELECTRIC: f32 = 0.04;
/// Lower bound applied to roughness before any NDF evaluation.
pub const MIN_ROUGHNESS: f32 = 0.01;
/// Highest mip of the prefiltered environment (5 levels).
pub const MAX_REFLECTION_LOD: f32 = 4.0;
/// Ambient used when image-based lighting is off.
pub const FLAT_AMBIENT: f32 = 0.03;

/// Trowbridge-Reitz GGX.
pub fn distribution_ggx(n_dot_h: f32, roughness: f32) -> f32 {
    let n_dot_h = n_dot_h.max(0.0);
    let r2 = roughness * roughness;
    let denom = n_dot_h * n_dot_h * (r2 - 1.0) + 1.0;
    r2 / (PI * denom * denom)
}

pub fn geometry_schlick_ggx(n_dot_v: f32, k: f32) -> f32 {
    let n_dot_v = n_dot_v.max(0.0);
    n_dot_v / (n_dot_v * (1.0 - k) + k)
}

/// `k` for analytic lights.
pub fn k_direct(roughness: f32) -> f32 {
    (roughness + 1.0) * (roughness + 1.0) / 8.0
}

/// `k` for image-based lighting.
pub fn k_ibl(roughness: f32) -> f32 {
    roughness * roughness / 2.0
}

pub fn geometry_smith(n_dot_v: f32, n_dot_l: f32, k: f32) -> f32 {
    geometry_schlick_ggx(n_dot_v, k) * geometry_schlick_ggx(n_dot_l, k)
}

pub fn fresnel_schlick(cos_theta: f32, f0: Vec3) -> Vec3 {
    let cos_theta = cos_theta.min(1.0);
    f0 + (Vec3::ONE - f0) * (1.0 - cos_theta).powi(5)
}

pub fn fresnel_schlick_roughness(cos_theta: f32, f0: Vec3, roughness: f32) -> Vec3 {
    let cos_theta = cos_theta.min(1.0);
    f0 + (Vec3::splat(1.0 - roughness).max(f0) - f0) * (1.0 - cos_theta).powi(5)
}

pub fn base_reflectance(albedo: Vec3, metalness: f32) -> Vec3 {
    Vec3::splat(F0_DIELECTRIC).lerp(albedo, metalness)
}

/// Diffuse and specular weights `(kd, ks)` for one light direction.
pub fn energy_split(v: Vec3, l: Vec3, albedo: Vec3, metalness: f32) -> (Vec3, Vec3) {
    let h = (l + v).normalize();
    let ks = fresnel_schlick(h.dot(v).max(0.0), base_reflectance(albedo, metalness));
    let kd = (Vec3::ONE - ks) * (1.0 - metalness);
    (kd, ks)
}

/// Cook-Torrance BRDF (Lambert diffuse plus GGX specular), without the N·L factor.
pub fn cook_torrance(
    v: Vec3,
    l: Vec3,
    n: Vec3,
    albedo: Vec3,
    roughness: f32,
    metalness: f32,
) -> Vec3 {
    let h = (l + v).normalize();
    let f = fresnel_schlick(h.dot(v).max(0.0), base_reflectance(albedo, metalness));
    let g = geometry_smith(n.dot(v), n.dot(l), k_direct(roughness));
    let d = distribution_ggx(n.dot(h), roughness);

    let kd = (Vec3::ONE - f) * (1.0 - metalness);
    let diffuse = kd * albedo / PI;

    let denom = (4.0 * n.dot(v).max(0.0) * n.dot(l).max(0.0)).max(0.001);
    diffuse + d * f * g / denom
}

/// A light brought into eye space: direction towards the light and attenuation
/// at `position`. `None` for disabled lights.
pub fn light_direction(info: &LightInfo, view: Mat4, position: Vec3) -> Option<(Vec3, f32)> {
    if !info.enabled {
        return None;
    }

    let eye = view * info.position;
    if info.position.w == 0.0 {
        // Directions ignore attenuation
        Some((eye.truncate().normalize(), 1.0))
    } else {
        let to_light = eye.truncate() - position;
        let distance = to_light.length();
        Some((
            to_light / distance,
            1.0 / (1.0 + info.attenuation * distance * distance),
        ))
    }
}

/// Values the lighting pass reads from the IBL textures for one pixel.
#[derive(Clone, Copy, Debug)]
pub struct IblSample {
    pub irradiance: Vec3,
    pub prefiltered: Vec3,
    pub brdf: Vec2,
}

/// One decoded G-Buffer texel, in eye space.
#[derive(Clone, Copy, Debug)]
pub struct Surface {
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    pub roughness: f32,
    pub metalness: f32,
    /// color * strength, zero when emission is off
    pub emissive: Vec3,
}

/// Outgoing radiance of a G-Buffer texel under PBR shading.
pub fn shade_pbr(
    surface: &Surface,
    lights: &[LightInfo],
    view: Mat4,
    ao: f32,
    ibl: Option<IblSample>,
) -> Vec3 {
    let roughness = surface.roughness.max(MIN_ROUGHNESS);
    let v = (-surface.position).normalize();
    let mut n = surface.normal.normalize();
    if n.dot(v) < 0.0 {
        n = -n;
    }

    let mut color = Vec3::ZERO;
    for info in lights {
        let Some((l, attenuation)) = light_direction(info, view, surface.position) else {
            continue;
        };
        let radiance = info.color * info.intensity * attenuation;
        let n_dot_l = n.dot(l).max(0.0);
        color += cook_torrance(v, l, n, surface.albedo, roughness, surface.metalness) * radiance * n_dot_l;
    }

    match ibl {
        None => color += FLAT_AMBIENT * surface.albedo * ao,
        Some(sample) => {
            let n_dot_v = n.dot(v).max(0.0);
            let f0 = base_reflectance(surface.albedo, surface.metalness);
            let ks = fresnel_schlick_roughness(n_dot_v, f0, roughness);
            let kd = (Vec3::ONE - ks) * (1.0 - surface.metalness);

            let diffuse = kd * sample.irradiance * surface.albedo;
            let specular = sample.prefiltered * (ks * sample.brdf.x + sample.brdf.y);
            color += (diffuse + specular) * ao;
        }
    }

    color + surface.emissive
}

/// Per-light Blinn-Phong (or Phong) term shared by the forward material and the
/// deferred Blinn-Phong lighting pass.
#[allow(clippy::too_many_arguments)]
pub fn shade_blinn_phong(
    position: Vec3,
    normal: Vec3,
    color: Vec3,
    specular_coefficient: f32,
    shininess: f32,
    emissive: Vec3,
    lights: &[LightInfo],
    view: Mat4,
    blinn: bool,
) -> Vec3 {
    let e = (-position).normalize();
    let mut n = normal.normalize();
    if n.dot(e) < 0.0 {
        n = -n;
    }

    let mut out = Vec3::ZERO;
    for info in lights {
        let Some((l, attenuation)) = light_direction(info, view, position) else {
            continue;
        };
        let light = info.color * info.intensity;

        let ambient = info.ambient_coefficient * color * light;
        let diffuse_coefficient = n.dot(l).max(0.0);
        let diffuse = diffuse_coefficient * color * light;

        let mut specular_term = 0.0;
        if diffuse_coefficient > 0.0 {
            let alignment = if blinn {
                n.dot((l + e).normalize())
            } else {
                reflect(-l, n).dot(e)
            };
            specular_term = alignment.max(0.0).powf(shininess);
        }
        let specular = specular_coefficient * specular_term * color * light;

        out += ambient + attenuation * (diffuse + specular);
    }

    out + emissive
}

pub fn reflect(i: Vec3, n: Vec3) -> Vec3 {
    i - 2.0 * n.dot(i) * n
}

/// Rec. 709 luminance; the bloom bright pass keeps pixels above 1.0.
pub fn bright_pass(color: Vec3) -> Vec3 {
    let brightness = color.dot(Vec3::new(0.2126, 0.7152, 0.0722));
    if brightness > 1.0 { color } else { Vec3::ZERO }
}

/// Compositing order: bloom add, exposure tone map, gamma.
pub fn composite(scene: Vec3, bloom: Vec3, use_bloom: bool, hdr: bool, gamma: bool, exposure: f32) -> Vec3 {
    let mut color = scene;
    if use_bloom {
        color += bloom;
    }
    if hdr {
        color = Vec3::ONE - (-color * exposure).exp();
    }
    if gamma {
        color = color.powf(1.0 / 2.2);
    }
    color
}

/// Rec. 601 luma used for FXAA edge detection.
pub fn fxaa_luma(color: Vec3) -> f32 {
    color.dot(Vec3::new(0.299, 0.587, 0.114))
}

/// FXAA for the pixel centred at `p`. `sample` reads the source with bilinear
/// filtering in pixel units, so one unit is one pixel.
pub fn fxaa(sample: impl Fn(Vec2) -> Vec3, p: Vec2) -> Vec3 {
    let luma_at = |dx: f32, dy: f32| fxaa_luma(sample(p + Vec2::new(dx, dy)));

    let color = sample(p);
    let m = fxaa_luma(color);
    let (d, u, r, l) = (luma_at(0.0, -1.0), luma_at(0.0, 1.0), luma_at(1.0, 0.0), luma_at(-1.0, 0.0));
    let luma_min = m.min(d).min(u).min(r).min(l);
    let luma_max = m.max(d).max(u).max(r).max(l);
    if !is_edge(luma_min, luma_max) {
        return color;
    }

    let (dl, dr) = (luma_at(-1.0, -1.0), luma_at(1.0, -1.0));
    let (ul, ur) = (luma_at(-1.0, 1.0), luma_at(1.0, 1.0));
    let edge_horizontal =
        (-2.0 * l + dl + ul).abs() + (-2.0 * m + d + u).abs() * 2.0 + (-2.0 * r + dr + ur).abs();
    let edge_vertical =
        (-2.0 * u + ul + ur).abs() + (-2.0 * m + l + r).abs() * 2.0 + (-2.0 * d + dl + dr).abs();
    let horizontal = edge_horizontal >= edge_vertical;

    let (luma1, luma2) = if horizontal { (d, u) } else { (l, r) };
    let gradient1 = luma1 - m;
    let gradient2 = luma2 - m;
    let use_gradient1 = gradient1.abs() >= gradient2.abs();
    let scaled_gradient = 0.25 * gradient1.abs().max(gradient2.abs());
    let (step, local_average) = if use_gradient1 {
        (-1.0, 0.5 * (luma1 + m))
    } else {
        (1.0, 0.5 * (luma2 + m))
    };

    // `across` steps over the edge, `along` follows it
    let (across, along) = if horizontal { (Vec2::Y, Vec2::X) } else { (Vec2::X, Vec2::Y) };
    let shifted = p + across * step * 0.5;
    let mut p1 = shifted - along;
    let mut p2 = shifted + along;

    let mut end1 = fxaa_luma(sample(p1)) - local_average;
    let mut end2 = fxaa_luma(sample(p2)) - local_average;
    let mut reached1 = end1.abs() >= scaled_gradient;
    let mut reached2 = end2.abs() >= scaled_gradient;
    if !reached1 {
        p1 -= along;
    }
    if !reached2 {
        p2 += along;
    }

    if !(reached1 && reached2) {
        for i in 2..FXAA_ITERATIONS {
            if !reached1 {
                end1 = fxaa_luma(sample(p1)) - local_average;
            }
            if !reached2 {
                end2 = fxaa_luma(sample(p2)) - local_average;
            }
            reached1 = end1.abs() >= scaled_gradient;
            reached2 = end2.abs() >= scaled_gradient;
            if !reached1 {
                p1 -= along * fxaa_quality(i);
            }
            if !reached2 {
                p2 += along * fxaa_quality(i);
            }
            if reached1 && reached2 {
                break;
            }
        }
    }

    let distance1 = (p - p1).dot(along);
    let distance2 = (p2 - p).dot(along);
    let direction1 = distance1 < distance2;
    let pixel_offset = -distance1.min(distance2) / (distance1 + distance2) + 0.5;

    let end_luma = if direction1 { end1 } else { end2 };
    let correct_variation = (end_luma < 0.0) != (m < local_average);
    let offset = if correct_variation { pixel_offset } else { 0.0 };
    sample(p + across * offset * step)
}

/// Van der Corput radical inverse, base 2.
pub fn radical_inverse_vdc(mut bits: u32) -> f32 {
    bits = bits.rotate_right(16);
    bits = ((bits & 0x5555_5555) << 1) | ((bits & 0xAAAA_AAAA) >> 1);
    bits = ((bits & 0x3333_3333) << 2) | ((bits & 0xCCCC_CCCC) >> 2);
    bits = ((bits & 0x0F0F_0F0F) << 4) | ((bits & 0xF0F0_F0F0) >> 4);
    bits = ((bits & 0x00FF_00FF) << 8) | ((bits & 0xFF00_FF00) >> 8);
    bits as f32 * 2.328_306_4e-10
}

pub fn hammersley(i: u32, count: u32) -> Vec2 {
    Vec2::new(i as f32 / count as f32, radical_inverse_vdc(i))
}

/// GGX importance sample around `n`, returning the half vector.
pub fn importance_sample_ggx(xi: Vec2, n: Vec3, roughness: f32) -> Vec3 {
    let a = roughness * roughness;
    let phi = 2.0 * PI * xi.x;
    let cos_theta = ((1.0 - xi.y) / (1.0 + (a * a - 1.0) * xi.y)).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

    let h = Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);

    let up = if n.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
    let tangent = up.cross(n).normalize();
    let bitangent = n.cross(tangent);
    (tangent * h.x + bitangent * h.y + n * h.z).normalize()
}

/// Split-sum BRDF integral `(scale, bias)` stored in the LUT.
pub fn integrate_brdf(n_dot_v: f32, roughness: f32, samples: u32) -> Vec2 {
    let v = Vec3::new((1.0 - n_dot_v * n_dot_v).sqrt(), 0.0, n_dot_v);
    let n = Vec3::Z;
    let k = k_ibl(roughness);

    let mut scale = 0.0;
    let mut bias = 0.0;
    for i in 0..samples {
        let h = importance_sample_ggx(hammersley(i, samples), n, roughness);
        let l = (2.0 * v.dot(h) * h - v).normalize();

        let n_dot_l = l.z.max(0.0);
        let n_dot_h = h.z.max(0.0);
        let v_dot_h = v.dot(h).max(0.0);

        if n_dot_l > 0.0 {
            let g = geometry_smith(n_dot_v, n_dot_l, k);
            let g_vis = (g * v_dot_h) / (n_dot_h * n_dot_v);
            let fc = (1.0 - v_dot_h).powi(5);
            scale += (1.0 - fc) * g_vis;
            bias += fc * g_vis;
        }
    }

    Vec2::new(scale, bias) / samples as f32
}

/// Angular step of the irradiance convolution.
pub const IRRADIANCE_STEP: f32 = 0.025;

/// Cosine-weighted hemisphere integral around `n`, normalised as `π · sum / count`.
pub fn irradiance(n: Vec3, environment: impl Fn(Vec3) -> Vec3) -> Vec3 {
    let up = if n.y.abs() < 0.999 { Vec3::Y } else { Vec3::Z };
    let right = up.cross(n).normalize();
    let up = n.cross(right);

    let mut sum = Vec3::ZERO;
    let mut count = 0u32;
    let mut phi = 0.0;
    while phi < 2.0 * PI {
        let mut theta = 0.0;
        while theta < 0.5 * PI {
            let tangent = Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
            let sample = tangent.x * right + tangent.y * up + tangent.z * n;
            sum += environment(sample) * theta.cos() * theta.sin();
            count += 1;
            theta += IRRADIANCE_STEP;
        }
        phi += IRRADIANCE_STEP;
    }

    PI * sum / count as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::Light;
    use approx::assert_relative_eq;
    use glam::Vec4;

    fn view() -> Mat4 {
        Mat4::look_at_rh(Vec3::new(0.0, 0.0, 8.0), Vec3::ZERO, Vec3::Y)
    }

    #[test]
    fn zero_roughness_is_finite() {
        // N·H = 0 and N·H = 1 with roughness clamped
        for n_dot_h in [0.0, 1.0] {
            let d = distribution_ggx(n_dot_h, 0.0f32.max(MIN_ROUGHNESS));
            assert!(d.is_finite());
        }

        let n = Vec3::Z;
        let v = Vec3::Z;
        let l = Vec3::X; // grazing, N·L = 0
        let c = cook_torrance(v, l, n, Vec3::splat(0.5), MIN_ROUGHNESS, 0.0);
        assert!(c.is_finite());
    }

    #[test]
    fn shade_with_zero_roughness_has_no_nan() {
        let mut sun = Light::directional(Vec3::new(0.0, 0.0, 1.0), Vec3::ONE, 1.0, 0.1);
        sun.set_enabled(true);
        let surface = Surface {
            position: Vec3::new(0.0, 0.0, -7.0),
            normal: Vec3::Z,
            albedo: Vec3::splat(0.5),
            roughness: 0.0,
            metalness: 1.0,
            emissive: Vec3::ZERO,
        };
        let out = shade_pbr(&surface, &[sun.info()], Mat4::IDENTITY, 1.0, None);
        assert!(out.is_finite());
    }

    #[test]
    fn dielectric_energy_split_never_exceeds_one() {
        for metalness in [0.0, 0.5, 1.0] {
            for albedo in [Vec3::ZERO, Vec3::new(0.75, 0.6, 0.22), Vec3::ONE] {
                for angle in 0..=8 {
                    let t = angle as f32 / 8.0 * 0.5 * PI;
                    let v = Vec3::new(t.sin(), 0.0, t.cos());
                    let l = Vec3::new(-t.sin() * 0.5, 0.3, t.cos()).normalize();
                    let (kd, ks) = energy_split(v, l, albedo, metalness);
                    let total = kd + ks;
                    assert!(total.max_element() <= 1.0 + 1e-6, "{total:?}");
                }
            }
        }
    }

    #[test]
    fn disabled_light_equals_removed_light() {
        let mut sun = Light::directional(Vec3::new(-3.0, 1.0, -3.0), Vec3::ONE, 0.5, 0.2);
        sun.set_enabled(true);
        let lamp = Light::point(Vec3::new(1.0, 1.0, -1.0), Vec3::new(0.2, 0.9, 0.5), 2.0, 0.01, 5.0);

        let surface = Surface {
            position: Vec3::new(0.2, -0.3, -7.5),
            normal: Vec3::new(0.1, 0.2, 1.0),
            albedo: Vec3::new(1.0, 0.71, 0.29),
            roughness: 0.2,
            metalness: 1.0,
            emissive: Vec3::ZERO,
        };

        let with_disabled = shade_pbr(&surface, &[sun.info(), lamp.info()], view(), 1.0, None);
        let without = shade_pbr(&surface, &[sun.info()], view(), 1.0, None);
        assert_eq!(with_disabled, without);

        let bp_disabled = shade_blinn_phong(
            surface.position,
            surface.normal,
            surface.albedo,
            0.5,
            64.0,
            Vec3::ZERO,
            &[sun.info(), lamp.info()],
            view(),
            true,
        );
        let bp_without = shade_blinn_phong(
            surface.position,
            surface.normal,
            surface.albedo,
            0.5,
            64.0,
            Vec3::ZERO,
            &[sun.info()],
            view(),
            true,
        );
        assert_eq!(bp_disabled, bp_without);
    }

    #[test]
    fn rough_diffuse_sphere_is_ambient_plus_diffuse() {
        let albedo = Vec3::new(0.75, 0.60, 0.22);
        let mut sun = Light::directional(Vec3::Z, Vec3::ONE, 0.5, 0.5);
        sun.set_enabled(true);

        // Eye at the origin looking down -Z at the point facing the light
        let surface = Surface {
            position: Vec3::new(0.0, 0.0, -5.0),
            normal: Vec3::Z,
            albedo,
            roughness: 1.0,
            metalness: 0.0,
            emissive: Vec3::ZERO,
        };
        let shaded = shade_pbr(&surface, &[sun.info()], Mat4::IDENTITY, 1.0, None);

        let kd = 1.0 - F0_DIELECTRIC;
        let expected = FLAT_AMBIENT * albedo + kd * albedo / PI * 0.5;
        assert!((shaded - expected).abs().max_element() < 0.005);
    }

    #[test]
    fn point_light_attenuates_with_distance() {
        let mut lamp = Light::point(Vec3::new(0.0, 0.0, 2.0), Vec3::ONE, 1.0, 0.0, 5.0);
        lamp.set_enabled(true);
        let (l, attenuation) = light_direction(&lamp.info(), Mat4::IDENTITY, Vec3::ZERO).unwrap();
        assert_relative_eq!(l, Vec3::Z);
        assert_relative_eq!(attenuation, 1.0 / (1.0 + 5.0 * 4.0));
    }

    #[test]
    fn directional_light_follows_view_rotation() {
        let mut sun = Light::directional(Vec3::X, Vec3::ONE, 1.0, 0.0);
        sun.set_enabled(true);
        let yaw = Mat4::from_rotation_y(PI / 2.0);
        let (l, attenuation) = light_direction(&sun.info(), yaw, Vec3::new(5.0, 5.0, 5.0)).unwrap();
        assert_relative_eq!(l, yaw.transform_vector3(Vec3::X), epsilon = 1e-6);
        assert_eq!(attenuation, 1.0);
    }

    #[test]
    fn blinn_phong_has_no_specular_on_the_dark_side() {
        let mut lamp = Light::point(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE, 1.0, 0.0, 0.0);
        lamp.set_enabled(true);
        let out = shade_blinn_phong(
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::Z,
            Vec3::ONE,
            1.0,
            8.0,
            Vec3::ZERO,
            &[lamp.info()],
            Mat4::IDENTITY,
            false,
        );
        assert_eq!(out, Vec3::ZERO);
    }

    #[test]
    fn emissive_is_added_unconditionally() {
        let surface = Surface {
            position: Vec3::new(0.0, 0.0, -5.0),
            normal: Vec3::Z,
            albedo: Vec3::ZERO,
            roughness: 0.5,
            metalness: 0.0,
            emissive: Vec3::new(0.9, 0.2, 0.1) * 4.0,
        };
        let out = shade_pbr(&surface, &[], Mat4::IDENTITY, 0.0, None);
        assert_relative_eq!(out, Vec3::new(3.6, 0.8, 0.4), epsilon = 1e-6);
    }

    #[test]
    fn exposure_is_monotonic_for_white() {
        use crate::config::EXPOSURE_VALUES;

        let mut previous = -1.0;
        for exposure in EXPOSURE_VALUES {
            let c = composite(Vec3::ONE, Vec3::ZERO, false, true, false, exposure);
            assert_relative_eq!(c.x, 1.0 - (-exposure).exp());
            assert!(c.x > previous);
            previous = c.x;
        }
    }

    #[test]
    fn composite_applies_bloom_before_tone_map() {
        let c = composite(Vec3::splat(0.5), Vec3::splat(0.5), true, true, true, 1.0);
        let expected = (1.0 - (-1.0f32).exp()).powf(1.0 / 2.2);
        assert_relative_eq!(c.x, expected, epsilon = 1e-6);
    }

    #[test]
    fn bright_pass_cuts_at_one() {
        assert_eq!(bright_pass(Vec3::splat(0.9)), Vec3::ZERO);
        assert_eq!(bright_pass(Vec3::splat(1.5)), Vec3::splat(1.5));
    }

    #[test]
    fn white_environment_irradiance_is_one() {
        for n in [Vec3::Y, Vec3::X, Vec3::new(0.3, -0.8, 0.2).normalize()] {
            let e = irradiance(n, |_| Vec3::ONE);
            assert_relative_eq!(e.x, 1.0, epsilon = 0.02);
        }
    }

    #[test]
    fn irradiance_is_deterministic() {
        let env = |d: Vec3| Vec3::new(d.x.max(0.0), d.y * d.y, 0.25);
        let n = Vec3::new(0.2, 0.9, -0.1).normalize();
        assert_eq!(irradiance(n, env), irradiance(n, env));
    }

    #[test]
    fn brdf_lut_head_on_smooth_is_unit() {
        let lut = integrate_brdf(1.0, 0.0, 256);
        assert_relative_eq!(lut.x + lut.y, 1.0, epsilon = 0.01);
        assert_eq!(lut, integrate_brdf(1.0, 0.0, 256));
    }

    #[test]
    fn brdf_lut_stays_in_unit_range() {
        for nv in [0.5, 0.9] {
            for r in [0.5, 1.0] {
                let lut = integrate_brdf(nv, r, 512);
                assert!(lut.x >= 0.0 && lut.y >= 0.0);
                assert!(lut.x + lut.y <= 1.02, "{lut:?}");
            }
        }
    }

    #[test]
    fn hammersley_second_coordinate_is_bit_reversed() {
        assert_eq!(hammersley(0, 4), Vec2::new(0.0, 0.0));
        assert_relative_eq!(hammersley(1, 4).y, 0.5);
        assert_relative_eq!(hammersley(2, 4).y, 0.25);
        assert_relative_eq!(hammersley(3, 4).y, 0.75);
    }

    #[test]
    fn light_positions_are_homogeneous() {
        let lamp = Light::point(Vec3::ONE, Vec3::ONE, 1.0, 0.0, 1.0);
        assert_eq!(lamp.info().position, Vec4::new(1.0, 1.0, 1.0, 1.0));
    }

    fn bilinear(grid: Vec<Vec<f32>>) -> impl Fn(Vec2) -> Vec3 {
        move |p| {
            let h = grid.len() as i32;
            let w = grid[0].len() as i32;
            let texel = |x: i32, y: i32| grid[y.clamp(0, h - 1) as usize][x.clamp(0, w - 1) as usize];
            let (x0, y0) = (p.x.floor(), p.y.floor());
            let (fx, fy) = (p.x - x0, p.y - y0);
            let (x0, y0) = (x0 as i32, y0 as i32);
            let top = texel(x0, y0) * (1.0 - fx) + texel(x0 + 1, y0) * fx;
            let bottom = texel(x0, y0 + 1) * (1.0 - fx) + texel(x0 + 1, y0 + 1) * fx;
            Vec3::splat(top * (1.0 - fy) + bottom * fy)
        }
    }

    #[test]
    fn fxaa_keeps_flat_neighbourhood() {
        let sample = bilinear(vec![vec![0.5; 3]; 3]);
        assert_eq!(fxaa(&sample, Vec2::new(1.0, 1.0)), Vec3::splat(0.5));
    }

    #[test]
    fn fxaa_ignores_contrast_below_threshold() {
        let mut grid = vec![vec![0.5; 3]; 3];
        grid[1][2] = 0.52;
        let sample = bilinear(grid);
        assert_eq!(fxaa(&sample, Vec2::new(1.0, 1.0)), Vec3::splat(0.5));
    }

    #[test]
    fn fxaa_blends_across_vertical_edge() {
        // Bright quadrant whose vertical edge ends at row 8
        let grid: Vec<Vec<f32>> = (0..16)
            .map(|y| (0..16).map(|x| if x >= 8 && y >= 8 { 1.0 } else { 0.0 }).collect())
            .collect();
        let sample = bilinear(grid);

        let blended = fxaa(&sample, Vec2::new(8.0, 9.0));
        assert!(blended.x > 0.0 && blended.x < 1.0, "{blended}");
        // Pulled towards the dark column on the left
        assert!(blended.x < 0.6, "{blended}");
        assert_eq!(fxaa(&sample, Vec2::new(3.0, 3.0)), Vec3::ZERO);
    }
}
