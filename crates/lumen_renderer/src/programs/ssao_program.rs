use glam::{Vec3, Vec4};
use half::f16;
use rand::{Rng, SeedableRng, rngs::StdRng};
use wgpu::util::DeviceExt;

use crate::{
    mesh::ScreenQuad,
    programs::{GpuProgram, GpuProgramRenderContext, SCREEN_VS, fullscreen_pipeline, replace_target},
    shader::{ProgramDesc, ShaderStage},
    targets::{GBuffer, PostTargets, SSAO_FORMAT},
    texture::{TextureHelper, sampler_entry, texture_entry, uniform_entry},
};

pub const KERNEL_SIZE: usize = 64;
pub const NOISE_DIM: u32 = 4;
pub const SSAO_RADIUS: f32 = 0.5;
pub const SSAO_BIAS: f32 = 0.025;

/// Fixed seed so the kernel, and therefore the image, is reproducible.
const SSAO_SEED: u64 = 0x55A0;

const OCCLUSION: ProgramDesc = ProgramDesc {
    label: "SSAO",
    vertex: SCREEN_VS,
    fragment: ShaderStage::new("ssao_fs", include_str!("ssao_fs.wgsl")),
};

const BLUR: ProgramDesc = ProgramDesc {
    label: "SSAO Blur",
    vertex: SCREEN_VS,
    fragment: ShaderStage::new("ssao_blur_fs", include_str!("ssao_blur_fs.wgsl")),
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SsaoUniform {
    pub samples: [[f32; 4]; KERNEL_SIZE],
    pub noise_scale: [f32; 2],
    pub radius: f32,
    pub bias: f32,
}

/// Hemisphere samples around +Z. Samples cluster towards the origin: the
/// length scale grows quadratically with the index.
pub fn generate_kernel(rng: &mut impl Rng) -> [Vec3; KERNEL_SIZE] {
    std::array::from_fn(|i| {
        let sample = Vec3::new(
            rng.r#gen::<f32>() * 2.0 - 1.0,
            rng.r#gen::<f32>() * 2.0 - 1.0,
            rng.r#gen::<f32>(),
        );
        let scale = i as f32 / KERNEL_SIZE as f32;
        let scale = 0.1 + (scale * scale) * (1.0 - 0.1);
        sample.normalize_or_zero() * rng.r#gen::<f32>() * scale
    })
}

/// Random rotations about the normal, tiled over the screen.
pub fn generate_noise(rng: &mut impl Rng) -> [Vec3; (NOISE_DIM * NOISE_DIM) as usize] {
    std::array::from_fn(|_| {
        Vec3::new(
            rng.r#gen::<f32>() * 2.0 - 1.0,
            rng.r#gen::<f32>() * 2.0 - 1.0,
            0.0,
        )
    })
}

/// Which of the two SSAO passes to record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SsaoStage {
    /// G-Buffer position/normal into the raw occlusion target.
    Occlusion,
    /// Raw occlusion into the blurred target.
    Blur,
}

pub struct SsaoDrawData<'a> {
    pub global: &'a wgpu::BindGroup,
    pub quad: &'a ScreenQuad,
    pub stage: SsaoStage,
}

pub struct SsaoInit<'i> {
    pub global_layout: &'i wgpu::BindGroupLayout,
    pub gbuffer: &'i GBuffer,
    pub targets: &'i PostTargets,
}

pub struct SsaoProgram {
    occlusion_pipeline: Option<wgpu::RenderPipeline>,
    blur_pipeline: Option<wgpu::RenderPipeline>,
    occlusion_bind_group: wgpu::BindGroup,
    blur_bind_group: wgpu::BindGroup,
}

impl SsaoProgram {
    fn noise_texture(ctx: &GpuProgramRenderContext, noise: &[Vec3]) -> wgpu::Texture {
        let texels: Vec<f16> = noise
            .iter()
            .flat_map(|n| Vec4::from((*n, 0.0)).to_array())
            .map(f16::from_f32)
            .collect();

        ctx.device.create_texture_with_data(
            ctx.queue,
            &wgpu::TextureDescriptor {
                label: Some("SSAO Noise"),
                size: wgpu::Extent3d {
                    width: NOISE_DIM,
                    height: NOISE_DIM,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TextureHelper::HDR_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            bytemuck::cast_slice(&texels),
        )
    }
}

impl GpuProgram for SsaoProgram {
    type InitData<'i> = SsaoInit<'i>;
    type DrawData<'a> = SsaoDrawData<'a>;

    fn new(ctx: &GpuProgramRenderContext, init: Self::InitData<'_>) -> Self {
        let device = ctx.device;

        // 1. Kernel and noise
        let mut rng = StdRng::seed_from_u64(SSAO_SEED);
        let kernel = generate_kernel(&mut rng);
        let noise = generate_noise(&mut rng);

        let width = init.targets.ssao_raw.width();
        let height = init.targets.ssao_raw.height();
        let uniform = SsaoUniform {
            samples: kernel.map(|s| Vec4::from((s, 0.0)).to_array()),
            noise_scale: [
                width as f32 / NOISE_DIM as f32,
                height as f32 / NOISE_DIM as f32,
            ],
            radius: SSAO_RADIUS,
            bias: SSAO_BIAS,
        };
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SSAO Params"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let noise_texture = Self::noise_texture(ctx, &noise);
        let noise_view = noise_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let gbuffer_sampler = TextureHelper::nearest_clamp_sampler(device, "SSAO G-Buffer Sampler");
        let noise_sampler = TextureHelper::repeat_nearest_sampler(device, "SSAO Noise Sampler");

        // 2. Layouts
        let occlusion_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Bind Group Layout"),
            entries: &[
                // --- BINDING 0/1: G-Buffer position and normal ---
                texture_entry(0, wgpu::TextureViewDimension::D2),
                texture_entry(1, wgpu::TextureViewDimension::D2),
                // --- BINDING 2: Rotation noise ---
                texture_entry(2, wgpu::TextureViewDimension::D2),
                sampler_entry(3),
                sampler_entry(4),
                // --- BINDING 5: Kernel ---
                uniform_entry(5, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let blur_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Blur Bind Group Layout"),
            entries: &[texture_entry(0, wgpu::TextureViewDimension::D2), sampler_entry(1)],
        });

        // 3. Bind groups over the fixed-size targets
        let occlusion_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO Bind Group"),
            layout: &occlusion_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&init.gbuffer.position.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&init.gbuffer.normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&noise_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&gbuffer_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&noise_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });
        let blur_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO Blur Bind Group"),
            layout: &blur_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&init.targets.ssao_raw.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&gbuffer_sampler),
                },
            ],
        });

        // 4. Pipelines
        let targets = [replace_target(SSAO_FORMAT)];
        let occlusion_pipeline = ctx.shaders.program(device, &OCCLUSION).and_then(|program| {
            fullscreen_pipeline(
                device,
                &program,
                &[init.global_layout, &occlusion_layout],
                &targets,
                None,
            )
        });
        let blur_pipeline = ctx
            .shaders
            .program(device, &BLUR)
            .and_then(|program| fullscreen_pipeline(device, &program, &[&blur_layout], &targets, None));

        Self {
            occlusion_pipeline,
            blur_pipeline,
            occlusion_bind_group,
            blur_bind_group,
        }
    }

    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>) {
        match data.stage {
            SsaoStage::Occlusion => {
                let Some(pipeline) = &self.occlusion_pipeline else {
                    return;
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, data.global, &[]);
                rpass.set_bind_group(1, &self.occlusion_bind_group, &[]);
            }
            SsaoStage::Blur => {
                let Some(pipeline) = &self.blur_pipeline else {
                    return;
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, &self.blur_bind_group, &[]);
            }
        }
        data.quad.draw(rpass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel() -> [Vec3; KERNEL_SIZE] {
        generate_kernel(&mut StdRng::seed_from_u64(SSAO_SEED))
    }

    #[test]
    fn kernel_lies_in_upper_hemisphere() {
        for sample in kernel() {
            assert!(sample.z >= 0.0);
            assert!(sample.length() <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn kernel_scale_grows_with_index() {
        let kernel = kernel();
        // Sample i is at most lerp(0.1, 1, (i/64)^2) long
        assert!(kernel[0].length() <= 0.1 + 1e-5);
        assert!(kernel[8].length() <= 0.1 + 0.9 * (8.0f32 / 64.0).powi(2) + 1e-5);
    }

    #[test]
    fn kernel_is_reproducible() {
        assert_eq!(kernel(), kernel());
    }

    #[test]
    fn noise_rotates_about_z() {
        let noise = generate_noise(&mut StdRng::seed_from_u64(7));
        assert_eq!(noise.len(), 16);
        for n in noise {
            assert_eq!(n.z, 0.0);
            assert!((-1.0..=1.0).contains(&n.x) && (-1.0..=1.0).contains(&n.y));
        }
    }

    #[test]
    fn uniform_matches_wgsl_layout() {
        // array<vec4, 64> + vec2 + f32 + f32
        assert_eq!(std::mem::size_of::<SsaoUniform>(), 64 * 16 + 16);
    }
}
