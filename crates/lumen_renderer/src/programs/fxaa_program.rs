//! Final passes onto the swapchain: FXAA, or a plain copy when FXAA is off.

use crate::{
    mesh::ScreenQuad,
    programs::{GpuProgram, GpuProgramRenderContext, SCREEN_VS, fullscreen_pipeline, replace_target},
    shader::{ProgramDesc, ShaderStage},
    texture::{RenderTexture, TextureHelper, sampler_entry, texture_entry, uniform_entry},
    uniforms::{UniformBlock, UniformLayout, UniformType},
};

pub const EDGE_THRESHOLD_MIN: f32 = 0.0312;
pub const EDGE_THRESHOLD_MAX: f32 = 0.125;
pub const FXAA_ITERATIONS: i32 = 12;

const FXAA: ProgramDesc = ProgramDesc {
    label: "FXAA",
    vertex: SCREEN_VS,
    fragment: ShaderStage::new("fxaa_fs", include_str!("fxaa_fs.wgsl")),
};

const BLIT: ProgramDesc = ProgramDesc {
    label: "Blit",
    vertex: SCREEN_VS,
    fragment: ShaderStage::new("blit_fs", include_str!("blit_fs.wgsl")),
};

/// Step multiplier of the edge walk at iteration `i`.
pub fn fxaa_quality(i: i32) -> f32 {
    match i {
        i if i < 1 => 1.5,
        i if i < 5 => 2.0,
        i if i < 6 => 4.0,
        _ => 8.0,
    }
}

/// Whether the local luma contrast is large enough to treat the pixel as an edge.
pub fn is_edge(luma_min: f32, luma_max: f32) -> bool {
    luma_max - luma_min >= EDGE_THRESHOLD_MIN.max(luma_max * EDGE_THRESHOLD_MAX)
}

fn source_layout(device: &wgpu::Device, label: &str, with_params: bool) -> wgpu::BindGroupLayout {
    let mut entries = vec![texture_entry(0, wgpu::TextureViewDimension::D2), sampler_entry(1)];
    if with_params {
        entries.push(uniform_entry(2, wgpu::ShaderStages::FRAGMENT));
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

fn source_entries<'a>(source: &'a RenderTexture, sampler: &'a wgpu::Sampler) -> Vec<wgpu::BindGroupEntry<'a>> {
    vec![
        wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(&source.view),
        },
        wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::Sampler(sampler),
        },
    ]
}

pub struct FxaaProgram {
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: wgpu::BindGroup,
}

impl GpuProgram for FxaaProgram {
    /// The tone-mapped composite.
    type InitData<'i> = &'i RenderTexture;
    type DrawData<'a> = &'a ScreenQuad;

    fn new(ctx: &GpuProgramRenderContext, source: Self::InitData<'_>) -> Self {
        let device = ctx.device;
        let layout = source_layout(device, "FXAA Bind Group Layout", true);
        let sampler = TextureHelper::linear_clamp_sampler(device, "FXAA Sampler");

        let mut params = UniformBlock::new(
            device,
            "FXAA Params",
            UniformLayout::new(&[("inverse_size", UniformType::Vec2)]),
        );
        params.set_vec2(
            ctx.queue,
            "inverse_size",
            [1.0 / source.width() as f32, 1.0 / source.height() as f32],
        );

        let mut entries = source_entries(source, &sampler);
        entries.push(wgpu::BindGroupEntry {
            binding: 2,
            resource: params.buffer().as_entire_binding(),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("FXAA Bind Group"),
            layout: &layout,
            entries: &entries,
        });

        let targets = [replace_target(ctx.format)];
        let pipeline = ctx
            .shaders
            .program(device, &FXAA)
            .and_then(|program| fullscreen_pipeline(device, &program, &[&layout], &targets, None));

        Self { pipeline, bind_group }
    }

    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, quad: Self::DrawData<'a>) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        quad.draw(rpass);
    }
}

/// Copies the composite to the surface unchanged.
pub struct BlitProgram {
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: wgpu::BindGroup,
}

impl GpuProgram for BlitProgram {
    type InitData<'i> = &'i RenderTexture;
    type DrawData<'a> = &'a ScreenQuad;

    fn new(ctx: &GpuProgramRenderContext, source: Self::InitData<'_>) -> Self {
        let device = ctx.device;
        let layout = source_layout(device, "Blit Bind Group Layout", false);
        let sampler = TextureHelper::linear_clamp_sampler(device, "Blit Sampler");

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout: &layout,
            entries: &source_entries(source, &sampler),
        });

        let targets = [replace_target(ctx.format)];
        let pipeline = ctx
            .shaders
            .program(device, &BLIT)
            .and_then(|program| fullscreen_pipeline(device, &program, &[&layout], &targets, None));

        Self { pipeline, bind_group }
    }

    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, quad: Self::DrawData<'a>) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        quad.draw(rpass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_schedule() {
        let steps: Vec<f32> = (0..FXAA_ITERATIONS).map(fxaa_quality).collect();
        assert_eq!(steps[0], 1.5);
        assert_eq!(&steps[1..5], &[2.0; 4]);
        assert_eq!(steps[5], 4.0);
        assert!(steps[6..].iter().all(|&q| q == 8.0));
    }

    #[test]
    fn flat_regions_are_not_edges() {
        assert!(!is_edge(0.5, 0.5));
        // Dark regions use the absolute floor
        assert!(!is_edge(0.0, 0.03));
        assert!(is_edge(0.0, 0.04));
    }

    #[test]
    fn bright_regions_need_relative_contrast() {
        // 0.9 * 0.125 = 0.1125
        assert!(!is_edge(0.8, 0.9));
        assert!(is_edge(0.7, 0.9));
    }
}
