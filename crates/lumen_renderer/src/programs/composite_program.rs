use crate::{
    config::FrameConfig,
    mesh::ScreenQuad,
    programs::{
        GpuProgram, GpuProgramRenderContext, SCREEN_VS, bloom_program::BLOOM_RESULT, fullscreen_pipeline,
        replace_target,
    },
    shader::{ProgramDesc, ShaderStage},
    targets::PostTargets,
    texture::{TextureHelper, sampler_entry, texture_entry, uniform_entry},
    uniforms::{UniformBlock, UniformLayout, UniformType},
};

const COMPOSITE: ProgramDesc = ProgramDesc {
    label: "Composite",
    vertex: SCREEN_VS,
    fragment: ShaderStage::new("composite_fs", include_str!("composite_fs.wgsl")),
};

fn params_layout() -> UniformLayout {
    UniformLayout::new(&[
        ("bloom", UniformType::F32),
        ("hdr", UniformType::F32),
        ("gamma", UniformType::F32),
        ("exposure", UniformType::F32),
    ])
}

/// HDR scene plus bloom, tone mapped and gamma corrected into the LDR composite target.
pub struct CompositeProgram {
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: wgpu::BindGroup,
    params: UniformBlock,
}

impl CompositeProgram {
    pub fn update(&mut self, queue: &wgpu::Queue, config: &FrameConfig) {
        self.params.set_flag(queue, "bloom", config.bloom);
        self.params.set_flag(queue, "hdr", config.hdr);
        self.params.set_flag(queue, "gamma", config.gamma);
        self.params.set_f32(queue, "exposure", config.exposure);
    }
}

impl GpuProgram for CompositeProgram {
    type InitData<'i> = &'i PostTargets;
    type DrawData<'a> = &'a ScreenQuad;

    fn new(ctx: &GpuProgramRenderContext, targets: Self::InitData<'_>) -> Self {
        let device = ctx.device;

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &[
                // --- BINDING 0: HDR scene ---
                texture_entry(0, wgpu::TextureViewDimension::D2),
                // --- BINDING 1: Blurred bloom ---
                texture_entry(1, wgpu::TextureViewDimension::D2),
                sampler_entry(2),
                uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let params = UniformBlock::new(device, "Composite Params", params_layout());
        let sampler = TextureHelper::linear_clamp_sampler(device, "Composite Sampler");

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.hdr.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.ping_pong[BLOOM_RESULT].view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params.buffer().as_entire_binding(),
                },
            ],
        });

        let targets = [replace_target(TextureHelper::LDR_FORMAT)];
        let pipeline = ctx
            .shaders
            .program(device, &COMPOSITE)
            .and_then(|program| fullscreen_pipeline(device, &program, &[&layout], &targets, None));

        Self {
            pipeline,
            bind_group,
            params,
        }
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
    fn params_pack_into_one_vec4() {
        let layout = params_layout();
        assert_eq!(layout.offset_of("exposure"), Some(12));
        assert_eq!(layout.size(), 16);
    }
}
