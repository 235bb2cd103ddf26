use crate::{
    mesh::ScreenQuad,
    programs::{GpuProgram, GpuProgramRenderContext, SCREEN_VS, fullscreen_pipeline, replace_target},
    shader::{ProgramDesc, ShaderStage},
    targets::{GBuffer, PostTargets},
    texture::{TextureHelper, sampler_entry, texture_entry, uniform_entry},
    uniforms::{UniformBlock, UniformLayout, UniformType},
};

const LIGHTING_PBR: ProgramDesc = ProgramDesc {
    label: "Deferred PBR Lighting",
    vertex: SCREEN_VS,
    fragment: ShaderStage::new("lighting_pbr_fs", include_str!("lighting_pbr_fs.wgsl")),
};

const LIGHTING_BLINN: ProgramDesc = ProgramDesc {
    label: "Deferred Blinn-Phong Lighting",
    vertex: SCREEN_VS,
    fragment: ShaderStage::new("lighting_blinn_fs", include_str!("lighting_blinn_fs.wgsl")),
};

fn settings_layout() -> UniformLayout {
    UniformLayout::new(&[
        ("ssao_enabled", UniformType::F32),
        ("ibl_enabled", UniformType::F32),
    ])
}

pub struct LightingInit<'i> {
    pub global_layout: &'i wgpu::BindGroupLayout,
    pub environment_layout: &'i wgpu::BindGroupLayout,
    pub gbuffer: &'i GBuffer,
    pub targets: &'i PostTargets,
}

pub struct LightingDrawData<'a> {
    pub global: &'a wgpu::BindGroup,
    pub environment: &'a wgpu::BindGroup,
    pub quad: &'a ScreenQuad,
    pub pbr: bool,
}

/// Full-screen resolve of the G-Buffer into HDR radiance.
pub struct LightingProgram {
    pbr_pipeline: Option<wgpu::RenderPipeline>,
    blinn_phong_pipeline: Option<wgpu::RenderPipeline>,
    bind_group: wgpu::BindGroup,
    settings: UniformBlock,
}

impl LightingProgram {
    /// Per-frame switches read by both lighting shaders.
    pub fn update(&mut self, queue: &wgpu::Queue, ssao: bool, ibl: bool) {
        self.settings.set_flag(queue, "ssao_enabled", ssao);
        self.settings.set_flag(queue, "ibl_enabled", ibl);
    }
}

impl GpuProgram for LightingProgram {
    type InitData<'i> = LightingInit<'i>;
    type DrawData<'a> = LightingDrawData<'a>;

    fn new(ctx: &GpuProgramRenderContext, init: Self::InitData<'_>) -> Self {
        let device = ctx.device;

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("G-Buffer Bind Group Layout"),
            entries: &[
                // --- BINDING 0-4: G-Buffer attachments ---
                texture_entry(0, wgpu::TextureViewDimension::D2),
                texture_entry(1, wgpu::TextureViewDimension::D2),
                texture_entry(2, wgpu::TextureViewDimension::D2),
                texture_entry(3, wgpu::TextureViewDimension::D2),
                texture_entry(4, wgpu::TextureViewDimension::D2),
                // --- BINDING 5: Blurred SSAO ---
                texture_entry(5, wgpu::TextureViewDimension::D2),
                sampler_entry(6),
                // --- BINDING 7: Lighting switches ---
                uniform_entry(7, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let settings = UniformBlock::new(device, "Lighting Settings", settings_layout());
        let sampler = TextureHelper::nearest_clamp_sampler(device, "G-Buffer Sampler");

        let mut entries: Vec<wgpu::BindGroupEntry> = init
            .gbuffer
            .views()
            .into_iter()
            .chain([&init.targets.ssao_blurred.view])
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: 6,
            resource: wgpu::BindingResource::Sampler(&sampler),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: 7,
            resource: settings.buffer().as_entire_binding(),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("G-Buffer Bind Group"),
            layout: &layout,
            entries: &entries,
        });

        // [0: Camera/Lights, 1: G-Buffer, 2: Environment]
        let layouts = [init.global_layout, &layout, init.environment_layout];
        let targets = [replace_target(TextureHelper::HDR_FORMAT)];
        let build = |desc: &ProgramDesc| {
            ctx.shaders
                .program(device, desc)
                .and_then(|program| fullscreen_pipeline(device, &program, &layouts, &targets, None))
        };

        Self {
            pbr_pipeline: build(&LIGHTING_PBR),
            blinn_phong_pipeline: build(&LIGHTING_BLINN),
            bind_group,
            settings,
        }
    }

    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>) {
        let pipeline = if data.pbr {
            &self.pbr_pipeline
        } else {
            &self.blinn_phong_pipeline
        };
        let Some(pipeline) = pipeline else {
            return;
        };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, data.global, &[]);
        rpass.set_bind_group(1, &self.bind_group, &[]);
        rpass.set_bind_group(2, data.environment, &[]);
        data.quad.draw(rpass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_block_is_one_vec4() {
        let layout = settings_layout();
        assert_eq!(layout.offset_of("ibl_enabled"), Some(4));
        assert_eq!(layout.size(), 16);
    }
}
