use wgpu::util::DeviceExt;

use crate::{
    mesh::ScreenQuad,
    programs::{GpuProgram, GpuProgramRenderContext, SCREEN_VS, fullscreen_pipeline, replace_target},
    shader::{ProgramDesc, ShaderStage},
    targets::PostTargets,
    texture::{TextureHelper, sampler_entry, texture_entry, uniform_entry},
};

/// Alternating horizontal/vertical passes (five of each).
pub const BLUR_PASSES: usize = 10;

/// Gaussian weights of the 9-tap blur, centre first. Mirrored in `blur_fs.wgsl`.
pub const BLUR_WEIGHTS: [f32; 5] = [0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216];

const BRIGHT: ProgramDesc = ProgramDesc {
    label: "Bloom Bright Pass",
    vertex: SCREEN_VS,
    fragment: ShaderStage::new("bright_fs", include_str!("bright_fs.wgsl")),
};

const BLUR: ProgramDesc = ProgramDesc {
    label: "Bloom Blur",
    vertex: SCREEN_VS,
    fragment: ShaderStage::new("blur_fs", include_str!("blur_fs.wgsl")),
};

/// Texture a blur iteration reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurInput {
    Brightness,
    PingPong(usize),
}

/// One iteration of the ping-pong chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurStep {
    pub input: BlurInput,
    /// Index into `PostTargets::ping_pong`.
    pub output: usize,
    pub horizontal: bool,
}

/// Even iterations blur horizontally into ping-pong 1, odd ones vertically
/// into ping-pong 0. The first reads the bright pass.
pub fn blur_step(iteration: usize) -> BlurStep {
    let horizontal = iteration % 2 == 0;
    let input = match (iteration, horizontal) {
        (0, _) => BlurInput::Brightness,
        (_, true) => BlurInput::PingPong(0),
        (_, false) => BlurInput::PingPong(1),
    };

    BlurStep {
        input,
        output: if horizontal { 1 } else { 0 },
        horizontal,
    }
}

/// Ping-pong index holding the finished blur.
pub const BLOOM_RESULT: usize = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BloomStage {
    Bright,
    Blur(usize),
}

pub struct BloomDrawData<'a> {
    pub quad: &'a ScreenQuad,
    pub stage: BloomStage,
}

pub struct BloomProgram {
    bright_pipeline: Option<wgpu::RenderPipeline>,
    blur_pipeline: Option<wgpu::RenderPipeline>,
    bright_bind_group: wgpu::BindGroup,
    // Brightness (H), ping-pong 0 (H), ping-pong 1 (V)
    blur_bind_groups: [wgpu::BindGroup; 3],
}

impl BloomProgram {
    fn blur_bind_group(&self, step: BlurStep) -> &wgpu::BindGroup {
        match step.input {
            BlurInput::Brightness => &self.blur_bind_groups[0],
            BlurInput::PingPong(0) => &self.blur_bind_groups[1],
            BlurInput::PingPong(_) => &self.blur_bind_groups[2],
        }
    }
}

impl GpuProgram for BloomProgram {
    type InitData<'i> = &'i PostTargets;
    type DrawData<'a> = BloomDrawData<'a>;

    fn new(ctx: &GpuProgramRenderContext, targets: Self::InitData<'_>) -> Self {
        let device = ctx.device;
        let sampler = TextureHelper::linear_clamp_sampler(device, "Bloom Sampler");

        let bright_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Bright Layout"),
            entries: &[texture_entry(0, wgpu::TextureViewDimension::D2), sampler_entry(1)],
        });
        let blur_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Blur Layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                sampler_entry(1),
                // --- BINDING 2: Blur direction ---
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let bright_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Bright Bind Group"),
            layout: &bright_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.hdr.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        // Directions are fixed per source texture, so each gets its own constant block
        let direction = |horizontal: bool| {
            let flag: [f32; 4] = [if horizontal { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0];
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bloom Blur Direction"),
                contents: bytemuck::cast_slice(&flag),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        };
        let horizontal = direction(true);
        let vertical = direction(false);

        let blur_group = |view: &wgpu::TextureView, direction: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Bloom Blur Bind Group"),
                layout: &blur_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: direction.as_entire_binding(),
                    },
                ],
            })
        };
        let blur_bind_groups = [
            blur_group(&targets.brightness.view, &horizontal),
            blur_group(&targets.ping_pong[0].view, &horizontal),
            blur_group(&targets.ping_pong[1].view, &vertical),
        ];

        let out = [replace_target(TextureHelper::HDR_FORMAT)];
        let bright_pipeline = ctx
            .shaders
            .program(device, &BRIGHT)
            .and_then(|program| fullscreen_pipeline(device, &program, &[&bright_layout], &out, None));
        let blur_pipeline = ctx
            .shaders
            .program(device, &BLUR)
            .and_then(|program| fullscreen_pipeline(device, &program, &[&blur_layout], &out, None));

        Self {
            bright_pipeline,
            blur_pipeline,
            bright_bind_group,
            blur_bind_groups,
        }
    }

    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>) {
        match data.stage {
            BloomStage::Bright => {
                let Some(pipeline) = &self.bright_pipeline else {
                    return;
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, &self.bright_bind_group, &[]);
            }
            BloomStage::Blur(iteration) => {
                let Some(pipeline) = &self.blur_pipeline else {
                    return;
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, self.blur_bind_group(blur_step(iteration)), &[]);
            }
        }
        data.quad.draw(rpass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_normalised() {
        let total = BLUR_WEIGHTS[0] + 2.0 * BLUR_WEIGHTS[1..].iter().sum::<f32>();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn first_pass_reads_brightness() {
        let step = blur_step(0);
        assert_eq!(step.input, BlurInput::Brightness);
        assert_eq!(step.output, 1);
        assert!(step.horizontal);
    }

    #[test]
    fn passes_alternate_between_buffers() {
        for i in 1..BLUR_PASSES {
            let step = blur_step(i);
            // Never read and write the same texture
            assert_ne!(step.input, BlurInput::PingPong(step.output));
            assert_eq!(step.horizontal, i % 2 == 0);
        }
        assert_eq!(blur_step(1).input, BlurInput::PingPong(1));
        assert_eq!(blur_step(2).input, BlurInput::PingPong(0));
    }

    #[test]
    fn last_pass_lands_in_result_buffer() {
        assert_eq!(blur_step(BLUR_PASSES - 1).output, BLOOM_RESULT);
    }
}
