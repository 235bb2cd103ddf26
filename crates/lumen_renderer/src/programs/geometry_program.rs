use crate::{
    material::{Material, MaterialTag, SidedPipelines},
    model::Model,
    programs::{
        GpuProgram, GpuProgramRenderContext, MESH_VS, MeshPipelineDesc, SKYBOX_VS, SceneLayouts,
        mesh_pipeline, opaque_depth, skybox_depth,
    },
    shader::{ProgramDesc, ShaderProgram, ShaderStage},
    targets::GBUFFER_FORMATS,
};

const GBUFFER_BLINN: ProgramDesc = ProgramDesc {
    label: "G-Buffer Blinn-Phong",
    vertex: MESH_VS,
    fragment: ShaderStage::new("gbuffer_blinn_fs", include_str!("gbuffer_blinn_fs.wgsl")),
};

const GBUFFER_PBR: ProgramDesc = ProgramDesc {
    label: "G-Buffer PBR",
    vertex: MESH_VS,
    fragment: ShaderStage::new("gbuffer_pbr_fs", include_str!("gbuffer_pbr_fs.wgsl")),
};

const GBUFFER_SKYBOX: ProgramDesc = ProgramDesc {
    label: "G-Buffer Skybox",
    vertex: SKYBOX_VS,
    fragment: ShaderStage::new("skybox_gbuffer_fs", include_str!("skybox_gbuffer_fs.wgsl")),
};

/// Attachment slots the skybox writes: position (background marker) and albedo.
const SKYBOX_WRITES: [bool; 5] = [true, false, true, false, false];

/// Rasterizes every model's G-Buffer material into the five attachments.
pub struct GeometryProgram {
    blinn_phong: SidedPipelines,
    pbr: SidedPipelines,
    skybox: SidedPipelines,
}

pub struct GeometryDrawData<'a> {
    pub global: &'a wgpu::BindGroup,
    pub environment: &'a wgpu::BindGroup,
    pub models: &'a [Model],
    /// Draw DeferredPbr materials (falling back to Deferred) instead of Deferred ones.
    pub pbr: bool,
}

fn gbuffer_targets() -> [Option<wgpu::ColorTargetState>; 5] {
    GBUFFER_FORMATS.map(|format| {
        Some(wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })
    })
}

fn skybox_targets() -> [Option<wgpu::ColorTargetState>; 5] {
    let mut targets = gbuffer_targets();
    for (target, writes) in targets.iter_mut().flatten().zip(SKYBOX_WRITES) {
        if !writes {
            target.write_mask = wgpu::ColorWrites::empty();
        }
    }
    targets
}

impl GpuProgram for GeometryProgram {
    type InitData<'i> = SceneLayouts<'i>;
    type DrawData<'a> = GeometryDrawData<'a>;

    fn new(ctx: &GpuProgramRenderContext, layouts: Self::InitData<'_>) -> Self {
        let blinn_program = ctx.shaders.program(ctx.device, &GBUFFER_BLINN);
        let pbr_program = ctx.shaders.program(ctx.device, &GBUFFER_PBR);
        let skybox_program = ctx.shaders.program(ctx.device, &GBUFFER_SKYBOX);

        let targets = gbuffer_targets();
        let sky_targets = skybox_targets();
        let mesh_layouts = [layouts.global, layouts.material, layouts.model];

        let build = |label, program: &Option<ShaderProgram>, targets: &[Option<wgpu::ColorTargetState>]| {
            SidedPipelines::build(|side| {
                mesh_pipeline(
                    ctx.device,
                    &MeshPipelineDesc {
                        label,
                        program: program.as_ref()?,
                        bind_group_layouts: &mesh_layouts,
                        targets,
                        depth: opaque_depth(),
                        cull_mode: side.cull_mode(),
                        sample_count: 1,
                    },
                )
            })
        };

        let blinn_phong = build("G-Buffer Blinn-Phong Pipeline", &blinn_program, &targets);
        let pbr = build("G-Buffer PBR Pipeline", &pbr_program, &targets);

        // Skybox: [0: Camera/Lights, 1: Environment]
        let skybox = SidedPipelines::build(|side| {
            mesh_pipeline(
                ctx.device,
                &MeshPipelineDesc {
                    label: "G-Buffer Skybox Pipeline",
                    program: skybox_program.as_ref()?,
                    bind_group_layouts: &[layouts.global, layouts.environment],
                    targets: &sky_targets,
                    depth: skybox_depth(),
                    cull_mode: side.cull_mode(),
                    sample_count: 1,
                },
            )
        });

        Self {
            blinn_phong,
            pbr,
            skybox,
        }
    }

    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>) {
        let tag = if data.pbr {
            MaterialTag::DeferredPbr
        } else {
            MaterialTag::Deferred
        };

        rpass.set_bind_group(0, data.global, &[]);

        for model in data.models {
            let Some(material) = model.material_for_pass(tag) else {
                continue;
            };

            let pipeline = match material {
                Material::Deferred(_) => self.blinn_phong.get(material.side()),
                Material::DeferredPbr(_) => self.pbr.get(material.side()),
                Material::SkyboxDeferred(sky) => self.skybox.get(sky.side),
                _ => None,
            };
            let Some(pipeline) = pipeline else {
                continue;
            };
            rpass.set_pipeline(pipeline);

            match material.bind_group() {
                Some(material_group) => {
                    rpass.set_bind_group(1, material_group, &[]);
                    rpass.set_bind_group(2, model.bind_group(), &[]);
                }
                // Skyboxes read the environment instead of a material
                None => rpass.set_bind_group(1, data.environment, &[]),
            }

            model.mesh().draw(rpass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skybox_only_writes_position_and_albedo() {
        let masks: Vec<_> = skybox_targets()
            .iter()
            .map(|t| t.as_ref().map(|t| t.write_mask))
            .collect();

        assert_eq!(masks[0], Some(wgpu::ColorWrites::ALL));
        assert_eq!(masks[1], Some(wgpu::ColorWrites::empty()));
        assert_eq!(masks[2], Some(wgpu::ColorWrites::ALL));
        assert_eq!(masks[3], Some(wgpu::ColorWrites::empty()));
        assert_eq!(masks[4], Some(wgpu::ColorWrites::empty()));
    }

    #[test]
    fn gbuffer_targets_follow_attachment_formats() {
        let formats: Vec<_> = gbuffer_targets().iter().flatten().map(|t| t.format).collect();
        assert_eq!(formats, GBUFFER_FORMATS.to_vec());
    }
}
