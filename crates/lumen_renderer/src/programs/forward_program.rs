use crate::{
    material::{Material, MaterialTag, SidedPipelines},
    model::Model,
    programs::{
        GpuProgram, GpuProgramRenderContext, MESH_VS, MeshPipelineDesc, SKYBOX_VS, SceneLayouts,
        mesh_pipeline, opaque_depth, replace_target, skybox_depth,
    },
    shader::{ProgramDesc, ShaderStage},
};

const FORWARD: ProgramDesc = ProgramDesc {
    label: "Forward Blinn-Phong",
    vertex: MESH_VS,
    fragment: ShaderStage::new("forward_fs", include_str!("forward_fs.wgsl")),
};

const SKYBOX: ProgramDesc = ProgramDesc {
    label: "Forward Skybox",
    vertex: SKYBOX_VS,
    fragment: ShaderStage::new("skybox_fs", include_str!("skybox_fs.wgsl")),
};

/// Pipelines for one sample count.
struct ForwardPipelines {
    blinn_phong: SidedPipelines,
    skybox: SidedPipelines,
}

/// Non-deferred path: every model's Forward material drawn straight into the
/// (optionally multisampled) HDR scene target.
pub struct ForwardProgram {
    single: ForwardPipelines,
    multi: Option<ForwardPipelines>,
}

pub struct ForwardDrawData<'a> {
    pub global: &'a wgpu::BindGroup,
    pub environment: &'a wgpu::BindGroup,
    pub models: &'a [Model],
    /// Must match the sample count of the attachments the pass was opened with.
    pub msaa: bool,
}

impl ForwardProgram {
    fn build(ctx: &GpuProgramRenderContext, layouts: SceneLayouts, sample_count: u32) -> ForwardPipelines {
        let forward = ctx.shaders.program(ctx.device, &FORWARD);
        let skybox = ctx.shaders.program(ctx.device, &SKYBOX);
        let targets = [replace_target(ctx.format)];

        // 1. Lit meshes: [0: Camera/Lights, 1: Material, 2: Model]
        let blinn_phong = SidedPipelines::build(|side| {
            let program = forward.as_ref()?;
            mesh_pipeline(
                ctx.device,
                &MeshPipelineDesc {
                    label: "Forward Blinn-Phong Pipeline",
                    program,
                    bind_group_layouts: &[layouts.global, layouts.material, layouts.model],
                    targets: &targets,
                    depth: opaque_depth(),
                    cull_mode: side.cull_mode(),
                    sample_count,
                },
            )
        });

        // 2. Skybox: [0: Camera/Lights, 1: Environment]
        let skybox = SidedPipelines::build(|side| {
            let program = skybox.as_ref()?;
            mesh_pipeline(
                ctx.device,
                &MeshPipelineDesc {
                    label: "Forward Skybox Pipeline",
                    program,
                    bind_group_layouts: &[layouts.global, layouts.environment],
                    targets: &targets,
                    depth: skybox_depth(),
                    cull_mode: side.cull_mode(),
                    sample_count,
                },
            )
        });

        ForwardPipelines { blinn_phong, skybox }
    }

    fn pipelines(&self, msaa: bool) -> &ForwardPipelines {
        match (&self.multi, msaa) {
            (Some(multi), true) => multi,
            _ => &self.single,
        }
    }
}

impl GpuProgram for ForwardProgram {
    /// Scene layouts and the MSAA sample count (1 disables the multisampled set).
    type InitData<'i> = (SceneLayouts<'i>, u32);
    type DrawData<'a> = ForwardDrawData<'a>;

    fn new(ctx: &GpuProgramRenderContext, (layouts, sample_count): Self::InitData<'_>) -> Self {
        let single = Self::build(ctx, layouts, 1);
        let multi = (sample_count > 1).then(|| Self::build(ctx, layouts, sample_count));

        Self { single, multi }
    }

    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>) {
        let pipelines = self.pipelines(data.msaa);

        // 1. Bind Shared Data (Group 0)
        rpass.set_bind_group(0, data.global, &[]);

        // 2. Draw Loop. Skyboxes sit at the far plane, so order does not matter.
        for model in data.models {
            let Some(material) = model.material(MaterialTag::Forward) else {
                continue;
            };

            match material {
                Material::Forward(_) => {
                    let (Some(pipeline), Some(material_group)) =
                        (pipelines.blinn_phong.get(material.side()), material.bind_group())
                    else {
                        continue;
                    };
                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(1, material_group, &[]);
                    rpass.set_bind_group(2, model.bind_group(), &[]);
                }
                Material::SkyboxForward(sky) => {
                    let Some(pipeline) = pipelines.skybox.get(sky.side) else {
                        continue;
                    };
                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(1, data.environment, &[]);
                }
                _ => continue,
            }

            model.mesh().draw(rpass);
        }
    }
}
