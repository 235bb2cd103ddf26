//! Image-based lighting precompute: equirect → environment cube, diffuse
//! irradiance, GGX-prefiltered specular mips and the split-sum BRDF LUT.
//!
//! Every sub-render is its own submission so the face uniform can be rewritten
//! in between and the shared depth buffer resized before each one.

use std::time::Instant;

use glam::{Mat4, Vec3};
use lumen_assets::{HdrImage, MeshData};

use crate::{
    error::RenderError,
    mesh::{GpuMesh, ScreenQuad},
    programs::{
        GpuProgramRenderContext, MeshPipelineDesc, SCREEN_VS, fullscreen_pipeline, mesh_pipeline, opaque_depth,
        replace_target,
    },
    shader::{ProgramDesc, ShaderStage},
    targets::{BRDF_LUT_FORMAT, ScratchDepth, clear_attachment, clear_depth},
    texture::{RenderTexture, TextureHelper, sampler_entry, texture_entry, uniform_entry},
};

pub const ENVIRONMENT_SIZE: u32 = 512;
pub const IRRADIANCE_SIZE: u32 = 32;
pub const PREFILTER_SIZE: u32 = 128;
pub const PREFILTER_MIPS: u32 = 5;
pub const BRDF_LUT_SIZE: u32 = 512;

const CUBE_VS: ShaderStage = ShaderStage::new("cube_vs", include_str!("ibl/cube_vs.wgsl"));

const EQUIRECT: ProgramDesc = ProgramDesc {
    label: "Equirect To Cube",
    vertex: CUBE_VS,
    fragment: ShaderStage::new("equirect_fs", include_str!("ibl/equirect_fs.wgsl")),
};

const IRRADIANCE: ProgramDesc = ProgramDesc {
    label: "Irradiance Convolution",
    vertex: CUBE_VS,
    fragment: ShaderStage::new("irradiance_fs", include_str!("ibl/irradiance_fs.wgsl")),
};

const PREFILTER: ProgramDesc = ProgramDesc {
    label: "Specular Prefilter",
    vertex: CUBE_VS,
    fragment: ShaderStage::new("prefilter_fs", include_str!("ibl/prefilter_fs.wgsl")),
};

const BRDF_LUT: ProgramDesc = ProgramDesc {
    label: "BRDF LUT",
    vertex: SCREEN_VS,
    fragment: ShaderStage::new("brdf_lut_fs", include_str!("ibl/brdf_lut_fs.wgsl")),
};

/// Camera looking from the cube centre through one face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubeFace {
    pub target: Vec3,
    pub up: Vec3,
}

/// Layer order +X, -X, +Y, -Y, +Z, -Z. Up vectors match the cube texture
/// addressing wgpu samples with.
pub const CUBE_FACE_VIEWS: [CubeFace; 6] = [
    CubeFace { target: Vec3::X, up: Vec3::Y },
    CubeFace { target: Vec3::NEG_X, up: Vec3::Y },
    CubeFace { target: Vec3::Y, up: Vec3::NEG_Z },
    CubeFace { target: Vec3::NEG_Y, up: Vec3::Z },
    CubeFace { target: Vec3::Z, up: Vec3::Y },
    CubeFace { target: Vec3::NEG_Z, up: Vec3::Y },
];

pub fn cube_projection() -> Mat4 {
    Mat4::perspective_lh(90f32.to_radians(), 1.0, 0.1, 10.0)
}

pub fn face_view_projection(face: &CubeFace) -> Mat4 {
    cube_projection() * Mat4::look_at_lh(Vec3::ZERO, face.target, face.up)
}

/// Full mip chain length for a square texture.
pub fn mip_level_count(size: u32) -> u32 {
    32 - size.max(1).leading_zeros()
}

pub fn mip_size(base: u32, mip: u32) -> u32 {
    (base >> mip).max(1)
}

/// Roughness baked into prefilter mip `mip`: 0 at the top, 1 at the last level.
pub fn prefilter_roughness(mip: u32) -> f32 {
    mip as f32 / (PREFILTER_MIPS - 1) as f32
}

/// Matches `struct Face` in `cube_vs.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FaceUniform {
    pub view_projection: [[f32; 4]; 4],
    pub roughness: f32,
    pub source_resolution: f32,
    pub _padding: [f32; 2],
}

impl FaceUniform {
    pub fn new(face: &CubeFace, roughness: f32) -> Self {
        Self {
            view_projection: face_view_projection(face).to_cols_array_2d(),
            roughness,
            source_resolution: ENVIRONMENT_SIZE as f32,
            _padding: [0.0; 2],
        }
    }
}

/// The four textures sampled by skyboxes and the lighting pass.
pub struct IblTextures {
    pub environment: RenderTexture,
    pub irradiance: RenderTexture,
    pub prefiltered: RenderTexture,
    pub brdf_lut: RenderTexture,
}

impl IblTextures {
    /// Black stand-ins bound until an environment map is loaded.
    pub fn placeholders(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            environment: TextureHelper::create_placeholder_cube(device, queue, "Placeholder Environment"),
            irradiance: TextureHelper::create_placeholder_cube(device, queue, "Placeholder Irradiance"),
            prefiltered: TextureHelper::create_placeholder_cube(device, queue, "Placeholder Prefilter"),
            // Zero-initialised by wgpu
            brdf_lut: TextureHelper::create_color_target(device, 1, 1, BRDF_LUT_FORMAT, "Placeholder BRDF LUT"),
        }
    }
}

pub fn environment_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Environment Bind Group Layout"),
        entries: &[
            // --- BINDING 0: Environment cube (skybox) ---
            texture_entry(0, wgpu::TextureViewDimension::Cube),
            // --- BINDING 1: Diffuse irradiance ---
            texture_entry(1, wgpu::TextureViewDimension::Cube),
            // --- BINDING 2: Prefiltered specular ---
            texture_entry(2, wgpu::TextureViewDimension::Cube),
            // --- BINDING 3: BRDF LUT ---
            texture_entry(3, wgpu::TextureViewDimension::D2),
            sampler_entry(4),
        ],
    })
}

pub fn environment_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    textures: &IblTextures,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Environment Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&textures.environment.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&textures.irradiance.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&textures.prefiltered.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&textures.brdf_lut.view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn source_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("IBL Source Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Target of one cube render.
struct FaceTarget<'a> {
    texture: &'a wgpu::Texture,
    face: u32,
    mip: u32,
    size: u32,
}

/// Pipelines and buffers reused across environment map loads.
pub struct IblPrecompute {
    cube: GpuMesh,
    face_buffer: wgpu::Buffer,
    face_bind_group: wgpu::BindGroup,
    flat_source_layout: wgpu::BindGroupLayout,
    cube_source_layout: wgpu::BindGroupLayout,
    equirect_pipeline: Option<wgpu::RenderPipeline>,
    irradiance_pipeline: Option<wgpu::RenderPipeline>,
    prefilter_pipeline: Option<wgpu::RenderPipeline>,
    brdf_pipeline: Option<wgpu::RenderPipeline>,
}

impl IblPrecompute {
    pub fn new(ctx: &GpuProgramRenderContext) -> Self {
        let device = ctx.device;

        let face_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("IBL Face Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let flat_source_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("IBL Equirect Source Layout"),
            entries: &[texture_entry(0, wgpu::TextureViewDimension::D2), sampler_entry(1)],
        });
        let cube_source_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("IBL Cube Source Layout"),
            entries: &[texture_entry(0, wgpu::TextureViewDimension::Cube), sampler_entry(1)],
        });

        let face_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("IBL Face Uniform"),
            size: std::mem::size_of::<FaceUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let face_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("IBL Face Bind Group"),
            layout: &face_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: face_buffer.as_entire_binding(),
            }],
        });

        let hdr_target = [replace_target(TextureHelper::HDR_FORMAT)];
        let cube_pipeline = |desc: &ProgramDesc, source: &wgpu::BindGroupLayout| {
            ctx.shaders.program(device, desc).and_then(|program| {
                mesh_pipeline(
                    device,
                    &MeshPipelineDesc {
                        label: desc.label,
                        program: &program,
                        bind_group_layouts: &[&face_layout, source],
                        targets: &hdr_target,
                        depth: opaque_depth(),
                        // Viewed from inside
                        cull_mode: None,
                        sample_count: 1,
                    },
                )
            })
        };

        let equirect_pipeline = cube_pipeline(&EQUIRECT, &flat_source_layout);
        let irradiance_pipeline = cube_pipeline(&IRRADIANCE, &cube_source_layout);
        let prefilter_pipeline = cube_pipeline(&PREFILTER, &cube_source_layout);

        let lut_target = [replace_target(BRDF_LUT_FORMAT)];
        let brdf_pipeline = ctx
            .shaders
            .program(device, &BRDF_LUT)
            .and_then(|program| fullscreen_pipeline(device, &program, &[], &lut_target, None));

        Self {
            cube: GpuMesh::new(device, &MeshData::unit_cube(), "IBL Cube"),
            face_buffer,
            face_bind_group,
            flat_source_layout,
            cube_source_layout,
            equirect_pipeline,
            irradiance_pipeline,
            prefilter_pipeline,
            brdf_pipeline,
        }
    }

    /// Builds a complete texture set from one equirectangular image. Blocks
    /// until every sub-render has been submitted.
    pub fn run(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &HdrImage,
        depth: &mut ScratchDepth,
        quad: &ScreenQuad,
    ) -> Result<IblTextures, RenderError> {
        let equirect_pipeline = self.equirect_pipeline.as_ref().ok_or(RenderError::IblStage("equirect"))?;
        let irradiance_pipeline = self
            .irradiance_pipeline
            .as_ref()
            .ok_or(RenderError::IblStage("irradiance"))?;
        let prefilter_pipeline = self.prefilter_pipeline.as_ref().ok_or(RenderError::IblStage("prefilter"))?;
        let brdf_pipeline = self.brdf_pipeline.as_ref().ok_or(RenderError::IblStage("brdf lut"))?;

        let started = Instant::now();
        let sampler = TextureHelper::linear_clamp_sampler(device, "IBL Sampler");

        // 1. Equirect → environment cube, every mip rendered directly
        let equirect = TextureHelper::upload_equirect(device, queue, image);
        let equirect_sampler = TextureHelper::equirect_sampler(device);
        let equirect_group = source_group(device, &self.flat_source_layout, &equirect.view, &equirect_sampler);

        let environment_mips = mip_level_count(ENVIRONMENT_SIZE);
        let environment = TextureHelper::create_cube_target(
            device,
            ENVIRONMENT_SIZE,
            environment_mips,
            TextureHelper::HDR_FORMAT,
            "Environment Cube",
        );
        for mip in 0..environment_mips {
            for (face, view) in CUBE_FACE_VIEWS.iter().enumerate() {
                let target = FaceTarget {
                    texture: &environment.texture,
                    face: face as u32,
                    mip,
                    size: mip_size(ENVIRONMENT_SIZE, mip),
                };
                self.render_face(
                    device,
                    queue,
                    depth,
                    equirect_pipeline,
                    &equirect_group,
                    &target,
                    FaceUniform::new(view, 0.0),
                );
            }
        }

        let environment_group = source_group(device, &self.cube_source_layout, &environment.view, &sampler);

        // 2. Diffuse irradiance
        let irradiance = TextureHelper::create_cube_target(
            device,
            IRRADIANCE_SIZE,
            1,
            TextureHelper::HDR_FORMAT,
            "Irradiance Cube",
        );
        for (face, view) in CUBE_FACE_VIEWS.iter().enumerate() {
            let target = FaceTarget {
                texture: &irradiance.texture,
                face: face as u32,
                mip: 0,
                size: IRRADIANCE_SIZE,
            };
            self.render_face(
                device,
                queue,
                depth,
                irradiance_pipeline,
                &environment_group,
                &target,
                FaceUniform::new(view, 0.0),
            );
        }

        // 3. Specular prefilter, depth resized for every mip
        let prefiltered = TextureHelper::create_cube_target(
            device,
            PREFILTER_SIZE,
            PREFILTER_MIPS,
            TextureHelper::HDR_FORMAT,
            "Prefiltered Cube",
        );
        for mip in 0..PREFILTER_MIPS {
            let roughness = prefilter_roughness(mip);
            for (face, view) in CUBE_FACE_VIEWS.iter().enumerate() {
                let target = FaceTarget {
                    texture: &prefiltered.texture,
                    face: face as u32,
                    mip,
                    size: mip_size(PREFILTER_SIZE, mip),
                };
                self.render_face(
                    device,
                    queue,
                    depth,
                    prefilter_pipeline,
                    &environment_group,
                    &target,
                    FaceUniform::new(view, roughness),
                );
            }
        }

        // 4. BRDF integration LUT
        let brdf_lut = TextureHelper::create_color_target(
            device,
            BRDF_LUT_SIZE,
            BRDF_LUT_SIZE,
            BRDF_LUT_FORMAT,
            "BRDF LUT",
        );
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("BRDF LUT Encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("BRDF LUT Pass"),
                color_attachments: &[Some(clear_attachment(&brdf_lut.view))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(brdf_pipeline);
            quad.draw(&mut rpass);
        }
        queue.submit(std::iter::once(encoder.finish()));

        log::info!(
            "IBL precompute: {}x{} equirect -> {} cube, {} irradiance, {}x{} prefilter, {} LUT in {:.2?}",
            image.width,
            image.height,
            ENVIRONMENT_SIZE,
            IRRADIANCE_SIZE,
            PREFILTER_SIZE,
            PREFILTER_MIPS,
            BRDF_LUT_SIZE,
            started.elapsed()
        );

        Ok(IblTextures {
            environment,
            irradiance,
            prefiltered,
            brdf_lut,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn render_face(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        depth: &mut ScratchDepth,
        pipeline: &wgpu::RenderPipeline,
        source: &wgpu::BindGroup,
        target: &FaceTarget,
        uniform: FaceUniform,
    ) {
        queue.write_buffer(&self.face_buffer, 0, bytemuck::bytes_of(&uniform));

        let color = TextureHelper::face_view(target.texture, target.face, target.mip);
        let depth_view = depth.resize(device, target.size, target.size);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("IBL Face Encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("IBL Face Pass"),
                color_attachments: &[Some(clear_attachment(&color))],
                depth_stencil_attachment: Some(clear_depth(depth_view)),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &self.face_bind_group, &[]);
            rpass.set_bind_group(1, source, &[]);
            self.cube.draw(&mut rpass);
        }
        queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn face_centre_projects_to_screen_centre() {
        for face in &CUBE_FACE_VIEWS {
            let ndc = face_view_projection(face).project_point3(face.target);
            assert_abs_diff_eq!(ndc.x, 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(ndc.y, 0.0, epsilon = 1e-5);
            assert!((0.0..=1.0).contains(&ndc.z));
        }
    }

    #[test]
    fn positive_x_face_runs_towards_negative_z() {
        let ndc = face_view_projection(&CUBE_FACE_VIEWS[0]).project_point3(Vec3::new(1.0, 0.0, -0.5));
        assert!(ndc.x > 0.0);
    }

    #[test]
    fn positive_y_face_has_positive_z_at_the_bottom() {
        let ndc = face_view_projection(&CUBE_FACE_VIEWS[2]).project_point3(Vec3::new(0.0, 1.0, 0.5));
        assert!(ndc.y < 0.0);
    }

    #[test]
    fn faces_cover_every_axis_once() {
        let sum: Vec3 = CUBE_FACE_VIEWS.iter().map(|f| f.target.abs()).sum();
        assert_eq!(sum, Vec3::splat(2.0));
        for face in &CUBE_FACE_VIEWS {
            assert_eq!(face.target.dot(face.up), 0.0);
        }
    }

    #[test]
    fn prefilter_mips_halve_and_ramp_roughness() {
        let sizes: Vec<u32> = (0..PREFILTER_MIPS).map(|m| mip_size(PREFILTER_SIZE, m)).collect();
        assert_eq!(sizes, [128, 64, 32, 16, 8]);
        assert_eq!(prefilter_roughness(0), 0.0);
        assert_eq!(prefilter_roughness(2), 0.5);
        assert_eq!(prefilter_roughness(PREFILTER_MIPS - 1), 1.0);
    }

    #[test]
    fn environment_has_full_mip_chain() {
        assert_eq!(mip_level_count(ENVIRONMENT_SIZE), 10);
        assert_eq!(mip_level_count(1), 1);
        assert_eq!(mip_size(ENVIRONMENT_SIZE, 9), 1);
    }

    #[test]
    fn face_uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<FaceUniform>(), 80);
    }
}
