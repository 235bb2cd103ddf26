pub mod bloom_program;
pub mod composite_program;
pub mod forward_program;
pub mod fxaa_program;
pub mod geometry_program;
pub mod lighting_program;
pub mod ssao_program;

pub use bloom_program::BloomProgram;
pub use composite_program::CompositeProgram;
pub use forward_program::ForwardProgram;
pub use fxaa_program::{BlitProgram, FxaaProgram};
pub use geometry_program::GeometryProgram;
pub use lighting_program::LightingProgram;
pub use ssao_program::SsaoProgram;

use crate::mesh::{ScreenQuad, Vertex};
use crate::shader::{ShaderCache, ShaderProgram, ShaderStage, create_render_pipeline};
use crate::texture::TextureHelper;

/// Fullscreen quad vertex stage shared by every post-process program.
pub const SCREEN_VS: ShaderStage = ShaderStage::new("screen_vs", include_str!("programs/screen_vs.wgsl"));
/// Mesh vertex stage: eye-space position and normal from groups 0 and 2.
pub const MESH_VS: ShaderStage = ShaderStage::new("mesh_vs", include_str!("programs/mesh_vs.wgsl"));
pub const SKYBOX_VS: ShaderStage = ShaderStage::new("skybox_vs", include_str!("programs/skybox_vs.wgsl"));

/// Holds common WGPU references to simplify function signatures.
pub struct GpuProgramRenderContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub format: wgpu::TextureFormat, // The output format (Swapchain or HDR)
    pub shaders: &'a ShaderCache,
}

pub trait GpuProgram {
    /// Data required to initialize the pipeline (e.g., global layouts)
    type InitData<'i>;

    /// Data required to draw a frame (e.g., Camera, List of Models)
    type DrawData<'a>
    where
        Self: 'a;

    /// 1. INIT: Compiles shaders, creates pipeline layouts and the pipelines.
    fn new(ctx: &GpuProgramRenderContext, init_data: Self::InitData<'_>) -> Self;

    /// 2. RECORD: Encodes commands into the RenderPass.
    /// A program whose shaders failed to build records nothing.
    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>);
}

/// Bind group layouts every scene program is built against.
#[derive(Clone, Copy)]
pub struct SceneLayouts<'a> {
    /// Group 0: camera and lights
    pub global: &'a wgpu::BindGroupLayout,
    /// Group 1: material uniforms
    pub material: &'a wgpu::BindGroupLayout,
    /// Group 2: model matrices
    pub model: &'a wgpu::BindGroupLayout,
    /// Environment cubemap and IBL textures
    pub environment: &'a wgpu::BindGroupLayout,
}

pub fn replace_target(format: wgpu::TextureFormat) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
    })
}

/// Builds a quad pipeline: screen vertex stage, one fragment stage, no depth.
pub fn fullscreen_pipeline(
    device: &wgpu::Device,
    program: &ShaderProgram,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    targets: &[Option<wgpu::ColorTargetState>],
    depth_stencil: Option<wgpu::DepthStencilState>,
) -> Option<wgpu::RenderPipeline> {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(program.label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });

    create_render_pipeline(
        device,
        &wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some(program.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[ScreenQuad::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets,
            }),
            primitive: ScreenQuad::PRIMITIVE,
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        },
    )
}

/// Depth state of opaque scene geometry.
pub fn opaque_depth() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: TextureHelper::DEPTH_FORMAT,
        depth_write_enabled: true,                  // Write Z-values
        depth_compare: wgpu::CompareFunction::Less, // Closer pixels win
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Skyboxes sit at depth 1.0 and never write depth.
pub fn skybox_depth() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: TextureHelper::DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

pub struct MeshPipelineDesc<'a> {
    pub label: &'a str,
    pub program: &'a ShaderProgram,
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    pub targets: &'a [Option<wgpu::ColorTargetState>],
    pub depth: wgpu::DepthStencilState,
    pub cull_mode: Option<wgpu::Face>,
    pub sample_count: u32,
}

/// Builds a pipeline drawing [`Vertex`] triangle lists.
pub fn mesh_pipeline(device: &wgpu::Device, desc: &MeshPipelineDesc) -> Option<wgpu::RenderPipeline> {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: desc.bind_group_layouts,
        push_constant_ranges: &[],
    });

    create_render_pipeline(
        device,
        &wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some(desc.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &desc.program.vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::desc()], // <--- Use our Vertex layout!
            },
            fragment: Some(wgpu::FragmentState {
                module: &desc.program.fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: desc.targets,
            }),
            depth_stencil: Some(desc.depth.clone()),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: desc.cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            multisample: wgpu::MultisampleState {
                count: desc.sample_count,
                ..Default::default()
            },
            multiview: None,
        },
    )
}
