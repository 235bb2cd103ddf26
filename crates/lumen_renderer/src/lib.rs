//! Deferred and forward PBR rendering on wgpu.

pub mod config;
mod error;
pub mod global_resources;
pub mod ibl;
pub mod light;
pub mod material;
pub mod mesh;
pub mod model;
pub mod programs;
mod renderer;
pub mod shader;
pub mod shading;
pub mod targets;
pub mod texture;
pub mod uniforms;

pub use config::{
    DEFAULT_EXPOSURE_INDEX, EXPOSURE_VALUES, FrameConfig, RenderPath, RenderToggles, RendererSettings,
    next_exposure_index,
};
pub use error::RenderError;
pub use light::{Light, LightInfo, LightKind, MAX_LIGHTS};
pub use material::{BlinnPhongMaterial, Material, MaterialTag, PbrMaterial, PbrPreset, Side, SkyboxMaterial};
pub use mesh::GpuMesh;
pub use model::Model;
pub use renderer::{LightId, Renderer};
