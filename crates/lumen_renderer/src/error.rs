use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("failed to read shader '{path}': {source}")]
    ShaderIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("shader '{name}' failed to compile: {message}")]
    ShaderCompile { name: String, message: String },

    #[error("pipeline '{label}' failed validation: {message}")]
    Pipeline { label: String, message: String },

    #[error("render target '{label}' is incomplete: {reason}")]
    IncompleteTarget { label: String, reason: String },

    #[error("IBL stage '{0}' has no usable pipeline")]
    IblStage(&'static str),

    #[error("environment map unavailable: {0}")]
    Environment(#[from] lumen_assets::AssetError),
}
