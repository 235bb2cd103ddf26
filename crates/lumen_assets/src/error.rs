use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("environment map must be 32-bit float RGB, got {0:?}")]
    UnsupportedLayout(image::ColorType),

    #[error("failed to load OBJ: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("'{0}' contains no geometry")]
    EmptyMesh(String),
}
