pub mod assets;
mod error;
pub mod hdr;
pub mod mesh;

pub use assets::Handle;
pub use error::AssetError;
pub use hdr::HdrImage;
pub use mesh::{MeshData, Vertex};
