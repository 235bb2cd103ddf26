pub mod camera;
pub mod time;
pub mod transform;

pub use camera::OrbitCamera;
pub use time::FramePacer;
pub use transform::ModelTransform;
