pub mod camera;
pub mod gpu;
pub mod mesh_buffers;
pub mod textures;

pub use gpu::{Frame, GpuState, Overlay};
pub use mesh_buffers::GpuMesh;
