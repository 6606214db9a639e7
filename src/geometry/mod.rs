pub mod mesh;
pub mod teapot;
pub mod teapot_data;

pub use mesh::TriangleMesh;
pub use teapot::{TeapotOptions, generate_teapot};
