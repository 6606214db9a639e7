pub mod controller;
pub mod material;
pub mod params;
pub mod scene;

pub use controller::{RenderBackend, ViewerState};
