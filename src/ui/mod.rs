pub mod panels;
pub mod state;
pub mod theme;

pub use panels::{UiActions, draw_control_panel, draw_help_overlay};
pub use state::{FpsCounter, PointerState, UiState, ViewStats};
pub use theme::apply_theme;
