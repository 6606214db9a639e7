use std::time::{Duration, Instant};

use glam::Vec2;

/// Panel toggles that are not part of the teapot parameters.
pub struct UiState {
    pub vsync_enabled: bool,
    pub show_stats: bool,
    pub show_help: bool,
}

impl UiState {
    pub fn new(vsync_enabled: bool) -> Self {
        Self {
            vsync_enabled,
            show_stats: true,
            show_help: true,
        }
    }
}

/// Numbers shown in the statistics section.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewStats {
    pub fps: f32,
    pub vertices: usize,
    pub triangles: usize,
    pub rebuilds: u64,
}

/// Drag state of the viewport. The cursor position is tracked on every move,
/// including moves over the panel, so a drag never starts from a stale point.
#[derive(Debug, Default)]
pub struct PointerState {
    pub orbiting: bool,
    pub panning: bool,
    last_position: Option<(f64, f64)>,
}

impl PointerState {
    pub fn track(&mut self, x: f64, y: f64) {
        self.last_position = Some((x, y));
    }

    /// Delta since the previous position, only while a button is held.
    pub fn moved(&mut self, x: f64, y: f64) -> Option<Vec2> {
        let (px, py) = self.last_position.replace((x, y))?;
        if !self.orbiting && !self.panning {
            return None;
        }
        Some(Vec2::new((x - px) as f32, (y - py) as f32))
    }

    pub fn leave(&mut self) {
        self.last_position = None;
    }
}

const FPS_WINDOW: Duration = Duration::from_millis(500);

/// Frames per second averaged over a short window. The viewer only redraws
/// on demand, so this reads low while idle.
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            fps: 0.0,
        }
    }

    pub fn tick(&mut self, now: Instant) -> f32 {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= FPS_WINDOW {
            self.fps = self.frames as f32 / elapsed.as_secs_f32();
            self.frames = 0;
            self.window_start = now;
        }
        self.fps
    }
}
