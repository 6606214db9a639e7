use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

mod config;
mod error;
mod geometry;
mod renderer;
mod ui;
mod viewer;

use config::Config;
use error::{Result, ViewerError};
use renderer::{Frame, GpuMesh, GpuState, Overlay};
use ui::{FpsCounter, PointerState, UiState, ViewStats, apply_theme, draw_control_panel, draw_help_overlay};
use viewer::ViewerState;

struct App {
    config: Config,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    viewer: Option<ViewerState<GpuMesh>>,
    ui_state: UiState,
    pointer: PointerState,
    fps: FpsCounter,
    pending_resize: Option<PhysicalSize<u32>>,
    fatal: Option<ViewerError>,
}

impl App {
    fn new(config: Config, viewer: ViewerState<GpuMesh>) -> Self {
        let ui_state = UiState::new(config.window.vsync);
        Self {
            config,
            window: None,
            gpu: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),

            viewer: Some(viewer),
            ui_state,
            pointer: PointerState::default(),
            fps: FpsCounter::new(Instant::now()),
            pending_resize: None,
            fatal: None,
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = pollster::block_on(GpuState::new(window.clone(), self.config.window.vsync))?;

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        self.pending_resize = Some(window.inner_size());
        window.request_redraw();

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);
        Ok(())
    }

    fn stats(&self) -> ViewStats {
        let Some(viewer) = &self.viewer else {
            return ViewStats::default();
        };
        let mesh = viewer.scene().mesh();
        ViewStats {
            fps: 0.0,
            vertices: mesh.map_or(0, |m| m.vertex_count),
            triangles: mesh.map_or(0, |m| m.triangle_count),
            rebuilds: viewer.rebuild_count(),
        }
    }

    fn render(&mut self) -> Result<()> {
        let (Some(window), Some(egui_state)) = (&self.window, &mut self.egui_state) else {
            return Ok(());
        };
        let Some(viewer) = &self.viewer else {
            return Ok(());
        };

        let raw_input = egui_state.take_egui_input(window);

        let stats = ViewStats {
            fps: self.fps.tick(Instant::now()),
            ..self.stats()
        };
        let params = *viewer.params();
        let distance = viewer.scene().camera.distance;

        let mut ui_actions = ui::UiActions::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_actions = draw_control_panel(ctx, &params, &mut self.ui_state, &stats);
            if self.ui_state.show_help {
                draw_help_overlay(ctx, distance);
            }
        });

        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };
        let Some(window) = &self.window else {
            return Ok(());
        };
        let Some(egui_state) = &mut self.egui_state else {
            return Ok(());
        };
        let Some(egui_renderer) = &mut self.egui_renderer else {
            return Ok(());
        };
        let Some(viewer) = &mut self.viewer else {
            return Ok(());
        };

        egui_state.handle_platform_output(window, full_output.platform_output);

        if let Some(vsync) = ui_actions.set_vsync {
            gpu.set_vsync(vsync);
        }

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.device, &gpu.queue, id, &delta);
        }

        let repaint_now = full_output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .is_some_and(|v| v.repaint_delay.is_zero());

        let viewport = self
            .pending_resize
            .take()
            .map(|size| (size.width, size.height));
        let outcome = viewer.redraw(
            viewport,
            &ui_actions.changes,
            &mut Frame {
                gpu,
                overlay: Some(Overlay {
                    renderer: &mut *egui_renderer,
                    paint_jobs: &paint_jobs,
                    screen: &screen_descriptor,
                }),
            },
        );

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }

        // a failed upload is retried on the next frame
        let retry = match outcome {
            Ok(()) => false,
            Err(err @ ViewerError::MeshUpload(_)) => {
                tracing::error!("{err}");
                viewer.needs_rebuild()
            }
            Err(err) => return Err(err),
        };

        if repaint_now || retry {
            window.request_redraw();
        }
        Ok(())
    }

    fn handle_pointer_motion(&mut self, position: PhysicalPosition<f64>) {
        let Some(delta) = self.pointer.moved(position.x, position.y) else {
            return;
        };
        let Some(viewer) = &mut self.viewer else { return };

        let camera = viewer.camera_mut();
        if self.pointer.orbiting {
            camera.rotate(delta);
        } else {
            camera.pan(delta);
        }
        self.request_redraw();
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let (Some(viewer), Some(gpu)) = (self.viewer.take(), self.gpu.as_mut()) {
            viewer.dispose(&mut Frame { gpu, overlay: None });
        }
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: ViewerError) {
        tracing::error!("{err}");
        self.fatal = Some(err);
        self.shutdown(event_loop);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init_gpu(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(egui_state) = &mut self.egui_state {
            if let Some(window) = &self.window {
                let response = egui_state.on_window_event(window, &event);
                if response.repaint {
                    window.request_redraw();
                }
                if response.consumed {
                    if let WindowEvent::CursorMoved { position, .. } = event {
                        self.pointer.track(position.x, position.y);
                    }
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(size) => {
                self.pending_resize = Some(size);
                self.request_redraw();
            }

            WindowEvent::MouseInput { button, state, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.pointer.orbiting = pressed,
                    MouseButton::Right => self.pointer.panning = pressed,
                    _ => {}
                }
            }

            WindowEvent::CursorMoved { position, .. } => self.handle_pointer_motion(position),

            WindowEvent::CursorLeft { .. } => self.pointer.leave(),

            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                if let Some(viewer) = &mut self.viewer {
                    viewer.camera_mut().zoom(steps);
                }
                self.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                if let Err(err) = self.render() {
                    self.fail(event_loop, err);
                }
            }

            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::load(Config::path_from_env().as_deref()).context("loading config")?;
    let viewer = ViewerState::from_config(&config).context("initial teapot parameters")?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, viewer);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.fatal {
        return Err(err.into());
    }
    Ok(())
}
