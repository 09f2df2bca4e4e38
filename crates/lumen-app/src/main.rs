// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use lumen_core::init_tracing;
use lumen_platform::PlatformWindow;
use lumen_render::{FrameStats, RenderError, RenderSize, Renderer, RendererConfig};
use lumen_render_vk::VkRenderer;
use tracing::{error, info};

use lumen_platform::winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod config;

use config::{AppCfg, Args};

const FPS_WINDOW: Duration = Duration::from_secs(1);
const VSYNC_TOGGLE: KeyCode = KeyCode::KeyV;

/// A fresh press of the vsync toggle key; auto-repeat is ignored.
fn is_vsync_toggle(key: PhysicalKey, state: ElementState, repeat: bool) -> bool {
    key == PhysicalKey::Code(VSYNC_TOGGLE) && state == ElementState::Pressed && !repeat
}

/// Labels a renderer failure for the shutdown log.
fn failure_kind(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<RenderError>() {
        Some(e) if e.is_fatal_setup() => "swapchain setup",
        Some(_) => "frame",
        None => "backend",
    }
}

struct App {
    cfg: AppCfg,
    render_cfg: RendererConfig,
    // Dropped before the window it presents to.
    renderer: Option<VkRenderer>,
    window: Option<Arc<PlatformWindow>>,
    render_size: RenderSize,
    paused: bool,
    exiting: bool,
    last_fps_instant: Instant,
    last_stats: FrameStats,
}

impl App {
    fn new(cfg: AppCfg, render_cfg: RendererConfig) -> Self {
        Self {
            cfg,
            render_cfg,
            renderer: None,
            window: None,
            render_size: RenderSize::new(1, 1),
            paused: false,
            exiting: false,
            last_fps_instant: Instant::now(),
            last_stats: FrameStats::default(),
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.exiting = true;
        self.renderer = None;
        self.window = None;
        event_loop.exit();
    }

    fn control_flow(&self) -> ControlFlow {
        if self.render_cfg.vsync {
            ControlFlow::Wait
        } else {
            ControlFlow::Poll
        }
    }

    fn toggle_vsync(&mut self, event_loop: &ActiveEventLoop) {
        self.render_cfg.vsync = !self.render_cfg.vsync;
        if let Some(renderer) = &mut self.renderer {
            renderer.set_vsync(self.render_cfg.vsync);
        }
        info!("vsync → {}", self.render_cfg.vsync);
        event_loop.set_control_flow(self.control_flow());
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn log_fps(&mut self) {
        let Some(renderer) = &self.renderer else {
            return;
        };
        let now = Instant::now();
        if now.duration_since(self.last_fps_instant) < FPS_WINDOW {
            return;
        }
        let stats = renderer.stats();
        info!(
            "fps ~ {} (skipped {}, rebuilds {})",
            stats.presented - self.last_stats.presented,
            stats.skipped - self.last_stats.skipped,
            stats.recreations - self.last_stats.recreations
        );
        self.last_stats = stats;
        self.last_fps_instant = now;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let w = &self.cfg.window;
            let attrs = Window::default_attributes()
                .with_title(w.title.clone())
                .with_inner_size(LogicalSize::new(w.width, w.height));
            let window = match event_loop.create_window(attrs) {
                Ok(win) => Arc::new(PlatformWindow::new(win)),
                Err(e) => {
                    error!("create_window failed: {e}");
                    self.shutdown(event_loop);
                    return;
                }
            };

            let size = window.window().inner_size();
            self.render_size = RenderSize::new(size.width, size.height);

            match VkRenderer::new(window.clone(), &self.render_cfg) {
                Ok(mut r) => {
                    r.set_clear_color(self.render_cfg.clear_color);
                    r.set_vsync(self.render_cfg.vsync);
                    self.renderer = Some(r);
                }
                Err(e) => {
                    error!("vk init failed: {e:#}");
                    self.shutdown(event_loop);
                    return;
                }
            }
            info!(
                "vsync cfg = {} ({:?}), {} frames in flight",
                self.render_cfg.vsync,
                self.render_cfg.vsync_mode,
                self.render_cfg.slot_count()
            );
            self.window = Some(window);
        }

        event_loop.set_control_flow(self.control_flow());

        self.paused = self.render_size.is_zero_area();
        info!("resumed → paused={}", self.paused);
        if !self.paused {
            if let Some(w) = &self.window {
                w.request_redraw();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.window().id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                self.render_size = RenderSize::new(new_size.width, new_size.height);
                let now_paused = self.render_size.is_zero_area();
                if self.paused != now_paused {
                    info!(
                        "Resized → {}x{} (paused={})",
                        self.render_size.width, self.render_size.height, now_paused
                    );
                }
                self.paused = now_paused;

                if let Some(renderer) = &mut self.renderer {
                    if let Err(e) = renderer.resize(self.render_size) {
                        error!("resize failed: {e:#}");
                    }
                }
                if !self.paused {
                    if let Some(w) = &self.window {
                        w.request_redraw();
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if is_vsync_toggle(event.physical_key, event.state, event.repeat) {
                    self.toggle_vsync(event_loop);
                }
            }

            WindowEvent::RedrawRequested => {
                if self.exiting || self.paused {
                    return;
                }
                if let Some(renderer) = &mut self.renderer {
                    if let Err(e) = renderer.render() {
                        // Past this point the device is in an unknown state.
                        error!("{} failure, shutting down: {e:#}", failure_kind(&e));
                        self.shutdown(event_loop);
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            return;
        }
        if self.paused {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        }

        event_loop.set_control_flow(self.control_flow());
        if let Some(w) = &self.window {
            w.request_redraw();
        }
        self.log_fps();
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = AppCfg::load(&args.config);
    let render_cfg = cfg.renderer_config(&args);

    let event_loop: EventLoop<()> = EventLoop::new()?;
    let mut app = App::new(cfg, render_cfg);
    event_loop.run_app(&mut app)?;
    Ok(())
}
