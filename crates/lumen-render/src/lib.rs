// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! Frame rendering and swapchain lifecycle engine.
//!
//! Everything in this crate talks to the GPU through [`PresentDevice`], so the
//! scheduling and rebuild logic is backend agnostic and can be driven by a
//! recording mock in tests. `lumen-render-vk` supplies the ash implementation.

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod frame;
pub mod recreate;
pub mod scheduler;
pub mod surface;
pub mod swapchain;

#[cfg(test)]
mod mock;

pub use config::{MeshKind, RendererConfig, VsyncMode};
pub use device::{
    FrameSubmit, ImageSharing, PresentDevice, QueueFamilies, RenderPassBegin, SurfaceSupport,
    SwapchainDesc,
};
pub use engine::{EngineSettings, FrameStats, PresentationEngine};
pub use error::{RenderError, RenderResult};
pub use frame::{FrameSlot, FrameSlotPool, SlotUniform};
pub use recreate::{RecreateReason, RecreationController};
pub use scheduler::{
    FrameCursor, FrameOutcome, FrameScheduler, IndexBinding, MeshBinding, PipelineBinding,
    UniformWriter,
};
pub use surface::{negotiate, PresentPolicy, SurfaceConfig};
pub use swapchain::{PresentableImage, SwapchainResourceSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True while the window is minimized (either dimension is zero).
    pub fn is_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Framebuffer-size source for extent negotiation.
///
/// Must be queried from the thread that owns the window's event loop.
pub trait WindowSize {
    fn framebuffer_size(&self) -> RenderSize;

    /// Called between polls while the framebuffer reports a zero area.
    fn wait_events(&self) {}
}

/// A window the renderer can both present to and ask for its size.
pub trait RenderWindow: HasWindowHandle + HasDisplayHandle + WindowSize {
    fn as_window_size(&self) -> &dyn WindowSize;
}

impl<T: HasWindowHandle + HasDisplayHandle + WindowSize> RenderWindow for T {
    fn as_window_size(&self) -> &dyn WindowSize {
        self
    }
}

pub trait Renderer {
    fn new(window: std::sync::Arc<dyn RenderWindow>, cfg: &RendererConfig) -> Result<Self>
    where
        Self: Sized;

    /// Resize notification from the event loop. A zero area pauses drawing.
    fn resize(&mut self, size: RenderSize) -> Result<()>;
    fn render(&mut self) -> Result<()>;
    fn set_clear_color(&mut self, rgba: [f32; 4]);
    fn set_vsync(&mut self, _on: bool) {}
    fn stats(&self) -> FrameStats;
}
