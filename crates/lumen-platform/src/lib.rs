// SPDX-License-Identifier: CEPL-1.0
//! Windowing glue: winit re-export plus the adapter the renderer talks to.

use std::sync::Arc;
use std::time::Duration;

use lumen_render::{RenderSize, WindowSize};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use tracing::debug;

pub use winit;
use winit::window::Window;

/// Sleep between framebuffer polls while minimized.
const MINIMIZED_POLL: Duration = Duration::from_millis(16);

/// A winit window shared between the event loop and the renderer.
#[derive(Clone, Debug)]
pub struct PlatformWindow(Arc<Window>);

impl PlatformWindow {
    pub fn new(window: Window) -> Self {
        Self(Arc::new(window))
    }

    pub fn window(&self) -> &Window {
        &self.0
    }

    pub fn request_redraw(&self) {
        self.0.request_redraw();
    }
}

impl WindowSize for PlatformWindow {
    fn framebuffer_size(&self) -> RenderSize {
        let s = self.0.inner_size();
        RenderSize::new(s.width, s.height)
    }

    fn wait_events(&self) {
        let size = self.framebuffer_size();
        if let Some(delay) = poll_delay(size) {
            debug!(
                "framebuffer is {}x{}, waiting {:?} before polling again",
                size.width, size.height, delay
            );
            std::thread::sleep(delay);
        }
    }
}

/// How long to sleep before the next size poll; `None` once the window has area again.
fn poll_delay(size: RenderSize) -> Option<Duration> {
    size.is_zero_area().then_some(MINIMIZED_POLL)
}

impl HasWindowHandle for PlatformWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.0.window_handle()
    }
}

impl HasDisplayHandle for PlatformWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.0.display_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeps_only_while_zero_area() {
        assert_eq!(poll_delay(RenderSize::new(0, 0)), Some(MINIMIZED_POLL));
        assert_eq!(poll_delay(RenderSize::new(800, 0)), Some(MINIMIZED_POLL));
        assert_eq!(poll_delay(RenderSize::new(0, 600)), Some(MINIMIZED_POLL));
        assert_eq!(poll_delay(RenderSize::new(800, 600)), None);
    }
}
