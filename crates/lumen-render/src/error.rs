// SPDX-License-Identifier: CEPL-1.0
//! Failure taxonomy of the frame engine.
//!
//! Out-of-date and suboptimal presentation, and fence timeouts, are not errors:
//! they come back as [`FrameOutcome`](crate::FrameOutcome) variants.

use ash::vk;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The surface reported no usable formats; the device/surface pair is unusable.
    #[error("surface capability query failed: {0}")]
    CapabilityQuery(String),

    #[error("failed to create {what}: {code:?}")]
    DeviceResourceExhausted {
        what: &'static str,
        code: vk::Result,
    },

    #[error("refusing to build a zero-area swapchain ({width}x{height})")]
    ZeroExtent { width: u32, height: u32 },

    #[error("frame slot pool needs at least one slot")]
    NoFrameSlots,

    #[error("{got} uniform bindings supplied for {slots} frame slots")]
    UniformCountMismatch { slots: usize, got: usize },

    #[error("no swapchain is built")]
    NoSwapchain,

    #[error("command buffer recording failed: {code:?}")]
    Record { code: vk::Result },

    #[error("acquire_next_image failed: {code:?}")]
    Acquire { code: vk::Result },

    #[error("fence wait/reset failed: {code:?}")]
    Fence { code: vk::Result },

    #[error("queue_submit failed: {code:?}")]
    Submit { code: vk::Result },

    #[error("queue_present failed: {code:?}")]
    Present { code: vk::Result },

    #[error("device_wait_idle failed: {code:?}")]
    WaitIdle { code: vk::Result },
}

impl RenderError {
    pub(crate) fn exhausted(what: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |code| RenderError::DeviceResourceExhausted { what, code }
    }

    /// Setup-time failures abort startup; everything else ends the render loop.
    pub fn is_fatal_setup(&self) -> bool {
        matches!(
            self,
            RenderError::CapabilityQuery(_)
                | RenderError::DeviceResourceExhausted { .. }
                | RenderError::ZeroExtent { .. }
                | RenderError::NoFrameSlots
                | RenderError::UniformCountMismatch { .. }
        )
    }
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_object() {
        let err = RenderError::exhausted("framebuffer")(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        assert_eq!(
            err.to_string(),
            "failed to create framebuffer: ERROR_OUT_OF_DEVICE_MEMORY"
        );
        assert!(err.is_fatal_setup());
    }

    #[test]
    fn runtime_failures_are_not_setup_failures() {
        let err = RenderError::Present {
            code: vk::Result::ERROR_DEVICE_LOST,
        };
        assert!(!err.is_fatal_setup());
        let err = RenderError::CapabilityQuery("no formats".into());
        assert!(err.is_fatal_setup());
    }
}
