// SPDX-License-Identifier: CEPL-1.0
//! Swapchain rebuilds.
//!
//! A rebuild is requested with a [`RecreateReason`] (from the event loop, or
//! from the scheduler's outcome) and carried out as
//! wait idle → teardown → support query → negotiate → build.
//! Frame slots, the pipeline and the render pass are never touched.

use ash::vk;
use bitflags::bitflags;
use tracing::{debug, info, warn};

use crate::device::{PresentDevice, SurfaceSupport};
use crate::error::{RenderError, RenderResult};
use crate::surface::{self, PresentPolicy, EXTENT_FOLLOWS_WINDOW};
use crate::swapchain::SwapchainResourceSet;
use crate::WindowSize;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RecreateReason: u8 {
        /// The window reported a new framebuffer size.
        const RESIZED     = 1 << 0;
        /// Acquire or present returned `ERROR_OUT_OF_DATE_KHR`.
        const OUT_OF_DATE = 1 << 1;
        /// Acquire or present returned `SUBOPTIMAL_KHR`.
        const SUBOPTIMAL  = 1 << 2;
        /// Present policy changed (vsync toggle).
        const CONFIG      = 1 << 3;
    }
}

pub struct RecreationController {
    current: Option<SwapchainResourceSet>,
    pending: RecreateReason,
    policy: PresentPolicy,
    render_pass: vk::RenderPass,
    generation: u64,
}

impl RecreationController {
    /// Negotiates and builds the first swapchain.
    pub fn init<D: PresentDevice + ?Sized>(
        device: &D,
        window: &dyn WindowSize,
        render_pass: vk::RenderPass,
        policy: PresentPolicy,
    ) -> RenderResult<Self> {
        let support = query_support(device, window)?;
        let config = surface::negotiate(&support, policy, window)?;
        let set = SwapchainResourceSet::build(device, &support, config, render_pass, None)?;
        Ok(Self {
            current: Some(set),
            pending: RecreateReason::empty(),
            policy,
            render_pass,
            generation: 0,
        })
    }

    /// Marks the swapchain stale. Carried out on the next [`Self::recreate`].
    pub fn request(&mut self, reason: RecreateReason) {
        if !self.pending.contains(reason) {
            debug!("swapchain rebuild requested: {:?}", reason);
        }
        self.pending |= reason;
    }

    pub fn pending(&self) -> RecreateReason {
        self.pending
    }

    pub fn set_policy(&mut self, policy: PresentPolicy) {
        if self.policy != policy {
            self.policy = policy;
            self.request(RecreateReason::CONFIG);
        }
    }

    pub fn policy(&self) -> PresentPolicy {
        self.policy
    }

    pub fn current(&self) -> Option<&SwapchainResourceSet> {
        self.current.as_ref()
    }

    /// Number of completed rebuilds since init.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Rebuilds the swapchain resource set for the window's current size.
    ///
    /// Blocks while the window is minimized. The old set is fully destroyed
    /// before the new one is created, so no handle from it survives.
    pub fn recreate<D: PresentDevice + ?Sized>(
        &mut self,
        device: &D,
        window: &dyn WindowSize,
    ) -> RenderResult<()> {
        // STRICT ORDER: nothing may still reference the old framebuffers.
        device
            .wait_idle()
            .map_err(|code| RenderError::WaitIdle { code })?;

        let previous = self.current.take().map(|old| {
            let config = *old.config();
            old.teardown(device);
            config
        });

        let support = query_support(device, window)?;
        let config = surface::negotiate(&support, self.policy, window)?;
        let set =
            SwapchainResourceSet::build(device, &support, config, self.render_pass, None)?;

        if let Some(prev) = previous {
            if prev.format != config.format || prev.color_space != config.color_space {
                warn!(
                    "surface format changed on rebuild ({} -> {}), render pass targets the old one",
                    surface::format_name(prev.format),
                    surface::format_name(config.format)
                );
            }
        }

        self.generation += 1;
        info!(
            "swapchain rebuilt (#{}, {:?}): {}x{}",
            self.generation,
            self.pending,
            config.extent.width,
            config.extent.height
        );
        self.pending = RecreateReason::empty();
        self.current = Some(set);
        Ok(())
    }

    /// Destroys the current set, if any. The device must be idle.
    pub fn teardown<D: PresentDevice + ?Sized>(&mut self, device: &D) {
        if let Some(set) = self.current.take() {
            set.teardown(device);
        }
    }
}

/// Queries surface support, re-querying while a fixed-size surface reports a
/// zero extent (minimized on platforms that do not use the window-sized sentinel).
fn query_support<D: PresentDevice + ?Sized>(
    device: &D,
    window: &dyn WindowSize,
) -> RenderResult<SurfaceSupport> {
    loop {
        let support = device
            .surface_support()
            .map_err(|code| RenderError::CapabilityQuery(format!("surface support: {code:?}")))?;
        let extent = support.capabilities.current_extent;
        if extent.width == EXTENT_FOLLOWS_WINDOW || (extent.width != 0 && extent.height != 0) {
            return Ok(support);
        }
        window.wait_events();
    }
}
