// SPDX-License-Identifier: CEPL-1.0
//! The assembled engine: one recreation controller, one slot pool, one scheduler.
//!
//! Exposed surface is `init` / `draw_frame` / `teardown`, all called from the
//! thread that owns the window's event loop. Stale-swapchain outcomes are
//! absorbed here by rebuilding before `draw_frame` returns.

use ash::vk;
use tracing::{debug, error, info};

use crate::config::RendererConfig;
use crate::device::PresentDevice;
use crate::error::{RenderError, RenderResult};
use crate::frame::{FrameSlotPool, SlotUniform};
use crate::recreate::{RecreateReason, RecreationController};
use crate::scheduler::{FrameOutcome, FrameScheduler, MeshBinding, PipelineBinding, UniformWriter};
use crate::surface::PresentPolicy;
use crate::swapchain::SwapchainResourceSet;
use crate::WindowSize;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSettings {
    pub frames_in_flight: usize,
    pub fence_timeout_ns: u64,
    pub policy: PresentPolicy,
    pub clear_color: [f32; 4],
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&RendererConfig::default())
    }
}

impl From<&RendererConfig> for EngineSettings {
    fn from(cfg: &RendererConfig) -> Self {
        Self {
            frames_in_flight: cfg.slot_count(),
            fence_timeout_ns: cfg.fence_timeout_ns(),
            policy: PresentPolicy {
                vsync: cfg.vsync,
                mode: cfg.vsync_mode,
            },
            clear_color: cfg.clear_color,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub presented: u64,
    pub skipped: u64,
    pub not_ready: u64,
    pub recreations: u64,
}

pub struct PresentationEngine {
    swapchain: RecreationController,
    slots: Option<FrameSlotPool>,
    scheduler: FrameScheduler,
    pipeline: PipelineBinding,
    stats: FrameStats,
}

impl PresentationEngine {
    /// Builds the first swapchain and the frame slot ring.
    ///
    /// `command_pool` must have been created with `RESET_COMMAND_BUFFER`.
    pub fn init<D: PresentDevice + ?Sized>(
        device: &D,
        window: &dyn WindowSize,
        pipeline: PipelineBinding,
        command_pool: vk::CommandPool,
        settings: EngineSettings,
    ) -> RenderResult<Self> {
        let mut swapchain =
            RecreationController::init(device, window, pipeline.render_pass, settings.policy)?;
        let slots = match FrameSlotPool::create(device, command_pool, settings.frames_in_flight) {
            Ok(s) => s,
            Err(e) => {
                swapchain.teardown(device);
                return Err(e);
            }
        };

        info!(
            "presentation engine ready: {} frames in flight",
            settings.frames_in_flight
        );
        Ok(Self {
            swapchain,
            scheduler: FrameScheduler::new(
                slots.len(),
                settings.fence_timeout_ns,
                settings.clear_color,
            ),
            slots: Some(slots),
            pipeline,
            stats: FrameStats::default(),
        })
    }

    pub fn attach_uniforms(&mut self, uniforms: Vec<SlotUniform>) -> RenderResult<()> {
        self.slots
            .as_mut()
            .ok_or(RenderError::NoSwapchain)?
            .attach_uniforms(uniforms)
    }

    /// Window resize from the event loop. The rebuild happens at the start of
    /// the next `draw_frame`.
    pub fn notify_resized(&mut self) {
        self.swapchain.request(RecreateReason::RESIZED);
    }

    pub fn set_present_policy(&mut self, policy: PresentPolicy) {
        self.swapchain.set_policy(policy);
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.scheduler.set_clear_color(rgba);
    }

    /// Runs one frame cycle and absorbs stale-swapchain outcomes.
    pub fn draw_frame<D: PresentDevice + ?Sized>(
        &mut self,
        device: &D,
        window: &dyn WindowSize,
        mesh: &MeshBinding,
        uniforms: Option<&mut dyn UniformWriter>,
    ) -> RenderResult<FrameOutcome> {
        if self.slots.is_none() {
            return Err(RenderError::NoSwapchain);
        }
        if !self.swapchain.pending().is_empty() {
            self.rebuild(device, window)?;
        }

        let (Some(current), Some(slots)) = (self.swapchain.current(), self.slots.as_ref()) else {
            return Err(RenderError::NoSwapchain);
        };
        let outcome =
            self.scheduler
                .draw_frame(device, current, slots, &self.pipeline, mesh, uniforms)?;

        match outcome {
            FrameOutcome::Presented => self.stats.presented += 1,
            FrameOutcome::PresentedStale => {
                self.stats.presented += 1;
                self.swapchain.request(RecreateReason::SUBOPTIMAL);
            }
            FrameOutcome::SkippedOutOfDate => {
                self.stats.skipped += 1;
                self.swapchain.request(RecreateReason::OUT_OF_DATE);
            }
            FrameOutcome::NotReady => self.stats.not_ready += 1,
        }
        if outcome.needs_recreate() {
            self.rebuild(device, window)?;
        }
        Ok(outcome)
    }

    fn rebuild<D: PresentDevice + ?Sized>(
        &mut self,
        device: &D,
        window: &dyn WindowSize,
    ) -> RenderResult<()> {
        self.swapchain.recreate(device, window)?;
        self.stats.recreations += 1;
        Ok(())
    }

    /// Drains the GPU, then destroys the slot pool and the swapchain set.
    /// Backend-owned objects are the caller's to destroy afterwards.
    /// A second call does nothing.
    pub fn teardown<D: PresentDevice + ?Sized>(&mut self, device: &D) {
        let Some(slots) = self.slots.take() else {
            return;
        };
        if let Err(code) = device.wait_idle() {
            error!("device wait idle before teardown failed: {:?}", code);
        }
        slots.destroy(device);
        self.swapchain.teardown(device);
        debug!("presentation engine torn down ({:?})", self.stats);
    }

    pub fn is_torn_down(&self) -> bool {
        self.slots.is_none()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn swapchain(&self) -> Option<&SwapchainResourceSet> {
        self.swapchain.current()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.as_ref().map_or(0, FrameSlotPool::len)
    }

    pub fn pending(&self) -> RecreateReason {
        self.swapchain.pending()
    }
}

impl Drop for PresentationEngine {
    fn drop(&mut self) {
        if self.slots.is_some() {
            error!("presentation engine dropped without teardown");
        }
    }
}
