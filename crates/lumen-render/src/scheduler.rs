// SPDX-License-Identifier: CEPL-1.0
//! Per-frame orchestration: wait, acquire, record, submit, present, advance.
//!
//! ```text
//! IDLE → WAIT_FENCE → ACQUIRE → RECORD → SUBMIT → PRESENT → ADVANCE → IDLE
//!              │           │
//!              │           └─ out of date: abort, fence untouched, cursor unchanged
//!              └─ timeout: NotReady, nothing touched
//! ```
//!
//! The slot's fence is reset only once an image has been acquired, so an
//! aborted cycle leaves the fence signaled and the next wait on it stays honest.

use ash::vk;
use tracing::{debug, trace};

use crate::device::{FrameSubmit, PresentDevice, RenderPassBegin};
use crate::error::{RenderError, RenderResult};
use crate::frame::FrameSlotPool;
use crate::swapchain::SwapchainResourceSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexBinding {
    pub buffer: vk::Buffer,
    pub count: u32,
    pub index_type: vk::IndexType,
}

/// The static mesh as the scheduler sees it: buffer handles and counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshBinding {
    pub vertex_buffer: vk::Buffer,
    pub vertex_count: u32,
    pub index: Option<IndexBinding>,
}

/// The compiled pipeline, its layout and the render pass it was built against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineBinding {
    pub render_pass: vk::RenderPass,
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

/// Fills a slot's uniform buffer right before its command buffer is recorded.
/// Only called once the slot's fence has been waited on.
pub trait UniformWriter {
    fn write(&mut self, slot: usize, extent: vk::Extent2D);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// Presented, but the swapchain no longer matches the surface.
    PresentedStale,
    /// Acquire reported out of date; nothing was recorded or presented.
    SkippedOutOfDate,
    /// The slot's fence did not signal within the timeout. Try again next tick.
    NotReady,
}

impl FrameOutcome {
    pub fn needs_recreate(&self) -> bool {
        matches!(
            self,
            FrameOutcome::PresentedStale | FrameOutcome::SkippedOutOfDate
        )
    }
}

/// Index of the next slot, advanced modulo the slot count after each submitted frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameCursor {
    index: usize,
    len: usize,
}

impl FrameCursor {
    pub fn new(len: usize) -> Self {
        Self {
            index: 0,
            len: len.max(1),
        }
    }

    #[inline]
    pub fn current(&self) -> usize {
        self.index
    }

    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.len;
    }
}

pub struct FrameScheduler {
    cursor: FrameCursor,
    timeout_ns: u64,
    clear: vk::ClearValue,
}

impl FrameScheduler {
    pub fn new(slot_count: usize, timeout_ns: u64, clear_color: [f32; 4]) -> Self {
        Self {
            cursor: FrameCursor::new(slot_count),
            timeout_ns,
            clear: clear_value(clear_color),
        }
    }

    pub fn cursor(&self) -> FrameCursor {
        self.cursor
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear = clear_value(rgba);
    }

    pub fn draw_frame<D: PresentDevice + ?Sized>(
        &mut self,
        device: &D,
        swapchain: &SwapchainResourceSet,
        slots: &FrameSlotPool,
        pipeline: &PipelineBinding,
        mesh: &MeshBinding,
        uniforms: Option<&mut dyn UniformWriter>,
    ) -> RenderResult<FrameOutcome> {
        let slot_index = self.cursor.current();
        let slot = slots.slot(slot_index);

        // WAIT_FENCE
        match device.wait_for_fence(slot.in_flight(), self.timeout_ns) {
            Ok(()) => {}
            Err(vk::Result::TIMEOUT) => {
                debug!("slot {} fence not ready", slot_index);
                return Ok(FrameOutcome::NotReady);
            }
            Err(code) => return Err(RenderError::Fence { code }),
        }

        // ACQUIRE
        let (image_index, acquire_stale) = match device.acquire_next_image(
            swapchain.swapchain(),
            self.timeout_ns,
            slot.image_available(),
        ) {
            Ok(pair) => pair,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("acquire: swapchain out of date, skipping frame");
                return Ok(FrameOutcome::SkippedOutOfDate);
            }
            Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => {
                debug!("acquire: no image ready");
                return Ok(FrameOutcome::NotReady);
            }
            Err(code) => return Err(RenderError::Acquire { code }),
        };
        let target = swapchain.image(image_index).ok_or(RenderError::Acquire {
            code: vk::Result::ERROR_UNKNOWN,
        })?;

        // Committed to submitting from here on. Any error past this reset leaves
        // the slot's fence unsignaled for good, so the slot is unusable afterwards.
        device
            .reset_fence(slot.in_flight())
            .map_err(|code| RenderError::Fence { code })?;

        if let Some(writer) = uniforms {
            writer.write(slot_index, swapchain.extent());
        }

        // RECORD
        let cmd = slot.command_buffer();
        self.record(
            device,
            cmd,
            target.framebuffer(),
            swapchain.extent(),
            pipeline,
            mesh,
            slot.uniform().map(|u| u.descriptor_set),
        )?;

        // SUBMIT
        device
            .queue_submit(&FrameSubmit {
                command_buffer: cmd,
                wait_semaphore: slot.image_available(),
                wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                signal_semaphore: slot.render_finished(),
                fence: slot.in_flight(),
            })
            .map_err(|code| RenderError::Submit { code })?;

        // PRESENT
        let present_stale = match device.queue_present(
            swapchain.swapchain(),
            image_index,
            slot.render_finished(),
        ) {
            Ok(suboptimal) => suboptimal,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => true,
            Err(code) => return Err(RenderError::Present { code }),
        };

        // ADVANCE
        self.cursor.advance();
        trace!("slot {} presented image {}", slot_index, image_index);

        Ok(if acquire_stale || present_stale {
            FrameOutcome::PresentedStale
        } else {
            FrameOutcome::Presented
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn record<D: PresentDevice + ?Sized>(
        &self,
        device: &D,
        cmd: vk::CommandBuffer,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        pipeline: &PipelineBinding,
        mesh: &MeshBinding,
        descriptor_set: Option<vk::DescriptorSet>,
    ) -> RenderResult<()> {
        let record_err = |code| RenderError::Record { code };

        device.reset_command_buffer(cmd).map_err(record_err)?;
        device.begin_command_buffer(cmd).map_err(record_err)?;

        device.cmd_begin_render_pass(
            cmd,
            &RenderPassBegin {
                render_pass: pipeline.render_pass,
                framebuffer,
                extent,
                clear: self.clear,
            },
        );
        device.cmd_bind_pipeline(cmd, pipeline.pipeline);
        device.cmd_set_viewport_and_scissor(cmd, extent);
        if let Some(set) = descriptor_set {
            device.cmd_bind_descriptor_set(cmd, pipeline.layout, set);
        }
        device.cmd_bind_vertex_buffer(cmd, mesh.vertex_buffer);
        match mesh.index {
            Some(index) => {
                device.cmd_bind_index_buffer(cmd, index.buffer, index.index_type);
                device.cmd_draw_indexed(cmd, index.count);
            }
            None => device.cmd_draw(cmd, mesh.vertex_count),
        }
        device.cmd_end_render_pass(cmd);

        device.end_command_buffer(cmd).map_err(record_err)
    }
}

fn clear_value(rgba: [f32; 4]) -> vk::ClearValue {
    vk::ClearValue {
        color: vk::ClearColorValue { float32: rgba },
    }
}
