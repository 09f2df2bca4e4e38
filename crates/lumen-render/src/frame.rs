// SPDX-License-Identifier: CEPL-1.0
//! Fixed ring of frame-in-flight slots.
//!
//! Slots live for the whole process and are never rebuilt on resize. Each
//! fence starts signaled so the very first wait on a slot returns at once.

use ash::vk;
use tracing::debug;

use crate::device::PresentDevice;
use crate::error::{RenderError, RenderResult};

/// Per-slot uniform buffer and the descriptor set that points at it.
/// Owned by the backend that allocated them; the pool only hands them out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotUniform {
    pub buffer: vk::Buffer,
    pub descriptor_set: vk::DescriptorSet,
}

#[derive(Clone, Copy, Debug)]
pub struct FrameSlot {
    command_buffer: vk::CommandBuffer,
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
    uniform: Option<SlotUniform>,
}

impl FrameSlot {
    #[inline]
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    #[inline]
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available
    }

    #[inline]
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished
    }

    #[inline]
    pub fn in_flight(&self) -> vk::Fence {
        self.in_flight
    }

    #[inline]
    pub fn uniform(&self) -> Option<SlotUniform> {
        self.uniform
    }
}

#[derive(Debug)]
pub struct FrameSlotPool {
    command_pool: vk::CommandPool,
    slots: Vec<FrameSlot>,
}

impl FrameSlotPool {
    /// Allocates `n` command buffers from `command_pool` plus two semaphores
    /// and one signaled fence per slot.
    ///
    /// `command_pool` must allow individual buffer resets
    /// (`RESET_COMMAND_BUFFER`), since slots are recycled independently.
    pub fn create<D: PresentDevice + ?Sized>(
        device: &D,
        command_pool: vk::CommandPool,
        n: usize,
    ) -> RenderResult<Self> {
        if n == 0 {
            return Err(RenderError::NoFrameSlots);
        }

        let command_buffers = device
            .allocate_command_buffers(command_pool, n as u32)
            .map_err(RenderError::exhausted("command buffers"))?;

        let mut pool = Self {
            command_pool,
            slots: Vec::with_capacity(n),
        };
        for &command_buffer in &command_buffers {
            match create_sync(device) {
                Ok((image_available, render_finished, in_flight)) => pool.slots.push(FrameSlot {
                    command_buffer,
                    image_available,
                    render_finished,
                    in_flight,
                    uniform: None,
                }),
                Err(e) => {
                    pool.destroy_sync(device);
                    device.free_command_buffers(command_pool, &command_buffers);
                    return Err(e);
                }
            }
        }

        debug!("frame slot pool: {} slots", n);
        Ok(pool)
    }

    /// Hands each slot its uniform binding, in slot order.
    pub fn attach_uniforms(&mut self, uniforms: Vec<SlotUniform>) -> RenderResult<()> {
        if uniforms.len() != self.slots.len() {
            return Err(RenderError::UniformCountMismatch {
                slots: self.slots.len(),
                got: uniforms.len(),
            });
        }
        for (slot, u) in self.slots.iter_mut().zip(uniforms) {
            slot.uniform = Some(u);
        }
        Ok(())
    }

    /// Fences and semaphores first, then the command buffers.
    /// The device must be idle.
    pub fn destroy<D: PresentDevice + ?Sized>(mut self, device: &D) {
        self.destroy_sync(device);
        let buffers: Vec<_> = self.slots.iter().map(|s| s.command_buffer).collect();
        if !buffers.is_empty() {
            device.free_command_buffers(self.command_pool, &buffers);
        }
        self.slots.clear();
    }

    fn destroy_sync<D: PresentDevice + ?Sized>(&self, device: &D) {
        for s in &self.slots {
            device.destroy_fence(s.in_flight);
            device.destroy_semaphore(s.image_available);
            device.destroy_semaphore(s.render_finished);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> &FrameSlot {
        &self.slots[index]
    }

    pub fn fences(&self) -> Vec<vk::Fence> {
        self.slots.iter().map(|s| s.in_flight).collect()
    }
}

fn create_sync<D: PresentDevice + ?Sized>(
    device: &D,
) -> RenderResult<(vk::Semaphore, vk::Semaphore, vk::Fence)> {
    let image_available = device
        .create_semaphore()
        .map_err(RenderError::exhausted("semaphore"))?;
    let render_finished = match device.create_semaphore() {
        Ok(s) => s,
        Err(code) => {
            device.destroy_semaphore(image_available);
            return Err(RenderError::exhausted("semaphore")(code));
        }
    };
    match device.create_fence(true) {
        Ok(fence) => Ok((image_available, render_finished, fence)),
        Err(code) => {
            device.destroy_semaphore(render_finished);
            device.destroy_semaphore(image_available);
            Err(RenderError::exhausted("fence")(code))
        }
    }
}
