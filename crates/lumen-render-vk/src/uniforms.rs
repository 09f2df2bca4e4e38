// SPDX-License-Identifier: CEPL-1.0
//! Per-slot camera uniforms: one persistently mapped buffer and descriptor set per frame slot.

use std::ffi::c_void;
use std::mem::size_of;
use std::time::Instant;

use anyhow::{Context, Result};
use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use lumen_render::{SlotUniform, UniformWriter};

use crate::mesh::{create_buffer, Allocation};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CameraUbo {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

impl CameraUbo {
    /// Mesh spinning about +Z at 90°/s, seen from (2, 2, 2).
    pub fn at(seconds: f32, extent: vk::Extent2D) -> Self {
        let aspect = if extent.height == 0 {
            1.0
        } else {
            extent.width as f32 / extent.height as f32
        };
        let mut proj = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 10.0);
        // Vulkan clip space has Y pointing down.
        proj.y_axis.y *= -1.0;
        Self {
            model: Mat4::from_rotation_z(seconds * 90f32.to_radians()),
            view: Mat4::look_at_rh(Vec3::splat(2.0), Vec3::ZERO, Vec3::Z),
            proj,
        }
    }
}

pub struct FrameUniforms {
    pool: vk::DescriptorPool,
    sets: Vec<vk::DescriptorSet>,
    buffers: Vec<Allocation>,
    mapped: Vec<*mut c_void>,
    start: Instant,
}

impl FrameUniforms {
    pub unsafe fn new(
        device: &ash::Device,
        mem_props: &vk::PhysicalDeviceMemoryProperties,
        set_layout: vk::DescriptorSetLayout,
        slots: usize,
    ) -> Result<Self> {
        let pool_size = vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: slots as u32,
        };
        let pool_info = vk::DescriptorPoolCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_POOL_CREATE_INFO,
            max_sets: slots as u32,
            pool_size_count: 1,
            p_pool_sizes: &pool_size,
            ..Default::default()
        };
        let pool = device
            .create_descriptor_pool(&pool_info, None)
            .context("create_descriptor_pool")?;

        let mut out = Self {
            pool,
            sets: Vec::new(),
            buffers: Vec::with_capacity(slots),
            mapped: Vec::with_capacity(slots),
            start: Instant::now(),
        };
        if let Err(e) = out.populate(device, mem_props, set_layout, slots) {
            out.destroy(device);
            return Err(e);
        }
        Ok(out)
    }

    unsafe fn populate(
        &mut self,
        device: &ash::Device,
        mem_props: &vk::PhysicalDeviceMemoryProperties,
        set_layout: vk::DescriptorSetLayout,
        slots: usize,
    ) -> Result<()> {
        let size = size_of::<CameraUbo>() as vk::DeviceSize;
        for _ in 0..slots {
            let alloc = create_buffer(
                device,
                mem_props,
                size,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )
            .context("uniform buffer")?;
            self.buffers.push(alloc);
            let ptr = device
                .map_memory(alloc.memory, 0, size, vk::MemoryMapFlags::empty())
                .context("map uniform buffer")?;
            self.mapped.push(ptr);
        }

        let layouts = vec![set_layout; slots];
        let alloc_info = vk::DescriptorSetAllocateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO,
            descriptor_pool: self.pool,
            descriptor_set_count: layouts.len() as u32,
            p_set_layouts: layouts.as_ptr(),
            ..Default::default()
        };
        self.sets = device
            .allocate_descriptor_sets(&alloc_info)
            .context("allocate_descriptor_sets")?;

        for (set, alloc) in self.sets.iter().zip(&self.buffers) {
            let info = vk::DescriptorBufferInfo {
                buffer: alloc.buffer,
                offset: 0,
                range: size,
            };
            let write = vk::WriteDescriptorSet {
                s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
                dst_set: *set,
                dst_binding: 0,
                descriptor_count: 1,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                p_buffer_info: &info,
                ..Default::default()
            };
            device.update_descriptor_sets(std::slice::from_ref(&write), &[]);
        }
        Ok(())
    }

    /// Handles to attach to the frame slots, in slot order.
    pub fn slot_uniforms(&self) -> Vec<SlotUniform> {
        self.buffers
            .iter()
            .zip(&self.sets)
            .map(|(a, &descriptor_set)| SlotUniform {
                buffer: a.buffer,
                descriptor_set,
            })
            .collect()
    }

    /// Sets go with the pool. The device must be idle.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        for (i, a) in self.buffers.drain(..).enumerate() {
            if i < self.mapped.len() {
                device.unmap_memory(a.memory);
            }
            a.destroy(device);
        }
        self.mapped.clear();
        self.sets.clear();
        device.destroy_descriptor_pool(self.pool, None);
        self.pool = vk::DescriptorPool::null();
    }
}

impl UniformWriter for FrameUniforms {
    fn write(&mut self, slot: usize, extent: vk::Extent2D) {
        let Some(&ptr) = self.mapped.get(slot) else {
            return;
        };
        let ubo = CameraUbo::at(self.start.elapsed().as_secs_f32(), extent);
        let bytes = bytemuck::bytes_of(&ubo);
        // The slot's fence has signaled, so the GPU is no longer reading this buffer.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn ubo_is_three_packed_matrices() {
        assert_eq!(size_of::<CameraUbo>(), 3 * 64);
    }

    #[test]
    fn projection_flips_y() {
        let ubo = CameraUbo::at(0.0, extent(800, 600));
        assert!(ubo.proj.y_axis.y < 0.0);
        // A point straight above the origin lands in the upper half of the framebuffer.
        let clip = ubo.proj * ubo.view * Vec4::new(0.0, 0.0, 0.5, 1.0);
        assert!(clip.y / clip.w < 0.0);
    }

    #[test]
    fn aspect_follows_extent() {
        let wide = CameraUbo::at(0.0, extent(1600, 800));
        let square = CameraUbo::at(0.0, extent(800, 800));
        let ratio = square.proj.x_axis.x / wide.proj.x_axis.x;
        assert!((ratio - 2.0).abs() < 1e-5);
        // Zero height falls back to square instead of dividing by zero.
        let degenerate = CameraUbo::at(0.0, extent(800, 0));
        assert!(degenerate.proj.x_axis.x.is_finite());
        assert!((degenerate.proj.x_axis.x - square.proj.x_axis.x).abs() < 1e-6);
    }

    #[test]
    fn model_rotates_quarter_turn_per_second() {
        let ubo = CameraUbo::at(1.0, extent(800, 600));
        let p = ubo.model.transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::Y, 1e-5));
        assert_eq!(CameraUbo::at(0.0, extent(1, 1)).model, Mat4::IDENTITY);
    }
}
