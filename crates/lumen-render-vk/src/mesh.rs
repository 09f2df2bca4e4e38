// SPDX-License-Identifier: CEPL-1.0
//! Static mesh data and its device-local upload.

use std::mem::{offset_of, size_of};

use anyhow::{anyhow, Context, Result};
use ash::vk;
use bytemuck::{Pod, Zeroable};
use lumen_render::{IndexBinding, MeshBinding, MeshKind};
use tracing::debug;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 2],
    pub color: [f32; 3],
}

impl Vertex {
    pub const fn new(pos: [f32; 2], color: [f32; 3]) -> Self {
        Self { pos, color }
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Vertex, pos) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, color) as u32,
            },
        ]
    }
}

pub const TRIANGLE: [Vertex; 3] = [
    Vertex::new([0.0, -0.5], [1.0, 0.0, 0.0]),
    Vertex::new([0.5, 0.5], [0.0, 1.0, 0.0]),
    Vertex::new([-0.5, 0.5], [0.0, 0.0, 1.0]),
];

pub const QUAD: [Vertex; 4] = [
    Vertex::new([-0.5, -0.5], [1.0, 0.0, 0.0]),
    Vertex::new([0.5, -0.5], [0.0, 1.0, 0.0]),
    Vertex::new([0.5, 0.5], [0.0, 0.0, 1.0]),
    Vertex::new([-0.5, 0.5], [1.0, 1.0, 1.0]),
];

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// CPU-side mesh: vertices plus optional u16 indices.
#[derive(Clone, Copy, Debug)]
pub struct MeshData {
    pub vertices: &'static [Vertex],
    pub indices: Option<&'static [u16]>,
}

impl MeshData {
    pub fn for_kind(kind: MeshKind) -> Self {
        match kind {
            MeshKind::Triangle => Self {
                vertices: &TRIANGLE,
                indices: None,
            },
            MeshKind::Quad => Self {
                vertices: &QUAD,
                indices: Some(&QUAD_INDICES),
            },
        }
    }
}

/// First memory type allowed by `type_bits` that has every flag in `wanted`.
pub fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    wanted: vk::MemoryPropertyFlags,
) -> Result<u32> {
    (0..props.memory_type_count)
        .find(|&i| {
            type_bits & (1 << i) != 0
                && props.memory_types[i as usize].property_flags.contains(wanted)
        })
        .ok_or_else(|| anyhow!("no memory type for bits {:#b} with {:?}", type_bits, wanted))
}

/// A buffer and the memory bound to it.
#[derive(Clone, Copy, Debug)]
pub struct Allocation {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
}

impl Allocation {
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_buffer(self.buffer, None);
        device.free_memory(self.memory, None);
    }
}

pub unsafe fn create_buffer(
    device: &ash::Device,
    mem_props: &vk::PhysicalDeviceMemoryProperties,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    memory_flags: vk::MemoryPropertyFlags,
) -> Result<Allocation> {
    let info = vk::BufferCreateInfo {
        s_type: vk::StructureType::BUFFER_CREATE_INFO,
        size,
        usage,
        sharing_mode: vk::SharingMode::EXCLUSIVE,
        ..Default::default()
    };
    let buffer = device.create_buffer(&info, None).context("create_buffer")?;
    let req = device.get_buffer_memory_requirements(buffer);
    let memory_type_index = match find_memory_type(mem_props, req.memory_type_bits, memory_flags) {
        Ok(i) => i,
        Err(e) => {
            device.destroy_buffer(buffer, None);
            return Err(e);
        }
    };
    let alloc = vk::MemoryAllocateInfo {
        s_type: vk::StructureType::MEMORY_ALLOCATE_INFO,
        allocation_size: req.size,
        memory_type_index,
        ..Default::default()
    };
    let memory = match device.allocate_memory(&alloc, None) {
        Ok(m) => m,
        Err(e) => {
            device.destroy_buffer(buffer, None);
            return Err(e).context("allocate_memory");
        }
    };
    if let Err(e) = device.bind_buffer_memory(buffer, memory, 0) {
        device.destroy_buffer(buffer, None);
        device.free_memory(memory, None);
        return Err(e).context("bind_buffer_memory");
    }
    Ok(Allocation { buffer, memory })
}

/// Vertex and index buffers in device-local memory.
pub struct GpuMesh {
    vertices: Allocation,
    vertex_count: u32,
    indices: Option<(Allocation, u32)>,
}

impl GpuMesh {
    pub unsafe fn upload(
        device: &ash::Device,
        mem_props: &vk::PhysicalDeviceMemoryProperties,
        pool: vk::CommandPool,
        queue: vk::Queue,
        data: MeshData,
    ) -> Result<Self> {
        let vertices = upload_buffer(
            device,
            mem_props,
            pool,
            queue,
            bytemuck::cast_slice(data.vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )
        .context("vertex buffer upload")?;

        let indices = match data.indices {
            Some(idx) => {
                let upload = upload_buffer(
                    device,
                    mem_props,
                    pool,
                    queue,
                    bytemuck::cast_slice(idx),
                    vk::BufferUsageFlags::INDEX_BUFFER,
                );
                match upload {
                    Ok(a) => Some((a, idx.len() as u32)),
                    Err(e) => {
                        vertices.destroy(device);
                        return Err(e).context("index buffer upload");
                    }
                }
            }
            None => None,
        };

        debug!(
            "vk: mesh uploaded ({} vertices, {} indices)",
            data.vertices.len(),
            data.indices.map_or(0, |i| i.len())
        );
        Ok(Self {
            vertices,
            vertex_count: data.vertices.len() as u32,
            indices,
        })
    }

    pub fn binding(&self) -> MeshBinding {
        MeshBinding {
            vertex_buffer: self.vertices.buffer,
            vertex_count: self.vertex_count,
            index: self.indices.map(|(a, count)| IndexBinding {
                buffer: a.buffer,
                count,
                index_type: vk::IndexType::UINT16,
            }),
        }
    }

    /// The device must be idle.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        if let Some((a, _)) = self.indices {
            a.destroy(device);
        }
        self.vertices.destroy(device);
    }
}

/// Copies `bytes` into a new device-local buffer through a host-visible staging buffer.
unsafe fn upload_buffer(
    device: &ash::Device,
    mem_props: &vk::PhysicalDeviceMemoryProperties,
    pool: vk::CommandPool,
    queue: vk::Queue,
    bytes: &[u8],
    usage: vk::BufferUsageFlags,
) -> Result<Allocation> {
    let size = bytes.len() as vk::DeviceSize;
    let staging = create_buffer(
        device,
        mem_props,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )
    .context("staging buffer")?;

    let result = (|| -> Result<Allocation> {
        let ptr = device
            .map_memory(staging.memory, 0, size, vk::MemoryMapFlags::empty())
            .context("map_memory")?;
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
        device.unmap_memory(staging.memory);

        let dst = create_buffer(
            device,
            mem_props,
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        if let Err(e) = copy_once(device, pool, queue, staging.buffer, dst.buffer, size) {
            dst.destroy(device);
            return Err(e);
        }
        Ok(dst)
    })();

    staging.destroy(device);
    result
}

/// One-shot command buffer; waits for the queue before returning.
unsafe fn copy_once(
    device: &ash::Device,
    pool: vk::CommandPool,
    queue: vk::Queue,
    src: vk::Buffer,
    dst: vk::Buffer,
    size: vk::DeviceSize,
) -> Result<()> {
    let alloc_info = vk::CommandBufferAllocateInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
        command_pool: pool,
        level: vk::CommandBufferLevel::PRIMARY,
        command_buffer_count: 1,
        ..Default::default()
    };
    let cmd = device
        .allocate_command_buffers(&alloc_info)
        .context("allocate transfer command buffer")?[0];

    let result = (|| -> Result<()> {
        let begin = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            ..Default::default()
        };
        device.begin_command_buffer(cmd, &begin)?;
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        device.cmd_copy_buffer(cmd, src, dst, std::slice::from_ref(&region));
        device.end_command_buffer(cmd)?;

        let submit = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            command_buffer_count: 1,
            p_command_buffers: &cmd,
            ..Default::default()
        };
        device.queue_submit(queue, std::slice::from_ref(&submit), vk::Fence::null())?;
        device.queue_wait_idle(queue)?;
        Ok(())
    })();

    device.free_command_buffers(pool, std::slice::from_ref(&cmd));
    result.context("buffer copy")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_shader_inputs() {
        assert_eq!(size_of::<Vertex>(), 20);
        let attrs = Vertex::attribute_descriptions();
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[0].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(attrs[1].offset, 8);
        assert_eq!(attrs[1].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(Vertex::binding_description().stride, 20);
    }

    #[test]
    fn quad_indices_stay_in_range() {
        let quad = MeshData::for_kind(MeshKind::Quad);
        let idx = quad.indices.unwrap();
        assert_eq!(idx.len(), 6);
        assert!(idx.iter().all(|&i| (i as usize) < quad.vertices.len()));
        assert!(MeshData::for_kind(MeshKind::Triangle).indices.is_none());
    }

    #[test]
    fn triangles_wind_counter_clockwise() {
        let signed_area = |a: [f32; 2], b: [f32; 2], c: [f32; 2]| {
            (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
        };
        assert!(signed_area(TRIANGLE[0].pos, TRIANGLE[1].pos, TRIANGLE[2].pos) > 0.0);
        for tri in QUAD_INDICES.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| QUAD[i as usize].pos);
            assert!(signed_area(a, b, c) > 0.0);
        }
    }

    #[test]
    fn memory_type_respects_bits_and_flags() {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: 3,
            ..Default::default()
        };
        props.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        props.memory_types[1].property_flags =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        props.memory_types[2].property_flags = vk::MemoryPropertyFlags::HOST_VISIBLE;

        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(find_memory_type(&props, 0b111, host).unwrap(), 1);
        let visible = vk::MemoryPropertyFlags::HOST_VISIBLE;
        assert_eq!(find_memory_type(&props, 0b100, visible).unwrap(), 2);
        assert!(find_memory_type(&props, 0b101, host).is_err());
    }
}
