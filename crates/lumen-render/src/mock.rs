// SPDX-License-Identifier: CEPL-1.0
//! Recording `PresentDevice` for tests.
//!
//! Hands out fresh handles, logs every call in order, and models fences as
//! signaled / unsignaled / pending. A pending fence completes when it is
//! waited on (unless the GPU is held) or on `wait_idle`. Waiting forever on a
//! fence that can never signal panics instead of hanging the test.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};

use ash::prelude::VkResult;
use ash::vk::{self, Handle};

use crate::device::{
    FrameSubmit, ImageSharing, PresentDevice, QueueFamilies, RenderPassBegin, SurfaceSupport,
    SwapchainDesc,
};
use crate::scheduler::{MeshBinding, PipelineBinding};
use crate::surface::{SurfaceConfig, EXTENT_FOLLOWS_WINDOW};
use crate::swapchain::SwapchainResourceSet;
use crate::{RenderSize, WindowSize};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    SurfaceSupport,
    CreateSwapchain {
        swapchain: u64,
        min_image_count: u32,
        sharing: ImageSharing,
        extent: vk::Extent2D,
        present_mode: vk::PresentModeKHR,
        old: u64,
    },
    SwapchainImages(u64),
    DestroySwapchain(u64),
    CreateImageView(u64),
    DestroyImageView(u64),
    CreateFramebuffer(u64),
    DestroyFramebuffer(u64),
    AllocateCommandBuffers(u32),
    FreeCommandBuffers(usize),
    CreateSemaphore(u64),
    DestroySemaphore(u64),
    CreateFence { fence: u64, signaled: bool },
    DestroyFence(u64),
    WaitFence(u64),
    ResetFence(u64),
    Acquire,
    ResetCommandBuffer(u64),
    BeginCommandBuffer(u64),
    EndCommandBuffer(u64),
    BeginRenderPass { framebuffer: u64 },
    EndRenderPass,
    BindPipeline(u64),
    SetViewportScissor(vk::Extent2D),
    BindDescriptorSet(u64),
    BindVertexBuffer(u64),
    BindIndexBuffer(u64),
    Draw(u32),
    DrawIndexed(u32),
    Submit { command_buffer: u64, fence: u64 },
    Present { image_index: u32, wait: u64 },
    WaitIdle,
}

impl Call {
    pub fn kind(&self) -> &'static str {
        match self {
            Call::SurfaceSupport => "surface_support",
            Call::CreateSwapchain { .. } => "create_swapchain",
            Call::SwapchainImages(_) => "swapchain_images",
            Call::DestroySwapchain(_) => "destroy_swapchain",
            Call::CreateImageView(_) => "create_view",
            Call::DestroyImageView(_) => "destroy_view",
            Call::CreateFramebuffer(_) => "create_framebuffer",
            Call::DestroyFramebuffer(_) => "destroy_framebuffer",
            Call::AllocateCommandBuffers(_) => "allocate_cmds",
            Call::FreeCommandBuffers(_) => "free_cmds",
            Call::CreateSemaphore(_) => "create_semaphore",
            Call::DestroySemaphore(_) => "destroy_semaphore",
            Call::CreateFence { .. } => "create_fence",
            Call::DestroyFence(_) => "destroy_fence",
            Call::WaitFence(_) => "wait_fence",
            Call::ResetFence(_) => "reset_fence",
            Call::Acquire => "acquire",
            Call::ResetCommandBuffer(_) => "reset_cmd",
            Call::BeginCommandBuffer(_) => "begin_cmd",
            Call::EndCommandBuffer(_) => "end_cmd",
            Call::BeginRenderPass { .. } => "begin_render_pass",
            Call::EndRenderPass => "end_render_pass",
            Call::BindPipeline(_) => "bind_pipeline",
            Call::SetViewportScissor(_) => "viewport_scissor",
            Call::BindDescriptorSet(_) => "bind_descriptor_set",
            Call::BindVertexBuffer(_) => "bind_vertex_buffer",
            Call::BindIndexBuffer(_) => "bind_index_buffer",
            Call::Draw(_) => "draw",
            Call::DrawIndexed(_) => "draw_indexed",
            Call::Submit { .. } => "submit",
            Call::Present { .. } => "present",
            Call::WaitIdle => "wait_idle",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FenceState {
    Signaled,
    Unsignaled,
    Pending,
}

/// Fails the `after`-th creation from now (0 = the next one), once.
#[derive(Clone, Copy, Debug)]
struct Failure {
    after: usize,
    code: vk::Result,
}

fn tick(slot: &mut Option<Failure>) -> Option<vk::Result> {
    let f = slot.as_mut()?;
    if f.after == 0 {
        let code = f.code;
        *slot = None;
        Some(code)
    } else {
        f.after -= 1;
        None
    }
}

#[derive(Default)]
struct State {
    next_handle: u64,
    calls: Vec<Call>,

    swapchains: HashMap<u64, u32>,
    views: HashSet<u64>,
    framebuffers: HashSet<u64>,
    semaphores: HashSet<u64>,
    command_buffers: HashSet<u64>,
    fences: HashMap<u64, FenceState>,

    in_flight: usize,
    max_in_flight: usize,
    hold_gpu: bool,
    last_submit: Option<FrameSubmit>,
    next_image: u32,

    acquire_script: VecDeque<VkResult<(u32, bool)>>,
    present_script: VecDeque<VkResult<bool>>,
    extent_script: VecDeque<vk::Extent2D>,

    fail_framebuffer: Option<Failure>,
    fail_fence: Option<Failure>,
    fail_end_cmd: Option<vk::Result>,
    fail_wait_idle: Option<vk::Result>,
}

impl State {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn complete(&mut self, fence: u64) {
        if let Some(state) = self.fences.get_mut(&fence) {
            if *state == FenceState::Pending {
                *state = FenceState::Signaled;
                self.in_flight -= 1;
            }
        }
    }
}

pub struct MockDevice {
    families: QueueFamilies,
    support: SurfaceSupport,
    image_count: u32,
    state: RefCell<State>,
}

impl MockDevice {
    /// Shared queue family, window-sized surface, three swapchain images.
    pub fn new() -> Self {
        Self::with_families(QueueFamilies {
            graphics: 0,
            present: 0,
        })
    }

    pub fn with_families(families: QueueFamilies) -> Self {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            current_extent: vk::Extent2D {
                width: EXTENT_FOLLOWS_WINDOW,
                height: EXTENT_FOLLOWS_WINDOW,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            max_image_array_layers: 1,
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            ..Default::default()
        };
        Self {
            families,
            support: SurfaceSupport {
                capabilities,
                formats: vec![vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                }],
                present_modes: vec![
                    vk::PresentModeKHR::FIFO,
                    vk::PresentModeKHR::MAILBOX,
                    vk::PresentModeKHR::IMMEDIATE,
                ],
            },
            image_count: 3,
            state: RefCell::new(State {
                next_handle: 0x1000,
                ..State::default()
            }),
        }
    }

    pub fn support(&self) -> SurfaceSupport {
        self.support.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn find_call(&self, pred: impl Fn(&Call) -> bool) -> Option<Call> {
        self.state.borrow().calls.iter().find(|c| pred(c)).cloned()
    }

    pub fn live_swapchains(&self) -> usize {
        self.state.borrow().swapchains.len()
    }

    pub fn live_views(&self) -> usize {
        self.state.borrow().views.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.state.borrow().framebuffers.len()
    }

    pub fn live_semaphores(&self) -> usize {
        self.state.borrow().semaphores.len()
    }

    pub fn live_fences(&self) -> usize {
        self.state.borrow().fences.len()
    }

    pub fn live_command_buffers(&self) -> usize {
        self.state.borrow().command_buffers.len()
    }

    /// Every handle this device created and nobody destroyed yet.
    pub fn live_handles(&self) -> usize {
        self.live_swapchains()
            + self.live_views()
            + self.live_framebuffers()
            + self.live_semaphores()
            + self.live_fences()
            + self.live_command_buffers()
    }

    pub fn fence_signaled(&self, fence: vk::Fence) -> bool {
        self.state.borrow().fences.get(&fence.as_raw()) == Some(&FenceState::Signaled)
    }

    /// Highest number of submissions simultaneously not yet fenced.
    pub fn max_in_flight(&self) -> usize {
        self.state.borrow().max_in_flight
    }

    pub fn last_submit(&self) -> Option<FrameSubmit> {
        self.state.borrow().last_submit
    }

    /// While held, waits on pending fences time out instead of completing.
    pub fn hold_gpu(&self, hold: bool) {
        self.state.borrow_mut().hold_gpu = hold;
    }

    pub fn script_acquire(&self, result: VkResult<(u32, bool)>) {
        self.state.borrow_mut().acquire_script.push_back(result);
    }

    pub fn script_present(&self, result: VkResult<bool>) {
        self.state.borrow_mut().present_script.push_back(result);
    }

    /// Fixed `current_extent`s for the next surface queries, after which the
    /// surface goes back to following the window.
    pub fn script_current_extents(&self, extents: &[(u32, u32)]) {
        let mut st = self.state.borrow_mut();
        st.extent_script.extend(
            extents
                .iter()
                .map(|&(width, height)| vk::Extent2D { width, height }),
        );
    }

    pub fn fail_framebuffer_after(&self, after: usize, code: vk::Result) {
        self.state.borrow_mut().fail_framebuffer = Some(Failure { after, code });
    }

    pub fn fail_fence_after(&self, after: usize, code: vk::Result) {
        self.state.borrow_mut().fail_fence = Some(Failure { after, code });
    }

    pub fn fail_end_command_buffer(&self, code: vk::Result) {
        self.state.borrow_mut().fail_end_cmd = Some(code);
    }

    pub fn fail_wait_idle(&self, code: vk::Result) {
        self.state.borrow_mut().fail_wait_idle = Some(code);
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl PresentDevice for MockDevice {
    fn queue_families(&self) -> QueueFamilies {
        self.families
    }

    fn surface_support(&self) -> VkResult<SurfaceSupport> {
        self.record(Call::SurfaceSupport);
        let mut support = self.support.clone();
        if let Some(extent) = self.state.borrow_mut().extent_script.pop_front() {
            support.capabilities.current_extent = extent;
        }
        Ok(support)
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        let mut st = self.state.borrow_mut();
        let h = st.handle();
        st.swapchains
            .insert(h, desc.min_image_count.max(self.image_count));
        st.calls.push(Call::CreateSwapchain {
            swapchain: h,
            min_image_count: desc.min_image_count,
            sharing: desc.sharing,
            extent: desc.extent,
            present_mode: desc.present_mode,
            old: desc.old_swapchain.as_raw(),
        });
        Ok(vk::SwapchainKHR::from_raw(h))
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::SwapchainImages(swapchain.as_raw()));
        let n = *st
            .swapchains
            .get(&swapchain.as_raw())
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)?;
        Ok((0..n)
            .map(|i| vk::Image::from_raw(swapchain.as_raw() * 0x100 + u64::from(i)))
            .collect())
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut st = self.state.borrow_mut();
        assert!(
            st.swapchains.remove(&swapchain.as_raw()).is_some(),
            "destroying unknown swapchain {swapchain:?}"
        );
        st.calls.push(Call::DestroySwapchain(swapchain.as_raw()));
    }

    fn create_image_view(&self, _image: vk::Image, _format: vk::Format) -> VkResult<vk::ImageView> {
        let mut st = self.state.borrow_mut();
        let h = st.handle();
        st.views.insert(h);
        st.calls.push(Call::CreateImageView(h));
        Ok(vk::ImageView::from_raw(h))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        let mut st = self.state.borrow_mut();
        assert!(st.views.remove(&view.as_raw()), "destroying unknown view");
        st.calls.push(Call::DestroyImageView(view.as_raw()));
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        view: vk::ImageView,
        _extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer> {
        let mut st = self.state.borrow_mut();
        assert!(
            st.views.contains(&view.as_raw()),
            "framebuffer over dead view"
        );
        if let Some(code) = tick(&mut st.fail_framebuffer) {
            return Err(code);
        }
        let h = st.handle();
        st.framebuffers.insert(h);
        st.calls.push(Call::CreateFramebuffer(h));
        Ok(vk::Framebuffer::from_raw(h))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        let mut st = self.state.borrow_mut();
        let raw = framebuffer.as_raw();
        assert!(
            st.framebuffers.remove(&raw),
            "destroying unknown framebuffer"
        );
        st.calls.push(Call::DestroyFramebuffer(raw));
    }

    fn allocate_command_buffers(
        &self,
        _pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::AllocateCommandBuffers(count));
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let h = st.handle();
            st.command_buffers.insert(h);
            out.push(vk::CommandBuffer::from_raw(h));
        }
        Ok(out)
    }

    fn free_command_buffers(&self, _pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        let mut st = self.state.borrow_mut();
        for b in buffers {
            assert!(
                st.command_buffers.remove(&b.as_raw()),
                "freeing unknown command buffer"
            );
        }
        st.calls.push(Call::FreeCommandBuffers(buffers.len()));
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        let mut st = self.state.borrow_mut();
        let h = st.handle();
        st.semaphores.insert(h);
        st.calls.push(Call::CreateSemaphore(h));
        Ok(vk::Semaphore::from_raw(h))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        let mut st = self.state.borrow_mut();
        let raw = semaphore.as_raw();
        assert!(st.semaphores.remove(&raw), "destroying unknown semaphore");
        st.calls.push(Call::DestroySemaphore(raw));
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let mut st = self.state.borrow_mut();
        if let Some(code) = tick(&mut st.fail_fence) {
            return Err(code);
        }
        let h = st.handle();
        let state = if signaled {
            FenceState::Signaled
        } else {
            FenceState::Unsignaled
        };
        st.fences.insert(h, state);
        st.calls.push(Call::CreateFence { fence: h, signaled });
        Ok(vk::Fence::from_raw(h))
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        let mut st = self.state.borrow_mut();
        let state = st.fences.remove(&fence.as_raw());
        assert!(state.is_some(), "destroying unknown fence");
        assert_ne!(
            state,
            Some(FenceState::Pending),
            "destroying a fence still in use"
        );
        st.calls.push(Call::DestroyFence(fence.as_raw()));
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> VkResult<()> {
        let mut st = self.state.borrow_mut();
        let raw = fence.as_raw();
        st.calls.push(Call::WaitFence(raw));
        let state = *st.fences.get(&raw).expect("waiting on unknown fence");
        match state {
            FenceState::Signaled => Ok(()),
            FenceState::Pending if !st.hold_gpu => {
                st.complete(raw);
                Ok(())
            }
            _ if timeout_ns == u64::MAX => {
                panic!("infinite wait on fence {raw:#x} that will never signal ({state:?})")
            }
            _ => Err(vk::Result::TIMEOUT),
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        let mut st = self.state.borrow_mut();
        let raw = fence.as_raw();
        st.calls.push(Call::ResetFence(raw));
        let state = st.fences.get_mut(&raw).expect("resetting unknown fence");
        assert_ne!(
            *state,
            FenceState::Pending,
            "resetting a fence still in use"
        );
        *state = FenceState::Unsignaled;
        Ok(())
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        _timeout_ns: u64,
        _signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::Acquire);
        if let Some(scripted) = st.acquire_script.pop_front() {
            return scripted;
        }
        let count = *st
            .swapchains
            .get(&swapchain.as_raw())
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)?;
        let index = st.next_image % count;
        st.next_image = st.next_image.wrapping_add(1);
        Ok((index, false))
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.record(Call::ResetCommandBuffer(cmd.as_raw()));
        Ok(())
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.record(Call::BeginCommandBuffer(cmd.as_raw()));
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::EndCommandBuffer(cmd.as_raw()));
        match st.fail_end_cmd.take() {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    fn cmd_begin_render_pass(&self, _cmd: vk::CommandBuffer, begin: &RenderPassBegin) {
        self.record(Call::BeginRenderPass {
            framebuffer: begin.framebuffer.as_raw(),
        });
    }

    fn cmd_end_render_pass(&self, _cmd: vk::CommandBuffer) {
        self.record(Call::EndRenderPass);
    }

    fn cmd_bind_pipeline(&self, _cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.record(Call::BindPipeline(pipeline.as_raw()));
    }

    fn cmd_set_viewport_and_scissor(&self, _cmd: vk::CommandBuffer, extent: vk::Extent2D) {
        self.record(Call::SetViewportScissor(extent));
    }

    fn cmd_bind_descriptor_set(
        &self,
        _cmd: vk::CommandBuffer,
        _layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    ) {
        self.record(Call::BindDescriptorSet(set.as_raw()));
    }

    fn cmd_bind_vertex_buffer(&self, _cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        self.record(Call::BindVertexBuffer(buffer.as_raw()));
    }

    fn cmd_bind_index_buffer(
        &self,
        _cmd: vk::CommandBuffer,
        buffer: vk::Buffer,
        _index_type: vk::IndexType,
    ) {
        self.record(Call::BindIndexBuffer(buffer.as_raw()));
    }

    fn cmd_draw(&self, _cmd: vk::CommandBuffer, vertex_count: u32) {
        self.record(Call::Draw(vertex_count));
    }

    fn cmd_draw_indexed(&self, _cmd: vk::CommandBuffer, index_count: u32) {
        self.record(Call::DrawIndexed(index_count));
    }

    fn queue_submit(&self, submit: &FrameSubmit) -> VkResult<()> {
        let mut st = self.state.borrow_mut();
        let fence = submit.fence.as_raw();
        st.calls.push(Call::Submit {
            command_buffer: submit.command_buffer.as_raw(),
            fence,
        });
        let state = st
            .fences
            .get_mut(&fence)
            .expect("submitting with unknown fence");
        assert_eq!(
            *state,
            FenceState::Unsignaled,
            "submit fence must be reset first"
        );
        *state = FenceState::Pending;
        st.in_flight += 1;
        st.max_in_flight = st.max_in_flight.max(st.in_flight);
        st.last_submit = Some(*submit);
        Ok(())
    }

    fn queue_present(
        &self,
        _swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::Present {
            image_index,
            wait: wait.as_raw(),
        });
        st.present_script.pop_front().unwrap_or(Ok(false))
    }

    fn wait_idle(&self) -> VkResult<()> {
        let mut st = self.state.borrow_mut();
        st.calls.push(Call::WaitIdle);
        if let Some(code) = st.fail_wait_idle.take() {
            return Err(code);
        }
        let pending: Vec<u64> = st
            .fences
            .iter()
            .filter(|(_, s)| **s == FenceState::Pending)
            .map(|(h, _)| *h)
            .collect();
        for fence in pending {
            st.complete(fence);
        }
        Ok(())
    }
}

/// Window whose framebuffer size is either fixed or replayed from a sequence.
pub struct MockWindow {
    sizes: RefCell<VecDeque<RenderSize>>,
    last: Cell<RenderSize>,
    polls: Cell<usize>,
}

impl MockWindow {
    pub fn fixed(width: u32, height: u32) -> Self {
        Self {
            sizes: RefCell::new(VecDeque::new()),
            last: Cell::new(RenderSize::new(width, height)),
            polls: Cell::new(0),
        }
    }

    /// Each size query returns the next entry; the last one sticks.
    pub fn sequence(sizes: &[(u32, u32)]) -> Self {
        let window = Self::fixed(0, 0);
        let queued = sizes.iter().map(|&(w, h)| RenderSize::new(w, h));
        window.sizes.borrow_mut().extend(queued);
        window
    }

    pub fn set_size(&self, width: u32, height: u32) {
        self.sizes.borrow_mut().clear();
        self.last.set(RenderSize::new(width, height));
    }

    /// How many times a caller waited for events.
    pub fn polls(&self) -> usize {
        self.polls.get()
    }
}

impl WindowSize for MockWindow {
    fn framebuffer_size(&self) -> RenderSize {
        if let Some(next) = self.sizes.borrow_mut().pop_front() {
            self.last.set(next);
        }
        self.last.get()
    }

    fn wait_events(&self) {
        self.polls.set(self.polls.get() + 1);
    }
}

pub fn pipeline() -> PipelineBinding {
    PipelineBinding {
        render_pass: vk::RenderPass::from_raw(0xBEEF),
        pipeline: vk::Pipeline::from_raw(0xF00D),
        layout: vk::PipelineLayout::from_raw(0xFACE),
    }
}

pub fn triangle() -> MeshBinding {
    MeshBinding {
        vertex_buffer: vk::Buffer::from_raw(0xB0),
        vertex_count: 3,
        index: None,
    }
}

/// An 800x600 FIFO swapchain over the device's default support.
pub fn build_swapchain(dev: &MockDevice) -> SwapchainResourceSet {
    let config = SurfaceConfig {
        format: vk::Format::B8G8R8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        present_mode: vk::PresentModeKHR::FIFO,
        extent: vk::Extent2D {
            width: 800,
            height: 600,
        },
    };
    SwapchainResourceSet::build(dev, &dev.support(), config, pipeline().render_pass, None)
        .expect("mock swapchain")
}
