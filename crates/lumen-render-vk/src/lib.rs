// SPDX-License-Identifier: CEPL-1.0
//! Vulkan backend: ash bring-up around the backend-agnostic presentation engine.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use ash::vk;
use tracing::{debug, info, trace};

use lumen_render::surface::{choose_surface_format, format_name};
use lumen_render::{
    EngineSettings, FrameOutcome, FrameStats, PresentDevice, PresentPolicy, PresentationEngine,
    RenderSize, RenderWindow, Renderer, RendererConfig,
};

pub mod device;
pub mod instance;
pub mod mesh;
pub mod pipeline;
pub mod present;
pub mod uniforms;

use instance::VkContext;
use mesh::{GpuMesh, MeshData};
use pipeline::GraphicsPipeline;
use present::AshDevice;
use uniforms::FrameUniforms;

/// Everything created on top of the logical device.
struct DeviceResources {
    command_pool: vk::CommandPool,
    pipeline: GraphicsPipeline,
    mesh: GpuMesh,
    uniforms: FrameUniforms,
    engine: PresentationEngine,
}

pub struct VkRenderer {
    window: Arc<dyn RenderWindow>,
    cfg: RendererConfig,
    ctx: VkContext,
    device: AshDevice,
    res: DeviceResources,
    paused: bool,
    destroyed: bool,
}

impl VkRenderer {
    /// STRICT TEARDOWN ORDER:
    ///   1) engine: device idle, frame slots, swapchain set
    ///   2) uniforms, mesh buffers
    ///   3) pipeline, layouts, render pass
    ///   4) command pool
    ///   5) logical device
    ///   6) messenger, surface, instance
    fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let stats = self.res.engine.stats();
        unsafe {
            destroy_resources(&self.device, &mut self.res);
            self.device.destroy();
            self.ctx.destroy();
        }
        info!(
            "vk: renderer destroyed ({} presented, {} skipped, {} rebuilds)",
            stats.presented, stats.skipped, stats.recreations
        );
    }
}

impl Drop for VkRenderer {
    fn drop(&mut self) {
        self.teardown();
    }
}

unsafe fn destroy_resources(device: &AshDevice, res: &mut DeviceResources) {
    res.engine.teardown(device);
    let d = device.raw();
    res.uniforms.destroy(d);
    res.mesh.destroy(d);
    res.pipeline.destroy(d);
    d.destroy_command_pool(res.command_pool, None);
}

unsafe fn create_command_pool(device: &ash::Device, family: u32) -> Result<vk::CommandPool> {
    // Frame slots reset their own command buffers.
    let info = vk::CommandPoolCreateInfo {
        s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
        flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        queue_family_index: family,
        ..Default::default()
    };
    Ok(device.create_command_pool(&info, None)?)
}

/// Builds everything above the device. On failure every object created so far
/// is destroyed before returning.
unsafe fn build_resources(
    device: &AshDevice,
    mem_props: &vk::PhysicalDeviceMemoryProperties,
    window: &dyn RenderWindow,
    cfg: &RendererConfig,
) -> Result<DeviceResources> {
    let d = device.raw();
    let support = device
        .surface_support()
        .map_err(|code| anyhow!("surface capability query failed: {:?}", code))?;
    let format = choose_surface_format(&support.formats)
        .ok_or_else(|| anyhow!("surface reports no formats"))?;

    let command_pool = create_command_pool(d, device.queue_families().graphics)
        .context("create_command_pool")?;

    let pipeline = match GraphicsPipeline::new(d, format.format) {
        Ok(p) => p,
        Err(e) => {
            d.destroy_command_pool(command_pool, None);
            return Err(e);
        }
    };

    let mesh = match GpuMesh::upload(
        d,
        mem_props,
        command_pool,
        device.graphics_queue(),
        MeshData::for_kind(cfg.mesh),
    ) {
        Ok(m) => m,
        Err(e) => {
            pipeline.destroy(d);
            d.destroy_command_pool(command_pool, None);
            return Err(e);
        }
    };

    let settings = EngineSettings::from(cfg);
    let mut uniforms =
        match FrameUniforms::new(d, mem_props, pipeline.set_layout, settings.frames_in_flight) {
            Ok(u) => u,
            Err(e) => {
                mesh.destroy(d);
                pipeline.destroy(d);
                d.destroy_command_pool(command_pool, None);
                return Err(e);
            }
        };

    let engine = PresentationEngine::init(
        device,
        window.as_window_size(),
        pipeline.binding(),
        command_pool,
        settings,
    );
    let mut engine = match engine {
        Ok(e) => e,
        Err(e) => {
            uniforms.destroy(d);
            mesh.destroy(d);
            pipeline.destroy(d);
            d.destroy_command_pool(command_pool, None);
            return Err(e).context("presentation engine init");
        }
    };

    let mut res = DeviceResources {
        command_pool,
        pipeline,
        mesh,
        uniforms,
        engine,
    };
    if let Err(e) = res.engine.attach_uniforms(res.uniforms.slot_uniforms()) {
        destroy_resources(device, &mut res);
        return Err(e).context("attach uniforms");
    }
    Ok(res)
}

unsafe fn build_renderer(
    window: Arc<dyn RenderWindow>,
    cfg: &RendererConfig,
) -> Result<VkRenderer> {
    let mut ctx = VkContext::new(&*window, cfg.validation)?;

    let selected = match device::select_physical_device(&ctx) {
        Ok(s) => s,
        Err(e) => {
            ctx.destroy();
            return Err(e);
        }
    };
    let logical = device::create_logical_device(&ctx, &selected);
    let (raw, graphics_queue, present_queue) = match logical {
        Ok(v) => v,
        Err(e) => {
            ctx.destroy();
            return Err(e);
        }
    };
    let mut device = AshDevice::new(
        ctx.instance(),
        raw,
        ctx.surface_loader().clone(),
        ctx.surface(),
        selected.phys,
        selected.families,
        graphics_queue,
        present_queue,
    );

    let mem_props = ctx
        .instance()
        .get_physical_device_memory_properties(selected.phys);
    let res = match build_resources(&device, &mem_props, &*window, cfg) {
        Ok(r) => r,
        Err(e) => {
            device.destroy();
            ctx.destroy();
            return Err(e);
        }
    };

    if let Some(sc) = res.engine.swapchain() {
        let c = sc.config();
        info!(
            "vk: ready on {} ({}x{}, {}, {} images, {} in flight)",
            selected.name,
            c.extent.width,
            c.extent.height,
            format_name(c.format),
            sc.len(),
            res.engine.frames_in_flight()
        );
    }

    Ok(VkRenderer {
        window,
        cfg: cfg.clone(),
        ctx,
        device,
        res,
        paused: false,
        destroyed: false,
    })
}

impl Renderer for VkRenderer {
    fn new(window: Arc<dyn RenderWindow>, cfg: &RendererConfig) -> Result<Self> {
        unsafe { build_renderer(window, cfg) }
    }

    fn resize(&mut self, size: RenderSize) -> Result<()> {
        if size.is_zero_area() {
            if !self.paused {
                debug!("vk: zero-area window, drawing paused");
            }
            self.paused = true;
            return Ok(());
        }
        if self.paused {
            debug!("vk: drawing resumed at {}x{}", size.width, size.height);
        }
        self.paused = false;
        self.res.engine.notify_resized();
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        if self.paused || self.destroyed {
            return Ok(());
        }
        let mesh = self.res.mesh.binding();
        let window = self.window.as_window_size();
        let outcome = self
            .res
            .engine
            .draw_frame(&self.device, window, &mesh, Some(&mut self.res.uniforms))
            .context("draw_frame")?;
        if outcome != FrameOutcome::Presented {
            trace!("vk: frame outcome {:?}", outcome);
        }
        Ok(())
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.cfg.clear_color = rgba;
        self.res.engine.set_clear_color(rgba);
    }

    fn set_vsync(&mut self, on: bool) {
        self.cfg.vsync = on;
        self.res.engine.set_present_policy(PresentPolicy {
            vsync: on,
            mode: self.cfg.vsync_mode,
        });
    }

    fn stats(&self) -> FrameStats {
        self.res.engine.stats()
    }
}
