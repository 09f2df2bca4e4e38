// SPDX-License-Identifier: CEPL-1.0
//! The chain of presentable images, their views and framebuffers.
//!
//! Built and torn down as one unit. Handles are private and `teardown`
//! consumes the set, so framebuffers always go before views and views before
//! the swapchain.

use ash::vk;
use tracing::{error, info};

use crate::device::{ImageSharing, PresentDevice, SurfaceSupport, SwapchainDesc};
use crate::error::{RenderError, RenderResult};
use crate::surface::{self, SurfaceConfig};

/// One presentable image. The image itself belongs to the swapchain.
#[derive(Clone, Copy, Debug)]
pub struct PresentableImage {
    image: vk::Image,
    view: vk::ImageView,
    framebuffer: vk::Framebuffer,
}

impl PresentableImage {
    pub fn image(&self) -> vk::Image {
        self.image
    }

    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    pub fn framebuffer(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

#[derive(Debug)]
pub struct SwapchainResourceSet {
    swapchain: vk::SwapchainKHR,
    config: SurfaceConfig,
    images: Vec<PresentableImage>,
}

impl SwapchainResourceSet {
    /// Creates the swapchain, one view per image and one framebuffer per view.
    ///
    /// On failure everything created so far is destroyed before returning.
    pub fn build<D: PresentDevice + ?Sized>(
        device: &D,
        support: &SurfaceSupport,
        config: SurfaceConfig,
        render_pass: vk::RenderPass,
        old: Option<&SwapchainResourceSet>,
    ) -> RenderResult<Self> {
        let extent = config.extent;
        if extent.width == 0 || extent.height == 0 {
            return Err(RenderError::ZeroExtent {
                width: extent.width,
                height: extent.height,
            });
        }

        let caps = &support.capabilities;
        let sharing = ImageSharing::for_families(device.queue_families());
        let desc = SwapchainDesc {
            surface_format: config.surface_format(),
            present_mode: config.present_mode,
            extent,
            min_image_count: surface::image_count(caps),
            sharing,
            pre_transform: surface::pre_transform(caps),
            old_swapchain: old.map_or(vk::SwapchainKHR::null(), |o| o.swapchain),
        };

        let swapchain = device
            .create_swapchain(&desc)
            .map_err(RenderError::exhausted("swapchain"))?;

        let images = match device.swapchain_images(swapchain) {
            Ok(images) => images,
            Err(code) => {
                device.destroy_swapchain(swapchain);
                return Err(RenderError::exhausted("swapchain images")(code));
            }
        };

        let mut views = Vec::with_capacity(images.len());
        let mut framebuffers = Vec::with_capacity(images.len());
        if let Err(e) = create_attachments(
            device,
            &images,
            config.format,
            render_pass,
            extent,
            &mut views,
            &mut framebuffers,
        ) {
            destroy_in_order(device, swapchain, &framebuffers, &views);
            return Err(e);
        }

        info!(
            "swapchain built: {} / {:?}, {}, {}x{}, images min={} req={} got={}, sharing {:?}",
            surface::format_name(config.format),
            config.color_space,
            surface::present_mode_name(config.present_mode),
            extent.width,
            extent.height,
            caps.min_image_count,
            desc.min_image_count,
            images.len(),
            sharing,
        );

        let images = images
            .into_iter()
            .zip(views)
            .zip(framebuffers)
            .map(|((image, view), framebuffer)| PresentableImage {
                image,
                view,
                framebuffer,
            })
            .collect();

        Ok(Self {
            swapchain,
            config,
            images,
        })
    }

    /// Destroys framebuffers, then views, then the swapchain.
    ///
    /// The caller must have drained every submission that references these
    /// framebuffers (device idle).
    pub fn teardown<D: PresentDevice + ?Sized>(mut self, device: &D) {
        let images = std::mem::take(&mut self.images);
        let framebuffers: Vec<_> = images.iter().map(|i| i.framebuffer).collect();
        let views: Vec<_> = images.iter().map(|i| i.view).collect();
        destroy_in_order(device, self.swapchain, &framebuffers, &views);
        self.swapchain = vk::SwapchainKHR::null();
    }

    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.config.extent
    }

    pub fn format(&self) -> vk::Format {
        self.config.format
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn image(&self, index: u32) -> Option<&PresentableImage> {
        self.images.get(index as usize)
    }

    pub fn images(&self) -> &[PresentableImage] {
        &self.images
    }
}

impl Drop for SwapchainResourceSet {
    fn drop(&mut self) {
        if !self.images.is_empty() || self.swapchain != vk::SwapchainKHR::null() {
            error!(
                "swapchain resource set dropped without teardown, leaking {} framebuffers/views",
                self.images.len()
            );
        }
    }
}

fn create_attachments<D: PresentDevice + ?Sized>(
    device: &D,
    images: &[vk::Image],
    format: vk::Format,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
    views: &mut Vec<vk::ImageView>,
    framebuffers: &mut Vec<vk::Framebuffer>,
) -> RenderResult<()> {
    for &image in images {
        let view = device
            .create_image_view(image, format)
            .map_err(RenderError::exhausted("image view"))?;
        views.push(view);
    }
    for &view in views.iter() {
        let fb = device
            .create_framebuffer(render_pass, view, extent)
            .map_err(RenderError::exhausted("framebuffer"))?;
        framebuffers.push(fb);
    }
    Ok(())
}

fn destroy_in_order<D: PresentDevice + ?Sized>(
    device: &D,
    swapchain: vk::SwapchainKHR,
    framebuffers: &[vk::Framebuffer],
    views: &[vk::ImageView],
) {
    for &fb in framebuffers {
        device.destroy_framebuffer(fb);
    }
    for &view in views {
        device.destroy_image_view(view);
    }
    device.destroy_swapchain(swapchain);
}
