// SPDX-License-Identifier: CEPL-1.0
//! Presentable surface negotiation: format, present mode and extent.

use ash::vk;
use tracing::debug;

use crate::config::VsyncMode;
use crate::device::SurfaceSupport;
use crate::error::{RenderError, RenderResult};
use crate::{RenderSize, WindowSize};

/// `current_extent.width` value meaning "the swapchain decides, follow the window".
pub const EXTENT_FOLLOWS_WINDOW: u32 = u32::MAX;

/// Negotiated swapchain parameters. Immutable until the next rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
}

impl SurfaceConfig {
    pub fn surface_format(&self) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format: self.format,
            color_space: self.color_space,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentPolicy {
    pub vsync: bool,
    pub mode: VsyncMode,
}

impl Default for PresentPolicy {
    fn default() -> Self {
        Self {
            vsync: true,
            mode: VsyncMode::Mailbox,
        }
    }
}

pub fn negotiate(
    support: &SurfaceSupport,
    policy: PresentPolicy,
    window: &dyn WindowSize,
) -> RenderResult<SurfaceConfig> {
    let format = choose_surface_format(&support.formats).ok_or_else(|| {
        RenderError::CapabilityQuery("surface reports no image formats".to_string())
    })?;
    let present_mode = choose_present_mode(&support.present_modes, policy);
    let extent = choose_extent(&support.capabilities, window);

    Ok(SurfaceConfig {
        format: format.format,
        color_space: format.color_space,
        present_mode,
        extent,
    })
}

/// 8-bit BGRA/RGBA with a non-linear sRGB color space, else the first entry.
/// `None` only for an empty list.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    const PREFERRED: [vk::Format; 4] = [
        vk::Format::B8G8R8A8_SRGB,
        vk::Format::R8G8B8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM,
        vk::Format::R8G8B8A8_UNORM,
    ];

    PREFERRED
        .iter()
        .find_map(|&want| {
            formats.iter().copied().find(|f| {
                f.format == want && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
        })
        .or_else(|| formats.first().copied())
}

pub fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    policy: PresentPolicy,
) -> vk::PresentModeKHR {
    let order: &[vk::PresentModeKHR] = if !policy.vsync {
        &[
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::FIFO,
        ]
    } else {
        match policy.mode {
            VsyncMode::Mailbox => &[vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO],
            VsyncMode::Fifo => &[vk::PresentModeKHR::FIFO],
        }
    };

    // FIFO is mandatory, so it is the answer even if the driver forgot to list it.
    order
        .iter()
        .copied()
        .find(|m| modes.contains(m))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, window: &dyn WindowSize) -> vk::Extent2D {
    if caps.current_extent.width != EXTENT_FOLLOWS_WINDOW {
        return caps.current_extent;
    }

    let size = wait_for_framebuffer(window);
    vk::Extent2D {
        width: size
            .width
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: size
            .height
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// Blocks until the window reports a non-zero framebuffer.
pub fn wait_for_framebuffer(window: &dyn WindowSize) -> RenderSize {
    let mut size = window.framebuffer_size();
    if size.is_zero_area() {
        debug!("framebuffer is {}x{}, waiting", size.width, size.height);
    }
    while size.is_zero_area() {
        window.wait_events();
        size = window.framebuffer_size();
    }
    size
}

/// One image above the surface minimum, capped at the maximum (0 = unbounded).
pub fn image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let want = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        want.min(caps.max_image_count)
    } else {
        want
    }
}

pub fn pre_transform(caps: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    if caps
        .supported_transforms
        .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
    {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        caps.current_transform
    }
}

pub fn format_name(f: vk::Format) -> &'static str {
    match f {
        vk::Format::B8G8R8A8_UNORM => "B8G8R8A8_UNORM",
        vk::Format::B8G8R8A8_SRGB => "B8G8R8A8_SRGB",
        vk::Format::R8G8B8A8_SRGB => "R8G8B8A8_SRGB",
        vk::Format::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
        vk::Format::A2B10G10R10_UNORM_PACK32 => "A2B10G10R10_UNORM",
        vk::Format::R16G16B16A16_SFLOAT => "R16G16B16A16_SFLOAT",
        _ => "OTHER",
    }
}

pub fn present_mode_name(m: vk::PresentModeKHR) -> &'static str {
    match m {
        vk::PresentModeKHR::FIFO => "FIFO",
        vk::PresentModeKHR::MAILBOX => "MAILBOX",
        vk::PresentModeKHR::IMMEDIATE => "IMMEDIATE",
        vk::PresentModeKHR::FIFO_RELAXED => "FIFO_RELAXED",
        _ => "OTHER",
    }
}
