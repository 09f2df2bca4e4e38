// SPDX-License-Identifier: CEPL-1.0
//! Physical device selection and logical device creation.

use std::ffi::CStr;

use anyhow::{anyhow, Context, Result};
use ash::khr::swapchain;
use ash::vk;
use lumen_render::QueueFamilies;
use tracing::{debug, info};

use crate::instance::VkContext;

pub struct SelectedDevice {
    pub phys: vk::PhysicalDevice,
    pub families: QueueFamilies,
    pub name: String,
}

/// First device with swapchain support, a graphics family, a family that can
/// present to the surface, and at least one surface format and present mode.
pub unsafe fn select_physical_device(ctx: &VkContext) -> Result<SelectedDevice> {
    let instance = ctx.instance();
    let surf = ctx.surface_loader();
    let surface = ctx.surface();

    for phys in instance
        .enumerate_physical_devices()
        .context("enumerate_physical_devices")?
    {
        let props = instance.get_physical_device_properties(phys);
        let name = CStr::from_ptr(props.device_name.as_ptr())
            .to_string_lossy()
            .into_owned();

        let exts = instance
            .enumerate_device_extension_properties(phys)
            .unwrap_or_default();
        let has_swapchain = exts
            .iter()
            .any(|e| CStr::from_ptr(e.extension_name.as_ptr()) == swapchain::NAME);
        if !has_swapchain {
            debug!("vk: skipping {name}: no {:?}", swapchain::NAME);
            continue;
        }

        let qprops = instance.get_physical_device_queue_family_properties(phys);
        let families = pick_families(&qprops, |i| {
            surf.get_physical_device_surface_support(phys, i, surface)
                .unwrap_or(false)
        });
        let Some(families) = families else {
            debug!("vk: skipping {name}: no graphics/present queue family");
            continue;
        };

        let formats = surf
            .get_physical_device_surface_formats(phys, surface)
            .unwrap_or_default();
        let modes = surf
            .get_physical_device_surface_present_modes(phys, surface)
            .unwrap_or_default();
        if formats.is_empty() || modes.is_empty() {
            debug!("vk: skipping {name}: surface reports no formats or present modes");
            continue;
        }

        info!(
            "vk: using {name} (graphics family {}, present family {})",
            families.graphics, families.present
        );
        return Ok(SelectedDevice {
            phys,
            families,
            name,
        });
    }
    Err(anyhow!("no suitable physical device for this surface"))
}

/// Graphics and present family indices, preferring one family that does both.
pub(crate) fn pick_families(
    props: &[vk::QueueFamilyProperties],
    can_present: impl Fn(u32) -> bool,
) -> Option<QueueFamilies> {
    let mut graphics = None;
    let mut present = None;
    for (i, q) in props.iter().enumerate() {
        let i = i as u32;
        let is_graphics = q.queue_count > 0 && q.queue_flags.contains(vk::QueueFlags::GRAPHICS);
        let presents = can_present(i);
        if is_graphics && presents {
            return Some(QueueFamilies {
                graphics: i,
                present: i,
            });
        }
        if is_graphics && graphics.is_none() {
            graphics = Some(i);
        }
        if presents && present.is_none() {
            present = Some(i);
        }
    }
    Some(QueueFamilies {
        graphics: graphics?,
        present: present?,
    })
}

/// One queue per distinct family.
pub(crate) fn unique_families(families: QueueFamilies) -> Vec<u32> {
    if families.is_shared() {
        vec![families.graphics]
    } else {
        vec![families.graphics, families.present]
    }
}

/// Returns the device plus its graphics and present queues (possibly the same queue).
pub unsafe fn create_logical_device(
    ctx: &VkContext,
    selected: &SelectedDevice,
) -> Result<(ash::Device, vk::Queue, vk::Queue)> {
    let priorities = [1.0_f32];
    let queue_infos: Vec<_> = unique_families(selected.families)
        .into_iter()
        .map(|family| vk::DeviceQueueCreateInfo {
            s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
            queue_family_index: family,
            queue_count: 1,
            p_queue_priorities: priorities.as_ptr(),
            ..Default::default()
        })
        .collect();

    let device_exts = [swapchain::NAME.as_ptr()];
    let features = vk::PhysicalDeviceFeatures::default();
    let dinfo = vk::DeviceCreateInfo {
        s_type: vk::StructureType::DEVICE_CREATE_INFO,
        queue_create_info_count: queue_infos.len() as u32,
        p_queue_create_infos: queue_infos.as_ptr(),
        enabled_extension_count: device_exts.len() as u32,
        pp_enabled_extension_names: device_exts.as_ptr(),
        p_enabled_features: &features,
        ..Default::default()
    };

    let device = ctx
        .instance()
        .create_device(selected.phys, &dinfo, None)
        .context("create_device")?;
    let graphics = device.get_device_queue(selected.families.graphics, 0);
    let present = device.get_device_queue(selected.families.present, 0);
    Ok((device, graphics, present))
}
