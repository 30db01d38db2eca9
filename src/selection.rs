//! Device, queue family and swapchain parameter selection.
//!
//! The choosers are pure functions over what the surface reports. The device
//! selector queries through [`Driver`] so it can be exercised with a mock.

use ash::prelude::VkResult;
use ash::vk;
use std::ffi::CStr;

use crate::backend::Driver;
use crate::error::{Error, Result};

/// Device extensions every candidate GPU must support
pub const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];

/// Queue families resolved for a physical device. Both indices may be equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Distinct family indices, one queue is requested per entry
    pub fn unique(&self) -> Vec<u32> {
        if self.graphics == self.present {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }

    pub fn sharing_mode(&self) -> vk::SharingMode {
        if self.graphics == self.present {
            vk::SharingMode::EXCLUSIVE
        } else {
            vk::SharingMode::CONCURRENT
        }
    }
}

/// Lowest graphics-capable family and, independently, lowest family that can
/// present to the surface. First match wins for each.
pub fn find_queue_families(
    families: &[vk::QueueFamilyProperties],
    supports_present: impl Fn(u32) -> bool,
) -> std::result::Result<QueueFamilyIndices, &'static str> {
    let indices = || (0u32..).zip(families.iter());

    let graphics = indices()
        .find(|(_, props)| {
            props.queue_count > 0 && props.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        })
        .map(|(index, _)| index)
        .ok_or("graphics")?;

    let present = indices()
        .find(|&(index, props)| props.queue_count > 0 && supports_present(index))
        .map(|(index, _)| index)
        .ok_or("presentation")?;

    Ok(QueueFamilyIndices { graphics, present })
}

/// Prefer 8-bit BGRA sRGB, otherwise take whatever the surface lists first
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first().copied())
}

/// MAILBOX when available, otherwise FIFO (always supported)
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Surfaces that report `u32::MAX` let the window decide the extent
pub fn choose_extent(
    caps: &vk::SurfaceCapabilitiesKHR,
    drawable: vk::Extent2D,
) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: drawable
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: drawable
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// One more than the minimum, capped by the maximum (0 = unbounded)
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        desired.min(caps.max_image_count)
    } else {
        desired
    }
}

/// Everything known about the selected GPU
#[derive(Debug, Clone)]
pub struct SelectedDevice {
    pub physical_device: vk::PhysicalDevice,
    pub name: String,
    pub queue_families: QueueFamilyIndices,
}

fn supports_extensions(available: &[String], required: &[&CStr]) -> bool {
    required.iter().all(|req| {
        let req = req.to_string_lossy();
        available.iter().any(|ext| *ext == req)
    })
}

/// Outcome of checking one candidate GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Suitable(QueueFamilyIndices),
    /// Missing the extension, surface formats or present modes
    Unsuitable,
    /// Capable, but the named queue family could not be resolved
    MissingQueueFamily(&'static str),
}

fn evaluate_device<D: Driver>(
    driver: &D,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<Verdict> {
    let name = driver.device_name(physical_device);

    let extensions = driver
        .device_extensions(physical_device)
        .map_err(Error::driver("enumerate device extensions"))?;
    if !supports_extensions(&extensions, REQUIRED_DEVICE_EXTENSIONS) {
        log::debug!("Skipping {}: missing swapchain extension", name);
        return Ok(Verdict::Unsuitable);
    }

    // Only query surface support once the swapchain extension is known to exist
    let formats = driver
        .surface_formats(physical_device, surface)
        .map_err(Error::driver("query surface formats"))?;
    let modes = driver
        .present_modes(physical_device, surface)
        .map_err(Error::driver("query present modes"))?;
    if formats.is_empty() || modes.is_empty() {
        log::debug!(
            "Skipping {}: {} surface formats, {} present modes",
            name,
            formats.len(),
            modes.len()
        );
        return Ok(Verdict::Unsuitable);
    }

    let families = driver
        .queue_families(physical_device)
        .map_err(Error::driver("query queue families"))?;
    // A failed query is a driver error, not a family without present support
    let present_support = (0u32..)
        .take(families.len())
        .map(|index| driver.surface_support(physical_device, index, surface))
        .collect::<VkResult<Vec<bool>>>()
        .map_err(Error::driver("query surface support"))?;
    let indices = find_queue_families(&families, |index| present_support[index as usize]);

    match indices {
        Ok(indices) => Ok(Verdict::Suitable(indices)),
        Err(missing) => {
            log::debug!("Skipping {}: no {} queue family", name, missing);
            Ok(Verdict::MissingQueueFamily(missing))
        }
    }
}

/// Pick the first GPU with the swapchain extension, a non-empty format and
/// present-mode list for `surface`, and resolvable queue families.
///
/// If no GPU qualifies but one was only missing a queue family, that is
/// reported as `NoSuitableQueueFamily`.
pub fn pick_physical_device<D: Driver>(
    driver: &D,
    surface: vk::SurfaceKHR,
) -> Result<SelectedDevice> {
    let candidates = driver
        .physical_devices()
        .map_err(Error::driver("enumerate physical devices"))?;

    let mut queue_family_miss = None;
    for &physical_device in &candidates {
        match evaluate_device(driver, physical_device, surface)? {
            Verdict::Suitable(queue_families) => {
                let name = driver.device_name(physical_device);
                log::info!(
                    "Selected GPU: {} (graphics family {}, present family {})",
                    name,
                    queue_families.graphics,
                    queue_families.present
                );
                return Ok(SelectedDevice {
                    physical_device,
                    name,
                    queue_families,
                });
            }
            Verdict::MissingQueueFamily(what) => {
                queue_family_miss.get_or_insert(what);
            }
            Verdict::Unsuitable => {}
        }
    }

    match queue_family_miss {
        Some(what) => Err(Error::NoSuitableQueueFamily(what)),
        None => Err(Error::NoSuitableDevice(candidates.len())),
    }
}
