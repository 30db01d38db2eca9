// Synchronization primitives
//
// Binary semaphores order GPU work against the presentation engine; the fence
// lets the CPU wait for the previous frame.

use ash::prelude::VkResult;
use ash::vk;

pub fn create_semaphore(device: &ash::Device) -> VkResult<vk::Semaphore> {
    let semaphore_info = vk::SemaphoreCreateInfo::default();
    unsafe { device.create_semaphore(&semaphore_info, None) }
}

/// A signalled fence lets the very first frame pass its wait immediately
pub fn create_fence(device: &ash::Device, signaled: bool) -> VkResult<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };
    let fence_info = vk::FenceCreateInfo::default().flags(flags);
    unsafe { device.create_fence(&fence_info, None) }
}

pub fn wait_for_fence(device: &ash::Device, fence: vk::Fence, timeout_ns: u64) -> VkResult<()> {
    unsafe { device.wait_for_fences(&[fence], true, timeout_ns) }
}

pub fn reset_fence(device: &ash::Device, fence: vk::Fence) -> VkResult<()> {
    unsafe { device.reset_fences(&[fence]) }
}
