// Swapchain - Window presentation
//
// Thin helpers over the swapchain loader. Choosing the format, mode, extent
// and image count happens in `selection`; this only turns a `SwapchainDesc`
// into driver calls.

use ash::khr::swapchain;
use ash::prelude::VkResult;
use ash::vk;

use super::{FrameSubmit, SwapchainDesc};

pub fn create_swapchain(
    loader: &swapchain::Device,
    desc: &SwapchainDesc,
) -> VkResult<vk::SwapchainKHR> {
    let mut create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(desc.surface)
        .min_image_count(desc.image_count)
        .image_format(desc.format.format)
        .image_color_space(desc.format.color_space)
        .image_extent(desc.extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(desc.sharing_mode)
        .pre_transform(desc.pre_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(desc.present_mode)
        .clipped(true);

    if desc.sharing_mode == vk::SharingMode::CONCURRENT {
        create_info = create_info.queue_family_indices(&desc.queue_family_indices);
    }

    unsafe { loader.create_swapchain(&create_info, None) }
}

pub fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
) -> VkResult<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe { device.create_image_view(&create_info, None) }
}

/// Submit the frame's command buffer to `queue`
pub fn submit(device: &ash::Device, queue: vk::Queue, frame: &FrameSubmit) -> VkResult<()> {
    let wait_semaphores = [frame.wait];
    let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
    let command_buffers = [frame.command_buffer];
    let signal_semaphores = [frame.signal];

    let submit_info = vk::SubmitInfo::default()
        .wait_semaphores(&wait_semaphores) // Wait for image to be available
        .wait_dst_stage_mask(&wait_stages) // Which stage waits
        .command_buffers(&command_buffers)
        .signal_semaphores(&signal_semaphores); // Signal when done

    unsafe { device.queue_submit(queue, &[submit_info], frame.fence) }
}

/// Present rendered image to screen, returning the suboptimal flag
pub fn present(
    loader: &swapchain::Device,
    queue: vk::Queue,
    swapchain: vk::SwapchainKHR,
    image_index: u32,
    wait: vk::Semaphore,
) -> VkResult<bool> {
    let wait_semaphores = [wait];
    let swapchains = [swapchain];
    let image_indices = [image_index];

    let present_info = vk::PresentInfoKHR::default()
        .wait_semaphores(&wait_semaphores)
        .swapchains(&swapchains)
        .image_indices(&image_indices);

    unsafe { loader.queue_present(queue, &present_info) }
}
