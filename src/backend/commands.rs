// Command pool and per-frame recording
//
// A single primary command buffer is reset and re-recorded every frame.

use ash::prelude::VkResult;
use ash::vk;

use super::DrawPass;

pub fn create_command_pool(device: &ash::Device, queue_family: u32) -> VkResult<vk::CommandPool> {
    let pool_info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(queue_family)
        // RESET: the buffer is re-recorded individually each frame
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

    unsafe { device.create_command_pool(&pool_info, None) }
}

pub fn allocate_command_buffer(
    device: &ash::Device,
    pool: vk::CommandPool,
) -> VkResult<vk::CommandBuffer> {
    let alloc_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let buffers = unsafe { device.allocate_command_buffers(&alloc_info) }?;
    buffers
        .into_iter()
        .next()
        .ok_or(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)
}

/// Reset `cmd` and record: begin pass, bind pipeline, draw 3 vertices, end pass
pub fn record_draw(device: &ash::Device, cmd: vk::CommandBuffer, pass: &DrawPass) -> VkResult<()> {
    let clear_values = [vk::ClearValue {
        color: vk::ClearColorValue {
            float32: pass.clear_color,
        },
    }];

    let render_area = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: pass.extent,
    };

    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: pass.extent.width as f32,
        height: pass.extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };

    let render_pass_info = vk::RenderPassBeginInfo::default()
        .render_pass(pass.render_pass)
        .framebuffer(pass.framebuffer)
        .render_area(render_area)
        .clear_values(&clear_values);

    unsafe {
        device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
        device.begin_command_buffer(cmd, &vk::CommandBufferBeginInfo::default())?;

        device.cmd_begin_render_pass(cmd, &render_pass_info, vk::SubpassContents::INLINE);
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pass.pipeline);
        device.cmd_set_viewport(cmd, 0, &[viewport]);
        device.cmd_set_scissor(cmd, 0, &[render_area]);
        // Vertex count 3, one instance; positions come from gl_VertexIndex
        device.cmd_draw(cmd, 3, 1, 0, 0);
        device.cmd_end_render_pass(cmd);

        device.end_command_buffer(cmd)
    }
}
