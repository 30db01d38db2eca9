// Backend module - Vulkan abstraction layer
//
// Design: the bring-up sequencer talks to the GPU only through `Driver`.
// `VulkanDriver` is the real implementation on top of ash; tests use a
// recording mock. Handles are plain `vk::*` values so both sides agree on
// identity without sharing any loader state.

use ash::prelude::VkResult;
use ash::vk;
use std::ffi::CStr;

pub mod commands;
pub mod device;
pub mod pipeline;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vulkan;

#[cfg(test)]
pub mod mock;

pub use vulkan::VulkanDriver;

/// Parameters for instance creation
#[derive(Debug, Clone, Copy)]
pub struct InstanceDesc<'a> {
    pub app_name: &'a str,
    pub layers: &'a [&'a CStr],
    /// Enable `VK_EXT_debug_utils` and chain the messenger into instance creation
    pub debug_messenger: bool,
}

/// Everything the driver needs to build a swapchain
#[derive(Debug, Clone)]
pub struct SwapchainDesc {
    pub surface: vk::SurfaceKHR,
    pub image_count: u32,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub sharing_mode: vk::SharingMode,
    /// Only consulted for `CONCURRENT` sharing
    pub queue_family_indices: Vec<u32>,
}

/// Fixed-function pipeline inputs. Viewport and scissor are dynamic state, so
/// the pipeline survives swapchain rebuilds.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDesc {
    pub render_pass: vk::RenderPass,
    pub layout: vk::PipelineLayout,
    pub vertex: vk::ShaderModule,
    pub fragment: vk::ShaderModule,
}

/// One recorded pass: clear, bind, draw three vertices
#[derive(Debug, Clone, Copy)]
pub struct DrawPass {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub pipeline: vk::Pipeline,
    pub extent: vk::Extent2D,
    pub clear_color: [f32; 4],
}

#[derive(Debug, Clone, Copy)]
pub struct FrameSubmit {
    pub command_buffer: vk::CommandBuffer,
    pub wait: vk::Semaphore,
    pub signal: vk::Semaphore,
    pub fence: vk::Fence,
}

/// The driver API as seen by the bring-up sequencer.
///
/// Creation calls return the raw error code; the caller attaches the step name.
/// Destroy calls never fail and must tolerate being called once per handle.
pub trait Driver {
    // ── windowing collaborator ──────────────────────────────────────────────
    /// Current drawable size of the window in pixels
    fn drawable_size(&self) -> vk::Extent2D;
    /// Release the window. Called last during teardown.
    fn close_window(&mut self);

    // ── instance level ──────────────────────────────────────────────────────
    fn available_layers(&self) -> VkResult<Vec<String>>;
    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<vk::Instance>;
    fn create_debug_messenger(&mut self) -> VkResult<vk::DebugUtilsMessengerEXT>;
    fn create_surface(&mut self) -> VkResult<vk::SurfaceKHR>;

    // ── physical device queries ─────────────────────────────────────────────
    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn device_name(&self, physical_device: vk::PhysicalDevice) -> String;
    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<Vec<String>>;
    fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>>;
    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;
    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;
    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;
    fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;

    // ── device level creation ───────────────────────────────────────────────
    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        queue_families: &[u32],
        extensions: &[&CStr],
    ) -> VkResult<vk::Device>;
    fn device_queue(&self, queue_family: u32) -> VkResult<vk::Queue>;
    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;
    fn create_image_view(&mut self, image: vk::Image, format: vk::Format)
        -> VkResult<vk::ImageView>;
    fn create_render_pass(&mut self, format: vk::Format) -> VkResult<vk::RenderPass>;
    fn create_shader_module(&mut self, code: &[u32]) -> VkResult<vk::ShaderModule>;
    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout>;
    fn create_graphics_pipeline(&mut self, desc: &PipelineDesc) -> VkResult<vk::Pipeline>;
    fn create_framebuffer(
        &mut self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer>;
    fn create_command_pool(&mut self, queue_family: u32) -> VkResult<vk::CommandPool>;
    fn allocate_command_buffer(&mut self, pool: vk::CommandPool) -> VkResult<vk::CommandBuffer>;
    fn create_semaphore(&mut self) -> VkResult<vk::Semaphore>;
    fn create_fence(&mut self, signaled: bool) -> VkResult<vk::Fence>;

    // ── per frame ───────────────────────────────────────────────────────────
    /// `Err(vk::Result::TIMEOUT)` when the timeout expires first
    fn wait_for_fence(&mut self, fence: vk::Fence, timeout_ns: u64) -> VkResult<()>;
    fn reset_fence(&mut self, fence: vk::Fence) -> VkResult<()>;
    /// Returns the image index and whether the swapchain is suboptimal
    fn acquire_next_image(
        &mut self,
        swapchain: vk::SwapchainKHR,
        timeout_ns: u64,
        signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)>;
    /// Reset `command_buffer` and record `pass` into it
    fn record_draw(&mut self, command_buffer: vk::CommandBuffer, pass: &DrawPass) -> VkResult<()>;
    fn submit(&mut self, queue: vk::Queue, submit: &FrameSubmit) -> VkResult<()>;
    /// Returns whether the swapchain is suboptimal
    fn present(
        &mut self,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool>;
    fn wait_idle(&mut self) -> VkResult<()>;

    // ── teardown ────────────────────────────────────────────────────────────
    fn destroy_semaphore(&mut self, semaphore: vk::Semaphore);
    fn destroy_fence(&mut self, fence: vk::Fence);
    fn destroy_command_pool(&mut self, pool: vk::CommandPool);
    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer);
    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline);
    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout);
    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass);
    fn destroy_shader_module(&mut self, module: vk::ShaderModule);
    fn destroy_image_view(&mut self, view: vk::ImageView);
    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR);
    fn destroy_device(&mut self, device: vk::Device);
    fn destroy_surface(&mut self, surface: vk::SurfaceKHR);
    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT);
    fn destroy_instance(&mut self, instance: vk::Instance);
}
