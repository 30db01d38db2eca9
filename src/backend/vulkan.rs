// Real driver on top of ash + ash-window
//
// Owns the loader objects (entry, instance, device, extension loaders) and
// the winit window. The sequencer only ever sees raw handles; this type maps
// them back onto the loader calls in the sibling modules.

use ash::ext::debug_utils;
use ash::khr::{surface, swapchain};
use ash::prelude::VkResult;
use ash::{vk, Entry};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use std::ffi::CStr;
use std::sync::Arc;
use winit::window::Window;

use super::{
    commands, device, pipeline, shader, swapchain as swapchain_ops, sync, Driver, DrawPass,
    FrameSubmit, InstanceDesc, PipelineDesc, SwapchainDesc,
};
use crate::error::{Error, Result};

const NOT_READY: vk::Result = vk::Result::ERROR_INITIALIZATION_FAILED;

pub struct VulkanDriver {
    entry: Entry,
    window: Option<Arc<Window>>,
    display_handle: RawDisplayHandle,
    window_handle: RawWindowHandle,

    instance: Option<ash::Instance>,
    debug_utils: Option<debug_utils::Instance>,
    surface_loader: Option<surface::Instance>,
    device: Option<ash::Device>,
    swapchain_loader: Option<swapchain::Device>,
}

impl VulkanDriver {
    /// Load the Vulkan library and capture the window's native handles
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let entry = unsafe { Entry::load() }.map_err(|e| {
            Error::EnvironmentInit(format!("failed to load Vulkan library: {e}"))
        })?;

        let display_handle = window
            .display_handle()
            .map_err(|e| Error::EnvironmentInit(format!("no display handle: {e}")))?
            .as_raw();
        let window_handle = window
            .window_handle()
            .map_err(|e| Error::EnvironmentInit(format!("no window handle: {e}")))?
            .as_raw();

        Ok(Self {
            entry,
            window: Some(window),
            display_handle,
            window_handle,
            instance: None,
            debug_utils: None,
            surface_loader: None,
            device: None,
            swapchain_loader: None,
        })
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    fn instance(&self) -> VkResult<&ash::Instance> {
        self.instance.as_ref().ok_or(NOT_READY)
    }

    fn surface_loader(&self) -> VkResult<&surface::Instance> {
        self.surface_loader.as_ref().ok_or(NOT_READY)
    }

    fn device(&self) -> VkResult<&ash::Device> {
        self.device.as_ref().ok_or(NOT_READY)
    }

    fn swapchain_loader(&self) -> VkResult<&swapchain::Device> {
        self.swapchain_loader.as_ref().ok_or(NOT_READY)
    }

    /// Run `f` against the logical device if it still exists
    fn with_device(&self, f: impl FnOnce(&ash::Device)) {
        if let Some(device) = &self.device {
            f(device);
        }
    }
}

impl Driver for VulkanDriver {
    fn drawable_size(&self) -> vk::Extent2D {
        self.window
            .as_ref()
            .map(|window| {
                let size = window.inner_size();
                vk::Extent2D {
                    width: size.width,
                    height: size.height,
                }
            })
            .unwrap_or_default()
    }

    fn close_window(&mut self) {
        self.window = None;
    }

    fn available_layers(&self) -> VkResult<Vec<String>> {
        device::available_layers(&self.entry)
    }

    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<vk::Instance> {
        let window_extensions = ash_window::enumerate_required_extensions(self.display_handle)?;
        let instance = device::create_instance(
            &self.entry,
            desc.app_name,
            window_extensions,
            desc.layers,
            desc.debug_messenger,
        )?;

        let handle = instance.handle();
        self.surface_loader = Some(surface::Instance::new(&self.entry, &instance));
        if desc.debug_messenger {
            self.debug_utils = Some(debug_utils::Instance::new(&self.entry, &instance));
        }
        self.instance = Some(instance);
        Ok(handle)
    }

    fn create_debug_messenger(&mut self) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let loader = self
            .debug_utils
            .as_ref()
            .ok_or(vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;
        device::setup_debug_messenger(loader)
    }

    fn create_surface(&mut self) -> VkResult<vk::SurfaceKHR> {
        let instance = self.instance()?;
        unsafe {
            ash_window::create_surface(
                &self.entry,
                instance,
                self.display_handle,
                self.window_handle,
                None,
            )
        }
    }

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance()?.enumerate_physical_devices() }
    }

    fn device_name(&self, physical_device: vk::PhysicalDevice) -> String {
        match self.instance() {
            Ok(instance) => device::device_name(instance, physical_device),
            Err(_) => String::new(),
        }
    }

    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        device::device_extensions(self.instance()?, physical_device)
    }

    fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        let instance = self.instance()?;
        Ok(unsafe { instance.get_physical_device_queue_family_properties(physical_device) })
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_support(physical_device, queue_family, surface)
        }
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_capabilities(physical_device, surface)
        }
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_formats(physical_device, surface)
        }
    }

    fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_present_modes(physical_device, surface)
        }
    }

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        queue_families: &[u32],
        extensions: &[&CStr],
    ) -> VkResult<vk::Device> {
        let instance = self.instance()?;
        let device =
            device::create_logical_device(instance, physical_device, queue_families, extensions)?;

        let handle = device.handle();
        self.swapchain_loader = Some(swapchain::Device::new(instance, &device));
        self.device = Some(device);
        Ok(handle)
    }

    fn device_queue(&self, queue_family: u32) -> VkResult<vk::Queue> {
        Ok(unsafe { self.device()?.get_device_queue(queue_family, 0) })
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        swapchain_ops::create_swapchain(self.swapchain_loader()?, desc)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        unsafe { self.swapchain_loader()?.get_swapchain_images(swapchain) }
    }

    fn create_image_view(
        &mut self,
        image: vk::Image,
        format: vk::Format,
    ) -> VkResult<vk::ImageView> {
        swapchain_ops::create_image_view(self.device()?, image, format)
    }

    fn create_render_pass(&mut self, format: vk::Format) -> VkResult<vk::RenderPass> {
        pipeline::create_render_pass(self.device()?, format)
    }

    fn create_shader_module(&mut self, code: &[u32]) -> VkResult<vk::ShaderModule> {
        shader::create_shader_module(self.device()?, code)
    }

    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout> {
        pipeline::create_pipeline_layout(self.device()?)
    }

    fn create_graphics_pipeline(&mut self, desc: &PipelineDesc) -> VkResult<vk::Pipeline> {
        pipeline::create_graphics_pipeline(self.device()?, desc)
    }

    fn create_framebuffer(
        &mut self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer> {
        pipeline::create_framebuffer(self.device()?, render_pass, view, extent)
    }

    fn create_command_pool(&mut self, queue_family: u32) -> VkResult<vk::CommandPool> {
        commands::create_command_pool(self.device()?, queue_family)
    }

    fn allocate_command_buffer(&mut self, pool: vk::CommandPool) -> VkResult<vk::CommandBuffer> {
        commands::allocate_command_buffer(self.device()?, pool)
    }

    fn create_semaphore(&mut self) -> VkResult<vk::Semaphore> {
        sync::create_semaphore(self.device()?)
    }

    fn create_fence(&mut self, signaled: bool) -> VkResult<vk::Fence> {
        sync::create_fence(self.device()?, signaled)
    }

    fn wait_for_fence(&mut self, fence: vk::Fence, timeout_ns: u64) -> VkResult<()> {
        sync::wait_for_fence(self.device()?, fence, timeout_ns)
    }

    fn reset_fence(&mut self, fence: vk::Fence) -> VkResult<()> {
        sync::reset_fence(self.device()?, fence)
    }

    fn acquire_next_image(
        &mut self,
        swapchain: vk::SwapchainKHR,
        timeout_ns: u64,
        signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        unsafe {
            self.swapchain_loader()?.acquire_next_image(
                swapchain,
                timeout_ns,
                signal,
                vk::Fence::null(),
            )
        }
    }

    fn record_draw(&mut self, command_buffer: vk::CommandBuffer, pass: &DrawPass) -> VkResult<()> {
        commands::record_draw(self.device()?, command_buffer, pass)
    }

    fn submit(&mut self, queue: vk::Queue, submit: &FrameSubmit) -> VkResult<()> {
        swapchain_ops::submit(self.device()?, queue, submit)
    }

    fn present(
        &mut self,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        swapchain_ops::present(self.swapchain_loader()?, queue, swapchain, image_index, wait)
    }

    fn wait_idle(&mut self) -> VkResult<()> {
        unsafe { self.device()?.device_wait_idle() }
    }

    fn destroy_semaphore(&mut self, semaphore: vk::Semaphore) {
        self.with_device(|d| unsafe { d.destroy_semaphore(semaphore, None) });
    }

    fn destroy_fence(&mut self, fence: vk::Fence) {
        self.with_device(|d| unsafe { d.destroy_fence(fence, None) });
    }

    fn destroy_command_pool(&mut self, pool: vk::CommandPool) {
        // Also frees the command buffer
        self.with_device(|d| unsafe { d.destroy_command_pool(pool, None) });
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        self.with_device(|d| unsafe { d.destroy_framebuffer(framebuffer, None) });
    }

    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.with_device(|d| unsafe { d.destroy_pipeline(pipeline, None) });
    }

    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout) {
        self.with_device(|d| unsafe { d.destroy_pipeline_layout(layout, None) });
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        self.with_device(|d| unsafe { d.destroy_render_pass(render_pass, None) });
    }

    fn destroy_shader_module(&mut self, module: vk::ShaderModule) {
        self.with_device(|d| unsafe { d.destroy_shader_module(module, None) });
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        self.with_device(|d| unsafe { d.destroy_image_view(view, None) });
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        if let Some(loader) = &self.swapchain_loader {
            unsafe { loader.destroy_swapchain(swapchain, None) };
        }
    }

    fn destroy_device(&mut self, _device: vk::Device) {
        self.swapchain_loader = None;
        if let Some(device) = self.device.take() {
            unsafe { device.destroy_device(None) };
        }
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        if let Some(loader) = &self.surface_loader {
            unsafe { loader.destroy_surface(surface, None) };
        }
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        if let Some(loader) = &self.debug_utils {
            unsafe { loader.destroy_debug_utils_messenger(messenger, None) };
        }
    }

    fn destroy_instance(&mut self, _instance: vk::Instance) {
        self.debug_utils = None;
        self.surface_loader = None;
        if let Some(instance) = self.instance.take() {
            unsafe { instance.destroy_instance(None) };
        }
    }
}
