// Recording driver for tests
//
// Hands out fresh fake handles, answers capability queries from a list of
// fake GPUs, and records every create/destroy/frame call in order. Submitting
// signals the fence immediately unless the GPU is told to hang.

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;
use std::rc::Rc;

use super::{Driver, DrawPass, FrameSubmit, InstanceDesc, PipelineDesc, SwapchainDesc};
use crate::context::ContextSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Object {
    Instance,
    DebugMessenger,
    Surface,
    Device,
    Swapchain,
    ImageView,
    RenderPass,
    ShaderModule,
    PipelineLayout,
    Pipeline,
    Framebuffer,
    CommandPool,
    CommandBuffer,
    Semaphore,
    Fence,
    Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Create(Object, u64),
    Destroy(Object, u64),
    WaitFence(u64),
    ResetFence(u64),
    Acquire(u32),
    Record { framebuffer: u64 },
    Submit,
    Present(u32),
    WaitIdle,
}

#[derive(Debug, Clone)]
pub struct MockGpu {
    pub name: &'static str,
    pub extensions: Vec<String>,
    /// Queue flags and whether the family can present to the surface
    pub families: Vec<(vk::QueueFlags, bool)>,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl MockGpu {
    /// One family that does graphics and presentation, BGRA sRGB, FIFO only
    pub fn capable(name: &'static str) -> Self {
        Self {
            name,
            extensions: vec!["VK_KHR_swapchain".to_string()],
            families: vec![(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, true)],
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        }
    }
}

/// Context settings whose shader paths point at freshly written SPIR-V stubs.
/// `tag` keeps parallel tests from sharing files.
pub fn settings(tag: &str) -> ContextSettings {
    let dir = std::env::temp_dir().join(format!(
        "hello-triangle-{}-{}",
        std::process::id(),
        tag
    ));
    std::fs::create_dir_all(&dir).unwrap();

    let mut bytes = 0x0723_0203u32.to_le_bytes().to_vec();
    bytes.extend_from_slice(&0x0001_0000u32.to_le_bytes());
    let vertex = dir.join("triangle.vert.spv");
    let fragment = dir.join("triangle.frag.spv");
    std::fs::write(&vertex, &bytes).unwrap();
    std::fs::write(&fragment, &bytes).unwrap();

    ContextSettings {
        app_name: "Hello Triangle".to_string(),
        validation: true,
        vertex_shader: vertex,
        fragment_shader: fragment,
        clear_color: [0.0, 0.0, 0.0, 1.0],
        fence_timeout: None,
    }
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Count of `Create(object, _)` entries in a log
pub fn created(calls: &[Call], object: Object) -> usize {
    calls
        .iter()
        .filter(|call| matches!(call, Call::Create(o, _) if *o == object))
        .count()
}

pub fn destroyed(calls: &[Call], object: Object) -> usize {
    calls
        .iter()
        .filter(|call| matches!(call, Call::Destroy(o, _) if *o == object))
        .count()
}

pub struct MockDriver {
    pub gpus: Vec<MockGpu>,
    pub layers: Vec<String>,
    pub drawable: vk::Extent2D,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Number of images every swapchain reports
    pub swapchain_images: u32,
    /// Scripted acquire results, consumed before the round-robin default
    pub acquire_results: VecDeque<VkResult<(u32, bool)>>,
    pub present_results: VecDeque<VkResult<bool>>,
    /// When set, submitted work never completes
    pub hang_gpu: bool,
    /// Fail the first creation of this object kind
    pub fail_create: Option<Object>,
    /// Returned by every surface support query when set
    pub surface_support_error: Option<vk::Result>,

    /// Shared so a test can keep reading it after the context is dropped
    pub calls: CallLog,
    pub last_instance: Option<(String, usize, bool)>,
    pub last_swapchain: Option<SwapchainDesc>,
    pub device_queue_families: Vec<u32>,

    next_handle: u64,
    next_image: u32,
    fences: HashMap<u64, bool>,
}

impl MockDriver {
    pub fn new(gpus: Vec<MockGpu>) -> Self {
        Self {
            gpus,
            layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            drawable: vk::Extent2D {
                width: 800,
                height: 600,
            },
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 1,
                max_image_count: 0,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            swapchain_images: 2,
            acquire_results: VecDeque::new(),
            present_results: VecDeque::new(),
            hang_gpu: false,
            fail_create: None,
            surface_support_error: None,
            calls: CallLog::default(),
            last_instance: None,
            last_swapchain: None,
            device_queue_families: Vec::new(),
            next_handle: 0,
            next_image: 0,
            fences: HashMap::new(),
        }
    }

    pub fn log(&self) -> CallLog {
        Rc::clone(&self.calls)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn create<H: Handle>(&mut self, object: Object) -> VkResult<H> {
        if self.fail_create == Some(object) {
            self.fail_create = None;
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        self.next_handle += 1;
        self.record(Call::Create(object, self.next_handle));
        Ok(H::from_raw(self.next_handle))
    }

    fn destroy<H: Handle>(&mut self, object: Object, handle: H) {
        self.record(Call::Destroy(object, handle.as_raw()));
    }

    fn gpu(&self, physical_device: vk::PhysicalDevice) -> VkResult<&MockGpu> {
        let index = physical_device.as_raw().wrapping_sub(1000) as usize;
        self.gpus.get(index).ok_or(vk::Result::ERROR_DEVICE_LOST)
    }
}

impl Driver for MockDriver {
    fn drawable_size(&self) -> vk::Extent2D {
        self.drawable
    }

    fn close_window(&mut self) {
        self.record(Call::Destroy(Object::Window, 0));
    }

    fn available_layers(&self) -> VkResult<Vec<String>> {
        Ok(self.layers.clone())
    }

    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<vk::Instance> {
        self.last_instance = Some((
            desc.app_name.to_string(),
            desc.layers.len(),
            desc.debug_messenger,
        ));
        self.create(Object::Instance)
    }

    fn create_debug_messenger(&mut self) -> VkResult<vk::DebugUtilsMessengerEXT> {
        self.create(Object::DebugMessenger)
    }

    fn create_surface(&mut self) -> VkResult<vk::SurfaceKHR> {
        self.create(Object::Surface)
    }

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        Ok((0..self.gpus.len() as u64)
            .map(|i| vk::PhysicalDevice::from_raw(1000 + i))
            .collect())
    }

    fn device_name(&self, physical_device: vk::PhysicalDevice) -> String {
        self.gpu(physical_device)
            .map(|gpu| gpu.name.to_string())
            .unwrap_or_default()
    }

    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        Ok(self.gpu(physical_device)?.extensions.clone())
    }

    fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        Ok(self
            .gpu(physical_device)?
            .families
            .iter()
            .map(|&(flags, _)| vk::QueueFamilyProperties {
                queue_flags: flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect())
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        if let Some(error) = self.surface_support_error {
            return Err(error);
        }
        Ok(self
            .gpu(physical_device)?
            .families
            .get(queue_family as usize)
            .is_some_and(|&(_, present)| present))
    }

    fn surface_capabilities(
        &self,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        Ok(self.capabilities)
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.gpu(physical_device)?.formats.clone())
    }

    fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        Ok(self.gpu(physical_device)?.present_modes.clone())
    }

    fn create_device(
        &mut self,
        _physical_device: vk::PhysicalDevice,
        queue_families: &[u32],
        _extensions: &[&CStr],
    ) -> VkResult<vk::Device> {
        self.device_queue_families = queue_families.to_vec();
        self.create(Object::Device)
    }

    fn device_queue(&self, queue_family: u32) -> VkResult<vk::Queue> {
        Ok(vk::Queue::from_raw(500 + queue_family as u64))
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        self.last_swapchain = Some(desc.clone());
        self.next_image = 0;
        self.create(Object::Swapchain)
    }

    fn swapchain_images(&self, _swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        Ok((0..self.swapchain_images as u64)
            .map(|i| vk::Image::from_raw(900 + i))
            .collect())
    }

    fn create_image_view(
        &mut self,
        _image: vk::Image,
        _format: vk::Format,
    ) -> VkResult<vk::ImageView> {
        self.create(Object::ImageView)
    }

    fn create_render_pass(&mut self, _format: vk::Format) -> VkResult<vk::RenderPass> {
        self.create(Object::RenderPass)
    }

    fn create_shader_module(&mut self, _code: &[u32]) -> VkResult<vk::ShaderModule> {
        self.create(Object::ShaderModule)
    }

    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout> {
        self.create(Object::PipelineLayout)
    }

    fn create_graphics_pipeline(&mut self, _desc: &PipelineDesc) -> VkResult<vk::Pipeline> {
        self.create(Object::Pipeline)
    }

    fn create_framebuffer(
        &mut self,
        _render_pass: vk::RenderPass,
        _view: vk::ImageView,
        _extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer> {
        self.create(Object::Framebuffer)
    }

    fn create_command_pool(&mut self, _queue_family: u32) -> VkResult<vk::CommandPool> {
        self.create(Object::CommandPool)
    }

    fn allocate_command_buffer(&mut self, _pool: vk::CommandPool) -> VkResult<vk::CommandBuffer> {
        self.create(Object::CommandBuffer)
    }

    fn create_semaphore(&mut self) -> VkResult<vk::Semaphore> {
        self.create(Object::Semaphore)
    }

    fn create_fence(&mut self, signaled: bool) -> VkResult<vk::Fence> {
        let fence: vk::Fence = self.create(Object::Fence)?;
        self.fences.insert(fence.as_raw(), signaled);
        Ok(fence)
    }

    fn wait_for_fence(&mut self, fence: vk::Fence, _timeout_ns: u64) -> VkResult<()> {
        self.record(Call::WaitFence(fence.as_raw()));
        if self.fences.get(&fence.as_raw()).copied().unwrap_or(false) {
            Ok(())
        } else {
            Err(vk::Result::TIMEOUT)
        }
    }

    fn reset_fence(&mut self, fence: vk::Fence) -> VkResult<()> {
        self.record(Call::ResetFence(fence.as_raw()));
        self.fences.insert(fence.as_raw(), false);
        Ok(())
    }

    fn acquire_next_image(
        &mut self,
        _swapchain: vk::SwapchainKHR,
        _timeout_ns: u64,
        _signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        let result = match self.acquire_results.pop_front() {
            Some(scripted) => scripted,
            None => {
                let index = self.next_image % self.swapchain_images.max(1);
                self.next_image += 1;
                Ok((index, false))
            }
        };
        if let Ok((index, _)) = result {
            self.record(Call::Acquire(index));
        }
        result
    }

    fn record_draw(&mut self, _command_buffer: vk::CommandBuffer, pass: &DrawPass) -> VkResult<()> {
        self.record(Call::Record {
            framebuffer: pass.framebuffer.as_raw(),
        });
        Ok(())
    }

    fn submit(&mut self, _queue: vk::Queue, submit: &FrameSubmit) -> VkResult<()> {
        self.record(Call::Submit);
        if !self.hang_gpu {
            self.fences.insert(submit.fence.as_raw(), true);
        }
        Ok(())
    }

    fn present(
        &mut self,
        _queue: vk::Queue,
        _swapchain: vk::SwapchainKHR,
        image_index: u32,
        _wait: vk::Semaphore,
    ) -> VkResult<bool> {
        self.record(Call::Present(image_index));
        self.present_results.pop_front().unwrap_or(Ok(false))
    }

    fn wait_idle(&mut self) -> VkResult<()> {
        self.record(Call::WaitIdle);
        Ok(())
    }

    fn destroy_semaphore(&mut self, semaphore: vk::Semaphore) {
        self.destroy(Object::Semaphore, semaphore);
    }

    fn destroy_fence(&mut self, fence: vk::Fence) {
        self.fences.remove(&fence.as_raw());
        self.destroy(Object::Fence, fence);
    }

    fn destroy_command_pool(&mut self, pool: vk::CommandPool) {
        self.destroy(Object::CommandPool, pool);
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        self.destroy(Object::Framebuffer, framebuffer);
    }

    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.destroy(Object::Pipeline, pipeline);
    }

    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout) {
        self.destroy(Object::PipelineLayout, layout);
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        self.destroy(Object::RenderPass, render_pass);
    }

    fn destroy_shader_module(&mut self, module: vk::ShaderModule) {
        self.destroy(Object::ShaderModule, module);
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        self.destroy(Object::ImageView, view);
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        self.destroy(Object::Swapchain, swapchain);
    }

    fn destroy_device(&mut self, device: vk::Device) {
        self.destroy(Object::Device, device);
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        self.destroy(Object::Surface, surface);
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        self.destroy(Object::DebugMessenger, messenger);
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        self.destroy(Object::Instance, instance);
    }
}
