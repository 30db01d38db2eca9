// =============================================================================
// GPU CONTEXT - ordered bring-up and reverse-order teardown
// =============================================================================
//
// BRING-UP ORDER:
//   instance → debug messenger → surface → physical device → device + queues
//   → swapchain → image views → render pass → pipeline layout → pipeline
//   → framebuffers → command pool/buffer → sync objects
//
// `new()` acquires nothing. `build()` fills the fields in the order above and
// stops at the first failure; whatever was created so far is still released
// by `Drop`, in exact reverse order.

use ash::vk;
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::{device::VALIDATION_LAYER, shader, Driver, InstanceDesc, PipelineDesc, SwapchainDesc};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::{FrameStage, RenderState};
use crate::selection::{self, SelectedDevice, REQUIRED_DEVICE_EXTENSIONS};

/// The subset of `Config` the context needs after construction
#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub app_name: String,
    pub validation: bool,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub clear_color: [f32; 4],
    pub fence_timeout: Option<Duration>,
}

impl From<&Config> for ContextSettings {
    fn from(config: &Config) -> Self {
        Self {
            app_name: config.graphics.app_name.clone(),
            validation: config.validation_enabled(),
            vertex_shader: config.shaders.vertex.clone(),
            fragment_shader: config.shaders.fragment.clone(),
            clear_color: config.graphics.clear_color,
            fence_timeout: config.fence_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Queues {
    pub graphics: vk::Queue,
    pub present: vk::Queue,
}

/// Swapchain plus the per-image views. Framebuffers live separately because
/// they are created after the pipeline and destroyed before it.
#[derive(Debug, Default)]
pub(crate) struct SwapchainResources {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub views: Vec<vk::ImageView>,
    pub extent: vk::Extent2D,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameSync {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    pub in_flight: vk::Fence,
}

/// Every GPU object the triangle needs, owned in one place.
pub struct GpuContext<D: Driver> {
    pub(crate) driver: D,
    pub(crate) settings: ContextSettings,

    instance: Option<vk::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    pub(crate) surface: Option<vk::SurfaceKHR>,
    pub(crate) gpu: Option<SelectedDevice>,
    device: Option<vk::Device>,
    pub(crate) queues: Option<Queues>,

    /// Chosen once at bring-up and reused on rebuild
    pub(crate) surface_format: Option<vk::SurfaceFormatKHR>,
    pub(crate) present_mode: vk::PresentModeKHR,
    pub(crate) swapchain: Option<SwapchainResources>,

    pub(crate) render_pass: Option<vk::RenderPass>,
    pipeline_layout: Option<vk::PipelineLayout>,
    pub(crate) pipeline: Option<vk::Pipeline>,
    pub(crate) framebuffers: Vec<vk::Framebuffer>,

    command_pool: Option<vk::CommandPool>,
    pub(crate) command_buffer: Option<vk::CommandBuffer>,
    pub(crate) sync: Option<FrameSync>,

    pub(crate) state: RenderState,
    pub(crate) stage: FrameStage,
}

impl<D: Driver> GpuContext<D> {
    /// Wrap a driver. Nothing is created until [`build`](Self::build).
    pub fn new(driver: D, settings: ContextSettings) -> Self {
        Self {
            driver,
            settings,
            instance: None,
            debug_messenger: None,
            surface: None,
            gpu: None,
            device: None,
            queues: None,
            surface_format: None,
            present_mode: vk::PresentModeKHR::FIFO,
            swapchain: None,
            render_pass: None,
            pipeline_layout: None,
            pipeline: None,
            framebuffers: Vec::new(),
            command_pool: None,
            command_buffer: None,
            sync: None,
            state: RenderState::Running,
            stage: FrameStage::Idle,
        }
    }

    /// Run the full bring-up sequence. The first failing step aborts the rest.
    pub fn build(&mut self) -> Result<()> {
        log::info!("Initializing Vulkan...");

        self.create_instance()?;
        self.create_surface()?;
        self.pick_device()?;
        self.create_device()?;
        self.create_swapchain()?;
        self.create_render_pass()?;
        self.create_pipeline()?;
        self.create_framebuffers()?;
        self.create_commands()?;
        self.create_sync_objects()?;

        log::info!("Vulkan initialized successfully!");
        Ok(())
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn selected_device(&self) -> Option<&SelectedDevice> {
        self.gpu.as_ref()
    }

    pub fn extent(&self) -> Option<vk::Extent2D> {
        self.swapchain.as_ref().map(|sc| sc.extent)
    }

    pub fn image_view_count(&self) -> usize {
        self.swapchain.as_ref().map_or(0, |sc| sc.views.len())
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    // =========================================================================
    // BRING-UP STEPS
    // =========================================================================

    fn create_instance(&mut self) -> Result<()> {
        let validation = self.settings.validation;

        // Validation must be present when asked for; never continue silently
        if validation {
            let layers = self
                .driver
                .available_layers()
                .map_err(Error::driver("enumerate instance layers"))?;
            let wanted = VALIDATION_LAYER.to_string_lossy();
            if !layers.iter().any(|layer| *layer == wanted) {
                return Err(Error::CapabilityUnavailable {
                    kind: "instance layer",
                    name: wanted.into_owned(),
                });
            }
        }

        let layers: &[&std::ffi::CStr] = if validation { &[VALIDATION_LAYER] } else { &[] };
        let desc = InstanceDesc {
            app_name: &self.settings.app_name,
            layers,
            debug_messenger: validation,
        };

        let instance = self.driver.create_instance(&desc).map_err(|result| match result {
            vk::Result::ERROR_LAYER_NOT_PRESENT => Error::CapabilityUnavailable {
                kind: "instance layer",
                name: VALIDATION_LAYER.to_string_lossy().into_owned(),
            },
            vk::Result::ERROR_EXTENSION_NOT_PRESENT => Error::CapabilityUnavailable {
                kind: "instance extension",
                name: "window surface extensions".to_string(),
            },
            result => Error::ResourceCreation {
                what: "instance",
                result,
            },
        })?;
        self.instance = Some(instance);
        log::info!(
            "Created instance (validation {})",
            if validation { "on" } else { "off" }
        );

        if validation {
            let messenger = self
                .driver
                .create_debug_messenger()
                .map_err(Error::creation("debug messenger"))?;
            self.debug_messenger = Some(messenger);
            log::debug!("Debug messenger attached");
        }

        Ok(())
    }

    fn create_surface(&mut self) -> Result<()> {
        let surface = self
            .driver
            .create_surface()
            .map_err(|e| Error::EnvironmentInit(format!("surface creation failed: {e}")))?;
        self.surface = Some(surface);
        Ok(())
    }

    fn pick_device(&mut self) -> Result<()> {
        let surface = self.surface.ok_or(Error::NotInitialized("surface"))?;
        let gpu = selection::pick_physical_device(&self.driver, surface)?;

        let formats = self
            .driver
            .surface_formats(gpu.physical_device, surface)
            .map_err(Error::driver("query surface formats"))?;
        let modes = self
            .driver
            .present_modes(gpu.physical_device, surface)
            .map_err(Error::driver("query present modes"))?;

        let format = selection::choose_surface_format(&formats)
            .ok_or(Error::NoSuitableDevice(1))?;
        self.surface_format = Some(format);
        self.present_mode = selection::choose_present_mode(&modes);
        log::info!(
            "Surface format {:?}/{:?}, present mode {:?}",
            format.format,
            format.color_space,
            self.present_mode
        );

        self.gpu = Some(gpu);
        Ok(())
    }

    fn create_device(&mut self) -> Result<()> {
        let gpu = self.gpu.as_ref().ok_or(Error::NotInitialized("physical device"))?;
        let families = gpu.queue_families;

        let device = self
            .driver
            .create_device(gpu.physical_device, &families.unique(), REQUIRED_DEVICE_EXTENSIONS)
            .map_err(|result| match result {
                vk::Result::ERROR_EXTENSION_NOT_PRESENT => Error::CapabilityUnavailable {
                    kind: "device extension",
                    name: ash::khr::swapchain::NAME.to_string_lossy().into_owned(),
                },
                result => Error::ResourceCreation {
                    what: "logical device",
                    result,
                },
            })?;
        self.device = Some(device);

        let graphics = self
            .driver
            .device_queue(families.graphics)
            .map_err(Error::driver("get graphics queue"))?;
        let present = self
            .driver
            .device_queue(families.present)
            .map_err(Error::driver("get present queue"))?;
        self.queues = Some(Queues { graphics, present });

        log::info!(
            "Created logical device with {} queue(s)",
            families.unique().len()
        );
        Ok(())
    }

    /// Create the swapchain and one image view per image
    pub(crate) fn create_swapchain(&mut self) -> Result<()> {
        let surface = self.surface.ok_or(Error::NotInitialized("surface"))?;
        let gpu = self.gpu.as_ref().ok_or(Error::NotInitialized("physical device"))?;
        let format = self.surface_format.ok_or(Error::NotInitialized("surface format"))?;

        let caps = self
            .driver
            .surface_capabilities(gpu.physical_device, surface)
            .map_err(Error::driver("query surface capabilities"))?;

        let extent = selection::choose_extent(&caps, self.driver.drawable_size());
        let families = gpu.queue_families;
        let desc = SwapchainDesc {
            surface,
            image_count: selection::choose_image_count(&caps),
            format,
            extent,
            present_mode: self.present_mode,
            pre_transform: caps.current_transform,
            sharing_mode: families.sharing_mode(),
            queue_family_indices: families.unique(),
        };

        let swapchain = self
            .driver
            .create_swapchain(&desc)
            .map_err(Error::creation("swapchain"))?;
        // Stored first so a failure below still releases it
        self.swapchain = Some(SwapchainResources {
            swapchain,
            extent,
            ..Default::default()
        });

        let images = self
            .driver
            .swapchain_images(swapchain)
            .map_err(Error::driver("get swapchain images"))?;
        log::info!(
            "Created swapchain: {}x{}, {} images, {:?} sharing",
            extent.width,
            extent.height,
            images.len(),
            desc.sharing_mode
        );

        for &image in &images {
            let view = self
                .driver
                .create_image_view(image, format.format)
                .map_err(Error::creation("image view"))?;
            if let Some(sc) = self.swapchain.as_mut() {
                sc.views.push(view);
            }
        }
        if let Some(sc) = self.swapchain.as_mut() {
            sc.images = images;
        }

        Ok(())
    }

    fn create_render_pass(&mut self) -> Result<()> {
        let format = self.surface_format.ok_or(Error::NotInitialized("surface format"))?;
        let render_pass = self
            .driver
            .create_render_pass(format.format)
            .map_err(Error::creation("render pass"))?;
        self.render_pass = Some(render_pass);
        Ok(())
    }

    /// Build the fixed pipeline. Shader modules only live for this call.
    fn create_pipeline(&mut self) -> Result<()> {
        let render_pass = self.render_pass.ok_or(Error::NotInitialized("render pass"))?;

        let layout = self
            .driver
            .create_pipeline_layout()
            .map_err(Error::creation("pipeline layout"))?;
        self.pipeline_layout = Some(layout);

        let vertex_code = shader::load_spirv(&self.settings.vertex_shader)?;
        let fragment_code = shader::load_spirv(&self.settings.fragment_shader)?;

        let vertex = self
            .driver
            .create_shader_module(&vertex_code)
            .map_err(Error::creation("vertex shader module"))?;
        let fragment = match self.driver.create_shader_module(&fragment_code) {
            Ok(module) => module,
            Err(result) => {
                self.driver.destroy_shader_module(vertex);
                return Err(Error::ResourceCreation {
                    what: "fragment shader module",
                    result,
                });
            }
        };

        let pipeline = self.driver.create_graphics_pipeline(&PipelineDesc {
            render_pass,
            layout,
            vertex,
            fragment,
        });

        self.driver.destroy_shader_module(fragment);
        self.driver.destroy_shader_module(vertex);

        self.pipeline = Some(pipeline.map_err(Error::creation("graphics pipeline"))?);
        log::info!("Created graphics pipeline");
        Ok(())
    }

    pub(crate) fn create_framebuffers(&mut self) -> Result<()> {
        let render_pass = self.render_pass.ok_or(Error::NotInitialized("render pass"))?;
        let (views, extent) = match &self.swapchain {
            Some(sc) => (sc.views.clone(), sc.extent),
            None => return Err(Error::NotInitialized("swapchain")),
        };

        for view in views {
            let framebuffer = self
                .driver
                .create_framebuffer(render_pass, view, extent)
                .map_err(Error::creation("framebuffer"))?;
            self.framebuffers.push(framebuffer);
        }
        log::debug!("Created {} framebuffers", self.framebuffers.len());
        Ok(())
    }

    fn create_commands(&mut self) -> Result<()> {
        let gpu = self.gpu.as_ref().ok_or(Error::NotInitialized("physical device"))?;
        let pool = self
            .driver
            .create_command_pool(gpu.queue_families.graphics)
            .map_err(Error::creation("command pool"))?;
        self.command_pool = Some(pool);

        let buffer = self
            .driver
            .allocate_command_buffer(pool)
            .map_err(Error::creation("command buffer"))?;
        self.command_buffer = Some(buffer);
        Ok(())
    }

    fn create_sync_objects(&mut self) -> Result<()> {
        let image_available = self
            .driver
            .create_semaphore()
            .map_err(Error::creation("image-available semaphore"))?;
        let render_finished = match self.driver.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(result) => {
                self.driver.destroy_semaphore(image_available);
                return Err(Error::creation("render-finished semaphore")(result));
            }
        };
        // Signalled so the first frame does not wait forever
        let in_flight = match self.driver.create_fence(true) {
            Ok(fence) => fence,
            Err(result) => {
                self.driver.destroy_semaphore(render_finished);
                self.driver.destroy_semaphore(image_available);
                return Err(Error::creation("in-flight fence")(result));
            }
        };

        self.sync = Some(FrameSync {
            image_available,
            render_finished,
            in_flight,
        });
        Ok(())
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Destroy framebuffers, image views and the swapchain, newest first
    pub(crate) fn destroy_swapchain_resources(&mut self) {
        for framebuffer in self.framebuffers.drain(..).rev() {
            self.driver.destroy_framebuffer(framebuffer);
        }
        self.destroy_swapchain();
    }

    fn destroy_swapchain(&mut self) {
        if let Some(sc) = self.swapchain.take() {
            for &view in sc.views.iter().rev() {
                self.driver.destroy_image_view(view);
            }
            self.driver.destroy_swapchain(sc.swapchain);
        }
    }

    /// Release everything in exact reverse creation order. Idempotent.
    fn teardown(&mut self) {
        if self.device.is_some() {
            // Nothing may be in flight while resources go away
            if let Err(e) = self.driver.wait_idle() {
                log::warn!("device_wait_idle failed during teardown: {}", e);
            }
        }

        if let Some(sync) = self.sync.take() {
            self.driver.destroy_fence(sync.in_flight);
            self.driver.destroy_semaphore(sync.render_finished);
            self.driver.destroy_semaphore(sync.image_available);
        }

        // Also frees the command buffer
        self.command_buffer = None;
        if let Some(pool) = self.command_pool.take() {
            self.driver.destroy_command_pool(pool);
        }

        for framebuffer in self.framebuffers.drain(..).rev() {
            self.driver.destroy_framebuffer(framebuffer);
        }
        if let Some(pipeline) = self.pipeline.take() {
            self.driver.destroy_pipeline(pipeline);
        }
        if let Some(layout) = self.pipeline_layout.take() {
            self.driver.destroy_pipeline_layout(layout);
        }
        if let Some(render_pass) = self.render_pass.take() {
            self.driver.destroy_render_pass(render_pass);
        }

        self.destroy_swapchain();

        self.queues = None;
        if let Some(device) = self.device.take() {
            self.driver.destroy_device(device);
        }
        self.gpu = None;
        if let Some(surface) = self.surface.take() {
            self.driver.destroy_surface(surface);
        }
        if let Some(messenger) = self.debug_messenger.take() {
            self.driver.destroy_debug_messenger(messenger);
        }
        if let Some(instance) = self.instance.take() {
            self.driver.destroy_instance(instance);
        }
    }
}

impl<D: Driver> Drop for GpuContext<D> {
    fn drop(&mut self) {
        log::info!("Cleaning up Vulkan resources...");
        self.teardown();
        self.driver.close_window();
        log::info!("Cleanup complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{self, Call, MockDriver, MockGpu, Object};
    use crate::frame::FrameOutcome;

    fn context(driver: MockDriver, tag: &str) -> GpuContext<MockDriver> {
        GpuContext::new(driver, mock::settings(tag))
    }

    #[test]
    fn bring_up_creates_one_of_each_and_views_per_image() {
        let driver = MockDriver::new(vec![MockGpu::capable("Mock GPU")]);
        let log = driver.log();
        let mut ctx = context(driver, "bring-up");

        ctx.build().unwrap();

        let calls = log.borrow().clone();
        assert_eq!(mock::created(&calls, Object::Instance), 1);
        assert_eq!(mock::created(&calls, Object::DebugMessenger), 1);
        assert_eq!(mock::created(&calls, Object::Device), 1);
        assert_eq!(mock::created(&calls, Object::ImageView), 2);
        assert_eq!(mock::created(&calls, Object::Framebuffer), 2);
        assert_eq!(mock::created(&calls, Object::Pipeline), 1);
        assert_eq!(mock::created(&calls, Object::CommandBuffer), 1);
        assert_eq!(mock::created(&calls, Object::Semaphore), 2);
        assert_eq!(mock::created(&calls, Object::Fence), 1);
        // Shader modules do not outlive pipeline creation
        assert_eq!(mock::destroyed(&calls, Object::ShaderModule), 2);

        assert_eq!(ctx.image_view_count(), 2);
        assert_eq!(ctx.framebuffer_count(), 2);
        assert_eq!(
            ctx.extent(),
            Some(vk::Extent2D {
                width: 800,
                height: 600
            })
        );
        assert_eq!(ctx.selected_device().unwrap().name, "Mock GPU");

        let (app_name, layers, messenger) = ctx.driver().last_instance.clone().unwrap();
        assert_eq!(app_name, "Hello Triangle");
        assert_eq!(layers, 1);
        assert!(messenger);

        let desc = ctx.driver().last_swapchain.clone().unwrap();
        assert_eq!(desc.sharing_mode, vk::SharingMode::EXCLUSIVE);
        assert_eq!(desc.image_count, 2);
        assert_eq!(desc.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(desc.format.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn first_frame_does_not_block_and_presents() {
        let driver = MockDriver::new(vec![MockGpu::capable("Mock GPU")]);
        let log = driver.log();
        let mut ctx = context(driver, "first-frame");
        ctx.build().unwrap();
        log.borrow_mut().clear();

        let outcome = ctx.draw_frame().unwrap();
        assert_eq!(outcome, FrameOutcome::Presented { image_index: 0 });
        assert_eq!(ctx.stage(), FrameStage::Presented);

        let calls = log.borrow().clone();
        let fence = match calls[0] {
            Call::WaitFence(fence) => fence,
            ref other => panic!("frame started with {other:?}"),
        };
        assert_eq!(calls[1], Call::Acquire(0));
        assert_eq!(calls[2], Call::ResetFence(fence));
        assert!(matches!(calls[3], Call::Record { .. }));
        assert_eq!(calls[4], Call::Submit);
        assert_eq!(calls[5], Call::Present(0));

        assert_eq!(
            ctx.draw_frame().unwrap(),
            FrameOutcome::Presented { image_index: 1 }
        );
    }

    #[test]
    fn teardown_is_reverse_of_creation_with_window_last() {
        let driver = MockDriver::new(vec![MockGpu::capable("Mock GPU")]);
        let log = driver.log();
        let mut ctx = context(driver, "teardown");
        ctx.build().unwrap();
        ctx.draw_frame().unwrap();
        drop(ctx);

        let calls = log.borrow().clone();
        let mut expected: Vec<_> = calls
            .iter()
            .filter_map(|call| match *call {
                Call::Create(Object::ShaderModule | Object::CommandBuffer, _) => None,
                Call::Create(object, handle) => Some((object, handle)),
                _ => None,
            })
            .collect();
        expected.reverse();
        let destroyed: Vec<_> = calls
            .iter()
            .filter_map(|call| match *call {
                Call::Destroy(Object::ShaderModule | Object::Window, _) => None,
                Call::Destroy(object, handle) => Some((object, handle)),
                _ => None,
            })
            .collect();

        assert_eq!(destroyed, expected);
        assert_eq!(calls.last(), Some(&Call::Destroy(Object::Window, 0)));
        assert_eq!(mock::destroyed(&calls, Object::Window), 1);
    }

    #[test]
    fn missing_validation_layer_fails_before_instance() {
        let mut driver = MockDriver::new(vec![MockGpu::capable("Mock GPU")]);
        driver.layers.clear();
        let log = driver.log();
        let mut ctx = context(driver, "no-layer");

        let err = ctx.build().unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityUnavailable {
                kind: "instance layer",
                ..
            }
        ));
        drop(ctx);

        let calls = log.borrow().clone();
        assert_eq!(mock::created(&calls, Object::Instance), 0);
        assert_eq!(calls, vec![Call::Destroy(Object::Window, 0)]);
    }

    #[test]
    fn validation_off_skips_layer_and_messenger() {
        let mut driver = MockDriver::new(vec![MockGpu::capable("Mock GPU")]);
        driver.layers.clear();
        let log = driver.log();
        let mut settings = mock::settings("no-validation");
        settings.validation = false;
        let mut ctx = GpuContext::new(driver, settings);

        ctx.build().unwrap();
        let (_, layers, messenger) = ctx.driver().last_instance.clone().unwrap();
        assert_eq!(layers, 0);
        assert!(!messenger);
        assert_eq!(mock::created(&log.borrow(), Object::DebugMessenger), 0);
    }

    #[test]
    fn missing_shader_aborts_and_releases_partial_state() {
        let driver = MockDriver::new(vec![MockGpu::capable("Mock GPU")]);
        let log = driver.log();
        let mut settings = mock::settings("missing-shader");
        settings.vertex_shader = PathBuf::from("shaders/does-not-exist.spv");
        let mut ctx = GpuContext::new(driver, settings);

        let err = ctx.build().unwrap_err();
        match err {
            Error::ShaderAssetMissing { path, .. } => {
                assert_eq!(path, PathBuf::from("shaders/does-not-exist.spv"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        drop(ctx);

        let calls = log.borrow().clone();
        assert_eq!(mock::created(&calls, Object::Pipeline), 0);
        assert_eq!(mock::created(&calls, Object::ShaderModule), 0);
        for object in [
            Object::PipelineLayout,
            Object::RenderPass,
            Object::ImageView,
            Object::Swapchain,
            Object::Device,
            Object::Surface,
            Object::DebugMessenger,
            Object::Instance,
        ] {
            assert_eq!(
                mock::created(&calls, object),
                mock::destroyed(&calls, object),
                "{object:?} leaked"
            );
        }
    }

    #[test]
    fn failed_fence_creation_releases_semaphores() {
        let mut driver = MockDriver::new(vec![MockGpu::capable("Mock GPU")]);
        driver.fail_create = Some(Object::Fence);
        let log = driver.log();
        let mut ctx = context(driver, "fence-fail");

        let err = ctx.build().unwrap_err();
        assert!(matches!(
            err,
            Error::ResourceCreation {
                what: "in-flight fence",
                ..
            }
        ));
        drop(ctx);

        let calls = log.borrow().clone();
        assert_eq!(mock::created(&calls, Object::Semaphore), 2);
        assert_eq!(mock::destroyed(&calls, Object::Semaphore), 2);
        assert_eq!(mock::destroyed(&calls, Object::CommandPool), 1);
    }

    #[test]
    fn no_gpu_with_swapchain_extension() {
        let mut gpu = MockGpu::capable("Compute Only");
        gpu.extensions.clear();
        let driver = MockDriver::new(vec![gpu]);
        let log = driver.log();
        let mut ctx = context(driver, "no-gpu");

        assert!(matches!(ctx.build(), Err(Error::NoSuitableDevice(1))));
        drop(ctx);

        let calls = log.borrow().clone();
        assert_eq!(mock::created(&calls, Object::Device), 0);
        assert_eq!(mock::destroyed(&calls, Object::Surface), 1);
        assert_eq!(mock::destroyed(&calls, Object::Instance), 1);
    }

    #[test]
    fn split_queue_families_share_concurrently() {
        let mut gpu = MockGpu::capable("Split Queues");
        gpu.families = vec![
            (vk::QueueFlags::GRAPHICS, false),
            (vk::QueueFlags::TRANSFER, true),
        ];
        let driver = MockDriver::new(vec![gpu]);
        let mut ctx = context(driver, "split-queues");

        ctx.build().unwrap();

        assert_eq!(ctx.driver().device_queue_families, vec![0, 1]);
        let desc = ctx.driver().last_swapchain.clone().unwrap();
        assert_eq!(desc.sharing_mode, vk::SharingMode::CONCURRENT);
        assert_eq!(desc.queue_family_indices, vec![0, 1]);

        let queues = ctx.queues.unwrap();
        assert_ne!(queues.graphics, queues.present);
    }

    #[test]
    fn settings_take_app_name_from_graphics_section() {
        let config = Config::parse("[window]\ntitle = \"Vulkan Intro\"").unwrap();
        let settings = ContextSettings::from(&config);
        assert_eq!(settings.app_name, "Hello Triangle");
    }
}
