// Vulkan instance and device creation
//
// Responsibilities:
// - Instance creation with optional validation layer + debug messenger chain
// - Debug callback routing driver diagnostics into `log`
// - Physical device queries (extensions, name)
// - Logical device creation with one queue per distinct family

use ash::prelude::VkResult;
use ash::{ext::debug_utils, vk, Entry};
use std::ffi::{c_char, CStr, CString};

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

const ENGINE_NAME: &CStr = c"No Engine";

/// Names of every instance layer the loader can see
pub fn available_layers(entry: &Entry) -> VkResult<Vec<String>> {
    let layers = unsafe { entry.enumerate_instance_layer_properties() }?;
    Ok(layers
        .iter()
        .filter_map(|layer| layer.layer_name_as_c_str().ok())
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}

/// Create the instance with the window's required extensions.
///
/// When `debug_messenger` is set, the messenger create-info is also chained
/// into instance creation so instance creation and destruction get validated.
pub fn create_instance(
    entry: &Entry,
    app_name: &str,
    window_extensions: &[*const c_char],
    layers: &[&CStr],
    debug_messenger: bool,
) -> VkResult<ash::Instance> {
    // Interior NULs cannot reach the driver, so strip them
    let app_name_cstr = CString::new(app_name.replace('\0', ""))
        .map_err(|_| vk::Result::ERROR_INITIALIZATION_FAILED)?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name_cstr)
        .application_version(vk::make_api_version(0, 1, 0, 0))
        .engine_name(ENGINE_NAME)
        .engine_version(vk::make_api_version(0, 1, 0, 0))
        .api_version(vk::API_VERSION_1_0);

    let mut extensions = window_extensions.to_vec();
    if debug_messenger {
        extensions.push(debug_utils::NAME.as_ptr());
    }

    let layer_names: Vec<*const c_char> = layers.iter().map(|layer| layer.as_ptr()).collect();

    let mut debug_info = debug_messenger_info();
    let mut create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extensions)
        .enabled_layer_names(&layer_names);

    if debug_messenger {
        create_info = create_info.push_next(&mut debug_info);
    }

    unsafe { entry.create_instance(&create_info, None) }
}

/// Messenger configuration shared by instance creation and the messenger itself
pub fn debug_messenger_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
}

pub fn setup_debug_messenger(
    loader: &debug_utils::Instance,
) -> VkResult<vk::DebugUtilsMessengerEXT> {
    unsafe { loader.create_debug_utils_messenger(&debug_messenger_info(), None) }
}

pub fn device_name(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> String {
    let properties = unsafe { instance.get_physical_device_properties(physical_device) };
    properties
        .device_name_as_c_str()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "<unnamed GPU>".to_string())
}

pub fn device_extensions(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> VkResult<Vec<String>> {
    let extensions = unsafe { instance.enumerate_device_extension_properties(physical_device) }?;
    Ok(extensions
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}

/// Create the logical device. `queue_families` must already be deduplicated.
pub fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    queue_families: &[u32],
    extensions: &[&CStr],
) -> VkResult<ash::Device> {
    let queue_priorities = [1.0];
    let queue_create_infos: Vec<_> = queue_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&queue_priorities)
        })
        .collect();

    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();
    let features = vk::PhysicalDeviceFeatures::default();

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    unsafe { instance.create_device(physical_device, &create_info, None) }
}

/// Log level for a driver message of the given severity
pub fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Debug
    } else {
        log::Level::Trace
    }
}

/// Short tag naming the message categories
pub fn category_tag(types: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if types.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "validation"
    } else if types.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "performance"
    } else {
        "general"
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message);

    log::log!(
        target: "vulkan",
        severity_level(message_severity),
        "[{}] {}",
        category_tag(message_type),
        message.to_string_lossy()
    );

    vk::FALSE
}
