use crate::device::*;

use anyhow::{Context as _, Result};
use ash::{
    extensions::ext::DebugUtils,
    Entry,
    Instance,
    vk,
};
use std::{
    borrow::Cow,
    ffi::{CStr, CString},
    ops::Deref,
    os::raw::{c_char, c_void},
    sync::Arc,
};

// Reexport
pub use vk::{
    DebugUtilsMessageSeverityFlagsEXT as MessageSeverity,
    DebugUtilsMessageTypeFlagsEXT as MessageType,
    DebugUtilsMessengerCallbackDataEXT as MessageData,
    DebugUtilsMessengerEXT as DebugUtilsMessenger
};



const VALIDATION_LAYER_NAME: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_LAYER_KHRONOS_validation\0") };

unsafe extern "system" fn debug_utils_messenger_callback(
    message_severity: MessageSeverity,
    message_type: MessageType,
    p_message_data: *const MessageData,
    _p_user_data: *mut c_void
) -> vk::Bool32 {
    if p_message_data.is_null() || (*p_message_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_message_data).p_message).to_string_lossy();

    match message_severity {
        MessageSeverity::ERROR => tracing::error!(?message_type, "{}", message),
        MessageSeverity::WARNING => tracing::warn!(?message_type, "{}", message),
        MessageSeverity::INFO => tracing::info!(?message_type, "{}", message),
        _ => tracing::trace!(?message_type, "{}", message),
    }

    vk::FALSE
}



pub struct ContextInfo {
    pub application_name: Cow<'static, str>,
    pub application_version: u32,
    /// Requests the Khronos validation layer and a debug messenger. Ignored if the layer is not installed.
    pub enable_validation: bool,
}

impl Default for ContextInfo {
    fn default() -> Self {
        Self {
            application_name: "Daxa Vulkan App".into(),
            application_version: 0,
            enable_validation: cfg!(debug_assertions)
        }
    }
}



#[derive(Clone)]
pub struct Context(pub(crate) Arc<ContextInternal>);

pub(crate) struct ContextInternal {
    _entry: Entry,
    pub instance: Instance,
    info: ContextInfo,
    debug_utils: Option<(DebugUtils, DebugUtilsMessenger)>,
}

impl Deref for Context {
    type Target = Instance;

    fn deref(&self) -> &Self::Target {
        &self.0.instance
    }
}

// Context creation methods
impl Context {
    pub fn new(
        info: ContextInfo
    ) -> Result<Self> {
        let entry = unsafe {
            Entry::load().context("Vulkan loader should be available.")?
        };

        // Validation is opt-in and only used when the layer and extension are installed
        let instance_layers = entry.enumerate_instance_layer_properties()
            .context("Instance layers should be enumerated.")?;
        let instance_extensions = entry.enumerate_instance_extension_properties(None)
            .context("Instance extensions should be enumerated.")?;

        let has_layer = instance_layers.iter().any(|layer| unsafe {
            CStr::from_ptr(layer.layer_name.as_ptr()) == VALIDATION_LAYER_NAME
        });
        let has_debug_utils = instance_extensions.iter().any(|extension| unsafe {
            CStr::from_ptr(extension.extension_name.as_ptr()) == DebugUtils::name()
        });

        let enable_validation = info.enable_validation && has_layer;
        let enable_debug_utils = info.enable_validation && has_debug_utils;
        if info.enable_validation && !enable_validation {
            tracing::warn!("Validation was requested but {:?} is not installed.", VALIDATION_LAYER_NAME);
        }

        let mut layer_names: Vec<*const c_char> = vec![];
        if enable_validation {
            layer_names.push(VALIDATION_LAYER_NAME.as_ptr());
        }
        let mut extension_names: Vec<*const c_char> = vec![];
        if enable_debug_utils {
            extension_names.push(DebugUtils::name().as_ptr());
        }

        // Create Vulkan instance
        let application_name = CString::new(&*info.application_name)?;
        let engine_name = CString::new("daxa")?;
        let application_info = vk::ApplicationInfo::builder()
            .application_name(&application_name)
            .application_version(info.application_version)
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_3);
        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&application_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);
        let instance = unsafe {
            entry.create_instance(&create_info, None)
                .context("Instance should be created.")?
        };

        // Create debug messenger
        let debug_utils = match enable_debug_utils {
            true => {
                let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
                    .message_severity(
                        MessageSeverity::ERROR
                            | MessageSeverity::WARNING
                            | MessageSeverity::INFO
                            | MessageSeverity::VERBOSE,
                    )
                    .message_type(
                        MessageType::GENERAL
                            | MessageType::VALIDATION
                            | MessageType::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(debug_utils_messenger_callback));

                let debug_utils = DebugUtils::new(&entry, &instance);
                let debug_utils_messenger = unsafe {
                    debug_utils.create_debug_utils_messenger(&create_info, None)
                        .context("Debug messenger should be created.")?
                };

                Some((debug_utils, debug_utils_messenger))
            },
            false => None
        };

        tracing::info!(
            application = %info.application_name,
            validation = enable_validation,
            "Created Vulkan context"
        );

        Ok(Self(Arc::new(ContextInternal {
            _entry: entry,
            instance,
            info,
            debug_utils
        })))
    }
}

// Context usage methods
impl Context {
    pub fn create_device(
        &self,
        device_info: DeviceInfo
    ) -> Result<Device> {
        // Get physical devices
        let physical_devices = unsafe {
            self.enumerate_physical_devices()
                .context("Physical devices should be enumerated.")?
        };

        // Score physical devices with provided selector
        let device_score = |physical_device: &vk::PhysicalDevice| -> i32 {
            let device_properties = unsafe { self.get_physical_device_properties(*physical_device) };

            match device_properties.api_version < vk::API_VERSION_1_3 {
                true => -1,
                false => (device_info.selector)(&device_properties)
            }
        };

        let Some(physical_device) = physical_devices
            .iter()
            .copied()
            .max_by_key(|physical_device| device_score(physical_device))
            .filter(|physical_device| device_score(physical_device) >= 0) else {
                anyhow::bail!("No suitable device found.");
            };

        let device_properties = unsafe { self.get_physical_device_properties(physical_device) };

        Device::new(device_info, device_properties, self.clone(), physical_device)
            .context("Device should be created.")
    }

    #[inline]
    pub fn info(&self) -> &ContextInfo {
        &self.0.info
    }

    #[inline]
    pub(crate) fn debug_utils(&self) -> Option<&DebugUtils> {
        self.0.debug_utils.as_ref().map(|(debug_utils, _)| debug_utils)
    }
}

impl Drop for ContextInternal {
    fn drop(&mut self) {
        unsafe {
            // Safety: vkDestroyDebugUtilsMessengerEXT
            //  Host access to messenger must be externally synchronized
            //
            //  Messenger is private to this object
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            //  Safety: vkDestroyInstance
            //  Host access to instance must be externally synchronized
            //
            //  Devices created with this instance retain a reference, so this only drops after all Devices drop
            self.instance.destroy_instance(None);
        }
    }
}
