use ash::{
    Instance,
    prelude::VkResult,
    vk::{self, PhysicalDevice},
};

use crate::LayerError;

mod command_stream;
mod context;
mod library;
mod shader;
mod vk_buffer;
mod vulkan_device;

pub use command_stream::*;
pub use context::*;
pub use library::*;
pub use shader::VkPipeline;
pub use vk_buffer::*;
pub use vulkan_device::*;

/// Returns every physical device with its first compute capable queue family.
pub fn list_compute_devices(instance: &Instance) -> VkResult<Vec<(PhysicalDevice, usize)>> {
    let physical_devices = unsafe { instance.enumerate_physical_devices()? };

    let mut physical_dev_with_queue_idx = Vec::new();

    for device in physical_devices {
        let queue_family = unsafe { instance.get_physical_device_queue_family_properties(device) };
        if let Some(idx) = queue_family
            .iter()
            .position(|props| props.queue_flags.contains(vk::QueueFlags::COMPUTE))
        {
            physical_dev_with_queue_idx.push((device, idx));
        }
    }
    Ok(physical_dev_with_queue_idx)
}

/// Reads the environment variable `BRAINCORE_VK_DEVICE_IDX` and returns the value as a `usize`.
/// Defaults to 0 if the variable is not set.
pub fn chosen_vk_idx() -> crate::Result<usize> {
    match std::env::var("BRAINCORE_VK_DEVICE_IDX") {
        Ok(idx) => Ok(idx.trim().parse().map_err(|_| LayerError::InvalidDeviceIdx)?),
        Err(_) => Ok(0),
    }
}
