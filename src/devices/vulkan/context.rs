use core::ops::Deref;

use ash::{
    Device, Entry, Instance,
    vk::{
        self, CommandPool, InstanceCreateInfo, PhysicalDevice, PhysicalDeviceMemoryProperties,
        PhysicalDeviceProperties, Queue,
    },
};

use super::list_compute_devices;
use crate::LayerError;

/// Owns the Vulkan instance, the logical device and the compute queue.
pub struct Context {
    _entry: Entry,
    instance: Instance,
    pub physical_device: PhysicalDevice,
    pub compute_family_idx: usize,
    pub device: Device,
    pub queue: Queue,
    pub command_pool: CommandPool,
    pub device_props: PhysicalDeviceProperties,
    pub memory_properties: PhysicalDeviceMemoryProperties,
}

impl Context {
    pub fn new(device_idx: usize) -> crate::Result<Self> {
        let entry = unsafe { Entry::load()? };
        let app_info = vk::ApplicationInfo::default()
            .application_name(c"braincore")
            .api_version(vk::API_VERSION_1_0);

        let instance_info = InstanceCreateInfo::default().application_info(&app_info);
        let instance = unsafe { entry.create_instance(&instance_info, None)? };

        let selected = match list_compute_devices(&instance) {
            Ok(devices) => devices.get(device_idx).copied(),
            Err(err) => {
                unsafe { instance.destroy_instance(None) };
                return Err(err.into());
            }
        };
        let Some((physical_device, compute_family_idx)) = selected else {
            unsafe { instance.destroy_instance(None) };
            return Err(LayerError::InvalidDeviceIdx.into());
        };

        let queue_priorities = [1.0];
        let queue_info = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(compute_family_idx as u32)
            .queue_priorities(&queue_priorities);

        let device_features = vk::PhysicalDeviceFeatures::default();
        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(core::slice::from_ref(&queue_info))
            .enabled_features(&device_features);

        let device = unsafe { instance.create_device(physical_device, &device_create_info, None)? };
        let queue = unsafe { device.get_device_queue(compute_family_idx as u32, 0) };

        let device_props = unsafe { instance.get_physical_device_properties(physical_device) };

        let command_pool_create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(compute_family_idx as u32)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool = unsafe { device.create_command_pool(&command_pool_create_info, None) }?;

        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };

        log::debug!(
            "vulkan device {device_idx}: {:?}, compute queue family {compute_family_idx}",
            device_props.device_name_as_c_str().unwrap_or(c"unknown"),
        );

        Ok(Context {
            _entry: entry,
            instance,
            physical_device,
            compute_family_idx,
            device,
            queue,
            command_pool,
            device_props,
            memory_properties,
        })
    }

    /// Byte alignment storage buffer offsets must satisfy.
    #[inline]
    pub fn min_storage_buffer_offset_alignment(&self) -> u64 {
        self.device_props.limits.min_storage_buffer_offset_alignment
    }
}

impl Deref for Context {
    type Target = ash::Device;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.device
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        unsafe {
            // nothing to do if the device is lost
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
