use std::rc::Rc;

use super::{Context, VkBuffer, VkCommandStream, VkLibrary, VkPipeline, chosen_vk_idx};
use crate::{Device, flag::StorageMode};

/// Runs WGSL kernels on a Vulkan compute queue.
///
/// All buffers are host visible and persistently mapped.
#[derive(Clone)]
pub struct Vulkan {
    context: Rc<Context>,
}

impl Vulkan {
    /// Opens the compute capable physical device at `idx`.
    #[inline]
    pub fn new(idx: usize) -> crate::Result<Vulkan> {
        Ok(Vulkan {
            context: Rc::new(Context::new(idx)?),
        })
    }

    /// Opens the device selected by the `BRAINCORE_VK_DEVICE_IDX` environment variable.
    #[inline]
    pub fn from_env() -> crate::Result<Vulkan> {
        Vulkan::new(chosen_vk_idx()?)
    }

    #[inline]
    pub fn context(&self) -> &Rc<Context> {
        &self.context
    }
}

impl Device for Vulkan {
    type Buffer = VkBuffer;
    type Pipeline = VkPipeline;
    type Library = VkLibrary;
    type CommandStream = VkCommandStream;

    #[inline]
    fn new_buffer(&self, len: usize, mode: StorageMode) -> crate::Result<VkBuffer> {
        VkBuffer::new(self.context.clone(), len, mode)
    }

    #[inline]
    fn new_buffer_with_bytes(&self, bytes: &[u8], mode: StorageMode) -> crate::Result<VkBuffer> {
        VkBuffer::from_bytes(self.context.clone(), bytes, mode)
    }

    #[inline]
    fn default_library(&self) -> crate::Result<VkLibrary> {
        Ok(VkLibrary::with_default_kernels(self.context.clone()))
    }

    #[inline]
    fn command_stream(&self) -> crate::Result<VkCommandStream> {
        VkCommandStream::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Device, DeviceBuffer, Vulkan, vulkan::chosen_vk_idx};

    #[test]
    fn test_vulkan_buffer_roundtrip() -> crate::Result<()> {
        let device = Vulkan::new(chosen_vk_idx()?)?;
        let buf = device.buffer_from_slice(&[1f32, 2., 3., 4.])?;
        assert_eq!(buf.len(), 16);
        assert_eq!(device.read::<f32>(&buf), [1., 2., 3., 4.]);
        Ok(())
    }

    #[test]
    fn test_vulkan_invalid_device_idx() {
        assert!(Vulkan::new(usize::MAX).is_err());
    }
}
