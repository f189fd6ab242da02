use core::cell::RefCell;
use std::rc::Rc;

use ash::{
    prelude::VkResult,
    vk::{self, BufferUsageFlags, MemoryPropertyFlags},
};

use super::context::Context;
use crate::{DeviceBuffer, LayerError, flag::StorageMode};

struct VkAllocation {
    len: usize,
    buf: vk::Buffer,
    mem: vk::DeviceMemory,
    mapped_ptr: *mut u8,
    mode: StorageMode,
    label: RefCell<Option<String>>,
    context: Rc<Context>,
}

impl Drop for VkAllocation {
    #[inline]
    fn drop(&mut self) {
        unsafe {
            self.context.unmap_memory(self.mem);
            self.context.free_memory(self.mem, None);
            self.context.destroy_buffer(self.buf, None)
        }
    }
}

/// A persistently mapped, host visible Vulkan storage buffer.
/// Clones share the same allocation.
#[derive(Clone)]
pub struct VkBuffer {
    inner: Rc<VkAllocation>,
}

impl VkBuffer {
    /// Allocates a zeroed buffer of `len` bytes.
    pub fn new(context: Rc<Context>, len: usize, mode: StorageMode) -> crate::Result<Self> {
        // zero sized buffers are invalid in vulkan
        let alloc_len = len.max(1);
        let usage = BufferUsageFlags::STORAGE_BUFFER
            | BufferUsageFlags::TRANSFER_SRC
            | BufferUsageFlags::TRANSFER_DST;
        let buf = unsafe { create_buffer(&context, usage, alloc_len)? };
        let mem_req = unsafe { context.get_buffer_memory_requirements(buf) };

        let mem = match unsafe { allocate_memory(&context, mem_req, mode) } {
            Ok(mem) => mem,
            Err(err) => {
                unsafe { context.destroy_buffer(buf, None) };
                return Err(err);
            }
        };

        let mapped = unsafe {
            context.bind_buffer_memory(buf, mem, 0).and_then(|_| {
                context.map_memory(mem, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
            })
        };
        let mapped_ptr = match mapped {
            Ok(ptr) => ptr as *mut u8,
            Err(err) => {
                unsafe {
                    context.free_memory(mem, None);
                    context.destroy_buffer(buf, None);
                }
                return Err(err.into());
            }
        };
        unsafe { core::ptr::write_bytes(mapped_ptr, 0, alloc_len) };

        Ok(VkBuffer {
            inner: Rc::new(VkAllocation {
                len,
                buf,
                mem,
                mapped_ptr,
                mode,
                label: RefCell::new(None),
                context,
            }),
        })
    }

    #[inline]
    pub fn from_bytes(
        context: Rc<Context>,
        bytes: &[u8],
        mode: StorageMode,
    ) -> crate::Result<Self> {
        let buf = VkBuffer::new(context, bytes.len(), mode)?;
        buf.write_bytes(0, bytes)?;
        Ok(buf)
    }

    /// The raw buffer handle.
    #[inline]
    pub fn raw(&self) -> vk::Buffer {
        self.inner.buf
    }

    #[inline]
    pub fn ptr_eq(&self, other: &VkBuffer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Copies `bytes` into the buffer, starting at `offset` bytes.
    pub fn write_bytes(&self, offset: usize, bytes: &[u8]) -> crate::Result<()> {
        if offset + bytes.len() > self.inner.len {
            return Err(LayerError::OutOfBounds.into());
        }
        unsafe {
            core::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.inner.mapped_ptr.add(offset),
                bytes.len(),
            )
        };
        Ok(())
    }
}

impl DeviceBuffer for VkBuffer {
    #[inline]
    fn len(&self) -> usize {
        self.inner.len
    }

    #[inline]
    fn label(&self) -> Option<String> {
        self.inner.label.borrow().clone()
    }

    #[inline]
    fn set_label(&self, label: &str) {
        *self.inner.label.borrow_mut() = Some(label.to_string());
    }

    #[inline]
    fn storage_mode(&self) -> StorageMode {
        self.inner.mode
    }

    fn read_bytes(&self) -> Vec<u8> {
        unsafe { std::slice::from_raw_parts(self.inner.mapped_ptr, self.inner.len) }.to_vec()
    }
}

impl core::fmt::Debug for VkBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VkBuffer")
            .field("buf", &self.inner.buf)
            .field("len", &self.inner.len)
            .field("label", &self.label())
            .field("mode", &self.inner.mode)
            .finish()
    }
}

fn get_memory_type_index(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    memory_type_bits: u32,
    property_flags: MemoryPropertyFlags,
) -> Option<u32> {
    (0..memory_properties.memory_type_count).find(|&i| {
        let mt = &memory_properties.memory_types[i as usize];
        (memory_type_bits & (1 << i)) != 0 && mt.property_flags.contains(property_flags)
    })
}

/// Memory types to try for `mode`, most preferred first.
fn preferred_memory_flags(mode: StorageMode) -> [MemoryPropertyFlags; 2] {
    let host = MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT;
    match mode {
        // read back by the host
        StorageMode::Shared => [host | MemoryPropertyFlags::HOST_CACHED, host],
        // only written by the host
        StorageMode::WriteCombined => [host | MemoryPropertyFlags::DEVICE_LOCAL, host],
    }
}

unsafe fn create_buffer(
    device: &ash::Device,
    usage: BufferUsageFlags,
    size: usize,
) -> VkResult<vk::Buffer> {
    let buffer_create_info = vk::BufferCreateInfo::default()
        .size(size as vk::DeviceSize)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);
    unsafe { device.create_buffer(&buffer_create_info, None) }
}

unsafe fn allocate_memory(
    context: &Context,
    mem_req: vk::MemoryRequirements,
    mode: StorageMode,
) -> crate::Result<vk::DeviceMemory> {
    let memory_type_index = preferred_memory_flags(mode)
        .into_iter()
        .find_map(|flags| {
            get_memory_type_index(&context.memory_properties, mem_req.memory_type_bits, flags)
        })
        .ok_or(LayerError::NoSuitableMemoryType)?;

    let memory_allocate_info = vk::MemoryAllocateInfo::default()
        .allocation_size(mem_req.size)
        .memory_type_index(memory_type_index);
    Ok(unsafe { context.allocate_memory(&memory_allocate_info, None)? })
}

#[cfg(test)]
mod tests {
    use super::{get_memory_type_index, preferred_memory_flags};
    use crate::flag::StorageMode;
    use ash::vk::{self, MemoryPropertyFlags};

    #[test]
    fn test_memory_type_index_respects_type_bits() {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: 2,
            ..Default::default()
        };
        let host = MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT;
        props.memory_types[0].property_flags = host;
        props.memory_types[1].property_flags = host | MemoryPropertyFlags::HOST_CACHED;

        assert_eq!(get_memory_type_index(&props, 0b11, host), Some(0));
        assert_eq!(get_memory_type_index(&props, 0b10, host), Some(1));
        assert_eq!(
            get_memory_type_index(&props, 0b11, MemoryPropertyFlags::DEVICE_LOCAL),
            None
        );
    }

    #[test]
    fn test_preferred_flags_fall_back_to_host_coherent() {
        let host = MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT;
        for mode in [StorageMode::Shared, StorageMode::WriteCombined] {
            let flags = preferred_memory_flags(mode);
            assert!(flags[0].contains(host));
            assert_eq!(flags[1], host);
        }
    }
}

#[cfg(test)]
mod device_tests {
    use std::rc::Rc;

    use super::VkBuffer;
    use crate::{DeviceBuffer, flag::StorageMode, vulkan::Context};

    #[test]
    fn test_vk_buffer_from_bytes() {
        let context = Rc::new(Context::new(0).unwrap());
        let buf = VkBuffer::from_bytes(context, &[1, 2, 3, 4, 5, 6], StorageMode::Shared).unwrap();
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.read_bytes(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_vk_buffer_empty() {
        let context = Rc::new(Context::new(0).unwrap());
        let buf = VkBuffer::new(context, 0, StorageMode::WriteCombined).unwrap();
        assert!(buf.is_empty());
        assert!(buf.read_bytes().is_empty());
    }
}
