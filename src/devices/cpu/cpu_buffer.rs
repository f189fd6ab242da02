use core::cell::RefCell;
use std::rc::Rc;

use crate::{DeviceBuffer, flag::StorageMode};

struct CpuAllocation {
    data: RefCell<Vec<u8>>,
    label: RefCell<Option<String>>,
    mode: StorageMode,
}

/// Host memory standing in for device memory.
/// Clones share the same allocation.
#[derive(Clone)]
pub struct CpuBuffer {
    inner: Rc<CpuAllocation>,
}

impl CpuBuffer {
    pub fn new(len: usize, mode: StorageMode) -> Self {
        CpuBuffer::from_vec(vec![0; len], mode)
    }

    pub fn from_vec(data: Vec<u8>, mode: StorageMode) -> Self {
        CpuBuffer {
            inner: Rc::new(CpuAllocation {
                data: RefCell::new(data),
                label: RefCell::new(None),
                mode,
            }),
        }
    }

    /// Returns `true` if both handles refer to the same allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &CpuBuffer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Copies `bytes` into the buffer, starting at `offset` bytes.
    pub fn write_bytes(&self, offset: usize, bytes: &[u8]) -> crate::Result<()> {
        let mut data = self.inner.data.borrow_mut();
        let dst = data
            .get_mut(offset..offset + bytes.len())
            .ok_or(crate::LayerError::OutOfBounds)?;
        dst.copy_from_slice(bytes);
        Ok(())
    }

    #[inline]
    pub(super) fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.inner.data.borrow())
    }

    #[inline]
    pub(super) fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.inner.data.borrow_mut())
    }
}

impl DeviceBuffer for CpuBuffer {
    #[inline]
    fn len(&self) -> usize {
        self.inner.data.borrow().len()
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

    #[inline]
    fn read_bytes(&self) -> Vec<u8> {
        self.inner.data.borrow().clone()
    }
}

impl core::fmt::Debug for CpuBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CpuBuffer")
            .field("len", &self.len())
            .field("label", &self.label())
            .field("mode", &self.inner.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::CpuBuffer;
    use crate::{DeviceBuffer, flag::StorageMode};

    #[test]
    fn test_cpu_buffer_clone_shares_memory() {
        let buf = CpuBuffer::new(8, StorageMode::Shared);
        let shallow = buf.clone();
        shallow.write_bytes(4, &[1, 2, 3, 4]).unwrap();

        assert!(buf.ptr_eq(&shallow));
        assert_eq!(buf.read_bytes(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_cpu_buffer_write_out_of_bounds() {
        let buf = CpuBuffer::new(4, StorageMode::Shared);
        assert!(buf.write_bytes(2, &[0; 4]).is_err());
    }

    #[test]
    fn test_cpu_buffer_label() {
        let buf = CpuBuffer::new(4, StorageMode::WriteCombined);
        assert_eq!(buf.label(), None);
        buf.set_label("dims");
        assert_eq!(buf.label().as_deref(), Some("dims"));
        assert_eq!(buf.storage_mode(), StorageMode::WriteCombined);
    }
}
