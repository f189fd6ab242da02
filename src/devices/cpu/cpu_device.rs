use super::{CpuBuffer, CpuCommandStream, CpuLibrary, CpuPipeline};
use crate::{Device, flag::StorageMode};

/// A `CPU` runs kernels on the host. Buffers live in host memory and every
/// dispatch is executed thread by thread when its command stream is committed.
///
/// # Example
/// ```
/// use braincore::{CommandStream, Device, ForwardLayer, TransposeLayer, CPU};
///
/// let device = CPU::new();
/// let mut layer = TransposeLayer::<CPU>::new(3);
/// layer.setup_in_library(&device.default_library()?)?;
///
/// let input = device.buffer_from_slice(&[1f32, 2., 3., 4., 5., 6.])?;
/// let output = device.buffer_from_slice(&[0f32; 6])?;
///
/// let mut stream = device.command_stream()?;
/// layer.encode_forward(&mut stream, 2, &input, 0, &output, 0)?;
/// stream.commit()?;
///
/// assert_eq!(device.read::<f32>(&output), [1., 4., 2., 5., 3., 6.]);
/// # Ok::<(), braincore::Error>(())
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CPU;

impl CPU {
    #[inline]
    #[must_use]
    pub fn new() -> CPU {
        CPU
    }
}

impl Device for CPU {
    type Buffer = CpuBuffer;
    type Pipeline = CpuPipeline;
    type Library = CpuLibrary;
    type CommandStream = CpuCommandStream;

    #[inline]
    fn new_buffer(&self, len: usize, mode: StorageMode) -> crate::Result<CpuBuffer> {
        Ok(CpuBuffer::new(len, mode))
    }

    #[inline]
    fn new_buffer_with_bytes(&self, bytes: &[u8], mode: StorageMode) -> crate::Result<CpuBuffer> {
        Ok(CpuBuffer::from_vec(bytes.to_vec(), mode))
    }

    #[inline]
    fn default_library(&self) -> crate::Result<CpuLibrary> {
        Ok(CpuLibrary::with_default_kernels())
    }

    #[inline]
    fn command_stream(&self) -> crate::Result<CpuCommandStream> {
        Ok(CpuCommandStream::new(*self))
    }
}
