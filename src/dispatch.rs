//! The compute-dispatch interface every backend implements.
//!
//! A [`Device`] names the handle types of a backend. Kernels are compiled into
//! [`ComputePipeline`]s by a [`KernelLibrary`], commands are recorded into a
//! [`CommandStream`] through scoped [`ComputeEncoder`]s and run on
//! [`CommandStream::commit`].

mod grid;
pub use grid::*;

use bytemuck::Pod;

use crate::flag::StorageMode;

/// A compute device and the handle types used to drive it.
pub trait Device: Sized {
    type Buffer: DeviceBuffer;
    type Pipeline: ComputePipeline;
    type Library: KernelLibrary<Self>;
    type CommandStream: CommandStream<Self>;

    /// Allocates a zero-initialized buffer of `len` bytes.
    fn new_buffer(&self, len: usize, mode: StorageMode) -> crate::Result<Self::Buffer>;

    /// Allocates a buffer holding a copy of `bytes`.
    fn new_buffer_with_bytes(&self, bytes: &[u8], mode: StorageMode)
        -> crate::Result<Self::Buffer>;

    /// Returns the library holding the kernels shipped with this crate.
    fn default_library(&self) -> crate::Result<Self::Library>;

    fn command_stream(&self) -> crate::Result<Self::CommandStream>;

    #[inline]
    fn buffer_from_slice<T: Pod>(&self, data: &[T]) -> crate::Result<Self::Buffer> {
        self.new_buffer_with_bytes(bytemuck::cast_slice(data), StorageMode::Shared)
    }

    /// Copies the contents of `buf` back to the host.
    #[inline]
    fn read<T: Pod>(&self, buf: &Self::Buffer) -> Vec<T> {
        bytemuck::pod_collect_to_vec(&buf.read_bytes())
    }
}

/// A handle to device memory. Cloning a handle does not copy the memory.
pub trait DeviceBuffer: Clone {
    /// Length in bytes.
    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn label(&self) -> Option<String>;
    fn set_label(&self, label: &str);
    fn storage_mode(&self) -> StorageMode;
    fn read_bytes(&self) -> Vec<u8>;
}

/// An executable, device-compiled kernel.
pub trait ComputePipeline: Clone {
    fn kernel_name(&self) -> &str;

    /// Number of threads the device prefers to run together along the first grid dimension.
    fn thread_execution_width(&self) -> usize;

    /// Width in bytes of the elements the kernel loads and stores, if it declares one.
    fn element_size(&self) -> Option<usize>;
}

pub trait KernelLibrary<D: Device> {
    fn has_kernel(&self, name: &str) -> bool;
    fn kernel_names(&self) -> Vec<String>;

    /// Looks up the kernel `name` and compiles it into a pipeline.
    /// Fails with [`LayerError::KernelNotFound`](crate::LayerError::KernelNotFound) if `name` is absent.
    fn new_compute_pipeline(&self, name: &str) -> crate::Result<D::Pipeline>;
}

/// Records compute passes. Passes run in the order they were encoded.
pub trait CommandStream<D: Device> {
    type Encoder<'a>: ComputeEncoder<D>
    where
        Self: 'a;

    fn device(&self) -> &D;
    fn compute_encoder(&mut self, label: &str) -> crate::Result<Self::Encoder<'_>>;

    /// Submits every recorded pass and blocks until the device finished them.
    fn commit(self) -> crate::Result<()>;
}

/// A scoped compute pass. Nothing reaches the stream before [`ComputeEncoder::end_encoding`].
pub trait ComputeEncoder<D: Device> {
    fn set_compute_pipeline(&mut self, pipeline: &D::Pipeline);

    /// Binds `buffer` at kernel slot `slot`, starting `offset` bytes into the buffer.
    fn set_buffer(&mut self, buffer: &D::Buffer, offset: usize, slot: usize);
    fn dispatch_threadgroups(&mut self, threadgroups: Dim3, threads_per_threadgroup: Dim3);
    fn end_encoding(self) -> crate::Result<()>;
}
