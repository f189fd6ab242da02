use core::mem::size_of;
use std::sync::Arc;

use bytemuck::Pod;

use super::CpuBuffer;
use crate::{ComputePipeline, Dim3, LayerError};

/// A buffer bound at a kernel slot.
#[derive(Debug, Clone)]
pub struct Binding {
    pub buffer: CpuBuffer,
    /// Byte offset into `buffer`.
    pub offset: usize,
}

/// Position of the invoked thread, mirroring the builtins a device kernel receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadPosition {
    pub thread_position_in_grid: Dim3,
    pub threadgroup_position_in_grid: Dim3,
    pub thread_position_in_threadgroup: Dim3,
}

/// The buffers a host kernel invocation can access, indexed by slot.
pub struct KernelArgs<'a> {
    bindings: &'a [Option<Binding>],
}

impl<'a> KernelArgs<'a> {
    #[inline]
    pub fn new(bindings: &'a [Option<Binding>]) -> Self {
        KernelArgs { bindings }
    }

    #[inline]
    fn binding(&self, slot: usize) -> crate::Result<&Binding> {
        Ok(self
            .bindings
            .get(slot)
            .and_then(Option::as_ref)
            .ok_or(LayerError::MissingBinding)?)
    }

    /// Reads element `index` of type `T` from the buffer bound at `slot`.
    pub fn load<T: Pod>(&self, slot: usize, index: usize) -> crate::Result<T> {
        let binding = self.binding(slot)?;
        let start = binding.offset + index * size_of::<T>();
        binding.buffer.with_bytes(|bytes| -> crate::Result<T> {
            let bytes = bytes
                .get(start..start + size_of::<T>())
                .ok_or(LayerError::OutOfBounds)?;
            Ok(bytemuck::pod_read_unaligned(bytes))
        })
    }

    /// Writes `value` to element `index` of the buffer bound at `slot`.
    pub fn store<T: Pod>(&self, slot: usize, index: usize, value: T) -> crate::Result<()> {
        let binding = self.binding(slot)?;
        let start = binding.offset + index * size_of::<T>();
        binding.buffer.with_bytes_mut(|bytes| -> crate::Result<()> {
            let dst = bytes
                .get_mut(start..start + size_of::<T>())
                .ok_or(LayerError::OutOfBounds)?;
            dst.copy_from_slice(bytemuck::bytes_of(&value));
            Ok(())
        })
    }
}

/// A kernel compiled for the host. Called once per thread of a dispatch.
pub type HostKernelFn = fn(&ThreadPosition, &KernelArgs<'_>) -> crate::Result<()>;

struct CpuKernel {
    name: String,
    thread_execution_width: usize,
    element_size: usize,
    function: HostKernelFn,
}

#[derive(Clone)]
pub struct CpuPipeline {
    kernel: Arc<CpuKernel>,
}

impl CpuPipeline {
    pub fn new(
        name: &str,
        thread_execution_width: usize,
        element_size: usize,
        function: HostKernelFn,
    ) -> Self {
        CpuPipeline {
            kernel: Arc::new(CpuKernel {
                name: name.to_string(),
                thread_execution_width,
                element_size,
                function,
            }),
        }
    }

    #[inline]
    pub fn ptr_eq(&self, other: &CpuPipeline) -> bool {
        Arc::ptr_eq(&self.kernel, &other.kernel)
    }

    /// Runs every thread of the grid described by `threadgroups` and `threads_per_threadgroup`.
    pub fn execute(
        &self,
        threadgroups: Dim3,
        threads_per_threadgroup: Dim3,
        bindings: &[Option<Binding>],
    ) -> crate::Result<()> {
        let args = KernelArgs::new(bindings);
        for gz in 0..threadgroups.depth {
            for gy in 0..threadgroups.height {
                for gx in 0..threadgroups.width {
                    let group = Dim3::new(gx, gy, gz);
                    for tz in 0..threads_per_threadgroup.depth {
                        for ty in 0..threads_per_threadgroup.height {
                            for tx in 0..threads_per_threadgroup.width {
                                let local = Dim3::new(tx, ty, tz);
                                let position = ThreadPosition {
                                    thread_position_in_grid: Dim3::new(
                                        gx * threads_per_threadgroup.width + tx,
                                        gy * threads_per_threadgroup.height + ty,
                                        gz * threads_per_threadgroup.depth + tz,
                                    ),
                                    threadgroup_position_in_grid: group,
                                    thread_position_in_threadgroup: local,
                                };
                                (self.kernel.function)(&position, &args)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl ComputePipeline for CpuPipeline {
    #[inline]
    fn kernel_name(&self) -> &str {
        &self.kernel.name
    }

    #[inline]
    fn thread_execution_width(&self) -> usize {
        self.kernel.thread_execution_width
    }

    #[inline]
    fn element_size(&self) -> Option<usize> {
        Some(self.kernel.element_size)
    }
}

impl core::fmt::Debug for CpuPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CpuPipeline")
            .field("kernel_name", &self.kernel.name)
            .field("thread_execution_width", &self.kernel.thread_execution_width)
            .field("element_size", &self.kernel.element_size)
            .finish()
    }
}
