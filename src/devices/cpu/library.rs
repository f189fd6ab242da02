use core::mem::size_of;
use std::collections::HashMap;

use super::{CpuPipeline, HostKernelFn, kernels};
use crate::{CPU, KernelLibrary, LayerError};

/// Execution width reported by the host kernels shipped with this crate.
pub const HOST_EXECUTION_WIDTH: usize = 32;

#[derive(Clone, Copy)]
struct HostKernel {
    thread_execution_width: usize,
    element_size: usize,
    function: HostKernelFn,
}

/// A set of named host kernels.
#[derive(Clone, Default)]
pub struct CpuLibrary {
    kernels: HashMap<String, HostKernel>,
}

impl CpuLibrary {
    /// Creates an empty library.
    #[inline]
    pub fn new() -> Self {
        CpuLibrary::default()
    }

    /// Creates a library containing the kernels shipped with this crate.
    pub fn with_default_kernels() -> Self {
        let mut library = CpuLibrary::new();
        library.register(
            crate::TransposeLayer::<CPU>::KERNEL_NAME,
            HOST_EXECUTION_WIDTH,
            size_of::<f32>(),
            kernels::transpose::<f32>,
        );
        library
    }

    /// Adds `function` under `name`, replacing a kernel of the same name.
    /// `element_size` is the width in bytes of the elements `function` moves.
    pub fn register(
        &mut self,
        name: &str,
        thread_execution_width: usize,
        element_size: usize,
        function: HostKernelFn,
    ) {
        self.kernels.insert(
            name.to_string(),
            HostKernel {
                thread_execution_width,
                element_size,
                function,
            },
        );
    }

    #[inline]
    pub fn remove(&mut self, name: &str) -> bool {
        self.kernels.remove(name).is_some()
    }
}

impl KernelLibrary<CPU> for CpuLibrary {
    #[inline]
    fn has_kernel(&self, name: &str) -> bool {
        self.kernels.contains_key(name)
    }

    fn kernel_names(&self) -> Vec<String> {
        let mut names = self.kernels.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    fn new_compute_pipeline(&self, name: &str) -> crate::Result<CpuPipeline> {
        let kernel = self.kernels.get(name).ok_or(LayerError::KernelNotFound)?;
        log::debug!(
            "compiled host kernel '{name}' with execution width {}",
            kernel.thread_execution_width
        );
        Ok(CpuPipeline::new(
            name,
            kernel.thread_execution_width,
            kernel.element_size,
            kernel.function,
        ))
    }
}
