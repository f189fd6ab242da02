use std::{collections::HashMap, rc::Rc};

use super::{Context, VkPipeline};
use crate::{KernelLibrary, LayerError, Vulkan, wgsl::Spirv};

/// WGSL source of the `transpose` kernel.
pub const TRANSPOSE_WGSL: &str = include_str!("kernels/transpose.wgsl");

/// Named WGSL kernels, compiled to SPIR-V when a pipeline is requested.
/// Every kernel declares its entry point as `main`.
#[derive(Clone)]
pub struct VkLibrary {
    context: Rc<Context>,
    sources: HashMap<String, String>,
}

impl VkLibrary {
    #[inline]
    pub fn new(context: Rc<Context>) -> Self {
        VkLibrary {
            context,
            sources: HashMap::new(),
        }
    }

    pub fn with_default_kernels(context: Rc<Context>) -> Self {
        let mut library = VkLibrary::new(context);
        library.insert_source(crate::TransposeLayer::<Vulkan>::KERNEL_NAME, TRANSPOSE_WGSL);
        library
    }

    /// Adds the WGSL `src` under `name`, replacing a kernel of the same name.
    pub fn insert_source(&mut self, name: &str, src: impl Into<String>) {
        self.sources.insert(name.to_string(), src.into());
    }

    #[inline]
    pub fn remove(&mut self, name: &str) -> bool {
        self.sources.remove(name).is_some()
    }
}

impl KernelLibrary<Vulkan> for VkLibrary {
    #[inline]
    fn has_kernel(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    fn kernel_names(&self) -> Vec<String> {
        let mut names = self.sources.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    fn new_compute_pipeline(&self, name: &str) -> crate::Result<VkPipeline> {
        let src = self.sources.get(name).ok_or(LayerError::KernelNotFound)?;
        let spirv = Spirv::from_wgsl(src)?;
        let pipeline = VkPipeline::new(self.context.clone(), name, &spirv)?;
        log::debug!(
            "compiled vulkan kernel '{name}' with workgroup size {:?}",
            spirv.workgroup_size()
        );
        Ok(pipeline)
    }
}
