mod command;
mod descriptor;
mod pipeline;

pub use command::*;
pub use descriptor::*;
pub use pipeline::*;

use std::rc::Rc;

use ash::vk::{DescriptorSetLayout, Pipeline, PipelineLayout, ShaderModule};

use super::Context;
use crate::{
    ComputePipeline,
    wgsl::{ShaderBinding, Spirv},
};

struct PipelineInner {
    context: Rc<Context>,
    kernel_name: String,
    pipeline: Pipeline,
    shader_module: ShaderModule,
    pipeline_layout: PipelineLayout,
    descriptor_set_layout: DescriptorSetLayout,
    bindings: Vec<ShaderBinding>,
    workgroup_size: [u32; 3],
    push_constant_size: u32,
    element_size: Option<u32>,
}

impl Drop for PipelineInner {
    #[inline]
    fn drop(&mut self) {
        let device = &self.context.device;
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
            device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
            device.destroy_shader_module(self.shader_module, None);
        }
    }
}

/// A compiled compute pipeline. Clones share the same Vulkan objects.
#[derive(Clone)]
pub struct VkPipeline {
    inner: Rc<PipelineInner>,
}

impl VkPipeline {
    pub fn new(context: Rc<Context>, kernel_name: &str, spirv: &Spirv) -> crate::Result<Self> {
        let device = &context.device;
        let shader_module = create_shader_module(device, spirv.as_slice())?;

        let descriptor_set_layout = match create_descriptor_set_layout(device, spirv.bindings()) {
            Ok(layout) => layout,
            Err(err) => {
                unsafe { device.destroy_shader_module(shader_module, None) };
                return Err(err.into());
            }
        };

        let (pipeline, pipeline_layout) =
            match create_pipeline(
                device,
                descriptor_set_layout,
                shader_module,
                spirv.push_constant_size(),
            ) {
                Ok(pipeline) => pipeline,
                Err(err) => {
                    unsafe {
                        device.destroy_descriptor_set_layout(descriptor_set_layout, None);
                        device.destroy_shader_module(shader_module, None);
                    }
                    return Err(err.into());
                }
            };

        Ok(VkPipeline {
            inner: Rc::new(PipelineInner {
                kernel_name: kernel_name.to_string(),
                pipeline,
                shader_module,
                pipeline_layout,
                descriptor_set_layout,
                bindings: spirv.bindings().to_vec(),
                workgroup_size: spirv.workgroup_size(),
                push_constant_size: spirv.push_constant_size(),
                element_size: spirv.element_size(),
                context,
            }),
        })
    }

    #[inline]
    pub fn raw(&self) -> Pipeline {
        self.inner.pipeline
    }

    #[inline]
    pub fn layout(&self) -> PipelineLayout {
        self.inner.pipeline_layout
    }

    #[inline]
    pub fn descriptor_set_layout(&self) -> DescriptorSetLayout {
        self.inner.descriptor_set_layout
    }

    #[inline]
    pub fn bindings(&self) -> &[ShaderBinding] {
        &self.inner.bindings
    }

    #[inline]
    pub fn workgroup_size(&self) -> [u32; 3] {
        self.inner.workgroup_size
    }

    /// Size of the kernel's push constant block, one `u32` offset remainder per slot.
    #[inline]
    pub fn push_constant_size(&self) -> u32 {
        self.inner.push_constant_size
    }
}

impl ComputePipeline for VkPipeline {
    #[inline]
    fn kernel_name(&self) -> &str {
        &self.inner.kernel_name
    }

    #[inline]
    fn thread_execution_width(&self) -> usize {
        self.inner.workgroup_size[0] as usize
    }

    #[inline]
    fn element_size(&self) -> Option<usize> {
        self.inner.element_size.map(|stride| stride as usize)
    }
}

impl core::fmt::Debug for VkPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VkPipeline")
            .field("kernel_name", &self.inner.kernel_name)
            .field("workgroup_size", &self.inner.workgroup_size)
            .field("bindings", &self.inner.bindings)
            .field("push_constant_size", &self.inner.push_constant_size)
            .field("element_size", &self.inner.element_size)
            .finish()
    }
}
