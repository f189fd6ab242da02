use ash::{
    Device,
    prelude::VkResult,
    vk::{self, DescriptorSetLayout, Pipeline, PipelineCache, PipelineLayout, ShaderModule},
};

pub fn create_shader_module(device: &Device, code: &[u32]) -> VkResult<ShaderModule> {
    let shader_module_create_info = vk::ShaderModuleCreateInfo::default().code(code);
    unsafe { device.create_shader_module(&shader_module_create_info, None) }
}

/// Push constant ranges of a compute kernel with a `push_constant_size` byte block.
pub fn push_constant_ranges(push_constant_size: u32) -> Vec<vk::PushConstantRange> {
    if push_constant_size == 0 {
        return Vec::new();
    }
    vec![
        vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::COMPUTE)
            .offset(0)
            .size(push_constant_size),
    ]
}

pub fn create_pipeline(
    device: &Device,
    descriptor_set_layout: DescriptorSetLayout,
    shader_module: ShaderModule,
    push_constant_size: u32,
) -> VkResult<(Pipeline, PipelineLayout)> {
    let push_constant_ranges = push_constant_ranges(push_constant_size);
    let pipeline_layout = {
        let pipeline_layout_create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(core::slice::from_ref(&descriptor_set_layout))
            .push_constant_ranges(&push_constant_ranges);
        unsafe { device.create_pipeline_layout(&pipeline_layout_create_info, None) }?
    };

    let stage = vk::PipelineShaderStageCreateInfo::default()
        .stage(vk::ShaderStageFlags::COMPUTE)
        .module(shader_module)
        .name(c"main");
    let pipeline_create_info = vk::ComputePipelineCreateInfo::default()
        .stage(stage)
        .layout(pipeline_layout);

    let pipeline = unsafe {
        device.create_compute_pipelines(
            PipelineCache::null(),
            core::slice::from_ref(&pipeline_create_info),
            None,
        )
    };
    match pipeline {
        Ok(pipelines) => Ok((pipelines[0], pipeline_layout)),
        Err((_, err)) => {
            unsafe { device.destroy_pipeline_layout(pipeline_layout, None) };
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use ash::vk;

    use super::push_constant_ranges;

    #[test]
    fn test_push_constant_range_covers_block() {
        assert!(push_constant_ranges(0).is_empty());

        let ranges = push_constant_ranges(12);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].stage_flags, vk::ShaderStageFlags::COMPUTE);
        assert_eq!(ranges[0].offset, 0);
        assert_eq!(ranges[0].size, 12);
    }
}
