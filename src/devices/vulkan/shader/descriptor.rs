use ash::{
    Device,
    prelude::VkResult,
    vk::{self, DescriptorPool, DescriptorSet, DescriptorSetLayout},
};

use crate::wgsl::{BindingKind, ShaderBinding};

#[inline]
pub fn descriptor_type(kind: BindingKind) -> vk::DescriptorType {
    match kind {
        BindingKind::Storage { .. } => vk::DescriptorType::STORAGE_BUFFER,
        BindingKind::Uniform => vk::DescriptorType::UNIFORM_BUFFER,
    }
}

pub fn create_descriptor_set_layout(
    device: &Device,
    bindings: &[ShaderBinding],
) -> VkResult<DescriptorSetLayout> {
    let descriptor_set_layout_bindings = bindings
        .iter()
        .map(|binding| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding.slot)
                .descriptor_type(descriptor_type(binding.kind))
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::COMPUTE)
        })
        .collect::<Vec<_>>();

    let descriptor_set_layout_create_info =
        vk::DescriptorSetLayoutCreateInfo::default().bindings(&descriptor_set_layout_bindings);

    unsafe { device.create_descriptor_set_layout(&descriptor_set_layout_create_info, None) }
}

/// Creates a pool holding exactly one descriptor set for `bindings`.
pub fn create_descriptor_pool(
    device: &Device,
    bindings: &[ShaderBinding],
) -> VkResult<DescriptorPool> {
    let mut pool_sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    for binding in bindings {
        let ty = descriptor_type(binding.kind);
        match pool_sizes.iter_mut().find(|size| size.ty == ty) {
            Some(size) => size.descriptor_count += 1,
            None => pool_sizes.push(vk::DescriptorPoolSize {
                ty,
                descriptor_count: 1,
            }),
        }
    }

    let descriptor_pool_create_info = vk::DescriptorPoolCreateInfo::default()
        .max_sets(1)
        .pool_sizes(&pool_sizes);

    unsafe { device.create_descriptor_pool(&descriptor_pool_create_info, None) }
}

pub fn allocate_descriptor_set(
    device: &Device,
    descriptor_pool: DescriptorPool,
    descriptor_set_layout: DescriptorSetLayout,
) -> VkResult<DescriptorSet> {
    let descriptor_set_allocate_info = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(descriptor_pool)
        .set_layouts(core::slice::from_ref(&descriptor_set_layout));

    Ok(unsafe { device.allocate_descriptor_sets(&descriptor_set_allocate_info) }?[0])
}
