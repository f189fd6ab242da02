use ash::{
    Device,
    prelude::VkResult,
    vk::{self, CommandBuffer, CommandPool},
};

pub fn allocate_command_buffer(
    device: &Device,
    command_pool: CommandPool,
) -> VkResult<CommandBuffer> {
    let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(command_pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);
    Ok(unsafe { device.allocate_command_buffers(&command_buffer_allocate_info) }?[0])
}

/// Makes shader writes of earlier dispatches visible to `dst_stage`.
pub fn compute_write_barrier(
    device: &Device,
    command_buffer: CommandBuffer,
    dst_stage: vk::PipelineStageFlags,
    dst_access: vk::AccessFlags,
) {
    let memory_barrier = vk::MemoryBarrier::default()
        .src_access_mask(vk::AccessFlags::SHADER_WRITE)
        .dst_access_mask(dst_access);
    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            dst_stage,
            vk::DependencyFlags::empty(),
            core::slice::from_ref(&memory_barrier),
            &[],
            &[],
        )
    }
}
