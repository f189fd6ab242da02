use ash::vk;

use super::{
    VkBuffer, VkPipeline,
    shader::{
        allocate_command_buffer, allocate_descriptor_set, compute_write_barrier,
        create_descriptor_pool, descriptor_type,
    },
};
use crate::{CommandStream, ComputeEncoder, ComputePipeline, Dim3, LayerError, Vulkan};

/// Records compute passes into a primary command buffer.
/// Buffers and pipelines used by a pass are kept alive until the stream is dropped.
pub struct VkCommandStream {
    device: Vulkan,
    command_buffer: vk::CommandBuffer,
    descriptor_pools: Vec<vk::DescriptorPool>,
    retained_buffers: Vec<VkBuffer>,
    retained_pipelines: Vec<VkPipeline>,
    dispatch_count: usize,
}

impl VkCommandStream {
    pub fn new(device: Vulkan) -> crate::Result<Self> {
        let context = device.context();
        let command_buffer = allocate_command_buffer(&context.device, context.command_pool)?;
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        if let Err(err) = unsafe { context.begin_command_buffer(command_buffer, &begin_info) } {
            unsafe { context.free_command_buffers(context.command_pool, &[command_buffer]) };
            return Err(err.into());
        }

        Ok(VkCommandStream {
            device,
            command_buffer,
            descriptor_pools: Vec::new(),
            retained_buffers: Vec::new(),
            retained_pipelines: Vec::new(),
            dispatch_count: 0,
        })
    }

    /// Number of dispatches recorded so far.
    #[inline]
    pub fn dispatch_count(&self) -> usize {
        self.dispatch_count
    }

    fn record_dispatch(&mut self, dispatch: PendingDispatch) -> crate::Result<()> {
        let context = self.device.context().clone();
        let device = &context.device;
        let pipeline = dispatch.pipeline;

        let groups = [
            dispatch.threadgroups.width,
            dispatch.threadgroups.height,
            dispatch.threadgroups.depth,
        ]
        .map(u32::try_from);
        let [Ok(x), Ok(y), Ok(z)] = groups else {
            return Err(LayerError::DimensionOverflow.into());
        };

        let alignment = context.min_storage_buffer_offset_alignment();
        let mut remainders = vec![0u32; pipeline.push_constant_size() as usize / 4];
        let mut buffer_infos = Vec::with_capacity(pipeline.bindings().len());
        for shader_binding in pipeline.bindings() {
            let slot = shader_binding.slot as usize;
            let binding = dispatch.bindings.get(slot).and_then(Option::as_ref);
            let Some((buffer, offset)) = binding else {
                return Err(LayerError::MissingBinding.into());
            };
            let (bound, remainder) = split_offset(*offset, alignment);
            if remainder != 0 {
                let Some(word) = remainders.get_mut(slot) else {
                    return Err(LayerError::MisalignedOffset.into());
                };
                *word = remainder;
            }
            buffer_infos.push(
                vk::DescriptorBufferInfo::default()
                    .buffer(buffer.raw())
                    .offset(bound)
                    .range(vk::WHOLE_SIZE),
            );
        }

        let descriptor_pool = create_descriptor_pool(device, pipeline.bindings())?;
        self.descriptor_pools.push(descriptor_pool);
        let descriptor_set =
            allocate_descriptor_set(device, descriptor_pool, pipeline.descriptor_set_layout())?;

        let writes = pipeline
            .bindings()
            .iter()
            .zip(&buffer_infos)
            .map(|(shader_binding, info)| {
                vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(shader_binding.slot)
                    .descriptor_type(descriptor_type(shader_binding.kind))
                    .buffer_info(core::slice::from_ref(info))
            })
            .collect::<Vec<_>>();

        unsafe {
            device.update_descriptor_sets(&writes, &[]);

            if self.dispatch_count > 0 {
                compute_write_barrier(
                    device,
                    self.command_buffer,
                    vk::PipelineStageFlags::COMPUTE_SHADER,
                    vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
                );
            }
            device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                pipeline.raw(),
            );
            device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                pipeline.layout(),
                0,
                &[descriptor_set],
                &[],
            );
            if !remainders.is_empty() {
                device.cmd_push_constants(
                    self.command_buffer,
                    pipeline.layout(),
                    vk::ShaderStageFlags::COMPUTE,
                    0,
                    bytemuck::cast_slice(&remainders),
                );
            }
            device.cmd_dispatch(self.command_buffer, x, y, z);
        }

        self.retained_buffers.extend(
            dispatch
                .bindings
                .into_iter()
                .flatten()
                .map(|(buffer, _)| buffer),
        );
        self.retained_pipelines.push(pipeline);
        self.dispatch_count += 1;
        Ok(())
    }
}

impl CommandStream<Vulkan> for VkCommandStream {
    type Encoder<'a> = VkComputeEncoder<'a>;

    #[inline]
    fn device(&self) -> &Vulkan {
        &self.device
    }

    #[inline]
    fn compute_encoder(&mut self, label: &str) -> crate::Result<VkComputeEncoder<'_>> {
        Ok(VkComputeEncoder {
            stream: self,
            label: label.to_string(),
            pipeline: None,
            bindings: Vec::new(),
            dispatches: Vec::new(),
            error: None,
        })
    }

    fn commit(self) -> crate::Result<()> {
        let context = self.device.context();
        log::debug!("submitting {} vulkan dispatches", self.dispatch_count);

        unsafe {
            // shader writes must be visible to host reads of mapped memory
            compute_write_barrier(
                &context.device,
                self.command_buffer,
                vk::PipelineStageFlags::HOST,
                vk::AccessFlags::HOST_READ,
            );
            context.end_command_buffer(self.command_buffer)?;

            let fence = context.create_fence(&vk::FenceCreateInfo::default(), None)?;
            let submit_info = vk::SubmitInfo::default()
                .command_buffers(core::slice::from_ref(&self.command_buffer));
            let result = context
                .queue_submit(context.queue, &[submit_info], fence)
                .and_then(|_| context.wait_for_fences(&[fence], true, u64::MAX));
            context.destroy_fence(fence, None);
            result?;
        }
        Ok(())
    }
}

impl Drop for VkCommandStream {
    fn drop(&mut self) {
        let context = self.device.context();
        unsafe {
            context.free_command_buffers(context.command_pool, &[self.command_buffer]);
            for pool in self.descriptor_pools.drain(..) {
                context.destroy_descriptor_pool(pool, None);
            }
        }
        // released only after the command buffer referencing them is gone
        self.retained_pipelines.clear();
        self.retained_buffers.clear();
    }
}

/// Splits a byte offset into the aligned part bound in the descriptor and the
/// remainder the kernel adds itself.
fn split_offset(offset: usize, alignment: u64) -> (vk::DeviceSize, u32) {
    let offset = offset as vk::DeviceSize;
    let remainder = offset % alignment.max(1);
    (offset - remainder, remainder as u32)
}

struct PendingDispatch {
    pipeline: VkPipeline,
    bindings: Vec<Option<(VkBuffer, usize)>>,
    threadgroups: Dim3,
}

pub struct VkComputeEncoder<'a> {
    stream: &'a mut VkCommandStream,
    label: String,
    pipeline: Option<VkPipeline>,
    bindings: Vec<Option<(VkBuffer, usize)>>,
    dispatches: Vec<PendingDispatch>,
    error: Option<LayerError>,
}

impl ComputeEncoder<Vulkan> for VkComputeEncoder<'_> {
    #[inline]
    fn set_compute_pipeline(&mut self, pipeline: &VkPipeline) {
        self.pipeline = Some(pipeline.clone());
    }

    fn set_buffer(&mut self, buffer: &VkBuffer, offset: usize, slot: usize) {
        if self.bindings.len() <= slot {
            self.bindings.resize(slot + 1, None);
        }
        self.bindings[slot] = Some((buffer.clone(), offset));
    }

    fn dispatch_threadgroups(&mut self, threadgroups: Dim3, threads_per_threadgroup: Dim3) {
        let Some(pipeline) = self.pipeline.clone() else {
            self.error.get_or_insert(LayerError::PipelineNotReady);
            return;
        };
        let [width, height, depth] = pipeline.workgroup_size().map(|extent| extent as usize);
        if threads_per_threadgroup != Dim3::new(width, height, depth) {
            log::warn!(
                "{}: kernel '{}' runs with its declared workgroup size {:?}, not {threads_per_threadgroup:?}",
                self.label,
                pipeline.kernel_name(),
                pipeline.workgroup_size(),
            );
        }
        log::trace!(
            "{}: dispatch '{}' threadgroups={threadgroups:?}",
            self.label,
            pipeline.kernel_name()
        );
        self.dispatches.push(PendingDispatch {
            pipeline,
            bindings: self.bindings.clone(),
            threadgroups,
        });
    }

    fn end_encoding(self) -> crate::Result<()> {
        if let Some(err) = self.error {
            return Err(err.into());
        }
        for dispatch in self.dispatches {
            self.stream.record_dispatch(dispatch)?;
        }
        Ok(())
    }
}
