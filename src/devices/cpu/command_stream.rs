use super::{Binding, CpuBuffer, CpuPipeline};
use crate::{CPU, CommandStream, ComputeEncoder, Dim3, LayerError};

/// One dispatch as it was encoded.
#[derive(Debug, Clone)]
pub struct RecordedDispatch {
    pub pipeline: CpuPipeline,
    /// Bindings by slot, with byte offsets.
    pub bindings: Vec<Option<Binding>>,
    pub threadgroups: Dim3,
    pub threads_per_threadgroup: Dim3,
}

impl RecordedDispatch {
    #[inline]
    pub fn binding(&self, slot: usize) -> Option<&Binding> {
        self.bindings.get(slot).and_then(Option::as_ref)
    }
}

/// A closed compute encoding scope.
#[derive(Debug, Clone)]
pub struct RecordedPass {
    pub label: String,
    pub dispatches: Vec<RecordedDispatch>,
}

/// Records compute passes and executes them on the host when committed.
/// The recorded passes can be inspected before committing.
#[derive(Debug, Default)]
pub struct CpuCommandStream {
    device: CPU,
    passes: Vec<RecordedPass>,
}

impl CpuCommandStream {
    #[inline]
    pub fn new(device: CPU) -> Self {
        CpuCommandStream {
            device,
            passes: Vec::new(),
        }
    }

    #[inline]
    pub fn passes(&self) -> &[RecordedPass] {
        &self.passes
    }

    pub fn dispatches(&self) -> impl Iterator<Item = &RecordedDispatch> {
        self.passes.iter().flat_map(|pass| pass.dispatches.iter())
    }
}

impl CommandStream<CPU> for CpuCommandStream {
    type Encoder<'a> = CpuComputeEncoder<'a>;

    #[inline]
    fn device(&self) -> &CPU {
        &self.device
    }

    #[inline]
    fn compute_encoder(&mut self, label: &str) -> crate::Result<CpuComputeEncoder<'_>> {
        Ok(CpuComputeEncoder {
            stream: self,
            label: label.to_string(),
            pipeline: None,
            bindings: Vec::new(),
            dispatches: Vec::new(),
            error: None,
        })
    }

    fn commit(self) -> crate::Result<()> {
        log::debug!("committing {} host compute passes", self.passes.len());
        for pass in &self.passes {
            for dispatch in &pass.dispatches {
                dispatch.pipeline.execute(
                    dispatch.threadgroups,
                    dispatch.threads_per_threadgroup,
                    &dispatch.bindings,
                )?;
            }
        }
        Ok(())
    }
}

pub struct CpuComputeEncoder<'a> {
    stream: &'a mut CpuCommandStream,
    label: String,
    pipeline: Option<CpuPipeline>,
    bindings: Vec<Option<Binding>>,
    dispatches: Vec<RecordedDispatch>,
    error: Option<LayerError>,
}

impl ComputeEncoder<CPU> for CpuComputeEncoder<'_> {
    #[inline]
    fn set_compute_pipeline(&mut self, pipeline: &CpuPipeline) {
        self.pipeline = Some(pipeline.clone());
    }

    fn set_buffer(&mut self, buffer: &CpuBuffer, offset: usize, slot: usize) {
        if self.bindings.len() <= slot {
            self.bindings.resize(slot + 1, None);
        }
        self.bindings[slot] = Some(Binding {
            buffer: buffer.clone(),
            offset,
        });
    }

    fn dispatch_threadgroups(&mut self, threadgroups: Dim3, threads_per_threadgroup: Dim3) {
        let Some(pipeline) = self.pipeline.clone() else {
            self.error.get_or_insert(LayerError::PipelineNotReady);
            return;
        };
        log::trace!(
            "{}: dispatch '{}' threadgroups={threadgroups:?} threads={threads_per_threadgroup:?}",
            self.label,
            crate::ComputePipeline::kernel_name(&pipeline),
        );
        self.dispatches.push(RecordedDispatch {
            pipeline,
            bindings: self.bindings.clone(),
            threadgroups,
            threads_per_threadgroup,
        });
    }

    fn end_encoding(self) -> crate::Result<()> {
        if let Some(err) = self.error {
            return Err(err.into());
        }
        self.stream.passes.push(RecordedPass {
            label: self.label,
            dispatches: self.dispatches,
        });
        Ok(())
    }
}
