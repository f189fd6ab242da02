use core::mem::size_of;

use bytemuck::{Pod, Zeroable};

use crate::{
    CommandStream, ComputeEncoder, ComputePipeline, Device, DeviceBuffer, ForwardLayer,
    LaunchGrid, LayerError, batch_grid, flag::StorageMode,
};

/// Dimensions the `transpose` kernel reads from slot 2.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransposeDimensions {
    pub batch_size: u32,
    pub input_size: u32,
}

impl TransposeDimensions {
    pub fn new(batch_size: usize, input_size: usize) -> crate::Result<Self> {
        Ok(TransposeDimensions {
            batch_size: u32::try_from(batch_size).map_err(|_| LayerError::DimensionOverflow)?,
            input_size: u32::try_from(input_size).map_err(|_| LayerError::DimensionOverflow)?,
        })
    }
}

/// The serializable part of a [`TransposeLayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransposeDescriptor {
    pub size: usize,
    pub element_size: usize,
}

/// Transposes input data so that elements of consecutive batch elements are
/// contiguous in memory.
///
/// A batch-major input `[b0e0, b0e1, .., b1e0, b1e1, ..]` becomes the
/// element-major output `[b0e0, b1e0, .., b0e1, b1e1, ..]`. Concatenating the
/// outputs of several layers then is a concatenation of memory blocks, which
/// removes the need for concat and split layers. This is not a general matrix
/// transposition.
pub struct TransposeLayer<D: Device> {
    size: usize,
    element_size: usize,
    pipeline: Option<D::Pipeline>,
}

impl<D: Device> TransposeLayer<D> {
    pub const KERNEL_NAME: &'static str = "transpose";

    /// Creates a layer transposing `size` `f32` elements per batch element.
    #[inline]
    pub fn new(size: usize) -> Self {
        TransposeLayer {
            size,
            element_size: size_of::<f32>(),
            pipeline: None,
        }
    }

    /// Creates a layer whose elements are `element_size` bytes wide.
    ///
    /// Setup fails with [`LayerError::ElementSizeMismatch`] unless the kernel
    /// registered as [`Self::KERNEL_NAME`] moves elements of that width.
    pub fn with_element_size(size: usize, element_size: usize) -> crate::Result<Self> {
        if element_size == 0 {
            return Err(LayerError::InvalidElementSize.into());
        }
        Ok(TransposeLayer {
            size,
            element_size,
            pipeline: None,
        })
    }

    #[inline]
    pub fn from_descriptor(descriptor: TransposeDescriptor) -> crate::Result<Self> {
        TransposeLayer::with_element_size(descriptor.size, descriptor.element_size)
    }

    #[inline]
    pub fn descriptor(&self) -> TransposeDescriptor {
        TransposeDescriptor {
            size: self.size,
            element_size: self.element_size,
        }
    }

    /// The number of elements of each batch element.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.pipeline.is_some()
    }

    #[inline]
    pub fn pipeline(&self) -> Option<&D::Pipeline> {
        self.pipeline.as_ref()
    }

    /// The grid dispatched for an input buffer of `input_len` bytes.
    ///
    /// The element count covers the whole input buffer, not only the
    /// `size * batch_size` elements read from it. The kernel discards threads
    /// outside of the dimensions record.
    pub fn launch_grid(&self, input_len: usize, batch_size: usize) -> crate::Result<LaunchGrid> {
        let pipeline = self.pipeline.as_ref().ok_or(LayerError::PipelineNotReady)?;
        let count = input_len / self.element_size;
        Ok(batch_grid(count, pipeline.thread_execution_width(), batch_size))
    }
}

impl<D: Device> ForwardLayer<D> for TransposeLayer<D> {
    #[inline]
    fn input_size(&self) -> usize {
        self.size
    }

    #[inline]
    fn output_size(&self) -> usize {
        self.size
    }

    fn setup_in_library(&mut self, library: &D::Library) -> crate::Result<()> {
        let pipeline = crate::KernelLibrary::new_compute_pipeline(library, Self::KERNEL_NAME)?;
        if pipeline.element_size() != Some(self.element_size) {
            log::debug!(
                "transpose kernel moves {:?} byte elements, the layer {}",
                pipeline.element_size(),
                self.element_size
            );
            return Err(LayerError::ElementSizeMismatch.into());
        }
        log::debug!(
            "transpose layer of size {} uses execution width {}",
            self.size,
            pipeline.thread_execution_width()
        );
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn encode_forward(
        &self,
        stream: &mut D::CommandStream,
        batch_size: usize,
        input: &D::Buffer,
        input_offset: usize,
        output: &D::Buffer,
        output_offset: usize,
    ) -> crate::Result<()> {
        let pipeline = self.pipeline.as_ref().ok_or(LayerError::PipelineNotReady)?;

        let dimensions = TransposeDimensions::new(batch_size, self.input_size())?;
        let dimensions_buf = stream
            .device()
            .new_buffer_with_bytes(bytemuck::bytes_of(&dimensions), StorageMode::WriteCombined)?;
        dimensions_buf.set_label("TransposeDimensions");

        let grid = self.launch_grid(input.len(), batch_size)?;

        let mut encoder = stream.compute_encoder("TransposeForward")?;
        encoder.set_compute_pipeline(pipeline);
        encoder.set_buffer(input, input_offset * self.element_size, 0);
        encoder.set_buffer(output, output_offset * self.element_size, 1);
        encoder.set_buffer(&dimensions_buf, 0, 2);
        encoder.dispatch_threadgroups(grid.threadgroups, grid.threads_per_threadgroup);
        encoder.end_encoding()
    }
}

#[cfg(test)]
mod tests {
    use super::{TransposeDimensions, TransposeLayer};
    use crate::{ErrorKind, ForwardLayer, LayerError};

    #[test]
    fn test_dimensions_layout() {
        let dims = TransposeDimensions::new(3, 70000).unwrap();
        let bytes = bytemuck::bytes_of(&dims);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &3u32.to_le_bytes());
        assert_eq!(&bytes[4..], &70000u32.to_le_bytes());
    }

    #[test]
    fn test_dimensions_overflow() {
        let err = TransposeDimensions::new(u32::MAX as usize + 1, 4).unwrap_err();
        assert_eq!(err.kind(), Some(&LayerError::DimensionOverflow));
        assert!(TransposeDimensions::new(u32::MAX as usize, 4).is_ok());
    }

    #[cfg(feature = "cpu")]
    #[test]
    fn test_sizes_match() {
        use crate::CPU;

        for size in [1, 2, 31, 32, 33, 1024] {
            let layer = TransposeLayer::<CPU>::new(size);
            assert_eq!(layer.input_size(), size);
            assert_eq!(layer.output_size(), size);
            assert_eq!(layer.element_size(), 4);
            assert!(!layer.is_ready());
        }
    }

    #[cfg(feature = "cpu")]
    #[test]
    fn test_launch_grid_needs_setup() {
        use crate::CPU;

        let layer = TransposeLayer::<CPU>::new(4);
        let err = layer.launch_grid(16, 1).unwrap_err();
        assert_eq!(err.kind(), Some(&LayerError::PipelineNotReady));
    }

    #[cfg(feature = "cpu")]
    #[test]
    fn test_descriptor_roundtrip() {
        use crate::CPU;

        let layer = TransposeLayer::<CPU>::with_element_size(12, 2).unwrap();
        let copy = TransposeLayer::<CPU>::from_descriptor(layer.descriptor()).unwrap();
        assert_eq!(copy.size(), 12);
        assert_eq!(copy.element_size(), 2);
    }

    #[cfg(feature = "cpu")]
    #[test]
    fn test_zero_element_size() {
        use super::TransposeDescriptor;
        use crate::CPU;

        let err = TransposeLayer::<CPU>::with_element_size(4, 0).err().unwrap();
        assert_eq!(err.kind(), Some(&LayerError::InvalidElementSize));

        let descriptor = TransposeDescriptor {
            size: 4,
            element_size: 0,
        };
        assert!(TransposeLayer::<CPU>::from_descriptor(descriptor).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_descriptor_serde_tokens() {
        use super::TransposeDescriptor;
        use serde_test::{Token, assert_tokens};

        let descriptor = TransposeDescriptor {
            size: 12,
            element_size: 4,
        };
        assert_tokens(
            &descriptor,
            &[
                Token::Struct {
                    name: "TransposeDescriptor",
                    len: 2,
                },
                Token::Str("size"),
                Token::U64(12),
                Token::Str("element_size"),
                Token::U64(4),
                Token::StructEnd,
            ],
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_dimensions_serde_tokens() {
        use serde_test::{Token, assert_tokens};

        let dims = TransposeDimensions::new(2, 8).unwrap();
        assert_tokens(
            &dims,
            &[
                Token::Struct {
                    name: "TransposeDimensions",
                    len: 2,
                },
                Token::Str("batch_size"),
                Token::U32(2),
                Token::Str("input_size"),
                Token::U32(8),
                Token::StructEnd,
            ],
        );
    }
}
