use crate::Device;

/// A layer that runs during the forward (inference) pass.
///
/// Sizes are counted in elements per batch element. Offsets passed to
/// [`ForwardLayer::encode_forward`] are element offsets into the bound buffers.
pub trait ForwardLayer<D: Device> {
    fn input_size(&self) -> usize;
    fn output_size(&self) -> usize;

    /// Compiles the kernels of this layer. Must succeed once before the layer is encoded.
    fn setup_in_library(&mut self, library: &D::Library) -> crate::Result<()>;

    /// Records the forward pass of `batch_size` batch elements into `stream`.
    /// The work runs when the stream is committed.
    fn encode_forward(
        &self,
        stream: &mut D::CommandStream,
        batch_size: usize,
        input: &D::Buffer,
        input_offset: usize,
        output: &D::Buffer,
        output_offset: usize,
    ) -> crate::Result<()>;
}
