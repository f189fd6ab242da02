use bytemuck::Pod;

use super::{KernelArgs, ThreadPosition};
use crate::TransposeDimensions;

/// Host counterpart of the `transpose` device kernel, moving elements of type `T`.
///
/// Slot 0 holds the batch-major input, slot 1 the element-major output and
/// slot 2 the [`TransposeDimensions`]. Threads outside of
/// `input_size x batch_size` return without touching memory.
/// The library ships `transpose::<f32>`. Other widths are registered with
/// [`CpuLibrary::register`](super::CpuLibrary::register).
pub fn transpose<T: Pod>(pos: &ThreadPosition, args: &KernelArgs<'_>) -> crate::Result<()> {
    let dims: TransposeDimensions = args.load(2, 0)?;
    let batch_size = dims.batch_size as usize;
    let input_size = dims.input_size as usize;

    let element = pos.thread_position_in_grid.width;
    let batch = pos.thread_position_in_grid.height;
    if element >= input_size || batch >= batch_size {
        return Ok(());
    }

    let value: T = args.load(0, batch * input_size + element)?;
    args.store(1, element * batch_size + batch, value)
}
