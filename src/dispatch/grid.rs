/// Extent of a grid or of a single threadgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dim3 {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Dim3 {
    #[inline]
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Dim3 {
            width,
            height,
            depth,
        }
    }

    #[inline]
    pub const fn volume(&self) -> usize {
        self.width * self.height * self.depth
    }
}

/// Threadgroup count and threadgroup extent of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchGrid {
    pub threadgroups: Dim3,
    pub threads_per_threadgroup: Dim3,
}

/// Covers `count` elements along x with groups of `width` threads and indexes
/// the batch along y.
///
/// # Example
/// ```
/// use braincore::{batch_grid, Dim3};
///
/// let grid = batch_grid(33, 32, 4);
/// assert_eq!(grid.threadgroups, Dim3::new(2, 4, 1));
/// assert_eq!(grid.threads_per_threadgroup, Dim3::new(32, 1, 1));
/// ```
#[inline]
pub fn batch_grid(count: usize, width: usize, batch_size: usize) -> LaunchGrid {
    let width = width.max(1);
    LaunchGrid {
        threadgroups: Dim3::new(count.div_ceil(width), batch_size, 1),
        threads_per_threadgroup: Dim3::new(width, 1, 1),
    }
}
