//! The host backend. Kernels are plain Rust functions, see [`HostKernelFn`].

mod command_stream;
mod cpu_buffer;
mod cpu_device;
mod kernel;
mod kernels;
mod library;

pub use command_stream::*;
pub use cpu_buffer::*;
pub use cpu_device::*;
pub use kernel::*;
pub use library::*;

pub use kernels::transpose as transpose_kernel;
