//! The batch-transpose layer of a GPU neural-network inference runtime.
//!
//! [`TransposeLayer`] reorders batch-major data into element-major data, so
//! that the outputs of several layers can be concatenated as plain memory
//! blocks. The layer only records a compute dispatch. The data movement is
//! done by the `transpose` kernel of the backend it runs on.
//!
//! Backends implement the compute-dispatch interface in [`dispatch`]:
//! - [`CPU`] runs kernels on the host (feature `cpu`, enabled by default)
//! - `Vulkan` runs WGSL kernels compiled to SPIR-V (feature `vulkan`)
//!
#![cfg_attr(feature = "cpu", doc = "```")]
#![cfg_attr(not(feature = "cpu"), doc = "```ignore")]
//! use braincore::{CPU, CommandStream, Device, ForwardLayer, TransposeLayer};
//!
//! let device = CPU::new();
//! let mut layer = TransposeLayer::<CPU>::new(2);
//! layer.setup_in_library(&device.default_library()?)?;
//!
//! // two batch elements of two elements each
//! let input = device.buffer_from_slice(&[1f32, 2., 3., 4.])?;
//! let output = device.buffer_from_slice(&[0f32; 4])?;
//!
//! let mut stream = device.command_stream()?;
//! layer.encode_forward(&mut stream, 2, &input, 0, &output, 0)?;
//! stream.commit()?;
//!
//! assert_eq!(device.read::<f32>(&output), [1., 3., 2., 4.]);
//! # Ok::<(), braincore::Error>(())
//! ```

pub use devices::*;
pub use dispatch::*;
pub use error::*;
pub use layer::*;
pub use layers::*;

pub mod devices;
pub mod dispatch;
mod error;
pub mod flag;
mod layer;
pub mod layers;
