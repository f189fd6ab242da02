//! Layers of the forward pass.

mod transpose;
pub use transpose::*;
