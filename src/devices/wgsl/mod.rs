mod error;
mod spirv;

pub use error::*;
pub use spirv::*;
