//! This module defines all available compute devices

#[cfg(feature = "cpu")]
pub mod cpu;

#[cfg(feature = "cpu")]
pub use cpu::CPU;

#[cfg(feature = "wgsl")]
pub mod wgsl;

#[cfg(feature = "vulkan")]
pub mod vulkan;

#[cfg(feature = "vulkan")]
pub use vulkan::Vulkan;
