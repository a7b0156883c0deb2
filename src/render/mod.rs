//! Rendering system and GPU interfaces

pub mod context;
pub mod buffer;
pub mod wgpu_backend;

pub use context::GpuContext;
pub use wgpu_backend::{RenderTargets, WgpuBackend, WgpuBuffer, WgpuKernel, WgpuMaterial};
