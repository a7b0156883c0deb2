//! gpugrass - GPU-driven procedural grass on wgpu

pub mod core;
pub mod math;
pub mod render;
pub mod grass;
