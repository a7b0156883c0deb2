//! The GPU operations the grass pipeline is built on.
//!
//! [`GrassBackend`] is the seam between host orchestration and whatever
//! device runs the generation kernel. The wgpu implementation lives in
//! `render::wgpu_backend`; tests use a recording implementation.

use crate::core::error::Error;
use crate::core::types::Result;
use crate::grass::kernel::{KernelSource, MaterialSource};
use crate::grass::params::{FrameUniforms, GenerationParams};
use crate::grass::wind::WindNoiseTexture;
use crate::math::Aabb;

/// How a grass buffer is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Structured data uploaded once at activation, read-only afterwards.
    Immutable,
    /// Structured buffer the kernel appends to through an atomic counter.
    Append,
    /// Indirect draw arguments, written by the host and the GPU.
    IndirectArgs,
}

/// Allocation request for one buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferDesc {
    pub label: &'static str,
    pub kind: BufferKind,
    /// Element count
    pub count: u64,
    /// Bytes per element
    pub stride: u64,
}

impl BufferDesc {
    pub fn new(label: &'static str, kind: BufferKind, count: u64, stride: u64) -> Self {
        Self { label, kind, count, stride }
    }

    /// Payload size in bytes (any append counter is extra)
    pub fn size(&self) -> u64 {
        self.count * self.stride
    }
}

/// Resource slots declared by the generation kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KernelSlot {
    SourceVertices,
    SourceTriangles,
    DrawTriangles,
    IndirectArgs,
}

impl KernelSlot {
    pub const ALL: [KernelSlot; 4] = [
        KernelSlot::SourceVertices,
        KernelSlot::SourceTriangles,
        KernelSlot::DrawTriangles,
        KernelSlot::IndirectArgs,
    ];

    /// Name the kernel declares the slot under
    pub fn name(self) -> &'static str {
        match self {
            KernelSlot::SourceVertices => "_SourceVertices",
            KernelSlot::SourceTriangles => "_SourceTriangles",
            KernelSlot::DrawTriangles => "_DrawTriangles",
            KernelSlot::IndirectArgs => "_IndirectArgsBuffer",
        }
    }
}

/// Primitive topology of an indirect draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Topology {
    #[default]
    Triangles,
}

/// Whether generated geometry is rendered into shadow maps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShadowCasting {
    #[default]
    Off,
    On,
}

/// One GPU-count-driven draw request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndirectDraw {
    /// World-space bounds used for culling the whole draw
    pub bounds: Aabb,
    pub topology: Topology,
    pub shadow_casting: ShadowCasting,
    /// Byte offset of the arguments inside the args buffer
    pub args_offset: u64,
}

impl IndirectDraw {
    /// Triangle draw, no shadows, arguments at offset 0.
    pub fn triangles(bounds: Aabb) -> Self {
        Self {
            bounds,
            topology: Topology::Triangles,
            shadow_casting: ShadowCasting::Off,
            args_offset: 0,
        }
    }
}

/// Device limits an activation has to fit in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendLimits {
    /// Workgroups along one dispatch dimension
    pub max_dispatch_groups: u32,
    /// Width or height of the wind noise texture
    pub max_texture_dimension: u32,
    /// Bytes of one storage buffer binding
    pub max_buffer_size: u64,
}

impl Default for BackendLimits {
    /// wgpu's default limits, which every adapter supports
    fn default() -> Self {
        Self {
            max_dispatch_groups: 65_535,
            max_texture_dimension: 8_192,
            max_buffer_size: 128 << 20,
        }
    }
}

impl BackendLimits {
    /// Fail with [`Error::LimitExceeded`] when `requested` is over `limit`.
    pub fn check(what: &'static str, requested: u64, limit: u64) -> Result<()> {
        if requested > limit {
            return Err(Error::LimitExceeded { what, requested, limit });
        }
        Ok(())
    }
}

/// Device operations needed to generate and draw grass.
///
/// Calls enqueue work and never block; ordering between them is the order
/// they are issued in.
pub trait GrassBackend {
    type Buffer;
    /// A private, per-activation instance of the generation kernel
    type Kernel;
    /// A private, per-activation instance of the draw material
    type Material;

    fn limits(&self) -> BackendLimits;

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Self::Buffer>;
    fn write_buffer(&mut self, buffer: &Self::Buffer, data: &[u8]);
    fn release_buffer(&mut self, buffer: Self::Buffer);

    fn instantiate_kernel(&mut self, source: &KernelSource) -> Result<Self::Kernel>;
    fn destroy_kernel(&mut self, kernel: Self::Kernel);
    fn instantiate_material(&mut self, source: &MaterialSource) -> Result<Self::Material>;
    fn destroy_material(&mut self, material: Self::Material);

    /// Invocations per workgroup along X, as compiled into the kernel.
    fn thread_group_width(&self, kernel: &Self::Kernel) -> u32;

    fn bind_kernel_buffer(&mut self, kernel: &mut Self::Kernel, slot: KernelSlot, buffer: &Self::Buffer);
    fn bind_material_buffer(&mut self, material: &mut Self::Material, buffer: &Self::Buffer);
    fn set_generation_params(&mut self, kernel: &mut Self::Kernel, params: &GenerationParams);
    fn set_wind_texture(&mut self, kernel: &mut Self::Kernel, texture: &WindNoiseTexture) -> Result<()>;
    fn set_frame_uniforms(&mut self, kernel: &mut Self::Kernel, uniforms: &FrameUniforms);

    /// Zero the append counter of an [`BufferKind::Append`] buffer.
    fn reset_append_counter(&mut self, buffer: &Self::Buffer);
    fn dispatch(&mut self, kernel: &mut Self::Kernel, groups: [u32; 3]);
    /// Write the vertex count for everything appended to `source` into `args`.
    fn copy_append_count(&mut self, kernel: &mut Self::Kernel, source: &Self::Buffer, args: &Self::Buffer);
    fn draw_procedural_indirect(&mut self, material: &Self::Material, args: &Self::Buffer, draw: &IndirectDraw);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_names_match_kernel_declarations() {
        let names: Vec<_> = KernelSlot::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["_SourceVertices", "_SourceTriangles", "_DrawTriangles", "_IndirectArgsBuffer"]);
    }

    #[test]
    fn test_buffer_desc_size() {
        let desc = BufferDesc::new("x", BufferKind::Append, 10, 60);
        assert_eq!(desc.size(), 600);
    }

    #[test]
    fn test_limit_check() {
        assert!(BackendLimits::check("dispatch groups", 65_535, 65_535).is_ok());
        let err = BackendLimits::check("dispatch groups", 65_536, 65_535).unwrap_err();
        assert!(matches!(
            err,
            Error::LimitExceeded { what: "dispatch groups", requested: 65_536, limit: 65_535 }
        ));
    }

    #[test]
    fn test_default_draw_has_no_shadows() {
        let draw = IndirectDraw::triangles(Aabb::default());
        assert_eq!(draw.shadow_casting, ShadowCasting::Off);
        assert_eq!(draw.topology, Topology::Triangles);
        assert_eq!(draw.args_offset, 0);
    }
}
