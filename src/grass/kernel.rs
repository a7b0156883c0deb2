//! Generation kernel and draw material descriptions.
//!
//! These are templates: every activation instantiates private copies through
//! the backend, so several grass renderers never share bindings.
//!
//! Kernel contract (group 0):
//! - 0 `_SourceVertices`: `array<SourceVertex>` (28-byte records), read
//! - 1 `_SourceTriangles`: `array<u32>`, read
//! - 2 `_DrawTriangles`: `array<DrawTriangle>` (60-byte records), read-write
//! - 3 append counter for `_DrawTriangles`: `atomic<u32>`
//! - 4 `_IndirectArgsBuffer`: `array<u32, 4>`, read-write
//! - 5 `GenerationParams` uniform, 6 `FrameUniforms` uniform
//! - 7 wind noise `texture_2d<f32>`, 8 its sampler
//!
//! The entry point runs one invocation per source triangle and must bound-check
//! its index against `num_source_triangles`. The count entry point writes
//! `counter * 3` into the first args word.

use std::borrow::Cow;

/// Reference generation kernel
pub const GRASS_GENERATE_WGSL: &str = include_str!("../../shaders/grass_generate.wgsl");
/// Reference draw material
pub const GRASS_DRAW_WGSL: &str = include_str!("../../shaders/grass_draw.wgsl");

/// Default workgroup width of the reference kernel
pub const DEFAULT_THREAD_GROUP_WIDTH: u32 = 128;

/// A compute kernel that satisfies the generation contract.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelSource {
    pub label: Cow<'static, str>,
    pub wgsl: Cow<'static, str>,
    /// Per-triangle generation entry point
    pub entry_point: Cow<'static, str>,
    /// Entry point copying the append count into the args buffer
    pub count_entry_point: Cow<'static, str>,
    /// Workgroup width the kernel is compiled with (`GROUP_WIDTH` override)
    pub thread_group_width: u32,
}

impl KernelSource {
    /// The kernel shipped in `shaders/grass_generate.wgsl`.
    pub fn reference() -> Self {
        Self {
            label: Cow::Borrowed("grass_generate"),
            wgsl: Cow::Borrowed(GRASS_GENERATE_WGSL),
            entry_point: Cow::Borrowed("main"),
            count_entry_point: Cow::Borrowed("finalize_args"),
            thread_group_width: DEFAULT_THREAD_GROUP_WIDTH,
        }
    }

    pub fn with_thread_group_width(mut self, width: u32) -> Self {
        self.thread_group_width = width.max(1);
        self
    }
}

/// A render material that draws `_DrawTriangles` records.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialSource {
    pub label: Cow<'static, str>,
    pub wgsl: Cow<'static, str>,
    pub vertex_entry_point: Cow<'static, str>,
    pub fragment_entry_point: Cow<'static, str>,
}

impl MaterialSource {
    /// The material shipped in `shaders/grass_draw.wgsl`.
    pub fn reference() -> Self {
        Self {
            label: Cow::Borrowed("grass_draw"),
            wgsl: Cow::Borrowed(GRASS_DRAW_WGSL),
            vertex_entry_point: Cow::Borrowed("vs_main"),
            fragment_entry_point: Cow::Borrowed("fs_main"),
        }
    }
}
