//! Buffer capacities and dispatch size for one activation.
//!
//! Everything here is a pure function of the mesh counts, the settings and
//! the kernel's thread-group width, so two activations with the same inputs
//! produce equal layouts and byte-identical buffers.

use crate::grass::backend::{BufferDesc, BufferKind};
use crate::grass::config::GrassSettings;
use crate::grass::mesh::{SOURCE_INDEX_STRIDE, SOURCE_VERTEX_STRIDE};
use crate::grass::params::{DRAW_STRIDE, INDIRECT_ARGS_STRIDE};

/// Sizing of the four grass buffers plus the compute dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrassLayout {
    pub vertex_count: u32,
    pub index_count: u32,
    pub source_triangle_count: u32,
    pub max_blade_segments: u32,
    pub max_blade_triangles: u32,
    /// Draw-output capacity in records
    pub draw_capacity: u64,
    pub thread_group_width: u32,
    pub dispatch_groups: u32,
}

impl GrassLayout {
    pub fn new(vertex_count: u32, index_count: u32, settings: &GrassSettings, thread_group_width: u32) -> Self {
        let source_triangle_count = index_count / 3;
        let max_blade_triangles = settings.max_blade_triangles();
        let thread_group_width = thread_group_width.max(1);
        Self {
            vertex_count,
            index_count,
            source_triangle_count,
            max_blade_segments: settings.max_blade_segments(),
            max_blade_triangles,
            draw_capacity: u64::from(source_triangle_count) * u64::from(max_blade_triangles),
            thread_group_width,
            dispatch_groups: dispatch_group_count(source_triangle_count, thread_group_width),
        }
    }

    pub fn source_vertices(&self) -> BufferDesc {
        BufferDesc::new("grass_source_vertices", BufferKind::Immutable, self.vertex_count.into(), SOURCE_VERTEX_STRIDE)
    }

    pub fn source_triangles(&self) -> BufferDesc {
        BufferDesc::new("grass_source_triangles", BufferKind::Immutable, self.index_count.into(), SOURCE_INDEX_STRIDE)
    }

    pub fn draw_triangles(&self) -> BufferDesc {
        BufferDesc::new("grass_draw_triangles", BufferKind::Append, self.draw_capacity, DRAW_STRIDE)
    }

    pub fn indirect_args(&self) -> BufferDesc {
        BufferDesc::new("grass_indirect_args", BufferKind::IndirectArgs, 1, INDIRECT_ARGS_STRIDE)
    }

    /// Total bytes across all four buffers, excluding the append counter
    pub fn total_bytes(&self) -> u64 {
        [self.source_vertices(), self.source_triangles(), self.draw_triangles(), self.indirect_args()]
            .iter()
            .map(BufferDesc::size)
            .sum()
    }
}

/// Workgroups needed so every source triangle gets one invocation.
pub fn dispatch_group_count(triangles: u32, thread_group_width: u32) -> u32 {
    triangles.div_ceil(thread_group_width.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_is_ceil_division() {
        for width in [1, 7, 32, 64, 128] {
            for n in [0u32, 1, 2, 63, 64, 65, 1000, 4097] {
                let expected = (n as f64 / width as f64).ceil() as u32;
                assert_eq!(dispatch_group_count(n, width), expected, "n={n} width={width}");
            }
        }
    }

    #[test]
    fn test_zero_width_does_not_divide_by_zero() {
        assert_eq!(dispatch_group_count(10, 0), 10);
    }

    #[test]
    fn test_draw_capacity_for_all_segment_counts() {
        let n = 17u32;
        for segments in -2..=10 {
            let settings = GrassSettings { max_segments: segments, ..Default::default() };
            let layout = GrassLayout::new(30, n * 3, &settings, 64);
            let clamped = segments.max(1) as u64;
            assert_eq!(layout.draw_capacity, n as u64 * ((clamped - 1) * 2 + 1));
        }
    }

    #[test]
    fn test_two_triangles_three_segments() {
        let settings = GrassSettings { max_segments: 3, ..Default::default() };
        let layout = GrassLayout::new(4, 6, &settings, 64);
        assert_eq!(layout.max_blade_triangles, 5);
        assert_eq!(layout.draw_capacity, 10);
        let draw = layout.draw_triangles();
        assert_eq!(draw.stride, 60);
        assert_eq!(draw.size(), 600);
        assert_eq!(layout.dispatch_groups, 1);
    }

    #[test]
    fn test_buffer_descs() {
        let layout = GrassLayout::new(4, 6, &GrassSettings::default(), 64);
        assert_eq!(layout.source_vertices().size(), 4 * 28);
        assert_eq!(layout.source_triangles().size(), 6 * 4);
        assert_eq!(layout.indirect_args().size(), 16);
        assert_eq!(layout.draw_triangles().kind, BufferKind::Append);
        assert_eq!(layout.total_bytes(), 112 + 24 + 600 + 16);
    }

    #[test]
    fn test_same_inputs_same_layout() {
        let s = GrassSettings::default();
        assert_eq!(GrassLayout::new(100, 300, &s, 64), GrassLayout::new(100, 300, &s, 64));
    }
}
