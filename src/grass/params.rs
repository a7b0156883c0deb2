//! GPU-facing records and uniform blocks of the generation kernel.
//!
//! Layouts must match grass_generate.wgsl / grass_draw.wgsl exactly.

use bytemuck::{Pod, Zeroable};

use crate::core::types::{Mat4, Vec3};
use crate::grass::config::GrassSettings;

/// One corner of a generated triangle.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DrawVertex {
    pub position_ws: [f32; 3],
    /// 0 at the blade root, 1 at the tip
    pub height: f32,
}

/// One generated triangle as appended by the kernel (60 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DrawTriangle {
    pub normal_ws: [f32; 3],
    pub vertices: [DrawVertex; 3],
}

/// Byte stride of one draw-output record
pub const DRAW_STRIDE: u64 = std::mem::size_of::<DrawTriangle>() as u64;

/// Vertices the indirect draw emits per appended record
pub const VERTICES_PER_RECORD: u32 = 3;

/// Non-indexed indirect draw arguments (matches wgpu's `DrawIndirectArgs`).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct IndirectArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl IndirectArgs {
    /// Per-frame reset value: no vertices, one instance.
    pub const RESET: IndirectArgs = IndirectArgs {
        vertex_count: 0,
        instance_count: 1,
        first_vertex: 0,
        first_instance: 0,
    };
}

/// Byte stride of the indirect-args block
pub const INDIRECT_ARGS_STRIDE: u64 = std::mem::size_of::<IndirectArgs>() as u64;

/// Static kernel uniforms, written once per activation (80 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GenerationParams {
    pub num_source_triangles: u32,
    pub max_blade_segments: u32,
    pub max_bend_angle: f32,
    pub blade_curvature: f32,
    // -- 16 bytes --
    pub blade_height: f32,
    pub blade_height_variance: f32,
    pub blade_width: f32,
    pub blade_width_variance: f32,
    // -- 32 bytes --
    pub wind_tex_mult: f32,
    pub wind_time_mult: f32,
    pub wind_pos_mult: f32,
    pub wind_amplitude: f32,
    // -- 48 bytes --
    pub wind_direction_angle: f32,
    pub max_draw_triangles: u32,
    pub _pad: [u32; 2],
    // -- 64 bytes --
    /// (min distance, max distance, falloff factor, unused)
    pub camera_lod: [f32; 4],
    // Total: 80 bytes
}

impl GenerationParams {
    pub fn from_settings(settings: &GrassSettings, num_source_triangles: u32, max_draw_triangles: u32) -> Self {
        Self {
            num_source_triangles,
            max_blade_segments: settings.max_blade_segments(),
            max_bend_angle: settings.max_bend_angle,
            blade_curvature: settings.blade_curvature,
            blade_height: settings.blade_height,
            blade_height_variance: settings.blade_height_variance,
            blade_width: settings.blade_width,
            blade_width_variance: settings.blade_width_variance,
            wind_tex_mult: settings.wind_texture_scale,
            wind_time_mult: settings.wind_period,
            wind_pos_mult: settings.wind_scale,
            wind_amplitude: settings.wind_amplitude,
            wind_direction_angle: settings.wind_direction_angle,
            max_draw_triangles,
            _pad: [0; 2],
            camera_lod: settings.camera_lod(),
        }
    }
}

/// Time-varying kernel uniforms, written every frame (96 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    /// (0, seconds since level load, 0, 0)
    pub time: [f32; 4],
    pub local_to_world: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub _pad: f32,
}

impl FrameUniforms {
    pub fn new(time: f32, local_to_world: Mat4, camera_position: Vec3) -> Self {
        Self {
            time: [0.0, time, 0.0, 0.0],
            local_to_world: local_to_world.to_cols_array_2d(),
            camera_position: camera_position.to_array(),
            _pad: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_record_is_fifteen_floats() {
        assert_eq!(DRAW_STRIDE, 60);
        assert_eq!(DRAW_STRIDE, 15 * 4);
    }

    #[test]
    fn test_indirect_args_layout() {
        assert_eq!(INDIRECT_ARGS_STRIDE, 16);
        assert_eq!(bytemuck::cast::<_, [u32; 4]>(IndirectArgs::RESET), [0, 1, 0, 0]);
    }

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<GenerationParams>(), 80);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 96);
        assert_eq!(std::mem::size_of::<GenerationParams>() % 16, 0);
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
    }

    #[test]
    fn test_params_from_settings() {
        let settings = GrassSettings {
            max_segments: 0,
            camera_lod_factor: -1.0,
            wind_period: 2.5,
            ..Default::default()
        };
        let params = GenerationParams::from_settings(&settings, 12, 12);
        assert_eq!(params.num_source_triangles, 12);
        assert_eq!(params.max_blade_segments, 1);
        assert_eq!(params.wind_time_mult, 2.5);
        assert_eq!(params.camera_lod, [3.0, 30.0, 0.0, 0.0]);
    }

    #[test]
    fn test_frame_uniforms_time_in_y() {
        let translation = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let u = FrameUniforms::new(4.5, translation, Vec3::Y);
        assert_eq!(u.time, [0.0, 4.5, 0.0, 0.0]);
        assert_eq!(u.local_to_world[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(u.camera_position, [0.0, 1.0, 0.0]);
    }
}
