//! Culling bounds for the generated grass.

use crate::core::types::Mat4;
use crate::grass::config::GrassSettings;
use crate::math::Aabb;

/// Mesh bounds grown by the largest distance a blade can reach.
///
/// Computed once per activation.
pub fn expand_local_bounds(mesh_bounds: Aabb, settings: &GrassSettings) -> Aabb {
    mesh_bounds.grown(settings.blade_extent())
}

/// Axis-aligned world bounds containing `local` under `local_to_world`.
///
/// The center is transformed as a point. Each half-extent axis is transformed
/// as a direction, and the absolute components of the three resulting vectors
/// are summed per world axis. The result always contains the rotated box.
pub fn transform_bounds(local: &Aabb, local_to_world: &Mat4) -> Aabb {
    let center = local_to_world.transform_point3(local.center());
    let extent = local.half_extent();

    let axis_x = local_to_world.transform_vector3(glam::Vec3::new(extent.x, 0.0, 0.0));
    let axis_y = local_to_world.transform_vector3(glam::Vec3::new(0.0, extent.y, 0.0));
    let axis_z = local_to_world.transform_vector3(glam::Vec3::new(0.0, 0.0, extent.z));

    let world_extent = axis_x.abs() + axis_y.abs() + axis_z.abs();
    Aabb::from_center_half_extent(center, world_extent)
}
