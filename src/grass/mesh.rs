//! Source mesh ingestion.
//!
//! The grass kernel expands each source triangle into blades, so the only
//! data it needs is vertex position, vertex color and the triangle index list.

use bytemuck::{Pod, Zeroable};

use crate::core::error::Error;
use crate::core::types::{Result, Vec3, Vec4};
use crate::grass::config::GrassSettings;
use crate::grass::subdivide::subdivide_levels;
use crate::math::Aabb;

/// Packed source vertex (28 bytes). Must match `SourceVertex` in grass_generate.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SourceVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Byte stride of one [`SourceVertex`]
pub const SOURCE_VERTEX_STRIDE: u64 = std::mem::size_of::<SourceVertex>() as u64;
/// Byte stride of one triangle index
pub const SOURCE_INDEX_STRIDE: u64 = std::mem::size_of::<u32>() as u64;

/// Static mesh the grass grows on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceMesh {
    pub positions: Vec<Vec3>,
    /// One color per position. The red channel doubles as the grass mask.
    pub colors: Vec<Vec4>,
    /// Three indices per triangle
    pub indices: Vec<u32>,
}

impl SourceMesh {
    pub fn new(positions: Vec<Vec3>, colors: Vec<Vec4>, indices: Vec<u32>) -> Self {
        Self { positions, colors, indices }
    }

    /// Flat XZ plane centered on the origin, `cells` x `cells` quads, white.
    pub fn plane(size: f32, cells: u32) -> Self {
        let cells = cells.max(1);
        let row = cells + 1;
        let step = size / cells as f32;
        let half = size * 0.5;

        let mut positions = Vec::with_capacity((row * row) as usize);
        for z in 0..row {
            for x in 0..row {
                positions.push(Vec3::new(x as f32 * step - half, 0.0, z as f32 * step - half));
            }
        }

        let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
        for z in 0..cells {
            for x in 0..cells {
                let i = z * row + x;
                // Counter-clockwise seen from +Y
                indices.extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
            }
        }

        let colors = vec![Vec4::ONE; positions.len()];
        Self { positions, colors, indices }
    }

    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count() / 3
    }

    /// Reject index lists the kernel could read out of bounds with.
    ///
    /// Color/position length agreement is a caller precondition and is not
    /// checked here; missing colors are padded with white by [`pack_vertices`].
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if self.positions.len() > u32::MAX as usize {
            return Err(Error::InvalidMesh("vertex count exceeds u32 range".into()));
        }
        let vertex_count = self.vertex_count();
        if let Some(bad) = self.indices.iter().find(|&&i| i >= vertex_count) {
            return Err(Error::InvalidMesh(format!(
                "index {bad} out of range for {vertex_count} vertices"
            )));
        }
        Ok(())
    }

    /// Bounds of the vertex positions. An empty mesh has zero-size bounds at the origin.
    pub fn local_bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().copied()).unwrap_or_default()
    }

    /// Keep only triangles whose three vertices have a red channel above zero.
    ///
    /// Vertices are left in place so indices stay valid; unreferenced
    /// vertices are simply never read by the kernel.
    pub fn masked(&self) -> SourceMesh {
        let grows = |i: u32| {
            self.colors
                .get(i as usize)
                .is_some_and(|c| c.x > 0.0)
        };

        let indices: Vec<u32> = self
            .indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| grows(i)))
            .flatten()
            .copied()
            .collect();

        SourceMesh {
            positions: self.positions.clone(),
            colors: self.colors.clone(),
            indices,
        }
    }

    /// The mesh actually uploaded for `settings`: validated, subdivided, then
    /// masked when the color mask is enabled.
    pub fn prepare(&self, settings: &GrassSettings) -> Result<SourceMesh> {
        self.validate()?;
        let mut mesh = subdivide_levels(self, settings.subdivision_levels());
        if settings.color_mask {
            mesh = mesh.masked();
        }
        Ok(mesh)
    }
}

/// Zip positions and colors into GPU records, index-aligned with the mesh.
pub fn pack_vertices(mesh: &SourceMesh) -> Vec<SourceVertex> {
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, p)| SourceVertex {
            position: p.to_array(),
            color: mesh.colors.get(i).copied().unwrap_or(Vec4::ONE).to_array(),
        })
        .collect()
}
