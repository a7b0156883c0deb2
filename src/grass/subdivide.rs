//! Midpoint subdivision of the source mesh.
//!
//! Each pass splits every triangle into four. Edge midpoints are cached so
//! neighbouring triangles share the new vertex regardless of edge direction.

use std::collections::HashMap;

use crate::grass::mesh::SourceMesh;

/// Split every triangle of `mesh` into four.
pub fn subdivide(mesh: &SourceMesh) -> SourceMesh {
    let mut positions = mesh.positions.clone();
    let mut colors = mesh.colors.clone();
    // Keep colors index-aligned even if the caller under-supplied them
    colors.resize(positions.len(), glam::Vec4::ONE);

    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
    let mut midpoint = |a: u32, b: u32| -> u32 {
        let key = (a.min(b), a.max(b));
        *midpoints.entry(key).or_insert_with(|| {
            let index = positions.len() as u32;
            let (a, b) = (a as usize, b as usize);
            let position = (positions[a] + positions[b]) * 0.5;
            let color = (colors[a] + colors[b]) * 0.5;
            positions.push(position);
            colors.push(color);
            index
        })
    };

    let mut indices = Vec::with_capacity(mesh.indices.len() * 4);
    for tri in mesh.indices.chunks_exact(3) {
        let (i1, i2, i3) = (tri[0], tri[1], tri[2]);
        let a = midpoint(i1, i2);
        let b = midpoint(i2, i3);
        let c = midpoint(i3, i1);
        indices.extend_from_slice(&[
            i1, a, c,
            i2, b, a,
            i3, c, b,
            a, b, c, // center
        ]);
    }

    SourceMesh { positions, colors, indices }
}

/// Apply [`subdivide`] `levels` times.
pub fn subdivide_levels(mesh: &SourceMesh, levels: u32) -> SourceMesh {
    let mut out = mesh.clone();
    for _ in 0..levels {
        out = subdivide(&out);
    }
    if levels > 0 {
        log::debug!(
            "Subdivided source mesh {} times: {} -> {} triangles",
            levels,
            mesh.triangle_count(),
            out.triangle_count()
        );
    }
    out
}
