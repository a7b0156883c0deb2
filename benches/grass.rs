use criterion::{criterion_group, criterion_main, Criterion, black_box};

use gpugrass::grass::mesh::pack_vertices;
use gpugrass::grass::subdivide::subdivide_levels;
use gpugrass::grass::{GrassSettings, SourceMesh, expand_local_bounds, transform_bounds};

use glam::{Mat4, Quat, Vec3};

fn bench_subdivide_plane_64(c: &mut Criterion) {
    let plane = SourceMesh::plane(32.0, 64);

    c.bench_function("subdivide_plane_64_x2", |b| {
        b.iter(|| subdivide_levels(black_box(&plane), 2));
    });
}

fn bench_mask_plane_128(c: &mut Criterion) {
    let mut plane = SourceMesh::plane(32.0, 128);
    // Checkerboard of painted vertices
    for (i, color) in plane.colors.iter_mut().enumerate() {
        color.x = (i % 2) as f32;
    }

    c.bench_function("mask_plane_128", |b| {
        b.iter(|| black_box(&plane).masked());
    });
}

fn bench_pack_vertices(c: &mut Criterion) {
    let plane = SourceMesh::plane(32.0, 256);

    c.bench_function("pack_vertices_256", |b| {
        b.iter(|| pack_vertices(black_box(&plane)));
    });
}

fn bench_prepare_with_settings(c: &mut Criterion) {
    let plane = SourceMesh::plane(32.0, 64);
    let settings = GrassSettings { mesh_subdivisions: 1, color_mask: true, ..Default::default() };

    c.bench_function("prepare_plane_64", |b| {
        b.iter(|| black_box(&plane).prepare(black_box(&settings)));
    });
}

fn bench_world_bounds(c: &mut Criterion) {
    let plane = SourceMesh::plane(32.0, 16);
    let local = expand_local_bounds(plane.local_bounds(), &GrassSettings::default());

    c.bench_function("transform_bounds", |b| {
        let mut frame = 0u32;
        b.iter(|| {
            frame += 1;
            let m = Mat4::from_scale_rotation_translation(
                Vec3::new(2.0, 1.0, 0.5),
                Quat::from_rotation_y(frame as f32 * 0.01),
                Vec3::new(5.0, 0.0, -3.0),
            );
            transform_bounds(black_box(&local), &m)
        });
    });
}

criterion_group!(
    benches,
    bench_subdivide_plane_64,
    bench_mask_plane_128,
    bench_pack_vertices,
    bench_prepare_with_settings,
    bench_world_bounds,
);
criterion_main!(benches);
