//! Grass Stats - print buffer sizing for a generated plane
//!
//! Usage: grass_stats [--settings <path>] [--cells <n>] [--size <meters>] [--group-width <n>] [--gpu]
//!
//! With `--gpu`, one frame is generated on a headless device and the
//! appended triangle count is read back.

use std::path::PathBuf;

use gpugrass::core::logging;
use gpugrass::core::types::{Mat4, Result, Vec3};
use gpugrass::grass::{
    FrameInput, GrassLayout, GrassRenderer, GrassSettings, KernelSource, MaterialSource, SourceMesh,
    expand_local_bounds,
};
use gpugrass::grass::kernel::DEFAULT_THREAD_GROUP_WIDTH;
use gpugrass::render::{GpuContext, RenderTargets, WgpuBackend};

fn arg_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn print_layout(layout: &GrassLayout) {
    println!("Source vertices:  {:>10} ({} B)", layout.vertex_count, layout.source_vertices().size());
    println!("Source indices:   {:>10} ({} B)", layout.index_count, layout.source_triangles().size());
    println!("Source triangles: {:>10}", layout.source_triangle_count);
    println!("Blade segments:   {:>10}", layout.max_blade_segments);
    println!("Blade triangles:  {:>10}", layout.max_blade_triangles);
    println!("Draw capacity:    {:>10} ({} B)", layout.draw_capacity, layout.draw_triangles().size());
    println!("Indirect args:    {:>10} B", layout.indirect_args().size());
    println!("Total:            {:>10} B", layout.total_bytes());
    println!("Dispatch:         {:>10} x {}", layout.dispatch_groups, layout.thread_group_width);
}

fn run_on_gpu(mesh: SourceMesh, settings: GrassSettings, kernel: KernelSource) -> Result<()> {
    let gpu = pollster::block_on(GpuContext::headless())?;
    let targets = RenderTargets { color: gpu.format(), depth: None };
    let mut backend = WgpuBackend::new(&gpu.device, &gpu.queue, targets);
    let mut renderer =
        GrassRenderer::with_resources(settings, mesh, kernel, MaterialSource::reference());
    renderer.activate(&mut backend)?;

    let frame = FrameInput {
        time: 0.0,
        local_to_world: Mat4::IDENTITY,
        camera_position: Vec3::new(0.0, 2.0, 0.0),
    };
    renderer.render_frame(&mut backend, &frame)?;

    let result = match renderer.active_buffers() {
        Some(active) => {
            let args = backend.read_indirect_args(&active.indirect_args)?;
            let triangles = args.vertex_count / 3;
            println!("Generated:        {:>10} triangles ({} vertices)", triangles, args.vertex_count);
            Ok(())
        }
        None => Err(gpugrass::core::Error::MissingResource("active grass buffers")),
    };

    renderer.deactivate(&mut backend);
    result
}

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let settings = match arg_value(&args, "--settings") {
        Some(path) => GrassSettings::load(PathBuf::from(path))?,
        None => GrassSettings::default(),
    };
    let cells = arg_value(&args, "--cells").and_then(|s| s.parse().ok()).unwrap_or(16);
    let size = arg_value(&args, "--size").and_then(|s| s.parse().ok()).unwrap_or(16.0);
    let group_width = arg_value(&args, "--group-width")
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_THREAD_GROUP_WIDTH);
    let kernel = KernelSource::reference().with_thread_group_width(group_width);

    let mesh = SourceMesh::plane(size, cells).prepare(&settings)?;
    let layout = GrassLayout::new(mesh.vertex_count(), mesh.index_count(), &settings, kernel.thread_group_width);

    println!("Plane {size} m, {cells} x {cells} cells, {} subdivision(s)", settings.mesh_subdivisions);
    print_layout(&layout);

    let bounds = expand_local_bounds(mesh.local_bounds(), &settings);
    println!("Local bounds:     {:?} .. {:?}", bounds.min, bounds.max);

    if args.iter().any(|a| a == "--gpu") {
        // The renderer prepares the raw plane itself
        run_on_gpu(SourceMesh::plane(size, cells), settings, kernel)?;
    }
    Ok(())
}
