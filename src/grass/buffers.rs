//! GPU buffer manager and parameter marshalling.
//!
//! An activation owns four buffers plus private instances of the kernel and
//! material. Nothing is resized in place: a settings or mesh change tears the
//! whole set down and builds a new one.

use crate::core::error::Error;
use crate::core::types::Result;
use crate::grass::backend::{BackendLimits, GrassBackend, KernelSlot};
use crate::grass::bounds::expand_local_bounds;
use crate::grass::config::GrassSettings;
use crate::grass::kernel::{KernelSource, MaterialSource};
use crate::grass::layout::GrassLayout;
use crate::grass::mesh::{SourceMesh, pack_vertices};
use crate::grass::params::GenerationParams;
use crate::grass::wind::WindNoiseTexture;
use crate::math::Aabb;

/// What an activation is built from. Any `None` is a fatal precondition failure.
#[derive(Clone, Copy, Debug)]
pub struct ActivationRequest<'a> {
    pub mesh: Option<&'a SourceMesh>,
    pub settings: &'a GrassSettings,
    pub kernel: Option<&'a KernelSource>,
    pub material: Option<&'a MaterialSource>,
}

/// Resources of one activation.
pub struct ActiveBuffers<B: GrassBackend> {
    pub source_vertices: B::Buffer,
    pub source_triangles: B::Buffer,
    pub draw_triangles: B::Buffer,
    pub indirect_args: B::Buffer,
    pub kernel: B::Kernel,
    pub material: B::Material,
    pub layout: GrassLayout,
    /// Mesh bounds grown by the blade extent
    pub local_bounds: Aabb,
}

impl<B: GrassBackend> ActiveBuffers<B> {
    fn release(self, backend: &mut B) {
        backend.release_buffer(self.source_vertices);
        backend.release_buffer(self.source_triangles);
        backend.release_buffer(self.draw_triangles);
        backend.release_buffer(self.indirect_args);
        backend.destroy_kernel(self.kernel);
        backend.destroy_material(self.material);
    }
}

/// Owner of the grass GPU resources.
pub struct GrassBuffers<B: GrassBackend> {
    active: Option<ActiveBuffers<B>>,
}

impl<B: GrassBackend> Default for GrassBuffers<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: GrassBackend> GrassBuffers<B> {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&ActiveBuffers<B>> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveBuffers<B>> {
        self.active.as_mut()
    }

    pub fn layout(&self) -> Option<&GrassLayout> {
        self.active.as_ref().map(|a| &a.layout)
    }

    /// Allocate, upload and bind everything for `request`.
    ///
    /// An existing activation is torn down first. On error nothing stays
    /// allocated and the manager is inactive.
    pub fn activate(&mut self, backend: &mut B, request: ActivationRequest<'_>) -> Result<()> {
        let (mesh, kernel_source, material_source) = match (request.mesh, request.kernel, request.material) {
            (Some(mesh), Some(kernel), Some(material)) => (mesh, kernel, material),
            (mesh, kernel, _) => {
                let missing = if mesh.is_none() {
                    "grass source mesh"
                } else if kernel.is_none() {
                    "grass compute kernel"
                } else {
                    "grass material"
                };
                log::error!("Cannot activate grass: {} is not set", missing);
                self.deactivate(backend);
                return Err(Error::MissingResource(missing));
            }
        };

        if self.active.is_some() {
            log::debug!("Grass already active, tearing down before re-activation");
            self.deactivate(backend);
        }

        let settings = request.settings;
        let mesh = mesh.prepare(settings).inspect_err(|e| log::error!("Cannot activate grass: {}", e))?;
        let limits = backend.limits();
        let wind = WindNoiseTexture::resolve(&settings.wind_noise, limits.max_texture_dimension)
            .inspect_err(|e| log::error!("Cannot activate grass: {}", e))?;

        let kernel = backend.instantiate_kernel(kernel_source)?;
        let material = match backend.instantiate_material(material_source) {
            Ok(material) => material,
            Err(e) => {
                backend.destroy_kernel(kernel);
                return Err(e);
            }
        };

        let width = backend.thread_group_width(&kernel);
        let layout = GrassLayout::new(mesh.vertex_count(), mesh.index_count(), settings, width);
        if let Err(e) = check_limits(&layout, &limits) {
            log::error!("Cannot activate grass: {}", e);
            backend.destroy_kernel(kernel);
            backend.destroy_material(material);
            return Err(e);
        }

        let created = (
            backend.create_buffer(&layout.source_vertices()),
            backend.create_buffer(&layout.source_triangles()),
            backend.create_buffer(&layout.draw_triangles()),
            backend.create_buffer(&layout.indirect_args()),
        );
        let (source_vertices, source_triangles, draw_triangles, indirect_args) = match created {
            (Ok(v), Ok(t), Ok(d), Ok(a)) => (v, t, d, a),
            (v, t, d, a) => {
                let mut first_error = None;
                for result in [v, t, d, a] {
                    match result {
                        Ok(buffer) => backend.release_buffer(buffer),
                        Err(e) => {
                            first_error.get_or_insert(e);
                        }
                    }
                }
                backend.destroy_kernel(kernel);
                backend.destroy_material(material);
                let err = first_error.unwrap_or_else(|| Error::Gpu("grass buffer allocation failed".into()));
                log::error!("Cannot activate grass: {}", err);
                return Err(err);
            }
        };

        // Written once; never touched again for this activation
        backend.write_buffer(&source_vertices, bytemuck::cast_slice(&pack_vertices(&mesh)));
        backend.write_buffer(&source_triangles, bytemuck::cast_slice(&mesh.indices));
        backend.reset_append_counter(&draw_triangles);

        let mut active = ActiveBuffers {
            source_vertices,
            source_triangles,
            draw_triangles,
            indirect_args,
            kernel,
            material,
            layout,
            local_bounds: expand_local_bounds(mesh.local_bounds(), settings),
        };

        if let Err(e) = marshal(backend, &mut active, settings, &wind) {
            active.release(backend);
            return Err(e);
        }

        log::debug!(
            "Grass buffers: {} vertices ({} B), {} indices ({} B), {} draw records ({} B), dispatch {} x {}",
            layout.vertex_count,
            layout.source_vertices().size(),
            layout.index_count,
            layout.source_triangles().size(),
            layout.draw_capacity,
            layout.draw_triangles().size(),
            layout.dispatch_groups,
            layout.thread_group_width,
        );
        log::info!(
            "Grass activated: {} source triangles, up to {} blade triangles each",
            layout.source_triangle_count,
            layout.max_blade_triangles
        );

        self.active = Some(active);
        Ok(())
    }

    /// Release every buffer and instance. Does nothing when already inactive.
    pub fn deactivate(&mut self, backend: &mut B) {
        if let Some(active) = self.active.take() {
            active.release(backend);
            log::info!("Grass deactivated");
        }
    }
}

/// The dispatch and every buffer of `layout` must fit the device.
fn check_limits(layout: &GrassLayout, limits: &BackendLimits) -> Result<()> {
    BackendLimits::check(
        "grass dispatch groups",
        u64::from(layout.dispatch_groups),
        u64::from(limits.max_dispatch_groups),
    )?;
    for desc in [
        layout.source_vertices(),
        layout.source_triangles(),
        layout.draw_triangles(),
        layout.indirect_args(),
    ] {
        BackendLimits::check(desc.label, desc.size(), limits.max_buffer_size)?;
    }
    Ok(())
}

/// Bind all buffers to the kernel and material, then push the static
/// parameters and the wind texture. Runs once per activation.
fn marshal<B: GrassBackend>(
    backend: &mut B,
    active: &mut ActiveBuffers<B>,
    settings: &GrassSettings,
    wind: &WindNoiseTexture,
) -> Result<()> {
    let ActiveBuffers {
        source_vertices,
        source_triangles,
        draw_triangles,
        indirect_args,
        kernel,
        material,
        layout,
        ..
    } = active;

    for slot in KernelSlot::ALL {
        let buffer = match slot {
            KernelSlot::SourceVertices => &*source_vertices,
            KernelSlot::SourceTriangles => &*source_triangles,
            KernelSlot::DrawTriangles => &*draw_triangles,
            KernelSlot::IndirectArgs => &*indirect_args,
        };
        backend.bind_kernel_buffer(kernel, slot, buffer);
    }
    backend.bind_material_buffer(material, draw_triangles);

    let max_draw_triangles = u32::try_from(layout.draw_capacity).unwrap_or(u32::MAX);
    let params = GenerationParams::from_settings(settings, layout.source_triangle_count, max_draw_triangles);
    backend.set_generation_params(kernel, &params);
    backend.set_wind_texture(kernel, wind)
}
