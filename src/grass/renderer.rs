//! Per-frame dispatcher for the grass subsystem.
//!
//! While active, every frame resets the append counter and the draw
//! arguments, pushes the frame uniforms, dispatches one invocation per source
//! triangle, copies the appended count into the arguments and queues one
//! indirect draw bounded by the world-space box.

use crate::core::types::{Mat4, Result, Vec3};
use crate::grass::backend::{GrassBackend, IndirectDraw};
use crate::grass::bounds::transform_bounds;
use crate::grass::buffers::{ActivationRequest, ActiveBuffers, GrassBuffers};
use crate::grass::config::{GrassSettings, SettingsCell};
use crate::grass::kernel::{KernelSource, MaterialSource};
use crate::grass::layout::GrassLayout;
use crate::grass::mesh::SourceMesh;
use crate::grass::params::{FrameUniforms, IndirectArgs};
use crate::math::Aabb;

/// Whether the host simulation is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Settings are frozen between explicit activations.
    #[default]
    Playing,
    /// Edit preview: changed settings or inputs are picked up on the next frame.
    Editing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererState {
    Inactive,
    Active,
}

/// Per-frame inputs from the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInput {
    /// Seconds since level load
    pub time: f32,
    pub local_to_world: Mat4,
    pub camera_position: Vec3,
}

/// What one frame submitted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    pub world_bounds: Aabb,
    pub dispatch_groups: u32,
    /// The activation was rebuilt before this frame
    pub reinitialized: bool,
}

/// Grass on one mesh: owns the inputs, the settings and the GPU resources.
pub struct GrassRenderer<B: GrassBackend> {
    mesh: Option<SourceMesh>,
    kernel: Option<KernelSource>,
    material: Option<MaterialSource>,
    /// Bumped whenever the mesh, kernel or material is replaced
    inputs_revision: u64,
    settings: SettingsCell,
    mode: PlaybackMode,
    buffers: GrassBuffers<B>,
    /// (settings revision, inputs revision) of the last activation attempt
    built_from: Option<(u64, u64)>,
}

impl<B: GrassBackend> GrassRenderer<B> {
    pub fn new(settings: GrassSettings) -> Self {
        Self {
            mesh: None,
            kernel: None,
            material: None,
            inputs_revision: 0,
            settings: SettingsCell::new(settings),
            mode: PlaybackMode::default(),
            buffers: GrassBuffers::new(),
            built_from: None,
        }
    }

    /// Renderer with the mesh, kernel and material already assigned.
    pub fn with_resources(
        settings: GrassSettings,
        mesh: SourceMesh,
        kernel: KernelSource,
        material: MaterialSource,
    ) -> Self {
        let mut renderer = Self::new(settings);
        renderer.mesh = Some(mesh);
        renderer.kernel = Some(kernel);
        renderer.material = Some(material);
        renderer
    }

    pub fn set_mesh(&mut self, mesh: Option<SourceMesh>) {
        self.mesh = mesh;
        self.inputs_revision += 1;
    }

    pub fn mesh(&self) -> Option<&SourceMesh> {
        self.mesh.as_ref()
    }

    pub fn set_kernel(&mut self, kernel: Option<KernelSource>) {
        self.kernel = kernel;
        self.inputs_revision += 1;
    }

    pub fn set_material(&mut self, material: Option<MaterialSource>) {
        self.material = material;
        self.inputs_revision += 1;
    }

    pub fn settings(&self) -> &GrassSettings {
        self.settings.get()
    }

    /// Edit the settings in place. Only an actual difference counts as a
    /// change for [`PlaybackMode::Editing`].
    pub fn update_settings(&mut self, edit: impl FnOnce(&mut GrassSettings)) {
        self.settings.update(edit);
    }

    pub fn set_settings(&mut self, settings: GrassSettings) {
        self.settings.set(settings);
    }

    pub fn playback_mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn set_playback_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }

    pub fn state(&self) -> RendererState {
        if self.buffers.is_active() {
            RendererState::Active
        } else {
            RendererState::Inactive
        }
    }

    pub fn layout(&self) -> Option<&GrassLayout> {
        self.buffers.layout()
    }

    /// GPU resources of the current activation
    pub fn active_buffers(&self) -> Option<&ActiveBuffers<B>> {
        self.buffers.active()
    }

    /// Expanded local bounds of the current activation
    pub fn local_bounds(&self) -> Option<Aabb> {
        self.buffers.active().map(|a| a.local_bounds)
    }

    /// Settings or inputs changed since the last activation attempt
    pub fn is_dirty(&self) -> bool {
        self.built_from != Some(self.current_revision())
    }

    fn current_revision(&self) -> (u64, u64) {
        (self.settings.revision(), self.inputs_revision)
    }

    /// Build the GPU resources from the current mesh and settings.
    pub fn activate(&mut self, backend: &mut B) -> Result<()> {
        self.built_from = Some(self.current_revision());
        let request = ActivationRequest {
            mesh: self.mesh.as_ref(),
            settings: self.settings.get(),
            kernel: self.kernel.as_ref(),
            material: self.material.as_ref(),
        };
        self.buffers.activate(backend, request)
    }

    pub fn deactivate(&mut self, backend: &mut B) {
        self.buffers.deactivate(backend);
    }

    /// Run the per-frame protocol. Returns `None` when inactive.
    pub fn render_frame(&mut self, backend: &mut B, frame: &FrameInput) -> Result<Option<FrameReport>> {
        let mut reinitialized = false;
        if self.mode == PlaybackMode::Editing && self.is_dirty() {
            log::info!("Grass inputs changed, reinitializing");
            self.deactivate(backend);
            self.activate(backend)?;
            reinitialized = true;
        }

        let Some(active) = self.buffers.active_mut() else {
            return Ok(None);
        };

        backend.reset_append_counter(&active.draw_triangles);
        backend.write_buffer(&active.indirect_args, bytemuck::bytes_of(&IndirectArgs::RESET));

        let world_bounds = transform_bounds(&active.local_bounds, &frame.local_to_world);

        let uniforms = FrameUniforms::new(frame.time, frame.local_to_world, frame.camera_position);
        backend.set_frame_uniforms(&mut active.kernel, &uniforms);

        let groups = active.layout.dispatch_groups;
        backend.dispatch(&mut active.kernel, [groups, 1, 1]);
        backend.copy_append_count(&mut active.kernel, &active.draw_triangles, &active.indirect_args);

        backend.draw_procedural_indirect(
            &active.material,
            &active.indirect_args,
            &IndirectDraw::triangles(world_bounds),
        );

        Ok(Some(FrameReport {
            world_bounds,
            dispatch_groups: groups,
            reinitialized,
        }))
    }
}

impl<B: GrassBackend> Drop for GrassRenderer<B> {
    fn drop(&mut self) {
        if self.buffers.is_active() {
            log::warn!("GrassRenderer dropped while active; call deactivate() to release GPU resources explicitly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use crate::grass::backend::ShadowCasting;
    use crate::grass::recording::{Op, RecordingBackend};
    use glam::Vec4;

    fn renderer() -> GrassRenderer<RecordingBackend> {
        let mesh = SourceMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::new(1.0, 0.0, 1.0)],
            vec![Vec4::ONE; 4],
            vec![0, 2, 1, 1, 2, 3],
        );
        GrassRenderer::with_resources(
            GrassSettings::default(),
            mesh,
            KernelSource::reference(),
            MaterialSource::reference(),
        )
    }

    fn frame() -> FrameInput {
        FrameInput {
            time: 1.5,
            local_to_world: Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)),
            camera_position: Vec3::new(0.0, 2.0, -5.0),
        }
    }

    fn args_of(backend: &RecordingBackend) -> [u32; 4] {
        let args = backend.buffer_by_label("grass_indirect_args").unwrap();
        let words: &[u32] = bytemuck::cast_slice(&args.data);
        [words[0], words[1], words[2], words[3]]
    }

    #[test]
    fn test_inactive_frame_does_nothing() {
        let mut r = renderer();
        let mut backend = RecordingBackend::new(64);
        assert_eq!(r.state(), RendererState::Inactive);
        assert_eq!(r.render_frame(&mut backend, &frame()).unwrap(), None);
        assert!(backend.ops.is_empty());
    }

    #[test]
    fn test_frame_protocol_order() {
        let mut r = renderer();
        let mut backend = RecordingBackend::new(64);
        r.activate(&mut backend).unwrap();
        backend.clear_ops();

        let report = r.render_frame(&mut backend, &frame()).unwrap().unwrap();
        assert_eq!(report.dispatch_groups, 1);
        assert!(!report.reinitialized);

        let kinds: Vec<&'static str> = backend
            .ops
            .iter()
            .map(|op| match op {
                Op::ResetCounter(_) => "reset",
                Op::Write(..) => "args",
                Op::SetFrame(_) => "uniforms",
                Op::Dispatch(_) => "dispatch",
                Op::CopyCount { .. } => "count",
                Op::Draw { .. } => "draw",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["reset", "args", "uniforms", "dispatch", "count", "draw"]);
        assert!(backend.ops.contains(&Op::Dispatch([1, 1, 1])));
    }

    #[test]
    fn test_args_reset_before_dispatch() {
        let mut r = renderer();
        let mut backend = RecordingBackend::new(64);
        r.activate(&mut backend).unwrap();
        backend.clear_ops();
        r.render_frame(&mut backend, &frame()).unwrap();

        let reset = backend.ops.iter().find_map(|op| match op {
            Op::Write(_, data) => Some(data.clone()),
            _ => None,
        });
        let reset: Vec<u32> = bytemuck::cast_slice(&reset.unwrap()).to_vec();
        assert_eq!(reset, [0, 1, 0, 0]);
    }

    #[test]
    fn test_append_count_reaches_args() {
        let mut r = renderer();
        let mut backend = RecordingBackend::new(64);
        backend.appends_per_dispatch = 4;
        r.activate(&mut backend).unwrap();

        r.render_frame(&mut backend, &frame()).unwrap();
        assert_eq!(args_of(&backend), [12, 1, 0, 0]);

        // The counter restarts every frame instead of accumulating
        r.render_frame(&mut backend, &frame()).unwrap();
        assert_eq!(args_of(&backend), [12, 1, 0, 0]);
    }

    #[test]
    fn test_append_count_saturates_at_capacity() {
        let mut r = renderer();
        let mut backend = RecordingBackend::new(64);
        backend.appends_per_dispatch = 1000;
        r.activate(&mut backend).unwrap();
        r.render_frame(&mut backend, &frame()).unwrap();
        assert_eq!(args_of(&backend)[0], 10 * 3);
    }

    #[test]
    fn test_frame_uniforms_and_draw() {
        let mut r = renderer();
        let mut backend = RecordingBackend::new(64);
        r.activate(&mut backend).unwrap();
        backend.clear_ops();
        let input = frame();
        let report = r.render_frame(&mut backend, &input).unwrap().unwrap();

        let expected = FrameUniforms::new(1.5, input.local_to_world, input.camera_position);
        assert!(backend.ops.contains(&Op::SetFrame(expected)));

        let draw = backend
            .ops
            .iter()
            .find_map(|op| match op {
                Op::Draw { draw, .. } => Some(*draw),
                _ => None,
            })
            .unwrap();
        assert_eq!(draw.shadow_casting, ShadowCasting::Off);
        assert_eq!(draw.bounds, report.world_bounds);
        let expected_center = r.local_bounds().unwrap().center() + Vec3::new(10.0, 0.0, 0.0);
        assert!((report.world_bounds.center() - expected_center).abs().max_element() < 1e-5);
    }

    #[test]
    fn test_playing_ignores_settings_changes() {
        let mut r = renderer();
        let mut backend = RecordingBackend::new(64);
        r.activate(&mut backend).unwrap();
        r.update_settings(|s| s.max_segments = 5);
        backend.clear_ops();

        let report = r.render_frame(&mut backend, &frame()).unwrap().unwrap();
        assert!(!report.reinitialized);
        assert_eq!(r.layout().unwrap().draw_capacity, 10);
        assert!(!backend.ops.iter().any(|op| matches!(op, Op::CreateBuffer(..))));
    }

    #[test]
    fn test_editing_reinitializes_only_on_change() {
        let mut r = renderer();
        r.set_playback_mode(PlaybackMode::Editing);
        let mut backend = RecordingBackend::new(64);

        let first = r.render_frame(&mut backend, &frame()).unwrap().unwrap();
        assert!(first.reinitialized);
        assert_eq!(r.state(), RendererState::Active);

        backend.clear_ops();
        let second = r.render_frame(&mut backend, &frame()).unwrap().unwrap();
        assert!(!second.reinitialized);
        assert!(!backend.ops.iter().any(|op| matches!(op, Op::CreateBuffer(..) | Op::Release(_))));

        r.update_settings(|s| s.max_segments = 5);
        let third = r.render_frame(&mut backend, &frame()).unwrap().unwrap();
        assert!(third.reinitialized);
        assert_eq!(r.layout().unwrap().draw_capacity, 2 * 9);
        assert_eq!(backend.buffers.len(), 4);
    }

    #[test]
    fn test_editing_ignores_no_op_edits() {
        let mut r = renderer();
        r.set_playback_mode(PlaybackMode::Editing);
        r.update_settings(|s| s.max_segments = 1);
        let mut backend = RecordingBackend::new(64);
        r.render_frame(&mut backend, &frame()).unwrap();

        // Lowering a segment count that is already at its floor changes nothing
        r.update_settings(|s| s.max_segments = (s.max_segments - 1).max(1));
        assert!(!r.is_dirty());
        backend.clear_ops();
        let report = r.render_frame(&mut backend, &frame()).unwrap().unwrap();
        assert!(!report.reinitialized);
        assert!(!backend.ops.iter().any(|op| matches!(op, Op::CreateBuffer(..) | Op::Release(_))));
    }

    #[test]
    fn test_editing_picks_up_new_mesh() {
        let mut r = renderer();
        r.set_playback_mode(PlaybackMode::Editing);
        let mut backend = RecordingBackend::new(64);
        r.render_frame(&mut backend, &frame()).unwrap();

        r.set_mesh(Some(SourceMesh::plane(2.0, 2)));
        let report = r.render_frame(&mut backend, &frame()).unwrap().unwrap();
        assert!(report.reinitialized);
        assert_eq!(r.layout().unwrap().source_triangle_count, 8);
    }

    #[test]
    fn test_editing_without_kernel_fails_once() {
        let mut r = renderer();
        r.set_kernel(None);
        r.set_playback_mode(PlaybackMode::Editing);
        let mut backend = RecordingBackend::new(64);

        let err = r.render_frame(&mut backend, &frame()).unwrap_err();
        assert!(matches!(err, Error::MissingResource(_)));
        // Nothing changed, so the failed activation is not retried
        assert_eq!(r.render_frame(&mut backend, &frame()).unwrap(), None);

        r.set_kernel(Some(KernelSource::reference()));
        assert!(r.render_frame(&mut backend, &frame()).unwrap().is_some());
    }

    #[test]
    fn test_editing_rebuilds_on_material_swap() {
        let mut r = renderer();
        r.set_playback_mode(PlaybackMode::Editing);
        let mut backend = RecordingBackend::new(64);
        r.render_frame(&mut backend, &frame()).unwrap();

        r.set_material(None);
        let err = r.render_frame(&mut backend, &frame()).unwrap_err();
        assert!(matches!(err, Error::MissingResource("grass material")));
        assert!(backend.is_empty());

        r.set_material(Some(MaterialSource::reference()));
        let report = r.render_frame(&mut backend, &frame()).unwrap().unwrap();
        assert!(report.reinitialized);
        assert_eq!(backend.materials.len(), 1);
    }

    #[test]
    fn test_activate_twice_and_deactivate_twice() {
        let mut r = renderer();
        let mut backend = RecordingBackend::new(64);
        r.activate(&mut backend).unwrap();
        r.activate(&mut backend).unwrap();
        assert_eq!(backend.buffers.len(), 4);

        r.deactivate(&mut backend);
        r.deactivate(&mut backend);
        assert_eq!(r.state(), RendererState::Inactive);
        assert!(backend.is_empty());
        assert_eq!(r.render_frame(&mut backend, &frame()).unwrap(), None);
    }

    #[test]
    fn test_many_frames_do_not_allocate() {
        let mut r = renderer();
        let mut backend = RecordingBackend::new(64);
        r.activate(&mut backend).unwrap();
        backend.clear_ops();
        for i in 0..50 {
            let input = FrameInput { time: i as f32 / 60.0, ..frame() };
            r.render_frame(&mut backend, &input).unwrap();
        }
        assert!(!backend.ops.iter().any(|op| matches!(op, Op::CreateBuffer(..) | Op::Release(_))));
        assert_eq!(backend.ops.iter().filter(|op| matches!(op, Op::Draw { .. })).count(), 50);
        r.deactivate(&mut backend);
        assert!(backend.is_empty());
    }
}
