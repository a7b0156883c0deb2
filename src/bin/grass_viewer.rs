//! Grass Viewer - interactive preview of GPU grass on a subdivided plane
//!
//! Usage: grass_viewer [settings.json]
//!
//! Controls:
//! - Tab: toggle playing / editing mode
//! - Up/Down: more / fewer blade segments
//! - R: reload the settings file
//! - S: save the current settings to the settings file
//! - Escape: exit

use std::path::PathBuf;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use gpugrass::core::camera::Camera;
use gpugrass::core::logging;
use gpugrass::core::time::{FrameTimer, LevelClock};
use gpugrass::core::types::{Mat4, Result, Vec3};
use gpugrass::grass::{
    FrameInput, GrassRenderer, GrassSettings, KernelSource, MaterialSource, PlaybackMode, SourceMesh,
};
use gpugrass::render::{GpuContext, RenderTargets, WgpuBackend};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const ORBIT_RADIUS: f32 = 14.0;
const ORBIT_HEIGHT: f32 = 5.0;

struct ViewerState {
    gpu: GpuContext,
    backend: WgpuBackend,
    renderer: GrassRenderer<WgpuBackend>,
    camera: Camera,
    depth_view: wgpu::TextureView,
    clock: LevelClock,
    timer: FrameTimer,
}

impl ViewerState {
    fn new(gpu: GpuContext, settings: GrassSettings) -> Result<Self> {
        let targets = RenderTargets { color: gpu.format(), depth: Some(DEPTH_FORMAT) };
        let mut backend = WgpuBackend::new(&gpu.device, &gpu.queue, targets);

        let plane = SourceMesh::plane(16.0, 32);
        let mut renderer =
            GrassRenderer::with_resources(settings, plane, KernelSource::reference(), MaterialSource::reference());
        renderer.activate(&mut backend)?;

        if let Some(layout) = renderer.layout() {
            log::info!(
                "{} source triangles, {} draw records ({:.1} MB)",
                layout.source_triangle_count,
                layout.draw_capacity,
                layout.draw_triangles().size() as f64 / (1024.0 * 1024.0)
            );
        }

        let (width, height) = gpu.size();
        let depth_view = create_depth_view(&gpu.device, width, height);
        let camera = Camera::new(
            Vec3::new(ORBIT_RADIUS, ORBIT_HEIGHT, 0.0),
            Vec3::ZERO,
            60.0,
            width as f32 / height as f32,
        );

        Ok(Self {
            gpu,
            backend,
            renderer,
            camera,
            depth_view,
            clock: LevelClock::start(),
            timer: FrameTimer::new(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        let (width, height) = self.gpu.size();
        self.depth_view = create_depth_view(&self.gpu.device, width, height);
        self.camera.set_aspect(width as f32, height as f32);
    }

    fn render(&mut self) -> Result<()> {
        // Acquire first so a lost surface skips the frame before any grass work is queued
        let output = self.gpu.get_current_texture()?;
        self.timer.tick();
        let time = self.clock.time_since_level_load();
        self.camera.orbit(time * 0.1, ORBIT_RADIUS, ORBIT_HEIGHT);

        let frame = FrameInput {
            time,
            local_to_world: Mat4::IDENTITY,
            camera_position: self.camera.position,
        };
        if let Some(report) = self.renderer.render_frame(&mut self.backend, &frame)? {
            if report.reinitialized {
                log::info!("Grass rebuilt");
            }
        }
        self.backend.set_camera(&self.camera);
        self.backend.flush();

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("viewer_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("grass_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r: 0.45, g: 0.6, b: 0.8, a: 1.0 }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.backend.render(&mut pass);
        }

        self.gpu.queue.submit(Some(encoder.finish()));
        output.present();

        if self.timer.frame_count() % 300 == 0 {
            log::info!("{:.1} fps ({:?})", self.timer.fps(), self.renderer.playback_mode());
        }
        Ok(())
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("viewer_depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

struct App {
    settings_path: Option<PathBuf>,
    window: Option<Arc<Window>>,
    state: Option<ViewerState>,
}

impl App {
    fn new(settings_path: Option<PathBuf>) -> Self {
        Self {
            settings_path,
            window: None,
            state: None,
        }
    }

    fn load_settings(&self) -> GrassSettings {
        match &self.settings_path {
            Some(path) => GrassSettings::load(path).unwrap_or_else(|e| {
                log::warn!("Could not load {}: {}, using defaults", path.display(), e);
                GrassSettings::default()
            }),
            None => GrassSettings {
                max_segments: 4,
                mesh_subdivisions: 1,
                max_bend_angle: 0.6,
                blade_height: 0.6,
                blade_width: 0.08,
                blade_width_variance: 0.02,
                wind_noise: gpugrass::grass::WindNoiseSource::Perlin { size: 128, frequency: 6.0, seed: 7 },
                wind_amplitude: 0.4,
                wind_scale: 0.05,
                camera_lod_min: 8.0,
                camera_lod_max: 40.0,
                ..Default::default()
            },
        }
    }

    fn handle_key(&mut self, key: KeyCode, event_loop: &ActiveEventLoop) {
        if key == KeyCode::Escape {
            event_loop.exit();
            return;
        }
        let reloaded = (key == KeyCode::KeyR).then(|| self.load_settings());
        let Some(state) = self.state.as_mut() else { return };
        let renderer = &mut state.renderer;

        match key {
            KeyCode::Tab => {
                let mode = match renderer.playback_mode() {
                    PlaybackMode::Playing => PlaybackMode::Editing,
                    PlaybackMode::Editing => PlaybackMode::Playing,
                };
                renderer.set_playback_mode(mode);
                log::info!("Playback mode: {:?}", mode);
            }
            KeyCode::ArrowUp => {
                renderer.update_settings(|s| s.max_segments = s.max_segments.saturating_add(1));
                log::info!("max_segments = {}", renderer.settings().max_segments);
            }
            KeyCode::ArrowDown => {
                renderer.update_settings(|s| s.max_segments = s.max_segments.saturating_sub(1).max(1));
                log::info!("max_segments = {}", renderer.settings().max_segments);
            }
            KeyCode::KeyS => match &self.settings_path {
                Some(path) => match renderer.settings().save(path) {
                    Ok(()) => log::info!("Settings saved to {}", path.display()),
                    Err(e) => log::warn!("Could not save {}: {}", path.display(), e),
                },
                None => log::warn!("No settings file given, nothing saved"),
            },
            KeyCode::KeyR => {
                if let Some(settings) = reloaded {
                    renderer.set_settings(settings);
                    log::info!("Settings reloaded");
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let window = match event_loop.create_window(
            Window::default_attributes()
                .with_title("Grass Viewer")
                .with_inner_size(PhysicalSize::new(1280, 720)),
        ) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        let settings = self.load_settings();
        let state = pollster::block_on(GpuContext::new(window))
            .and_then(|gpu| ViewerState::new(gpu, settings));
        match state {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                log::error!("Failed to initialize viewer: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                if let Some(state) = self.state.as_mut() {
                    state.renderer.deactivate(&mut state.backend);
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = self.state.as_mut() {
                    state.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed()
                    && let PhysicalKey::Code(key) = event.physical_key
                {
                    self.handle_key(key, event_loop);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(state) = self.state.as_mut()
                    && let Err(e) = state.render()
                {
                    log::warn!("Frame skipped: {}", e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    logging::init();
    log::info!("Grass Viewer starting...");

    let settings_path = std::env::args().nth(1).map(PathBuf::from);

    let event_loop = EventLoop::new().map_err(|e| gpugrass::core::Error::Window(e.to_string()))?;
    let mut app = App::new(settings_path);
    event_loop
        .run_app(&mut app)
        .map_err(|e| gpugrass::core::Error::Window(e.to_string()))?;
    Ok(())
}
