//! [`GrassBackend`] on a wgpu device.
//!
//! Buffer clears and compute passes are recorded into a pending encoder;
//! buffer and uniform uploads go through the queue, which wgpu executes
//! before the next submitted command buffer. Call [`WgpuBackend::flush`]
//! once per frame before the render pass that replays the queued draws.
//!
//! Append buffers carry a separate 4-byte atomic counter. The kernel's count
//! entry point turns that counter into the vertex count of the indirect
//! arguments, so the draw never reads a stale count.

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::grass::backend::{
    BackendLimits, BufferDesc, BufferKind, GrassBackend, IndirectDraw, KernelSlot, ShadowCasting,
};
use crate::grass::kernel::{KernelSource, MaterialSource};
use crate::grass::params::{FrameUniforms, GenerationParams, IndirectArgs, INDIRECT_ARGS_STRIDE};
use crate::grass::wind::WindNoiseTexture;
use crate::math::{Aabb, Frustum};
use crate::render::buffer::CameraBuffer;

const COUNTER_SIZE: u64 = std::mem::size_of::<u32>() as u64;

/// A grass buffer plus, for append buffers, its counter.
#[derive(Clone, Debug)]
pub struct WgpuBuffer {
    pub buffer: wgpu::Buffer,
    pub counter: Option<wgpu::Buffer>,
    pub desc: BufferDesc,
}

/// Buffers bound to the kernel's resource slots
#[derive(Default)]
struct KernelBindings {
    source_vertices: Option<wgpu::Buffer>,
    source_triangles: Option<wgpu::Buffer>,
    draw_triangles: Option<wgpu::Buffer>,
    draw_counter: Option<wgpu::Buffer>,
    indirect_args: Option<wgpu::Buffer>,
}

/// Private instance of the generation kernel.
pub struct WgpuKernel {
    label: String,
    thread_group_width: u32,
    generate: wgpu::ComputePipeline,
    finalize: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bindings: KernelBindings,
    params: wgpu::Buffer,
    frame: wgpu::Buffer,
    wind: Option<(wgpu::Texture, wgpu::TextureView)>,
    sampler: wgpu::Sampler,
    /// Rebuilt on first use after any binding changes
    bind_group: Option<wgpu::BindGroup>,
}

impl WgpuKernel {
    fn bind_group(&mut self, device: &wgpu::Device) -> Option<&wgpu::BindGroup> {
        if self.bind_group.is_none() {
            let b = &self.bindings;
            let (
                Some(vertices),
                Some(triangles),
                Some(draw),
                Some(counter),
                Some(args),
                Some((_, wind_view)),
            ) = (
                &b.source_vertices,
                &b.source_triangles,
                &b.draw_triangles,
                &b.draw_counter,
                &b.indirect_args,
                &self.wind,
            )
            else {
                return None;
            };

            self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{}_bind_group", self.label)),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: vertices.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 1, resource: triangles.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 2, resource: draw.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 3, resource: counter.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 4, resource: args.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 5, resource: self.params.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 6, resource: self.frame.as_entire_binding() },
                    wgpu::BindGroupEntry {
                        binding: 7,
                        resource: wgpu::BindingResource::TextureView(wind_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 8,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            }));
        }
        self.bind_group.as_ref()
    }
}

/// Private instance of the draw material.
pub struct WgpuMaterial {
    label: String,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: Option<wgpu::BindGroup>,
}

/// An indirect draw waiting for the host's render pass
struct QueuedDraw {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    args: wgpu::Buffer,
    args_offset: u64,
    bounds: Aabb,
}

/// Draws waiting for the render pass, at most one per key.
///
/// A frame that never reaches the render pass leaves its draw behind; the
/// next draw with the same key replaces it instead of stacking up.
struct DrawQueue<K, D> {
    entries: Vec<(K, D)>,
}

impl<K: PartialEq, D> DrawQueue<K, D> {
    fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn push(&mut self, key: K, draw: D) {
        self.forget(&key);
        self.entries.push((key, draw));
    }

    /// Drop any draw for `key`, e.g. because its buffers were released
    fn forget(&mut self, key: &K) {
        self.entries.retain(|(k, _)| k != key);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn drain(&mut self) -> impl Iterator<Item = D> + '_ {
        self.entries.drain(..).map(|(_, draw)| draw)
    }
}

/// Formats of the attachments the host renders grass into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTargets {
    pub color: wgpu::TextureFormat,
    pub depth: Option<wgpu::TextureFormat>,
}

/// wgpu implementation of [`GrassBackend`].
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    targets: RenderTargets,
    camera: CameraBuffer,
    frustum: Option<Frustum>,
    encoder: Option<wgpu::CommandEncoder>,
    /// Keyed by the args buffer each draw reads
    draws: DrawQueue<wgpu::Buffer, QueuedDraw>,
}

impl WgpuBackend {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, targets: RenderTargets) -> Self {
        Self {
            device: device.clone(),
            queue: queue.clone(),
            targets,
            camera: CameraBuffer::new(device),
            frustum: None,
            encoder: None,
            draws: DrawQueue::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Camera used by the draw material and for culling queued draws.
    pub fn set_camera(&mut self, camera: &Camera) {
        self.camera.update(&self.queue, camera);
        self.frustum = Some(Frustum::from_view_projection(&camera.view_projection()));
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        self.encoder.get_or_insert_with(|| {
            self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("grass_encoder"),
            })
        })
    }

    /// Submit everything recorded since the last flush.
    pub fn flush(&mut self) -> Option<wgpu::SubmissionIndex> {
        let encoder = self.encoder.take()?;
        Some(self.queue.submit(Some(encoder.finish())))
    }

    /// Replay queued draws into `pass`, skipping those outside the camera frustum.
    ///
    /// Returns the number of draws issued. The queue is emptied either way.
    pub fn render(&mut self, pass: &mut wgpu::RenderPass<'_>) -> usize {
        let mut issued = 0;
        for draw in self.draws.drain() {
            if let Some(frustum) = &self.frustum
                && !frustum.intersects_aabb(&draw.bounds)
            {
                log::trace!("Grass draw culled, bounds {:?}", draw.bounds);
                continue;
            }
            pass.set_pipeline(&draw.pipeline);
            pass.set_bind_group(0, &draw.bind_group, &[]);
            pass.set_bind_group(1, self.camera.bind_group(), &[]);
            pass.draw_indirect(&draw.args, draw.args_offset);
            issued += 1;
        }
        issued
    }

    /// Flush, then block until the GPU has written `args` and read it back.
    pub fn read_indirect_args(&mut self, args: &WgpuBuffer) -> Result<IndirectArgs> {
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_args_staging"),
            size: INDIRECT_ARGS_STRIDE,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.encoder().copy_buffer_to_buffer(&args.buffer, 0, &staging, 0, INDIRECT_ARGS_STRIDE);
        self.flush();

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::PollType::Wait { submission_index: None, timeout: None });

        rx.recv()
            .map_err(|e| Error::Gpu(e.to_string()))?
            .map_err(|e| Error::Gpu(e.to_string()))?;
        let data = slice.get_mapped_range();
        let args: IndirectArgs = bytemuck::pod_read_unaligned(&data[..INDIRECT_ARGS_STRIDE as usize]);
        drop(data);
        staging.unmap();
        Ok(args)
    }
}

fn storage_entry(binding: u32, read_only: bool, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Allocation size: at least one element, 4-byte aligned
fn allocation_size(desc: &BufferDesc) -> u64 {
    desc.size().max(desc.stride).max(4).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

impl GrassBackend for WgpuBackend {
    type Buffer = WgpuBuffer;
    type Kernel = WgpuKernel;
    type Material = WgpuMaterial;

    fn limits(&self) -> BackendLimits {
        let limits = self.device.limits();
        BackendLimits {
            max_dispatch_groups: limits.max_compute_workgroups_per_dimension,
            max_texture_dimension: limits.max_texture_dimension_2d,
            max_buffer_size: u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size),
        }
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<WgpuBuffer> {
        let usage = match desc.kind {
            BufferKind::Immutable => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            BufferKind::Append => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            BufferKind::IndirectArgs => {
                wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::INDIRECT
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC
            }
        };

        let size = allocation_size(desc);
        BackendLimits::check(desc.label, size, self.limits().max_buffer_size)?;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size,
            usage,
            mapped_at_creation: false,
        });

        let counter = (desc.kind == BufferKind::Append).then(|| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("grass_append_counter"),
                size: COUNTER_SIZE,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        });

        Ok(WgpuBuffer { buffer, counter, desc: *desc })
    }

    fn write_buffer(&mut self, buffer: &WgpuBuffer, data: &[u8]) {
        if !data.is_empty() {
            self.queue.write_buffer(&buffer.buffer, 0, data);
        }
    }

    fn release_buffer(&mut self, buffer: WgpuBuffer) {
        // A draw still queued for this buffer must never reach a render pass
        self.draws.forget(&buffer.buffer);
        buffer.buffer.destroy();
        if let Some(counter) = buffer.counter {
            counter.destroy();
        }
    }

    fn instantiate_kernel(&mut self, source: &KernelSource) -> Result<WgpuKernel> {
        let label = source.label.to_string();
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(source.wgsl.clone()),
        });

        let compute = wgpu::ShaderStages::COMPUTE;
        let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label}_layout")),
            entries: &[
                storage_entry(0, true, compute),
                storage_entry(1, true, compute),
                storage_entry(2, false, compute),
                storage_entry(3, false, compute),
                storage_entry(4, false, compute),
                uniform_entry(5),
                uniform_entry(6),
                wgpu::BindGroupLayoutEntry {
                    binding: 7,
                    visibility: compute,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 8,
                    visibility: compute,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label}_pipeline_layout")),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let width = source.thread_group_width.max(1);
        let constants = [("GROUP_WIDTH", f64::from(width))];
        let generate = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{label}_generate")),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(source.entry_point.as_ref()),
            compilation_options: wgpu::PipelineCompilationOptions {
                constants: &constants,
                ..Default::default()
            },
            cache: None,
        });
        let finalize = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{label}_finalize")),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(source.count_entry_point.as_ref()),
            compilation_options: Default::default(),
            cache: None,
        });

        let params = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_generation_params"),
            size: std::mem::size_of::<GenerationParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_frame_uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("grass_wind_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::debug!("Instantiated kernel {} (group width {})", label, width);
        Ok(WgpuKernel {
            label,
            thread_group_width: width,
            generate,
            finalize,
            bind_group_layout,
            bindings: KernelBindings::default(),
            params,
            frame,
            wind: None,
            sampler,
            bind_group: None,
        })
    }

    fn destroy_kernel(&mut self, kernel: WgpuKernel) {
        kernel.params.destroy();
        kernel.frame.destroy();
        if let Some((texture, _)) = kernel.wind {
            texture.destroy();
        }
    }

    fn instantiate_material(&mut self, source: &MaterialSource) -> Result<WgpuMaterial> {
        let label = source.label.to_string();
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(source.wgsl.clone()),
        });

        let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label}_layout")),
            entries: &[storage_entry(0, true, wgpu::ShaderStages::VERTEX)],
        });

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label}_pipeline_layout")),
            bind_group_layouts: &[&bind_group_layout, self.camera.bind_group_layout()],
            immediate_size: 0,
        });

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(source.vertex_entry_point.as_ref()),
                buffers: &[], // Vertices are pulled from the draw buffer
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Blades are visible from both sides
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: self.targets.depth.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(source.fragment_entry_point.as_ref()),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.targets.color,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        Ok(WgpuMaterial {
            label,
            pipeline,
            bind_group_layout,
            bind_group: None,
        })
    }

    fn destroy_material(&mut self, _material: WgpuMaterial) {
        // Pipelines and bind groups are freed when the last handle drops
    }

    fn thread_group_width(&self, kernel: &WgpuKernel) -> u32 {
        kernel.thread_group_width
    }

    fn bind_kernel_buffer(&mut self, kernel: &mut WgpuKernel, slot: KernelSlot, buffer: &WgpuBuffer) {
        let b = &mut kernel.bindings;
        match slot {
            KernelSlot::SourceVertices => b.source_vertices = Some(buffer.buffer.clone()),
            KernelSlot::SourceTriangles => b.source_triangles = Some(buffer.buffer.clone()),
            KernelSlot::DrawTriangles => {
                b.draw_triangles = Some(buffer.buffer.clone());
                b.draw_counter = buffer.counter.clone();
            }
            KernelSlot::IndirectArgs => b.indirect_args = Some(buffer.buffer.clone()),
        }
        kernel.bind_group = None;
    }

    fn bind_material_buffer(&mut self, material: &mut WgpuMaterial, buffer: &WgpuBuffer) {
        material.bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{}_bind_group", material.label)),
            layout: &material.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.buffer.as_entire_binding(),
            }],
        }));
    }

    fn set_generation_params(&mut self, kernel: &mut WgpuKernel, params: &GenerationParams) {
        self.queue.write_buffer(&kernel.params, 0, bytemuck::bytes_of(params));
    }

    fn set_wind_texture(&mut self, kernel: &mut WgpuKernel, texture: &WindNoiseTexture) -> Result<()> {
        let expected = (texture.width as usize) * (texture.height as usize) * 4;
        if texture.width == 0 || texture.height == 0 || texture.texels.len() != expected {
            return Err(Error::Gpu(format!(
                "wind texture {}x{} has {} bytes, expected {}",
                texture.width,
                texture.height,
                texture.texels.len(),
                expected
            )));
        }
        let max_dimension = self.limits().max_texture_dimension;
        BackendLimits::check(
            "wind noise texture",
            u64::from(texture.width.max(texture.height)),
            u64::from(max_dimension),
        )?;

        let size = wgpu::Extent3d {
            width: texture.width,
            height: texture.height,
            depth_or_array_layers: 1,
        };
        let gpu_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("grass_wind_noise"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            gpu_texture.as_image_copy(),
            &texture.texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(texture.bytes_per_row()),
                rows_per_image: Some(texture.height),
            },
            size,
        );
        let view = gpu_texture.create_view(&wgpu::TextureViewDescriptor::default());

        if let Some((old, _)) = kernel.wind.replace((gpu_texture, view)) {
            old.destroy();
        }
        kernel.bind_group = None;
        Ok(())
    }

    fn set_frame_uniforms(&mut self, kernel: &mut WgpuKernel, uniforms: &FrameUniforms) {
        self.queue.write_buffer(&kernel.frame, 0, bytemuck::bytes_of(uniforms));
    }

    fn reset_append_counter(&mut self, buffer: &WgpuBuffer) {
        if let Some(counter) = buffer.counter.clone() {
            self.encoder().clear_buffer(&counter, 0, None);
        }
    }

    fn dispatch(&mut self, kernel: &mut WgpuKernel, groups: [u32; 3]) {
        if groups.contains(&0) {
            return;
        }
        let max_groups = self.limits().max_dispatch_groups;
        if groups.iter().any(|&g| g > max_groups) {
            log::error!("Kernel {} dispatch {:?} exceeds {} groups, skipped", kernel.label, groups, max_groups);
            return;
        }
        let device = self.device.clone();
        let Some(bind_group) = kernel.bind_group(&device).cloned() else {
            log::warn!("Kernel {} dispatched with unbound resources, skipped", kernel.label);
            return;
        };
        let pipeline = kernel.generate.clone();

        let mut pass = self.encoder().begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("grass_generate_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
    }

    fn copy_append_count(&mut self, kernel: &mut WgpuKernel, source: &WgpuBuffer, args: &WgpuBuffer) {
        // The kernel's own bindings decide which counter is read
        debug_assert!(kernel.bindings.draw_triangles.as_ref() == Some(&source.buffer));
        debug_assert!(kernel.bindings.indirect_args.as_ref() == Some(&args.buffer));

        let device = self.device.clone();
        let Some(bind_group) = kernel.bind_group(&device).cloned() else {
            log::warn!("Kernel {} has unbound resources, count copy skipped", kernel.label);
            return;
        };
        let pipeline = kernel.finalize.clone();

        let mut pass = self.encoder().begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("grass_finalize_args_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(1, 1, 1);
    }

    fn draw_procedural_indirect(&mut self, material: &WgpuMaterial, args: &WgpuBuffer, draw: &IndirectDraw) {
        let Some(bind_group) = material.bind_group.clone() else {
            log::warn!("Material {} drawn without a geometry buffer, skipped", material.label);
            return;
        };
        if draw.shadow_casting == ShadowCasting::On {
            log::trace!("Shadow casting requested but no shadow pass is attached");
        }
        self.draws.push(args.buffer.clone(), QueuedDraw {
            pipeline: material.pipeline.clone(),
            bind_group,
            args: args.buffer.clone(),
            args_offset: draw.args_offset,
            bounds: draw.bounds,
        });
    }
}
