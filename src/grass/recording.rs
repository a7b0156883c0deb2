//! In-memory [`GrassBackend`] that records every call.
//!
//! Tracks live allocations so leaks and double releases fail tests, keeps
//! buffer contents so writes can be inspected, and can pretend the kernel
//! appended a fixed number of records per dispatch.

use std::collections::{HashMap, HashSet};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::grass::backend::{BackendLimits, BufferDesc, BufferKind, GrassBackend, IndirectDraw, KernelSlot};
use crate::grass::kernel::{KernelSource, MaterialSource};
use crate::grass::params::{FrameUniforms, GenerationParams, VERTICES_PER_RECORD};
use crate::grass::wind::WindNoiseTexture;

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    CreateBuffer(u32, BufferDesc),
    Write(u32, Vec<u8>),
    Release(u32),
    InstantiateKernel(u32),
    DestroyKernel(u32),
    InstantiateMaterial(u32),
    DestroyMaterial(u32),
    BindKernel(KernelSlot, u32),
    BindMaterial(u32),
    SetParams(GenerationParams),
    SetWind(u32, u32),
    SetFrame(FrameUniforms),
    ResetCounter(u32),
    Dispatch([u32; 3]),
    CopyCount { source: u32, args: u32 },
    Draw { args: u32, draw: IndirectDraw },
}

/// Buffer handle. Deliberately not `Clone`: releasing consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct RecBuffer(pub u32);

#[derive(Debug)]
pub struct RecKernel {
    pub id: u32,
    pub bound: HashMap<KernelSlot, u32>,
}

#[derive(Debug)]
pub struct RecMaterial {
    pub id: u32,
    pub draw_buffer: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct BufferState {
    pub desc: BufferDesc,
    pub data: Vec<u8>,
    pub counter: u32,
}

#[derive(Default)]
pub struct RecordingBackend {
    pub thread_group_width: u32,
    /// Records the fake kernel appends on every dispatch
    pub appends_per_dispatch: u32,
    /// Make every `create_buffer` after this many successful ones fail
    pub fail_buffer_after: Option<usize>,
    pub limits: BackendLimits,
    pub ops: Vec<Op>,
    pub buffers: HashMap<u32, BufferState>,
    pub kernels: HashSet<u32>,
    pub materials: HashSet<u32>,
    created_buffers: usize,
    next_id: u32,
}

impl RecordingBackend {
    pub fn new(thread_group_width: u32) -> Self {
        Self {
            thread_group_width,
            ..Default::default()
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Nothing allocated is still alive
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.kernels.is_empty() && self.materials.is_empty()
    }

    /// Descriptors of live buffers, sorted by label
    pub fn live_descs(&self) -> Vec<BufferDesc> {
        let mut descs: Vec<_> = self.buffers.values().map(|b| b.desc).collect();
        descs.sort_by_key(|d| d.label);
        descs
    }

    pub fn buffer_by_label(&self, label: &str) -> Option<&BufferState> {
        self.buffers.values().find(|b| b.desc.label == label)
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }
}

impl GrassBackend for RecordingBackend {
    type Buffer = RecBuffer;
    type Kernel = RecKernel;
    type Material = RecMaterial;

    fn limits(&self) -> BackendLimits {
        self.limits
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<RecBuffer> {
        if self.fail_buffer_after.is_some_and(|n| self.created_buffers >= n) {
            return Err(Error::Gpu(format!("out of memory allocating {}", desc.label)));
        }
        self.created_buffers += 1;
        let id = self.next_id();
        self.buffers.insert(id, BufferState {
            desc: *desc,
            data: vec![0; desc.size() as usize],
            counter: 0,
        });
        self.ops.push(Op::CreateBuffer(id, *desc));
        Ok(RecBuffer(id))
    }

    fn write_buffer(&mut self, buffer: &RecBuffer, data: &[u8]) {
        let state = self.buffers.get_mut(&buffer.0).expect("write to released buffer");
        state.data[..data.len()].copy_from_slice(data);
        self.ops.push(Op::Write(buffer.0, data.to_vec()));
    }

    fn release_buffer(&mut self, buffer: RecBuffer) {
        assert!(self.buffers.remove(&buffer.0).is_some(), "double release of buffer {}", buffer.0);
        self.ops.push(Op::Release(buffer.0));
    }

    fn instantiate_kernel(&mut self, _source: &KernelSource) -> Result<RecKernel> {
        let id = self.next_id();
        self.kernels.insert(id);
        self.ops.push(Op::InstantiateKernel(id));
        Ok(RecKernel { id, bound: HashMap::new() })
    }

    fn destroy_kernel(&mut self, kernel: RecKernel) {
        assert!(self.kernels.remove(&kernel.id), "double destroy of kernel {}", kernel.id);
        self.ops.push(Op::DestroyKernel(kernel.id));
    }

    fn instantiate_material(&mut self, _source: &MaterialSource) -> Result<RecMaterial> {
        let id = self.next_id();
        self.materials.insert(id);
        self.ops.push(Op::InstantiateMaterial(id));
        Ok(RecMaterial { id, draw_buffer: None })
    }

    fn destroy_material(&mut self, material: RecMaterial) {
        assert!(self.materials.remove(&material.id), "double destroy of material {}", material.id);
        self.ops.push(Op::DestroyMaterial(material.id));
    }

    fn thread_group_width(&self, _kernel: &RecKernel) -> u32 {
        self.thread_group_width
    }

    fn bind_kernel_buffer(&mut self, kernel: &mut RecKernel, slot: KernelSlot, buffer: &RecBuffer) {
        kernel.bound.insert(slot, buffer.0);
        self.ops.push(Op::BindKernel(slot, buffer.0));
    }

    fn bind_material_buffer(&mut self, material: &mut RecMaterial, buffer: &RecBuffer) {
        material.draw_buffer = Some(buffer.0);
        self.ops.push(Op::BindMaterial(buffer.0));
    }

    fn set_generation_params(&mut self, _kernel: &mut RecKernel, params: &GenerationParams) {
        self.ops.push(Op::SetParams(*params));
    }

    fn set_wind_texture(&mut self, _kernel: &mut RecKernel, texture: &WindNoiseTexture) -> Result<()> {
        self.ops.push(Op::SetWind(texture.width, texture.height));
        Ok(())
    }

    fn set_frame_uniforms(&mut self, _kernel: &mut RecKernel, uniforms: &FrameUniforms) {
        self.ops.push(Op::SetFrame(*uniforms));
    }

    fn reset_append_counter(&mut self, buffer: &RecBuffer) {
        let state = self.buffers.get_mut(&buffer.0).expect("reset of released buffer");
        assert_eq!(state.desc.kind, BufferKind::Append);
        state.counter = 0;
        self.ops.push(Op::ResetCounter(buffer.0));
    }

    fn dispatch(&mut self, kernel: &mut RecKernel, groups: [u32; 3]) {
        if let Some(draw) = kernel.bound.get(&KernelSlot::DrawTriangles)
            && let Some(state) = self.buffers.get_mut(draw)
        {
            let capacity = state.desc.count as u32;
            state.counter = (state.counter + self.appends_per_dispatch).min(capacity);
        }
        self.ops.push(Op::Dispatch(groups));
    }

    fn copy_append_count(&mut self, _kernel: &mut RecKernel, source: &RecBuffer, args: &RecBuffer) {
        let count = self.buffers[&source.0].counter * VERTICES_PER_RECORD;
        let args_state = self.buffers.get_mut(&args.0).expect("copy into released buffer");
        args_state.data[..4].copy_from_slice(&count.to_le_bytes());
        self.ops.push(Op::CopyCount { source: source.0, args: args.0 });
    }

    fn draw_procedural_indirect(&mut self, _material: &RecMaterial, args: &RecBuffer, draw: &IndirectDraw) {
        self.ops.push(Op::Draw { args: args.0, draw: *draw });
    }
}
