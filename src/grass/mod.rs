//! GPU-driven procedural grass.
//!
//! A static source mesh is uploaded once per activation. Every frame a
//! compute kernel expands each source triangle into curved, wind-bent blade
//! segments, appends them to a draw buffer through an atomic counter, and
//! one indirect draw renders whatever was appended. The host never reads
//! the generated geometry back.
//!
//! [`GrassRenderer`] drives the lifecycle; [`GrassBackend`] is the device
//! seam it drives it through.

pub mod backend;
pub mod bounds;
pub mod buffers;
pub mod config;
pub mod kernel;
pub mod layout;
pub mod mesh;
pub mod params;
pub mod renderer;
pub mod subdivide;
pub mod wind;

#[cfg(test)]
pub(crate) mod recording;

pub use backend::{BackendLimits, BufferDesc, BufferKind, GrassBackend, IndirectDraw, KernelSlot, ShadowCasting, Topology};
pub use bounds::{expand_local_bounds, transform_bounds};
pub use buffers::{ActivationRequest, ActiveBuffers, GrassBuffers};
pub use config::{GrassSettings, SettingsCell, WindNoiseSource};
pub use kernel::{KernelSource, MaterialSource};
pub use layout::{GrassLayout, dispatch_group_count};
pub use mesh::{SourceMesh, SourceVertex};
pub use params::{DrawTriangle, DrawVertex, FrameUniforms, GenerationParams, IndirectArgs};
pub use renderer::{FrameInput, FrameReport, GrassRenderer, PlaybackMode, RendererState};
pub use wind::WindNoiseTexture;
