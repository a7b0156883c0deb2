//! Grass generation settings.
//!
//! A [`GrassSettings`] snapshot is read-only for the lifetime of one
//! activation. Buffer capacities and derived constants depend on it, so any
//! change requires a full re-initialisation. [`SettingsCell`] tracks changes
//! with a revision counter so the renderer only rebuilds when something
//! actually changed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::types::Result;

/// Subdivision passes applied at most. Each pass quadruples the triangle count.
pub const MAX_MESH_SUBDIVISIONS: u32 = 6;

/// Where the wind noise texture comes from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindNoiseSource {
    /// No texture: the kernel samples a flat mid-gray (no wind variation).
    #[default]
    None,
    /// Load an image file.
    File(PathBuf),
    /// Generate tileable-ish Perlin noise of `size` x `size` texels.
    Perlin {
        size: u32,
        frequency: f32,
        seed: u32,
    },
}

/// User-facing grass configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrassSettings {
    /// Maximum segments per blade. Values below 1 are clamped to 1.
    pub max_segments: i32,
    /// Times the source mesh is subdivided (each pass splits a triangle into 4),
    /// capped at [`MAX_MESH_SUBDIVISIONS`].
    pub mesh_subdivisions: u32,
    /// Maximum random bend of a blade, in radians.
    pub max_bend_angle: f32,
    /// Exponent shaping how the bend accumulates along the blade.
    pub blade_curvature: f32,
    pub blade_height: f32,
    pub blade_height_variance: f32,
    pub blade_width: f32,
    pub blade_width_variance: f32,
    /// Wind noise texture
    pub wind_noise: WindNoiseSource,
    /// Multiplier applied to the sampled wind noise.
    pub wind_texture_scale: f32,
    /// How fast the noise scrolls over time.
    pub wind_period: f32,
    /// World-position to noise-UV scale.
    pub wind_scale: f32,
    pub wind_amplitude: f32,
    /// Wind direction around the up axis, in radians.
    pub wind_direction_angle: f32,
    /// Camera distance at which blades start losing segments.
    pub camera_lod_min: f32,
    /// Camera distance beyond which no blades are generated.
    pub camera_lod_max: f32,
    /// Falloff exponent between min and max (clamped to >= 0).
    pub camera_lod_factor: f32,
    /// Only grow grass on triangles whose vertices all have red > 0.
    pub color_mask: bool,
}

impl Default for GrassSettings {
    fn default() -> Self {
        Self {
            max_segments: 3,
            mesh_subdivisions: 0,
            max_bend_angle: 0.0,
            blade_curvature: 1.0,
            blade_height: 1.0,
            blade_height_variance: 0.1,
            blade_width: 1.0,
            blade_width_variance: 0.1,
            wind_noise: WindNoiseSource::None,
            wind_texture_scale: 1.0,
            wind_period: 1.0,
            wind_scale: 1.0,
            wind_amplitude: 0.0,
            wind_direction_angle: 0.0,
            camera_lod_min: 3.0,
            camera_lod_max: 30.0,
            camera_lod_factor: 1.0,
            color_mask: false,
        }
    }
}

impl GrassSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&text)?;
        log::debug!("Loaded grass settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Write settings as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Segments per blade, clamped to at least 1.
    pub fn max_blade_segments(&self) -> u32 {
        self.max_segments.max(1) as u32
    }

    /// Triangles one blade can produce: two per segment, one for the tip.
    pub fn max_blade_triangles(&self) -> u32 {
        (self.max_blade_segments() - 1) * 2 + 1
    }

    /// Subdivision passes actually applied.
    pub fn subdivision_levels(&self) -> u32 {
        if self.mesh_subdivisions > MAX_MESH_SUBDIVISIONS {
            log::warn!(
                "mesh_subdivisions {} capped at {}",
                self.mesh_subdivisions,
                MAX_MESH_SUBDIVISIONS
            );
        }
        self.mesh_subdivisions.min(MAX_MESH_SUBDIVISIONS)
    }

    /// Largest distance a blade can reach from its root.
    pub fn blade_extent(&self) -> f32 {
        (self.blade_height + self.blade_height_variance)
            .max(self.blade_width + self.blade_width_variance)
    }

    /// Camera LOD thresholds as packed for the kernel: (min, max, factor, 0).
    pub fn camera_lod(&self) -> [f32; 4] {
        [
            self.camera_lod_min,
            self.camera_lod_max,
            self.camera_lod_factor.max(0.0),
            0.0,
        ]
    }
}

/// Settings plus a revision counter bumped whenever they change.
#[derive(Clone, Debug, Default)]
pub struct SettingsCell {
    settings: GrassSettings,
    revision: u64,
}

impl SettingsCell {
    pub fn new(settings: GrassSettings) -> Self {
        Self { settings, revision: 0 }
    }

    pub fn get(&self) -> &GrassSettings {
        &self.settings
    }

    /// Edit the settings in place. Edits that leave them equal are not a change.
    pub fn update(&mut self, edit: impl FnOnce(&mut GrassSettings)) {
        let mut settings = self.settings.clone();
        edit(&mut settings);
        self.set(settings);
    }

    /// Replace the settings wholesale. Equal settings do not bump the revision.
    pub fn set(&mut self, settings: GrassSettings) {
        if settings != self.settings {
            self.settings = settings;
            self.revision += 1;
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
