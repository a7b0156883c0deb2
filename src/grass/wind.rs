//! Wind noise texture resolved from [`WindNoiseSource`] at activation.

use noise::{NoiseFn, Perlin};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::grass::config::WindNoiseSource;

/// RGBA8 texture the generation kernel samples for wind displacement.
#[derive(Clone, Debug, PartialEq)]
pub struct WindNoiseTexture {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 texels, row-major
    pub texels: Vec<u8>,
}

impl WindNoiseTexture {
    /// 1x1 mid-gray. Sampling it yields no directional wind variation.
    pub fn flat() -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![128, 128, 128, 255],
        }
    }

    /// Load any image format the `image` crate understands.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::debug!("Loaded wind noise {}x{} from {}", width, height, path.display());
        Ok(Self {
            width,
            height,
            texels: rgba.into_raw(),
        })
    }

    /// Perlin noise in the red and green channels (two decorrelated octaves).
    pub fn perlin(size: u32, frequency: f32, seed: u32) -> Self {
        let size = size.max(1);
        let red = Perlin::new(seed);
        let green = Perlin::new(seed.wrapping_add(1));
        let mut texels = Vec::with_capacity((size * size * 4) as usize);
        let step = f64::from(frequency) / f64::from(size);

        for y in 0..size {
            for x in 0..size {
                let p = [f64::from(x) * step, f64::from(y) * step];
                texels.push(to_unorm8(red.get(p)));
                texels.push(to_unorm8(green.get(p)));
                texels.push(128);
                texels.push(255);
            }
        }

        Self {
            width: size,
            height: size,
            texels,
        }
    }

    /// Resolve a settings source into texels no wider or taller than
    /// `max_dimension`. Oversized Perlin noise is rejected before generation.
    pub fn resolve(source: &WindNoiseSource, max_dimension: u32) -> Result<Self> {
        let texture = match source {
            WindNoiseSource::None => Self::flat(),
            WindNoiseSource::File(path) => Self::load(path)?,
            WindNoiseSource::Perlin { size, frequency, seed } => {
                check_dimension(*size, max_dimension)?;
                Self::perlin(*size, *frequency, *seed)
            }
        };
        check_dimension(texture.width.max(texture.height), max_dimension)?;
        Ok(texture)
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }
}

fn check_dimension(size: u32, max_dimension: u32) -> Result<()> {
    if size > max_dimension {
        return Err(Error::LimitExceeded {
            what: "wind noise texture",
            requested: u64::from(size),
            limit: u64::from(max_dimension),
        });
    }
    Ok(())
}

/// Map noise output in [-1, 1] to a byte.
fn to_unorm8(v: f64) -> u8 {
    (((v.clamp(-1.0, 1.0) + 1.0) * 0.5) * 255.0).round() as u8
}
