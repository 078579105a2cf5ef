//! Rolling hills from multi-octave simplex noise.

use noise::{NoiseFn, Simplex};

use crate::context::GeneratorContext;
use crate::error::StepError;
use crate::step::GeneratorStep;

/// Shape of the hills: a sum of simplex octaves, each finer and fainter than the last.
#[derive(Clone, Debug)]
pub struct HeightmapParams {
    pub octaves: u32,
    /// Frequency ratio between consecutive octaves.
    pub lacunarity: f64,
    /// Amplitude ratio between consecutive octaves.
    pub persistence: f64,
    /// Frequency of the broadest octave, in cycles per block.
    pub base_frequency: f64,
    /// Amplitude of the broadest octave, in blocks.
    pub amplitude: f64,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 0.02,
            amplitude: 6.0,
        }
    }
}

/// Seeded height field over world columns.
pub struct HeightmapSampler {
    simplex: Simplex,
    params: HeightmapParams,
}

impl HeightmapSampler {
    pub fn new(seed: u64, params: HeightmapParams) -> Self {
        // Simplex takes a 32-bit seed; fold the high half in so both halves matter.
        let folded = (seed ^ (seed >> 32)) as u32;
        Self {
            simplex: Simplex::new(folded),
            params,
        }
    }

    /// `(frequency, amplitude)` of each octave, broadest first.
    fn octaves(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let first = (self.params.base_frequency, self.params.amplitude);
        std::iter::successors(Some(first), |&(freq, amp)| {
            Some((freq * self.params.lacunarity, amp * self.params.persistence))
        })
        .take(self.params.octaves as usize)
    }

    /// Height offset of world column `(x, z)`, within `±max_amplitude()`.
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        self.octaves()
            .map(|(freq, amp)| self.simplex.get([x * freq, z * freq]) * amp)
            .sum()
    }

    /// Largest offset `sample` can return.
    pub fn max_amplitude(&self) -> f64 {
        self.octaves().map(|(_, amp)| amp).sum()
    }
}

/// Fills each column up to a noise-driven surface: stone, then dirt, then one grass block.
#[derive(Clone, Debug)]
pub struct HeightmapStep {
    pub params: HeightmapParams,
    /// World-space Y the noise oscillates around.
    pub base_height: i32,
    /// Dirt layers between stone and the grass cap.
    pub dirt_depth: u32,
    pub stone: String,
    pub dirt: String,
    pub grass: String,
}

impl Default for HeightmapStep {
    fn default() -> Self {
        Self {
            params: HeightmapParams::default(),
            base_height: 20,
            dirt_depth: 3,
            stone: "stone".to_string(),
            dirt: "dirt".to_string(),
            grass: "grass".to_string(),
        }
    }
}

impl HeightmapStep {
    pub const NAME: &'static str = "heightmap";

    /// Surface height of a world column: the Y of the grass block.
    pub fn surface_height(&self, sampler: &HeightmapSampler, x: i32, z: i32) -> i32 {
        self.base_height + sampler.sample(x as f64, z as f64).round() as i32
    }
}

impl GeneratorStep for HeightmapStep {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(&self, ctx: &mut GeneratorContext<'_>) -> Result<(), StepError> {
        let stone = ctx.require_block(&self.stone)?;
        let dirt = ctx.require_block(&self.dirt)?;
        let grass = ctx.require_block(&self.grass)?;

        let sampler = HeightmapSampler::new(ctx.seed(), self.params.clone());
        let origin = ctx.world_position();
        let (size, height) = (ctx.chunk_size(), ctx.chunk_height());

        for lz in 0..size {
            for lx in 0..size {
                let surface = self.surface_height(&sampler, origin.x + lx as i32, origin.z + lz as i32);
                for ly in 0..height {
                    let wy = origin.y + ly as i32;
                    let id = if wy == surface {
                        grass
                    } else if wy < surface - self.dirt_depth as i32 {
                        stone
                    } else if wy < surface {
                        dirt
                    } else {
                        continue;
                    };
                    ctx.set_block(lx, ly, lz, id);
                }
            }
        }
        Ok(())
    }
}
