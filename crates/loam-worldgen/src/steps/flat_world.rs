use std::ops::RangeInclusive;

use crate::context::GeneratorContext;
use crate::error::StepError;
use crate::step::GeneratorStep;

/// One band of a flat world: `block` fills world-space layers `layers`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatLayer {
    pub block: String,
    pub layers: RangeInclusive<i32>,
}

/// Fills horizontal layers from a table of bands.
///
/// Bands are applied in order, so a later band overwrites an earlier one
/// where they overlap. Layers are world-space Y, so chunks above or below the
/// table stay empty.
#[derive(Clone, Debug, Default)]
pub struct FlatWorldStep {
    bands: Vec<FlatLayer>,
}

impl FlatWorldStep {
    pub const NAME: &'static str = "flat_world";

    pub fn new() -> Self {
        Self::default()
    }

    /// Bedrock floor, stone to 28, dirt 29 to 31 capped with grass at 31.
    pub fn classic() -> Self {
        Self::new()
            .layer("bedrock", 0..=0)
            .layer("stone", 1..=28)
            .layer("dirt", 29..=31)
            .layer("grass", 31..=31)
    }

    pub fn layer(mut self, block: &str, layers: RangeInclusive<i32>) -> Self {
        self.bands.push(FlatLayer {
            block: block.to_string(),
            layers,
        });
        self
    }

    pub fn bands(&self) -> &[FlatLayer] {
        &self.bands
    }
}

impl GeneratorStep for FlatWorldStep {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(&self, ctx: &mut GeneratorContext<'_>) -> Result<(), StepError> {
        let base_y = ctx.world_position().y;
        let top_y = base_y + ctx.chunk_height() as i32 - 1;

        for band in &self.bands {
            let id = ctx.require_block(&band.block)?;
            let lo = (*band.layers.start()).max(base_y);
            let hi = (*band.layers.end()).min(top_y);
            for world_y in lo..=hi {
                ctx.fill_layer((world_y - base_y) as u32, id);
            }
        }
        Ok(())
    }
}
