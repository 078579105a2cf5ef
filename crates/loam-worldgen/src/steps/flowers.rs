use loam_voxel::{BlockTypeId, ChunkEntity};
use rand::Rng;

use crate::context::GeneratorContext;
use crate::error::StepError;
use crate::step::GeneratorStep;

/// Scatters decorative blocks on exposed grass using the chunk's seeded RNG.
///
/// Flower and grass names that are not registered are skipped, so worlds
/// without decoration blocks still generate.
#[derive(Clone, Debug)]
pub struct FlowerScatterStep {
    pub grass: String,
    pub flowers: Vec<String>,
    /// Chance, per exposed grass column, of placing a flower.
    pub density: f64,
}

impl Default for FlowerScatterStep {
    fn default() -> Self {
        Self {
            grass: "grass".to_string(),
            flowers: vec!["red_flower".to_string(), "yellow_flower".to_string()],
            density: 0.1,
        }
    }
}

impl FlowerScatterStep {
    pub const NAME: &'static str = "flowers";
}

/// Highest grass cell in the column with air directly above it.
fn exposed_grass(chunk: &ChunkEntity, grass: BlockTypeId, x: u32, z: u32) -> Option<u32> {
    (0..chunk.height().saturating_sub(1))
        .rev()
        .find(|&y| chunk.get_block(x, y, z) == grass && chunk.get_block(x, y + 1, z) == BlockTypeId::AIR)
}

impl GeneratorStep for FlowerScatterStep {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(&self, ctx: &mut GeneratorContext<'_>) -> Result<(), StepError> {
        let Some(grass) = ctx.block_id(&self.grass) else {
            return Ok(());
        };
        let flowers: Vec<BlockTypeId> = self
            .flowers
            .iter()
            .filter_map(|name| ctx.block_id(name))
            .collect();
        if flowers.is_empty() {
            return Ok(());
        }

        let density = self.density.clamp(0.0, 1.0);
        let mut rng = ctx.rng();
        let size = ctx.chunk_size();
        for z in 0..size {
            for x in 0..size {
                let Some(y) = exposed_grass(ctx.chunk(), grass, x, z) else {
                    continue;
                };
                if rng.random_bool(density) {
                    let flower = flowers[rng.random_range(0..flowers.len())];
                    ctx.set_block(x, y + 1, z, flower);
                }
            }
        }
        Ok(())
    }
}
