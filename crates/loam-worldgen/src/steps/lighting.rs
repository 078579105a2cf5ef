use loam_lighting::{LightingOptions, relight_chunk};

use crate::context::GeneratorContext;
use crate::error::StepError;
use crate::step::GeneratorStep;

/// Recomputes the chunk's light grid. Runs after every block-placing step.
#[derive(Clone, Copy, Debug, Default)]
pub struct LightingStep {
    pub options: LightingOptions,
}

impl LightingStep {
    pub const NAME: &'static str = "lighting";

    pub fn new(options: LightingOptions) -> Self {
        Self { options }
    }
}

impl GeneratorStep for LightingStep {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(&self, ctx: &mut GeneratorContext<'_>) -> Result<(), StepError> {
        let (chunk, registry) = ctx.split_mut();
        relight_chunk(chunk, registry, self.options);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_voxel::{BlockRegistry, ChunkCoord, ChunkDims, ChunkEntity, MAX_LIGHT_LEVEL};

    #[test]
    fn test_lighting_step_lights_open_air() {
        let mut registry = BlockRegistry::new();
        let stone = registry.register_block("stone", |b| b).unwrap();
        let mut chunk = ChunkEntity::new(ChunkCoord::default(), ChunkDims::new(8, 8));
        chunk.fill_layer(0, stone);

        LightingStep::default()
            .generate(&mut GeneratorContext::new(&mut chunk, &registry, 0))
            .unwrap();
        assert_eq!(chunk.get_light(3, 1, 3), MAX_LIGHT_LEVEL);
        assert_eq!(chunk.get_light(3, 0, 3), 0);
    }
}
