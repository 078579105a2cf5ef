//! Built-in generator steps.

mod flat_world;
mod flowers;
mod heightmap;
mod lighting;

pub use flat_world::{FlatLayer, FlatWorldStep};
pub use flowers::FlowerScatterStep;
pub use heightmap::{HeightmapParams, HeightmapSampler, HeightmapStep};
pub use lighting::LightingStep;
