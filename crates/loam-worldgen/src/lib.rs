//! Chunk generation pipeline: generator steps, per-chunk seeding, and the caching chunk service.

mod context;
mod error;
mod seed;
mod service;
mod step;

pub mod steps;

pub use context::GeneratorContext;
pub use error::{GenerationError, StepError};
pub use seed::{chunk_rng, derive_chunk_seed};
pub use service::{
    CancelFlag, ChunkGeneratorService, GeneratorSettings, InitialGenerationReport, SharedChunk,
};
pub use step::{FnStep, GeneratorStep};
pub use steps::{
    FlatLayer, FlatWorldStep, FlowerScatterStep, HeightmapParams, HeightmapSampler, HeightmapStep,
    LightingStep,
};
