//! Flood-fill light propagation over a chunk's block grid.

pub mod propagation;

pub use propagation::{
    LightSource, LightingOptions, LightingStats, collect_light_sources, propagate_from_sources,
    relight_chunk, relight_chunk_with_emitters, remove_light_source,
};
