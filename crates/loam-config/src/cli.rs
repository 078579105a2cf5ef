//! Command-line argument parsing for the loam demo.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// loam command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "loam", about = "Voxel chunk pipeline demo")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Chunk edge length in blocks.
    #[arg(long)]
    pub chunk_size: Option<u32>,

    /// Chunk height in blocks.
    #[arg(long)]
    pub chunk_height: Option<u32>,

    /// Initial generation radius in chunks.
    #[arg(long)]
    pub radius: Option<u32>,

    /// Worker threads for initial generation.
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Maximum cached chunks.
    #[arg(long)]
    pub cache_size: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory holding `config.ron`. Defaults to the platform config dir.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Replaces every setting that was given on the command line.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(size) = args.chunk_size {
            self.world.chunk_size = size;
        }
        if let Some(height) = args.chunk_height {
            self.world.chunk_height = height;
        }
        if let Some(radius) = args.radius {
            self.world.initial_radius = radius;
        }
        if let Some(jobs) = args.jobs {
            self.world.max_concurrent_jobs = jobs;
        }
        if let Some(cache) = args.cache_size {
            self.world.max_cache_size_chunks = cache;
        }
        if let Some(level) = &args.log_level {
            self.debug.log_level.clone_from(level);
        }
    }
}
