//! World, lighting and debug settings persisted as `config.ron`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name used inside the config directory.
const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration for the voxel core.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World generation and chunk cache settings.
    pub world: WorldConfig,
    /// Light propagation settings.
    pub lighting: LightingConfig,
    pub debug: DebugConfig,
}

/// Inclusive range of chunk layers (chunk-space Y) to pre-generate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayerRange {
    /// Lowest chunk layer, inclusive.
    pub min_layer: i32,
    /// Highest chunk layer, inclusive.
    pub max_layer: i32,
}

impl Default for LayerRange {
    fn default() -> Self {
        Self {
            min_layer: 0,
            max_layer: 0,
        }
    }
}

/// World generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Horizontal edge length of a chunk in blocks (X and Z).
    pub chunk_size: u32,
    /// Vertical extent of a chunk in blocks (Y).
    pub chunk_height: u32,
    /// World seed. Combined with chunk coordinates to seed each chunk.
    pub seed: u64,
    /// Upper bound on cached chunks before least-recently-used eviction.
    pub max_cache_size_chunks: usize,
    /// Worker count used for eager initial generation. 0 means one per CPU core.
    pub max_concurrent_jobs: usize,
    /// World-space block position the initial chunks are centred on.
    pub initial_position: [i32; 3],
    /// Horizontal radius (in chunks) of the initial generation square.
    pub initial_radius: u32,
    /// Chunk layers generated eagerly at startup.
    pub initial_layers: LayerRange,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            chunk_height: 32,
            seed: 1337,
            max_cache_size_chunks: 512,
            max_concurrent_jobs: 4,
            initial_position: [0, 0, 0],
            initial_radius: 2,
            initial_layers: LayerRange::default(),
        }
    }
}

/// Light propagation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Run light propagation as the final generation stage.
    pub enabled: bool,
    /// Seed light from columns open to the sky.
    pub sky_light: bool,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sky_light: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Directory for JSON log files in debug builds.
    pub log_dir: Option<PathBuf>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// Platform config directory for loam (`~/.config/loam` on Linux).
///
/// Falls back to the working directory when the platform has no config dir.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("loam"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// --- Persistence ---

/// Reads and validates `config.ron` at `path`.
fn read_file(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
    let parsed: Config = ron::from_str(&text).map_err(ConfigError::ParseError)?;
    parsed.validate()?;
    Ok(parsed)
}

impl Config {
    /// Path of the config file inside `config_dir`.
    pub fn file_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE)
    }

    /// Reads `config.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::file_path(config_dir);
        if !path.exists() {
            let defaults = Config::default();
            defaults.save(config_dir)?;
            log::info!("Wrote default world config to {}", path.display());
            return Ok(defaults);
        }

        let config = read_file(&path)?;
        log::info!(
            "Loaded world config from {} (seed {}, chunk {}x{})",
            path.display(),
            config.world.seed,
            config.world.chunk_size,
            config.world.chunk_height
        );
        Ok(config)
    }

    /// Writes the config as pretty RON, creating `config_dir` if needed.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;
        let text = ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::new()
                .depth_limit(3)
                .separate_tuple_members(true)
                .enumerate_arrays(false),
        )
        .map_err(ConfigError::SerializeError)?;
        std::fs::write(Self::file_path(config_dir), text).map_err(ConfigError::WriteError)
    }

    /// Re-reads the file. `Ok(None)` means nothing changed since `self` was loaded.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = read_file(&Self::file_path(config_dir))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("World config changed on disk");
        Ok(Some(fresh))
    }

    /// Rejects values the chunk pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if world.chunk_size == 0 || world.chunk_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "chunk dimensions must be non-zero (size {}, height {})",
                world.chunk_size, world.chunk_height
            )));
        }
        if world.chunk_size > 256 || world.chunk_height > 1024 {
            return Err(ConfigError::Invalid(format!(
                "chunk dimensions too large (size {}, height {})",
                world.chunk_size, world.chunk_height
            )));
        }
        if world.max_cache_size_chunks == 0 {
            return Err(ConfigError::Invalid(
                "max_cache_size_chunks must be at least 1".to_string(),
            ));
        }
        if world.initial_layers.min_layer > world.initial_layers.max_layer {
            return Err(ConfigError::Invalid(format!(
                "initial_layers is empty ({}..={})",
                world.initial_layers.min_layer, world.initial_layers.max_layer
            )));
        }
        Ok(())
    }
}
