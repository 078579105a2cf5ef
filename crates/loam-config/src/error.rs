use std::io;

/// Why `config.ron` could not be loaded, written or accepted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config.ron: {0}")]
    ReadError(#[source] io::Error),

    #[error("could not write config.ron: {0}")]
    WriteError(#[source] io::Error),

    #[error("config.ron is not valid RON: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    #[error("could not encode config as RON: {0}")]
    SerializeError(#[source] ron::Error),

    /// A world or lighting value the chunk pipeline cannot run with.
    #[error("invalid config: {0}")]
    Invalid(String),
}
