use loam_voxel::ChunkCoord;
use thiserror::Error;

/// Failure reported by a single generator step.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("required block '{0}' is not registered")]
    MissingBlock(String),
    #[error("{0}")]
    Failed(String),
}

impl StepError {
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed(message.into())
    }
}

/// Outcome of a failed chunk request.
///
/// Cloneable so every caller waiting on the same in-flight generation receives it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("step '{step}' failed for chunk {coord}: {message}")]
    StepFailed {
        coord: ChunkCoord,
        step: String,
        message: String,
    },
    #[error("generation of chunk {coord} panicked: {message}")]
    WorkerPanicked { coord: ChunkCoord, message: String },
    #[error("generation cancelled before chunk {0} started")]
    Cancelled(ChunkCoord),
}

impl GenerationError {
    pub fn coord(&self) -> ChunkCoord {
        match self {
            GenerationError::StepFailed { coord, .. }
            | GenerationError::WorkerPanicked { coord, .. }
            | GenerationError::Cancelled(coord) => *coord,
        }
    }
}
