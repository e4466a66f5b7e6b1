use thiserror::Error;

use crate::blocks::BoxError;

/// Errors raised while a block falls down
#[derive(Error, Debug)]
pub enum DominoError {
    #[error("block {type_name} was started but never placed")]
    UnplacedBlock { type_name: &'static str },

    #[error("block {type_name} failed to fall down: {source}")]
    FallDown {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("action for {type_name} panicked")]
    ActionPanicked { type_name: &'static str },

    #[error("worker pool is closed")]
    WorkerPoolClosed,

    #[error("placement for {type_name} does not match the block or output type")]
    TypeMismatch { type_name: &'static str },
}

impl DominoError {
    /// Name of the block type this error belongs to, if any
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            DominoError::UnplacedBlock { type_name }
            | DominoError::FallDown { type_name, .. }
            | DominoError::ActionPanicked { type_name }
            | DominoError::TypeMismatch { type_name } => Some(type_name),
            DominoError::WorkerPoolClosed => None,
        }
    }

    /// The error returned by the block's own behavior, unchanged
    pub fn fall_down_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            DominoError::FallDown { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// Take ownership of the error returned by the block's own behavior
    pub fn into_fall_down_error(self) -> Result<BoxError, Self> {
        match self {
            DominoError::FallDown { source, .. } => Ok(source),
            other => Err(other),
        }
    }
}
