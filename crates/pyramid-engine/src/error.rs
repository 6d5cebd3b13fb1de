//! Error types for engine operations.

use thiserror::Error;

use pyramid_types::{BlockError, BlockId, Color};

use crate::store::StoreError;

/// Errors that can occur while planning or executing a gesture.
///
/// Validation variants are raised before anything is sent to the
/// persistence service. `Store` and `BatchFailed` come back from it.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Block not present in the working copy.
    #[error("block not found: {0}")]
    BlockNotFound(BlockId),

    /// A dependency edge may not point at its own source.
    #[error("block {0} cannot depend on itself")]
    SelfDependency(BlockId),

    /// Insertion index outside the destination tier.
    #[error("insertion index {index} out of range for tier of {len} blocks")]
    IndexOutOfRange { index: usize, len: usize },

    /// Color is not enabled in the project's palette.
    #[error("color {0} is not in the palette")]
    ColorNotInPalette(Color),

    /// Invalid block fields.
    #[error(transparent)]
    InvalidBlock(#[from] BlockError),

    /// A single service call failed.
    #[error("persistence service error: {0}")]
    Store(#[from] StoreError),

    /// Some writes of a concurrent batch failed. The rest were applied and
    /// are not rolled back; re-fetch to resynchronize.
    #[error("{failed} of {total} writes failed; first error: {first}")]
    BatchFailed {
        failed: usize,
        total: usize,
        first: Box<StoreError>,
    },
}

impl EngineError {
    /// Check if this was rejected locally, before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::BlockNotFound(_)
                | EngineError::SelfDependency(_)
                | EngineError::IndexOutOfRange { .. }
                | EngineError::ColorNotInPalette(_)
                | EngineError::InvalidBlock(_)
        )
    }

    /// Check if local and remote state may now disagree.
    pub fn needs_refresh(&self) -> bool {
        matches!(self, EngineError::BatchFailed { .. })
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
