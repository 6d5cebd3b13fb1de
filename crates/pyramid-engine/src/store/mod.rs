//! Persistence service boundary.
//!
//! The engine owns no durable state. Everything it reads or writes goes
//! through [`PersistenceService`], addressed by project id. Two
//! implementations ship with the engine:
//!
//! - [`MemoryStore`]: ephemeral, for tests and embedding
//! - [`FileStore`]: one JSON document per project on disk
//!
//! Both share their mutation rules through [`ProjectData`], so a block
//! created in one behaves exactly like a block created in the other.

mod file;
mod memory;
mod project;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use project::ProjectData;

use std::collections::HashMap;
use std::io;

use async_trait::async_trait;
use thiserror::Error;

use pyramid_types::{
    ArrangementResponse, Block, BlockId, BlockPatch, Color, NewBlock, ProjectId,
};

/// Failure reported by a persistence service.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Project or block does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The service refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The service could not be reached.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Stored or received data could not be decoded.
    #[error("malformed data: {0}")]
    Malformed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Internal(String),
}

impl StoreError {
    /// Create a NotFound error for a block.
    pub fn block_not_found(id: &BlockId) -> Self {
        Self::NotFound(format!("block {id}"))
    }

    /// Create a Rejected error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

/// Result type for persistence calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable storage for blocks, edges, palette and arrangement note.
///
/// Every call is independent; there is no transaction spanning two calls
/// and no optimistic locking. Concurrent writes are last-write-wins.
#[async_trait]
pub trait PersistenceService: Send + Sync {
    // ========================================================================
    // Blocks
    // ========================================================================

    /// All blocks of a project, sorted by `(level, order)`.
    async fn list_blocks(&self, project: &ProjectId) -> StoreResult<Vec<Block>>;

    /// Create a block. `order: None` appends at the block's level.
    async fn create_block(&self, project: &ProjectId, block: NewBlock) -> StoreResult<Block>;

    /// Apply a partial update and return the stored block.
    async fn update_block(
        &self,
        project: &ProjectId,
        id: &BlockId,
        patch: BlockPatch,
    ) -> StoreResult<Block>;

    /// Delete a block and every edge touching it.
    async fn delete_block(&self, project: &ProjectId, id: &BlockId) -> StoreResult<()>;

    // ========================================================================
    // Dependencies
    // ========================================================================

    /// Add (or recolor) the edge `from -> to`. Returns the `from` block.
    async fn add_dependency(
        &self,
        project: &ProjectId,
        from: &BlockId,
        to: &BlockId,
        color: Option<Color>,
    ) -> StoreResult<Block>;

    /// Remove the edge `from -> to` and its color. Returns the `from` block.
    async fn remove_dependency(
        &self,
        project: &ProjectId,
        from: &BlockId,
        to: &BlockId,
    ) -> StoreResult<Block>;

    /// Edge colors keyed `"{from}_{to}"`.
    async fn get_dependency_colors(
        &self,
        project: &ProjectId,
    ) -> StoreResult<HashMap<String, String>>;

    // ========================================================================
    // Palette
    // ========================================================================

    /// Stored palette, unvalidated. Empty when never set.
    async fn get_color_palette(&self, project: &ProjectId) -> StoreResult<Vec<String>>;

    /// Replace the stored palette.
    async fn set_color_palette(
        &self,
        project: &ProjectId,
        colors: Vec<String>,
    ) -> StoreResult<Vec<String>>;

    // ========================================================================
    // Arrangement
    // ========================================================================

    /// Compute and store new placements for `ids`.
    async fn run_bulk_arrangement(
        &self,
        project: &ProjectId,
        ids: &[BlockId],
    ) -> StoreResult<ArrangementResponse>;

    /// Reasoning note from the last arrangement.
    async fn get_arrangement_reasoning(&self, project: &ProjectId) -> StoreResult<Option<String>>;

    /// Replace or clear the reasoning note.
    async fn set_arrangement_reasoning(
        &self,
        project: &ProjectId,
        reasoning: Option<String>,
    ) -> StoreResult<()>;
}
