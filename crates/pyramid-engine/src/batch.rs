//! Concurrent write batches.
//!
//! One user gesture becomes one batch of block updates. The writes are
//! independent and issued together; there is no ordering between them, no
//! rollback and no retry. A batch that partly fails leaves the service with
//! whatever succeeded, and the caller is told exactly which writes landed.

use futures::future::join_all;
use tracing::{debug, warn};

use pyramid_types::{Block, BlockId, BlockPatch, ProjectId};

use crate::error::{EngineError, Result};
use crate::store::{PersistenceService, StoreError};

/// One persistence write: a partial update of one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockWrite {
    pub block_id: BlockId,
    pub patch: BlockPatch,
}

impl BlockWrite {
    pub fn new(block_id: BlockId, patch: BlockPatch) -> Self {
        Self { block_id, patch }
    }
}

/// What came back from a batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Blocks as stored after each successful write.
    pub applied: Vec<Block>,
    /// Writes that failed, with their errors.
    pub failed: Vec<(BlockId, StoreError)>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.applied.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turn any failure into [`EngineError::BatchFailed`].
    pub fn into_result(self) -> Result<Vec<Block>> {
        let total = self.total();
        let failed = self.failed.len();
        match self.failed.into_iter().next() {
            None => Ok(self.applied),
            Some((_, first)) => Err(EngineError::BatchFailed {
                failed,
                total,
                first: Box::new(first),
            }),
        }
    }
}

/// Issue every write concurrently and wait for all of them.
pub async fn execute(
    store: &dyn PersistenceService,
    project: &ProjectId,
    writes: Vec<BlockWrite>,
) -> BatchOutcome {
    if writes.is_empty() {
        return BatchOutcome::default();
    }
    debug!(project = %project, writes = writes.len(), "issuing write batch");

    let futures = writes.into_iter().map(|write| async move {
        let result = store
            .update_block(project, &write.block_id, write.patch)
            .await;
        (write.block_id, result)
    });

    let mut outcome = BatchOutcome::default();
    for (block_id, result) in join_all(futures).await {
        match result {
            Ok(block) => outcome.applied.push(block),
            Err(e) => {
                warn!(project = %project, block = %block_id, error = %e, "batched write failed");
                outcome.failed.push((block_id, e));
            }
        }
    }
    outcome
}
