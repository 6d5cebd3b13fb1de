//! Merging bulk arrangement results into the working copy.

use std::collections::HashSet;

use tracing::warn;

use pyramid_types::{ArrangementResult, Block, BlockId};

/// What a merge did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Chosen blocks whose placement was applied.
    pub applied: Vec<BlockId>,
    /// Placements skipped because the block was not chosen or not known.
    pub ignored: Vec<BlockId>,
    /// Chosen blocks the result said nothing about. Left unchanged.
    pub missing: Vec<BlockId>,
}

/// Apply `result` to exactly the blocks in `chosen`.
///
/// Blocks outside `chosen` keep their level and order even when they share
/// a target tier with an arranged block. Nothing is de-duplicated.
pub fn reconcile(blocks: &mut [Block], chosen: &[BlockId], result: &ArrangementResult) -> ReconcileReport {
    let chosen_set: HashSet<&BlockId> = chosen.iter().collect();
    let mut report = ReconcileReport::default();
    let mut placed: HashSet<&BlockId> = HashSet::new();

    for placement in &result.placements {
        let target = if chosen_set.contains(&placement.block_id) {
            blocks.iter_mut().find(|b| b.id == placement.block_id)
        } else {
            None
        };
        match target {
            Some(block) => {
                block.level = placement.level;
                block.order = placement.order;
                placed.insert(&placement.block_id);
                report.applied.push(placement.block_id.clone());
            }
            None => {
                warn!(block = %placement.block_id, "ignoring placement outside the arranged set");
                report.ignored.push(placement.block_id.clone());
            }
        }
    }

    report.missing = chosen
        .iter()
        .filter(|id| !placed.contains(id) && blocks.iter().any(|b| &b.id == *id))
        .cloned()
        .collect();
    if !report.missing.is_empty() {
        warn!(count = report.missing.len(), "arrangement left chosen blocks unplaced");
    }
    report
}
