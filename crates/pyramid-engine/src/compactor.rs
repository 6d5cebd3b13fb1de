//! Order-key compaction after a deletion.

use pyramid_types::{Block, BlockPatch};

use crate::batch::BlockWrite;

/// Writes that close the gap left by `deleted` in its tier.
///
/// Every remaining sibling ordered after the deleted block moves down by
/// exactly one. Pool blocks are never compacted. `remaining` may or may not
/// still contain `deleted`; it is skipped either way.
pub fn plan_deletion(remaining: &[Block], deleted: &Block) -> Vec<BlockWrite> {
    if deleted.level.is_pool() {
        return Vec::new();
    }
    remaining
        .iter()
        .filter(|b| b.id != deleted.id && b.level == deleted.level && b.order > deleted.order)
        .map(|b| BlockWrite::new(b.id.clone(), BlockPatch::order(b.order - 1)))
        .collect()
}
