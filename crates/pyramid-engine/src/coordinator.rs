//! Tier reassignment planning.
//!
//! A move is planned in full before anything is written: every block whose
//! level or order key changes gets exactly one [`BlockWrite`]. Planning is
//! pure and validates its inputs, so a rejected move never reaches the
//! persistence service.
//!
//! Within one tier, `index` is the mover's final position (`0..len`). Every
//! sibling the mover passes over shifts one slot toward its old position,
//! in addition to any room the allocator has to make:
//!
//! ```text
//! tier 2: [A:0, B:1, C:2]   move A to 2
//!   others [B:1, C:2], crossed B and C shift -1 → B:0, C:1
//!   allocate at end after C:2 → A:3
//!   result [B:0, C:1, A:3]
//! ```
//!
//! Across tiers, `index` ranges over `0..=len` of the destination tier and
//! the source tier is left as it is.

use std::collections::BTreeMap;

use tracing::debug;

use pyramid_types::{Block, BlockId, BlockPatch, Level};

use crate::batch::BlockWrite;
use crate::error::{EngineError, Result};
use crate::order::allocate;
use crate::tiers::siblings;

/// All writes for one user-visible move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovePlan {
    pub block_id: BlockId,
    pub from: Level,
    pub to: Level,
    pub writes: Vec<BlockWrite>,
}

impl MovePlan {
    /// Check if the move changes nothing.
    pub fn is_noop(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Plan moving `block_id` to `level` at position `index` (default: end).
pub fn plan_move(
    blocks: &[Block],
    block_id: &BlockId,
    level: Level,
    index: Option<usize>,
) -> Result<MovePlan> {
    let mover = blocks
        .iter()
        .find(|b| &b.id == block_id)
        .ok_or_else(|| EngineError::BlockNotFound(block_id.clone()))?;

    let writes = if mover.level == level {
        plan_within_tier(blocks, mover, index)?
    } else {
        plan_across_tiers(blocks, mover, level, index)?
    };

    debug!(
        block = %block_id,
        from = %mover.level,
        to = %level,
        writes = writes.len(),
        "planned move"
    );
    Ok(MovePlan {
        block_id: block_id.clone(),
        from: mover.level,
        to: level,
        writes,
    })
}

fn plan_within_tier(blocks: &[Block], mover: &Block, index: Option<usize>) -> Result<Vec<BlockWrite>> {
    let tier = siblings(blocks, mover.level);
    let len = tier.len();
    let old = tier
        .iter()
        .position(|b| b.id == mover.id)
        .ok_or_else(|| EngineError::BlockNotFound(mover.id.clone()))?;
    let new = index.unwrap_or(len - 1);
    if new >= len {
        return Err(EngineError::IndexOutOfRange { index: new, len });
    }
    if new == old {
        return Ok(Vec::new());
    }

    let others: Vec<Block> = tier.into_iter().filter(|b| b.id != mover.id).collect();
    let allocation = allocate(&others, new);

    // Net change per sibling; BTreeMap keeps the write order deterministic.
    let mut deltas: BTreeMap<usize, i64> = BTreeMap::new();
    let (crossed, step) = if new > old {
        (old..new, -1)
    } else {
        (new..old, 1)
    };
    for pos in crossed {
        *deltas.entry(pos).or_default() += step;
    }
    for shift in &allocation.shifts {
        if let Some(pos) = others.iter().position(|b| b.id == shift.block_id) {
            *deltas.entry(pos).or_default() += shift.order - others[pos].order;
        }
    }

    let mut writes = vec![BlockWrite::new(
        mover.id.clone(),
        BlockPatch::order(allocation.order),
    )];
    writes.extend(
        deltas
            .into_iter()
            .filter(|(_, delta)| *delta != 0)
            .map(|(pos, delta)| {
                let sibling = &others[pos];
                BlockWrite::new(sibling.id.clone(), BlockPatch::order(sibling.order + delta))
            }),
    );
    Ok(writes)
}

fn plan_across_tiers(
    blocks: &[Block],
    mover: &Block,
    level: Level,
    index: Option<usize>,
) -> Result<Vec<BlockWrite>> {
    let destination = siblings(blocks, level);
    let len = destination.len();
    let index = index.unwrap_or(len);
    if index > len {
        return Err(EngineError::IndexOutOfRange { index, len });
    }

    let allocation = allocate(&destination, index);
    let mut writes = vec![BlockWrite::new(
        mover.id.clone(),
        BlockPatch::placement(level, allocation.order),
    )];
    writes.extend(
        allocation
            .shifts
            .into_iter()
            .map(|shift| BlockWrite::new(shift.block_id, BlockPatch::order(shift.order))),
    );
    Ok(writes)
}

/// Apply a plan's writes to a local block list.
pub fn apply_writes(blocks: &mut [Block], writes: &[BlockWrite]) {
    for write in writes {
        if let Some(block) = blocks.iter_mut().find(|b| b.id == write.block_id) {
            block.apply(&write.patch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiers::tier;

    fn block(id: &str, level: i32, order: i64) -> Block {
        Block {
            id: BlockId::new(id),
            title: id.to_uppercase(),
            description: String::new(),
            category: None,
            level: Level::new(level),
            order,
            dependencies: vec![],
        }
    }

    fn ids_at(blocks: &[Block], level: Level) -> Vec<String> {
        tier(blocks, level).iter().map(|b| b.id.to_string()).collect()
    }

    fn moved(blocks: &[Block], id: &str, level: Level, index: Option<usize>) -> Vec<Block> {
        let plan = plan_move(blocks, &BlockId::new(id), level, index).unwrap();
        let mut after = blocks.to_vec();
        apply_writes(&mut after, &plan.writes);
        after
    }

    fn assert_distinct(blocks: &[Block], level: Level) {
        let orders: Vec<i64> = tier(blocks, level).iter().map(|b| b.order).collect();
        assert!(orders.windows(2).all(|w| w[0] < w[1]), "orders {orders:?}");
    }

    #[test]
    fn test_move_first_to_last() {
        let blocks = vec![block("a", 2, 0), block("b", 2, 1), block("c", 2, 2)];
        let after = moved(&blocks, "a", Level::tier(2), Some(2));
        assert_eq!(ids_at(&after, Level::tier(2)), vec!["b", "c", "a"]);
        assert_distinct(&after, Level::tier(2));
    }

    #[test]
    fn test_every_position_in_tier() {
        let blocks: Vec<Block> = ["a", "b", "c", "d", "e"]
            .iter()
            .enumerate()
            .map(|(i, id)| block(id, 1, i as i64))
            .collect();
        for mover in ["a", "b", "c", "d", "e"] {
            for index in 0..blocks.len() {
                let after = moved(&blocks, mover, Level::tier(1), Some(index));
                let order = ids_at(&after, Level::tier(1));
                assert_eq!(order[index], mover, "move {mover} to {index}: {order:?}");
                assert_distinct(&after, Level::tier(1));

                // Everyone else keeps their relative order.
                let rest: Vec<&str> = order
                    .iter()
                    .map(String::as_str)
                    .filter(|id| *id != mover)
                    .collect();
                let expected: Vec<&str> = ["a", "b", "c", "d", "e"]
                    .into_iter()
                    .filter(|id| *id != mover)
                    .collect();
                assert_eq!(rest, expected);
            }
        }
    }

    #[test]
    fn test_sparse_tier_moves() {
        let blocks = vec![block("a", 0, 0), block("b", 0, 10), block("c", 0, 20), block("d", 0, 21)];
        for index in 0..4 {
            let after = moved(&blocks, "d", Level::tier(0), Some(index));
            assert_eq!(ids_at(&after, Level::tier(0))[index], "d");
            assert_distinct(&after, Level::tier(0));
        }
    }

    #[test]
    fn test_same_position_is_noop() {
        let blocks = vec![block("a", 2, 0), block("b", 2, 1)];
        let plan = plan_move(&blocks, &BlockId::new("b"), Level::tier(2), None).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn test_cross_tier_insert() {
        let blocks = vec![block("p", -1, 0), block("x", 3, 0), block("y", 3, 1)];
        let after = moved(&blocks, "p", Level::tier(3), Some(1));
        assert_eq!(ids_at(&after, Level::tier(3)), vec!["x", "p", "y"]);
        assert_distinct(&after, Level::tier(3));
        assert!(ids_at(&after, Level::POOL).is_empty());

        let after = moved(&blocks, "x", Level::POOL, None);
        assert_eq!(ids_at(&after, Level::POOL), vec!["p", "x"]);
    }

    #[test]
    fn test_cross_tier_does_not_compact_source() {
        let blocks = vec![block("a", 1, 0), block("b", 1, 1), block("c", 1, 2)];
        let plan = plan_move(&blocks, &BlockId::new("a"), Level::tier(2), None).unwrap();
        assert_eq!(plan.writes.len(), 1);
        assert_eq!(plan.writes[0].patch, BlockPatch::placement(Level::tier(2), 0));
    }

    #[test]
    fn test_validation_errors() {
        let blocks = vec![block("a", 1, 0), block("b", 1, 1)];
        assert!(matches!(
            plan_move(&blocks, &BlockId::new("zz"), Level::tier(1), None),
            Err(EngineError::BlockNotFound(_))
        ));
        assert!(matches!(
            plan_move(&blocks, &BlockId::new("a"), Level::tier(1), Some(2)),
            Err(EngineError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            plan_move(&blocks, &BlockId::new("a"), Level::tier(4), Some(1)),
            Err(EngineError::IndexOutOfRange { index: 1, len: 0 })
        ));
    }
}
