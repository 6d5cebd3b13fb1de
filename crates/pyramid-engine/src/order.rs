//! Order-key allocation within a single level.
//!
//! Keys are sparse integers. An insertion first looks for integer room
//! between its neighbours (midpoint, or one past/before the edge sibling);
//! when there is none, the new block takes the next slot and every sibling
//! from the insertion point onward moves up by one.
//!
//! ```text
//! [A:0, B:4]   insert at 1  →  new = 2,           no shifts
//! [A:0, B:1]   insert at 1  →  new = 1,           B → 2
//! [A:3]        insert at 0  →  new = 2,           no shifts
//! [A:0, B:1]   insert at 0  →  new = 0,           A → 1, B → 2
//! ```

use pyramid_types::{Block, BlockId};

/// A sibling whose key has to change to make room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderShift {
    pub block_id: BlockId,
    pub order: i64,
}

/// Result of allocating a key for one insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    /// Key for the inserted block.
    pub order: i64,
    /// Sibling keys to rewrite, with their new values.
    pub shifts: Vec<OrderShift>,
}

impl Allocation {
    fn fresh(order: i64) -> Self {
        Self {
            order,
            shifts: Vec::new(),
        }
    }

    /// Insert at `order`, bumping every sibling from `index` onward by one.
    fn bumping(order: i64, siblings: &[Block], index: usize) -> Self {
        Self {
            order,
            shifts: siblings[index..]
                .iter()
                .map(|b| OrderShift {
                    block_id: b.id.clone(),
                    order: b.order + 1,
                })
                .collect(),
        }
    }
}

/// Allocate an order key for an insertion at `index`.
///
/// `siblings` are the blocks of the destination level sorted by order, with
/// the block being placed already excluded. `index` ranges over `0..=len`.
///
/// # Panics
///
/// Panics if `index > siblings.len()`. Callers validate user-supplied
/// indices before planning.
pub fn allocate(siblings: &[Block], index: usize) -> Allocation {
    assert!(
        index <= siblings.len(),
        "insertion index {index} out of range for {} siblings",
        siblings.len()
    );

    if siblings.is_empty() {
        return Allocation::fresh(0);
    }

    if index == 0 {
        let next = siblings[0].order;
        return if next > 0 {
            Allocation::fresh(next - 1)
        } else {
            // No non-negative room below the first sibling.
            Allocation::bumping(next, siblings, 0)
        };
    }

    let prev = siblings[index - 1].order;
    if index == siblings.len() {
        return Allocation::fresh(prev + 1);
    }

    let next = siblings[index].order;
    if next - prev > 1 {
        Allocation::fresh((prev + next).div_euclid(2))
    } else {
        Allocation::bumping(prev + 1, siblings, index)
    }
}
