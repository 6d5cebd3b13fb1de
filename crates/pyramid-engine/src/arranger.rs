//! Bulk arrangement strategies.
//!
//! A store's `run_bulk_arrangement` hands the project's blocks and the
//! chosen ids to an [`Arranger`] and persists whatever placements come back.
//! The engine treats the result as opaque; [`LayeredArranger`] is the
//! deterministic strategy used by the bundled stores.

use std::collections::{BTreeMap, HashMap, HashSet};

use pyramid_types::{ArrangementResponse, Block, BlockId, Level};

/// Highest tier an arrangement may assign by default.
pub const DEFAULT_MAX_ARRANGED_LEVEL: u32 = 5;

/// Computes new placements for a chosen subset of blocks.
pub trait Arranger: Send + Sync {
    /// Arrange `chosen` (ids not in `blocks` are skipped). Returns the
    /// arranged blocks with their new level and order, plus reasoning.
    fn arrange(&self, blocks: &[Block], chosen: &[BlockId]) -> ArrangementResponse;
}

/// Places blocks by dependency depth.
///
/// A chosen block with no dependencies inside the chosen set lands on the
/// foundation; every other block sits one tier above its highest chosen
/// dependency, capped at `max_level`. Within a tier, arranged blocks are
/// appended after the tier's existing members, keeping their previous
/// relative order.
#[derive(Debug, Clone)]
pub struct LayeredArranger {
    max_level: u32,
}

impl Default for LayeredArranger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ARRANGED_LEVEL)
    }
}

impl LayeredArranger {
    pub fn new(max_level: u32) -> Self {
        Self { max_level }
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Dependency depth of every chosen block, capped at `max_level`.
    ///
    /// Relaxation only ever raises a depth and depths are capped, so the
    /// loop terminates on cyclic graphs too.
    fn depths(&self, chosen: &[&Block], ids: &HashSet<&BlockId>) -> HashMap<BlockId, u32> {
        let mut depth: HashMap<BlockId, u32> = chosen.iter().map(|b| (b.id.clone(), 0)).collect();

        loop {
            let mut changed = false;
            for block in chosen {
                let needed = block
                    .dependencies
                    .iter()
                    .filter(|dep| ids.contains(dep) && **dep != block.id)
                    .filter_map(|dep| depth.get(dep))
                    .map(|d| (d + 1).min(self.max_level))
                    .max()
                    .unwrap_or(0);
                if let Some(current) = depth.get_mut(&block.id)
                    && needed > *current
                {
                    *current = needed;
                    changed = true;
                }
            }
            if !changed {
                return depth;
            }
        }
    }
}

impl Arranger for LayeredArranger {
    fn arrange(&self, blocks: &[Block], chosen: &[BlockId]) -> ArrangementResponse {
        let wanted: HashSet<&BlockId> = chosen.iter().collect();
        let mut picked: Vec<&Block> = blocks.iter().filter(|b| wanted.contains(&b.id)).collect();
        if picked.is_empty() {
            return ArrangementResponse {
                blocks: Vec::new(),
                reasoning: "Nothing to arrange.".to_string(),
            };
        }
        let ids: HashSet<&BlockId> = picked.iter().map(|b| &b.id).collect();
        let depth = self.depths(&picked, &ids);

        // Keep previous relative order: tiered blocks by (level, order), pool last.
        picked.sort_by(|a, b| {
            (a.level.is_pool(), a.level, a.order, &a.id).cmp(&(b.level.is_pool(), b.level, b.order, &b.id))
        });

        // Next free key per tier, after members that are not being arranged.
        let mut next_order: BTreeMap<u32, i64> = BTreeMap::new();
        for block in blocks.iter().filter(|b| b.level.is_tier() && !ids.contains(&b.id)) {
            let tier = block.level.value() as u32;
            let slot = next_order.entry(tier).or_insert(0);
            *slot = (*slot).max(block.order + 1);
        }

        let mut arranged = Vec::with_capacity(picked.len());
        let mut tiers: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
        for block in picked {
            let tier = depth.get(&block.id).copied().unwrap_or(0);
            let slot = next_order.entry(tier).or_insert(0);
            let mut placed = block.clone();
            placed.level = Level::tier(tier);
            placed.order = *slot;
            *slot += 1;
            tiers.entry(tier).or_default().push(&block.title);
            arranged.push(placed);
        }

        let mut reasoning = format!(
            "Arranged {} block{} by dependency depth: blocks without prerequisites form the foundation and each block sits one tier above its highest prerequisite.",
            arranged.len(),
            if arranged.len() == 1 { "" } else { "s" },
        );
        for (tier, titles) in &tiers {
            reasoning.push_str(&format!("\nTier {tier}: {}", titles.join(", ")));
        }

        ArrangementResponse {
            blocks: arranged,
            reasoning,
        }
    }
}
