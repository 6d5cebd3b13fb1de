//! Sorted views over a block set.

use std::collections::BTreeMap;

use pyramid_types::{Block, Level};

fn by_order(a: &&Block, b: &&Block) -> std::cmp::Ordering {
    a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id))
}

/// Blocks at `level`, sorted by order key.
pub fn tier(blocks: &[Block], level: Level) -> Vec<&Block> {
    let mut members: Vec<&Block> = blocks.iter().filter(|b| b.level == level).collect();
    members.sort_by(by_order);
    members
}

/// Pool blocks, sorted by order key.
pub fn pool(blocks: &[Block]) -> Vec<&Block> {
    tier(blocks, Level::POOL)
}

/// Assigned tiers only, each sorted by order key.
pub fn group_by_level(blocks: &[Block]) -> BTreeMap<Level, Vec<&Block>> {
    let mut tiers: BTreeMap<Level, Vec<&Block>> = BTreeMap::new();
    for block in blocks.iter().filter(|b| b.level.is_tier()) {
        tiers.entry(block.level).or_default().push(block);
    }
    for members in tiers.values_mut() {
        members.sort_by(by_order);
    }
    tiers
}

/// Highest tier to display: the highest occupied tier, never below `floor`.
pub fn max_display_level(blocks: &[Block], floor: i32) -> i32 {
    blocks
        .iter()
        .map(|b| b.level.value())
        .fold(floor, i32::max)
}

/// Key that sorts after every block currently at `level`.
///
/// Moves leave gaps, so the member count can collide with a live key.
pub fn next_order(blocks: &[Block], level: Level) -> i64 {
    blocks
        .iter()
        .filter(|b| b.level == level)
        .map(|b| b.order)
        .max()
        .map_or(0, |max| max + 1)
}

/// Owned copy of a tier's members, for planning.
pub(crate) fn siblings(blocks: &[Block], level: Level) -> Vec<Block> {
    tier(blocks, level).into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyramid_types::BlockId;

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

    fn ids(blocks: &[&Block]) -> Vec<String> {
        blocks.iter().map(|b| b.id.to_string()).collect()
    }

    #[test]
    fn test_next_order_skips_past_gaps() {
        let blocks = vec![block("a", -1, 0), block("c", -1, 2), block("t", 0, 5)];
        assert_eq!(next_order(&blocks, Level::POOL), 3);
        assert_eq!(next_order(&blocks, Level::tier(0)), 6);
        assert_eq!(next_order(&blocks, Level::tier(3)), 0);
    }

    #[test]
    fn test_tier_sorted_by_order() {
        let blocks = vec![block("c", 1, 9), block("a", 1, 2), block("p", -1, 0), block("b", 1, 4)];
        assert_eq!(ids(&tier(&blocks, Level::tier(1))), vec!["a", "b", "c"]);
        assert_eq!(ids(&pool(&blocks)), vec!["p"]);
    }

    #[test]
    fn test_group_excludes_pool() {
        let blocks = vec![block("a", 0, 1), block("b", 2, 0), block("p", -1, 0), block("c", 0, 0)];
        let groups = group_by_level(&blocks);
        assert_eq!(groups.len(), 2);
        assert_eq!(ids(&groups[&Level::tier(0)]), vec!["c", "a"]);
        assert_eq!(ids(&groups[&Level::tier(2)]), vec!["b"]);
    }

    #[test]
    fn test_max_display_level_floor() {
        assert_eq!(max_display_level(&[], 4), 4);
        assert_eq!(max_display_level(&[block("a", 2, 0)], 4), 4);
        assert_eq!(max_display_level(&[block("a", 7, 0)], 4), 7);
    }
}
