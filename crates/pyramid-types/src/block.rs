//! Block types: tiers, blocks, creation requests and partial updates.
//!
//! A block sits either in the unassigned pool (`Level::POOL`) or on one of the
//! pyramid tiers (`0` = foundation, higher = closer to the goal). Within a
//! level the `order` key sequences blocks; keys are only compared between
//! blocks sharing a level and need not be contiguous or zero-based.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::BlockId;

/// Minimum number of tiers shown even when fewer are occupied.
///
/// Display-only: nothing in the engine refuses a block above or below this.
pub const MIN_DISPLAY_LEVEL: i32 = 4;

/// A pyramid tier, or the unassigned pool.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct Level(i32);

impl Level {
    /// The unassigned holding pool.
    pub const POOL: Level = Level(-1);

    /// The foundation tier.
    pub const FOUNDATION: Level = Level(0);

    /// Wrap a raw level value. Anything below `-1` collapses into the pool.
    pub fn new(value: i32) -> Self {
        Self(value.max(-1))
    }

    /// A pyramid tier.
    pub fn tier(n: u32) -> Self {
        Self(n.min(i32::MAX as u32) as i32)
    }

    /// Raw level value (`-1` for the pool).
    pub fn value(&self) -> i32 {
        self.0
    }

    /// Check if this is the unassigned pool.
    pub fn is_pool(&self) -> bool {
        self.0 < 0
    }

    /// Check if this is an assigned pyramid tier.
    pub fn is_tier(&self) -> bool {
        self.0 >= 0
    }

    /// Parse from string (case-insensitive).
    ///
    /// Accepts an integer, or "pool"/"none"/"unassigned" for the pool.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::POOL
    }
}

impl From<i32> for Level {
    fn from(value: i32) -> Self {
        Self::new(value)
    }
}

impl From<Level> for i32 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl FromStr for Level {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if ["pool", "none", "unassigned"]
            .iter()
            .any(|alias| s.eq_ignore_ascii_case(alias))
        {
            return Ok(Self::POOL);
        }
        s.parse::<i32>().map(Self::new)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pool() {
            f.write_str("pool")
        } else {
            write!(f, "L{}", self.0)
        }
    }
}

/// A work item placed in the pyramid or the pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub level: Level,
    pub order: i64,
    /// Blocks this block points at (outgoing dependency edges).
    #[serde(default)]
    pub dependencies: Vec<BlockId>,
}

impl Block {
    /// Check if this block sits in the unassigned pool.
    pub fn is_pooled(&self) -> bool {
        self.level.is_pool()
    }

    /// Check if this block has an outgoing edge to `other`.
    pub fn depends_on(&self, other: &BlockId) -> bool {
        self.dependencies.iter().any(|d| d == other)
    }

    /// Apply a partial update in place. Unset fields are left alone.
    pub fn apply(&mut self, patch: &BlockPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(category) = &patch.category {
            self.category = Some(category.clone());
        }
        if let Some(level) = patch.level {
            self.level = level;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }
}

/// Validation failures for block creation and edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("block title must not be empty")]
    EmptyTitle,
}

/// Request to create a block.
///
/// `order: None` lets the store pick the next key at `level`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBlock {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl NewBlock {
    /// A block bound for the pool, keyed by the store.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            level: Level::POOL,
            order: None,
            category: None,
        }
    }

    /// A pool block with an explicit order key.
    pub fn pooled(title: impl Into<String>, order: i64) -> Self {
        Self {
            order: Some(order),
            ..Self::new(title)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Place the block explicitly.
    pub fn at(mut self, level: Level, order: i64) -> Self {
        self.level = level;
        self.order = Some(order);
        self
    }

    /// Check the request before it leaves the process.
    pub fn validate(&self) -> Result<(), BlockError> {
        if self.title.trim().is_empty() {
            return Err(BlockError::EmptyTitle);
        }
        Ok(())
    }
}

/// Partial update of a block. `None` fields are not sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl BlockPatch {
    /// Only the order key changes.
    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }

    /// Level and order change together.
    pub fn placement(level: Level, order: i64) -> Self {
        Self {
            level: Some(level),
            order: Some(order),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Check if nothing would be written.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.level.is_none()
            && self.order.is_none()
    }

    /// Check the patch before it leaves the process.
    pub fn validate(&self) -> Result<(), BlockError> {
        if let Some(title) = &self.title
            && title.trim().is_empty()
        {
            return Err(BlockError::EmptyTitle);
        }
        Ok(())
    }
}
