//! Dependency edges and the service's edge-color key format.
//!
//! An edge is identified by its ordered `(from, to)` pair. The persistence
//! service stores edge colors in a flat map keyed `"{from}_{to}"`; ids that
//! themselves contain `_` cannot round-trip through that key, and parsing
//! always splits on the first `_`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::ids::BlockId;

/// Directed edge between two blocks, keyed by the ordered pair.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: BlockId,
    pub to: BlockId,
}

impl EdgeKey {
    pub fn new(from: BlockId, to: BlockId) -> Self {
        Self { from, to }
    }

    /// Check if both ends are the same block.
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// The same pair, reversed.
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }

    /// Check if `id` is either end.
    pub fn touches(&self, id: &BlockId) -> bool {
        &self.from == id || &self.to == id
    }

    /// Service color-map key: `"{from}_{to}"`.
    pub fn to_color_key(&self) -> String {
        format!("{}_{}", self.from, self.to)
    }

    /// Parse a service color-map key. Splits on the first `_`.
    pub fn from_color_key(key: &str) -> Option<Self> {
        let (from, to) = key.split_once('_')?;
        if from.is_empty() || to.is_empty() {
            return None;
        }
        Some(Self::new(BlockId::new(from), BlockId::new(to)))
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from.short(), self.to.short())
    }
}

/// A dependency edge with its optional color.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: BlockId,
    pub to: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl DependencyEdge {
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from.clone(), self.to.clone())
    }
}
