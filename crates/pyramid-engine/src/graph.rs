//! Computed dependency graph.
//!
//! The durable edge set is the `dependencies` list on each stored block plus
//! the service's color map. [`DependencyGraph`] is the in-memory index over
//! both: one entry per ordered `(from, to)` pair with an optional color. It
//! can always be rebuilt from a fresh block listing, so a stale color is the
//! worst a missed update can cause.
//!
//! Cycles are allowed. Nothing here walks the graph transitively.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use pyramid_types::{Block, BlockId, Color, DependencyEdge, EdgeKey};

use crate::error::{EngineError, Result};

/// Directed edges between blocks, each with an optional color.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<EdgeKey, Option<Color>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from blocks' dependency lists and a service color map keyed
    /// `"{from}_{to}"`. Unparseable keys and unknown colors are skipped.
    pub fn from_parts(blocks: &[Block], colors: &HashMap<String, String>) -> Self {
        let mut graph = Self::new();
        graph.rebuild(blocks, colors);
        graph
    }

    /// Replace every edge with those in `blocks`, colored from `colors`.
    pub fn rebuild(&mut self, blocks: &[Block], colors: &HashMap<String, String>) {
        let mut parsed: HashMap<EdgeKey, Color> = HashMap::with_capacity(colors.len());
        for (key, value) in colors {
            let Some(edge) = EdgeKey::from_color_key(key) else {
                warn!(key = %key, "ignoring malformed dependency color key");
                continue;
            };
            match Color::from_str(value) {
                Some(color) => {
                    parsed.insert(edge, color);
                }
                None => warn!(edge = %edge, color = %value, "ignoring unknown dependency color"),
            }
        }
        self.rebuild_with(blocks, |key| parsed.get(key).copied());
    }

    /// Replace every edge with those in `blocks`, keeping known colors.
    pub fn refresh(&mut self, blocks: &[Block]) {
        let previous = std::mem::take(&mut self.edges);
        self.rebuild_with(blocks, |key| previous.get(key).copied().flatten());
    }

    fn rebuild_with(&mut self, blocks: &[Block], color_of: impl Fn(&EdgeKey) -> Option<Color>) {
        self.edges.clear();
        for block in blocks {
            for to in &block.dependencies {
                let key = EdgeKey::new(block.id.clone(), to.clone());
                if key.is_self_loop() {
                    warn!(block = %block.id, "ignoring stored self-dependency");
                    continue;
                }
                let color = color_of(&key);
                self.edges.insert(key, color);
            }
        }
    }

    /// Insert or recolor the edge `from -> to`.
    pub fn add_edge(&mut self, from: &BlockId, to: &BlockId, color: Option<Color>) -> Result<()> {
        if from == to {
            return Err(EngineError::SelfDependency(from.clone()));
        }
        self.edges
            .insert(EdgeKey::new(from.clone(), to.clone()), color);
        Ok(())
    }

    /// Remove the edge `from -> to`. Returns whether it existed.
    pub fn remove_edge(&mut self, from: &BlockId, to: &BlockId) -> bool {
        self.edges
            .remove(&EdgeKey::new(from.clone(), to.clone()))
            .is_some()
    }

    pub fn contains(&self, from: &BlockId, to: &BlockId) -> bool {
        self.edges
            .contains_key(&EdgeKey::new(from.clone(), to.clone()))
    }

    /// Color of the edge `from -> to`; `None` if uncolored or absent.
    pub fn color_of(&self, from: &BlockId, to: &BlockId) -> Option<Color> {
        self.edges
            .get(&EdgeKey::new(from.clone(), to.clone()))
            .copied()
            .flatten()
    }

    /// Edges between `a` and `b` in either direction.
    pub fn edges_between(&self, a: &BlockId, b: &BlockId) -> Vec<DependencyEdge> {
        self.edges()
            .filter(|e| (&e.from == a && &e.to == b) || (&e.from == b && &e.to == a))
            .collect()
    }

    /// Edges leaving `id`.
    pub fn outgoing(&self, id: &BlockId) -> Vec<DependencyEdge> {
        self.edges().filter(|e| &e.from == id).collect()
    }

    /// Edges arriving at `id`.
    pub fn incoming(&self, id: &BlockId) -> Vec<DependencyEdge> {
        self.edges().filter(|e| &e.to == id).collect()
    }

    /// Drop every edge touching `id`. Returns how many were removed.
    pub fn remove_block(&mut self, id: &BlockId) -> usize {
        let before = self.edges.len();
        self.edges.retain(|key, _| !key.touches(id));
        before - self.edges.len()
    }

    /// All edges, ordered by `(from, to)`.
    pub fn edges(&self) -> impl Iterator<Item = DependencyEdge> + '_ {
        self.edges.iter().map(|(key, color)| DependencyEdge {
            from: key.from.clone(),
            to: key.to.clone(),
            color: *color,
        })
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
