//! Bulk arrangement results.
//!
//! An arrangement is computed outside the engine for a chosen subset of
//! blocks. It arrives once, is merged into the working copy, and its
//! reasoning text becomes the project's arrangement note.

use serde::{Deserialize, Serialize};

use crate::block::{Block, Level};
use crate::ids::BlockId;

/// New placement for one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub block_id: BlockId,
    pub level: Level,
    pub order: i64,
}

impl Placement {
    pub fn new(block_id: BlockId, level: Level, order: i64) -> Self {
        Self {
            block_id,
            level,
            order,
        }
    }
}

/// Result of one bulk arrangement run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrangementResult {
    pub placements: Vec<Placement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ArrangementResult {
    /// Reasoning text, with empty or whitespace-only text treated as absent.
    pub fn note(&self) -> Option<&str> {
        self.reasoning.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// What the arrangement service sends back.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrangementResponse {
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub reasoning: String,
}

impl ArrangementResponse {
    /// Placements carried by the returned blocks.
    pub fn placements(&self) -> Vec<Placement> {
        self.blocks
            .iter()
            .map(|b| Placement::new(b.id.clone(), b.level, b.order))
            .collect()
    }
}

impl From<ArrangementResponse> for ArrangementResult {
    fn from(response: ArrangementResponse) -> Self {
        Self {
            placements: response.placements(),
            reasoning: Some(response.reasoning),
        }
    }
}
