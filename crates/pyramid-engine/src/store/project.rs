//! Per-project state shared by the bundled stores.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use pyramid_types::{Block, BlockId, BlockPatch, Color, EdgeKey, NewBlock, Placement};

use super::{StoreError, StoreResult};

/// Everything a store keeps for one project.
///
/// This is also the on-disk document format of [`FileStore`](super::FileStore).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectData {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub palette: Vec<String>,
    /// Edge colors keyed `"{from}_{to}"`.
    #[serde(default)]
    pub dependency_colors: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrangement_reasoning: Option<String>,
}

impl ProjectData {
    fn find(&self, id: &BlockId) -> StoreResult<&Block> {
        self.blocks
            .iter()
            .find(|b| &b.id == id)
            .ok_or_else(|| StoreError::block_not_found(id))
    }

    fn find_mut(&mut self, id: &BlockId) -> StoreResult<&mut Block> {
        self.blocks
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| StoreError::block_not_found(id))
    }

    /// Blocks sorted by `(level, order)`.
    pub fn list(&self) -> Vec<Block> {
        let mut blocks = self.blocks.clone();
        blocks.sort_by(|a, b| (a.level, a.order).cmp(&(b.level, b.order)));
        blocks
    }

    pub fn create(&mut self, new: NewBlock) -> StoreResult<Block> {
        new.validate()
            .map_err(|e| StoreError::rejected(e.to_string()))?;

        let order = new
            .order
            .unwrap_or_else(|| crate::tiers::next_order(&self.blocks, new.level));
        let block = Block {
            id: BlockId::generate(),
            title: new.title,
            description: new.description,
            category: new.category,
            level: new.level,
            order,
            dependencies: Vec::new(),
        };
        debug!(id = %block.id, level = %block.level, order, "created block");
        self.blocks.push(block.clone());
        Ok(block)
    }

    pub fn update(&mut self, id: &BlockId, patch: &BlockPatch) -> StoreResult<Block> {
        patch
            .validate()
            .map_err(|e| StoreError::rejected(e.to_string()))?;
        let block = self.find_mut(id)?;
        block.apply(patch);
        Ok(block.clone())
    }

    /// Remove a block, scrubbing it from every dependency list and color key.
    pub fn delete(&mut self, id: &BlockId) -> StoreResult<()> {
        let before = self.blocks.len();
        self.blocks.retain(|b| &b.id != id);
        if self.blocks.len() == before {
            return Err(StoreError::block_not_found(id));
        }
        for block in &mut self.blocks {
            block.dependencies.retain(|d| d != id);
        }
        self.dependency_colors
            .retain(|key, _| EdgeKey::from_color_key(key).is_none_or(|edge| !edge.touches(id)));
        Ok(())
    }

    pub fn add_dependency(
        &mut self,
        from: &BlockId,
        to: &BlockId,
        color: Option<Color>,
    ) -> StoreResult<Block> {
        if from == to {
            return Err(StoreError::rejected("a block cannot depend on itself"));
        }
        self.find(to)?;
        let block = self.find_mut(from)?;
        if !block.depends_on(to) {
            block.dependencies.push(to.clone());
        }
        let block = block.clone();

        let key = EdgeKey::new(from.clone(), to.clone()).to_color_key();
        match color {
            Some(color) => {
                self.dependency_colors.insert(key, color.as_str().to_string());
            }
            None => {
                self.dependency_colors.remove(&key);
            }
        }
        Ok(block)
    }

    pub fn remove_dependency(&mut self, from: &BlockId, to: &BlockId) -> StoreResult<Block> {
        let block = self.find_mut(from)?;
        block.dependencies.retain(|d| d != to);
        let block = block.clone();

        let key = EdgeKey::new(from.clone(), to.clone()).to_color_key();
        self.dependency_colors.remove(&key);
        Ok(block)
    }

    pub fn dependency_colors(&self) -> HashMap<String, String> {
        self.dependency_colors
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Write arranged placements back. Unknown ids are skipped.
    pub fn apply_placements(&mut self, placements: &[Placement]) -> usize {
        let mut applied = 0;
        for placement in placements {
            if let Ok(block) = self.find_mut(&placement.block_id) {
                block.level = placement.level;
                block.order = placement.order;
                applied += 1;
            }
        }
        applied
    }
}
