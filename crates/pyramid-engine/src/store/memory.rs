//! In-memory persistence service.
//!
//! Used for tests and embedding. All data is ephemeral.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use pyramid_types::{
    ArrangementResponse, Block, BlockId, BlockPatch, Color, NewBlock, ProjectId,
};

use super::{PersistenceService, ProjectData, StoreResult};
use crate::arranger::{Arranger, LayeredArranger};

/// In-memory persistence service.
///
/// Thread-safe via internal `RwLock`. Unknown projects read as empty and are
/// created on first write. All data is lost when dropped.
pub struct MemoryStore {
    projects: RwLock<HashMap<ProjectId, ProjectData>>,
    arranger: Arc<dyn Arranger>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("projects", &self.projects.read().len())
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create an empty store using the layered arranger.
    pub fn new() -> Self {
        Self::with_arranger(Arc::new(LayeredArranger::default()))
    }

    pub fn with_arranger(arranger: Arc<dyn Arranger>) -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            arranger,
        }
    }

    /// Create a store pre-seeded with one project's data.
    pub fn with_project(project: ProjectId, data: ProjectData) -> Self {
        let store = Self::new();
        store.projects.write().insert(project, data);
        store
    }

    /// Copy of a project's current data.
    pub fn snapshot(&self, project: &ProjectId) -> ProjectData {
        self.projects
            .read()
            .get(project)
            .cloned()
            .unwrap_or_default()
    }

    fn read<T>(&self, project: &ProjectId, f: impl FnOnce(&ProjectData) -> T) -> T {
        let projects = self.projects.read();
        match projects.get(project) {
            Some(data) => f(data),
            None => f(&ProjectData::default()),
        }
    }

    fn write<T>(&self, project: &ProjectId, f: impl FnOnce(&mut ProjectData) -> T) -> T {
        let mut projects = self.projects.write();
        f(projects.entry(project.clone()).or_default())
    }
}

#[async_trait]
impl PersistenceService for MemoryStore {
    async fn list_blocks(&self, project: &ProjectId) -> StoreResult<Vec<Block>> {
        Ok(self.read(project, ProjectData::list))
    }

    async fn create_block(&self, project: &ProjectId, block: NewBlock) -> StoreResult<Block> {
        self.write(project, |data| data.create(block))
    }

    async fn update_block(
        &self,
        project: &ProjectId,
        id: &BlockId,
        patch: BlockPatch,
    ) -> StoreResult<Block> {
        self.write(project, |data| data.update(id, &patch))
    }

    async fn delete_block(&self, project: &ProjectId, id: &BlockId) -> StoreResult<()> {
        self.write(project, |data| data.delete(id))
    }

    async fn add_dependency(
        &self,
        project: &ProjectId,
        from: &BlockId,
        to: &BlockId,
        color: Option<Color>,
    ) -> StoreResult<Block> {
        self.write(project, |data| data.add_dependency(from, to, color))
    }

    async fn remove_dependency(
        &self,
        project: &ProjectId,
        from: &BlockId,
        to: &BlockId,
    ) -> StoreResult<Block> {
        self.write(project, |data| data.remove_dependency(from, to))
    }

    async fn get_dependency_colors(
        &self,
        project: &ProjectId,
    ) -> StoreResult<HashMap<String, String>> {
        Ok(self.read(project, ProjectData::dependency_colors))
    }

    async fn get_color_palette(&self, project: &ProjectId) -> StoreResult<Vec<String>> {
        Ok(self.read(project, |data| data.palette.clone()))
    }

    async fn set_color_palette(
        &self,
        project: &ProjectId,
        colors: Vec<String>,
    ) -> StoreResult<Vec<String>> {
        self.write(project, |data| {
            data.palette = colors;
            Ok(data.palette.clone())
        })
    }

    async fn run_bulk_arrangement(
        &self,
        project: &ProjectId,
        ids: &[BlockId],
    ) -> StoreResult<ArrangementResponse> {
        self.write(project, |data| {
            let response = self.arranger.arrange(&data.blocks, ids);
            data.apply_placements(&response.placements());
            Ok(response)
        })
    }

    async fn get_arrangement_reasoning(&self, project: &ProjectId) -> StoreResult<Option<String>> {
        Ok(self.read(project, |data| data.arrangement_reasoning.clone()))
    }

    async fn set_arrangement_reasoning(
        &self,
        project: &ProjectId,
        reasoning: Option<String>,
    ) -> StoreResult<()> {
        self.write(project, |data| {
            data.arrangement_reasoning = reasoning;
            Ok(())
        })
    }
}
