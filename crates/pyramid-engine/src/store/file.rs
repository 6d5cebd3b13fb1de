//! File-backed persistence service.
//!
//! One JSON document per project at `<data_dir>/<project>.json`, holding a
//! [`ProjectData`]. Every mutation is a read-modify-write of the whole
//! document, serialized by an internal lock and written atomically
//! (temp file + rename).

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use pyramid_types::{
    ArrangementResponse, Block, BlockId, BlockPatch, Color, NewBlock, ProjectId,
};

use super::{PersistenceService, ProjectData, StoreError, StoreResult};
use crate::arranger::{Arranger, LayeredArranger};

/// File-backed persistence service.
pub struct FileStore {
    root: PathBuf,
    arranger: Arc<dyn Arranger>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_arranger(root, Arc::new(LayeredArranger::default()))
    }

    pub fn with_arranger(root: impl Into<PathBuf>, arranger: Arc<dyn Arranger>) -> Self {
        Self {
            root: root.into(),
            arranger,
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every project that has a document under the root.
    pub async fn projects(&self) -> StoreResult<Vec<ProjectId>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut projects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                projects.push(ProjectId::new(stem));
            }
        }
        projects.sort();
        Ok(projects)
    }

    /// Path of a project's document. Ids that could escape the root are rejected.
    fn document_path(&self, project: &ProjectId) -> StoreResult<PathBuf> {
        let id = project.as_str();
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::rejected(format!("invalid project id: {id:?}")));
        }
        Ok(self.root.join(format!("{id}.json")))
    }

    async fn load(&self, project: &ProjectId) -> StoreResult<ProjectData> {
        let path = self.document_path(project)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ProjectData::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, project: &ProjectId, data: &ProjectData) -> StoreResult<()> {
        let path = self.document_path(project)?;
        fs::create_dir_all(&self.root).await?;

        let bytes = serde_json::to_vec_pretty(data)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &bytes).await?;
        fs::rename(&tmp_path, &path).await?;
        debug!(project = %project, path = %path.display(), bytes = bytes.len(), "saved project");
        Ok(())
    }

    /// Load, mutate, and save only if the mutation succeeded.
    async fn modify<T>(
        &self,
        project: &ProjectId,
        f: impl FnOnce(&mut ProjectData) -> StoreResult<T> + Send,
    ) -> StoreResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.load(project).await?;
        let value = f(&mut data)?;
        self.save(project, &data).await?;
        Ok(value)
    }
}

#[async_trait]
impl PersistenceService for FileStore {
    async fn list_blocks(&self, project: &ProjectId) -> StoreResult<Vec<Block>> {
        Ok(self.load(project).await?.list())
    }

    async fn create_block(&self, project: &ProjectId, block: NewBlock) -> StoreResult<Block> {
        self.modify(project, |data| data.create(block)).await
    }

    async fn update_block(
        &self,
        project: &ProjectId,
        id: &BlockId,
        patch: BlockPatch,
    ) -> StoreResult<Block> {
        self.modify(project, |data| data.update(id, &patch)).await
    }

    async fn delete_block(&self, project: &ProjectId, id: &BlockId) -> StoreResult<()> {
        self.modify(project, |data| data.delete(id)).await
    }

    async fn add_dependency(
        &self,
        project: &ProjectId,
        from: &BlockId,
        to: &BlockId,
        color: Option<Color>,
    ) -> StoreResult<Block> {
        self.modify(project, |data| data.add_dependency(from, to, color))
            .await
    }

    async fn remove_dependency(
        &self,
        project: &ProjectId,
        from: &BlockId,
        to: &BlockId,
    ) -> StoreResult<Block> {
        self.modify(project, |data| data.remove_dependency(from, to))
            .await
    }

    async fn get_dependency_colors(
        &self,
        project: &ProjectId,
    ) -> StoreResult<HashMap<String, String>> {
        Ok(self.load(project).await?.dependency_colors())
    }

    async fn get_color_palette(&self, project: &ProjectId) -> StoreResult<Vec<String>> {
        Ok(self.load(project).await?.palette)
    }

    async fn set_color_palette(
        &self,
        project: &ProjectId,
        colors: Vec<String>,
    ) -> StoreResult<Vec<String>> {
        self.modify(project, |data| {
            data.palette = colors;
            Ok(data.palette.clone())
        })
        .await
    }

    async fn run_bulk_arrangement(
        &self,
        project: &ProjectId,
        ids: &[BlockId],
    ) -> StoreResult<ArrangementResponse> {
        let arranger = Arc::clone(&self.arranger);
        self.modify(project, move |data| {
            let response = arranger.arrange(&data.blocks, ids);
            data.apply_placements(&response.placements());
            Ok(response)
        })
        .await
    }

    async fn get_arrangement_reasoning(&self, project: &ProjectId) -> StoreResult<Option<String>> {
        Ok(self.load(project).await?.arrangement_reasoning)
    }

    async fn set_arrangement_reasoning(
        &self,
        project: &ProjectId,
        reasoning: Option<String>,
    ) -> StoreResult<()> {
        self.modify(project, |data| {
            data.arrangement_reasoning = reasoning;
            Ok(())
        })
        .await
    }
}
