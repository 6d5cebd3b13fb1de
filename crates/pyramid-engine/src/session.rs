//! Per-project working copy.
//!
//! A [`ProjectSession`] owns everything the engine knows about one open
//! project: its blocks, the dependency graph, the color palette, the last
//! arrangement note and any half-finished connection gesture. Every gesture
//! follows the same shape:
//!
//! 1. validate against the working copy (nothing sent on failure)
//! 2. plan the writes
//! 3. issue them to the persistence service
//! 4. patch the working copy with what the service returned
//!
//! When a batch partly fails the successful writes are still patched in and
//! the gesture returns [`EngineError::BatchFailed`]; call
//! [`refresh`](ProjectSession::refresh) to resynchronize.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use pyramid_types::{
    ArrangementResult, Block, BlockId, BlockPatch, Color, DependencyEdge, Level, MIN_DISPLAY_LEVEL,
    NewBlock, ProjectId,
};

use crate::batch::{self, BlockWrite};
use crate::compactor::plan_deletion;
use crate::coordinator::{MovePlan, plan_move};
use crate::error::{EngineError, Result};
use crate::graph::DependencyGraph;
use crate::palette::{self, ColorPalette};
use crate::reconciler::{ReconcileReport, reconcile};
use crate::store::{PersistenceService, StoreError};
use crate::tiers;

/// The working copy of one open project.
pub struct ProjectSession {
    store: Arc<dyn PersistenceService>,
    project: ProjectId,
    blocks: Vec<Block>,
    graph: DependencyGraph,
    palette: ColorPalette,
    note: Option<String>,
    connecting_from: Option<BlockId>,
    min_display_level: i32,
}

impl std::fmt::Debug for ProjectSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectSession")
            .field("project", &self.project)
            .field("blocks", &self.blocks.len())
            .field("edges", &self.graph.len())
            .field("palette", &self.palette)
            .field("connecting_from", &self.connecting_from)
            .finish_non_exhaustive()
    }
}

impl ProjectSession {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open a project: list its blocks, then load palette, edge colors and
    /// the arrangement note. Only the block listing can fail; the rest fall
    /// back to defaults with a warning.
    pub async fn open(store: Arc<dyn PersistenceService>, project: ProjectId) -> Result<Self> {
        let blocks = store.list_blocks(&project).await?;
        let palette = palette::load_palette(store.as_ref(), &project).await;

        let colors = match store.get_dependency_colors(&project).await {
            Ok(colors) => colors,
            Err(e) => {
                warn!(project = %project, error = %e, "failed to load dependency colors");
                Default::default()
            }
        };
        let graph = DependencyGraph::from_parts(&blocks, &colors);

        let note = match store.get_arrangement_reasoning(&project).await {
            Ok(note) => note,
            Err(e) => {
                warn!(project = %project, error = %e, "failed to load arrangement note");
                None
            }
        };

        info!(project = %project, blocks = blocks.len(), edges = graph.len(), "opened project");
        Ok(Self {
            store,
            project,
            blocks,
            graph,
            palette,
            note,
            connecting_from: None,
            min_display_level: MIN_DISPLAY_LEVEL,
        })
    }

    /// Set the minimum number of displayed tiers.
    pub fn with_min_display_level(mut self, level: i32) -> Self {
        self.min_display_level = level;
        self
    }

    /// Re-list every block and rebuild the graph, keeping cached colors.
    pub async fn refresh(&mut self) -> Result<()> {
        self.blocks = self.store.list_blocks(&self.project).await?;
        self.graph.refresh(&self.blocks);
        debug!(project = %self.project, blocks = self.blocks.len(), "refreshed");
        Ok(())
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Create a block as requested.
    pub async fn create_block(&mut self, new: NewBlock) -> Result<Block> {
        new.validate()?;
        let block = self.store.create_block(&self.project, new).await?;
        info!(block = %block.id, level = %block.level, "created block");
        self.blocks.push(block.clone());
        Ok(block)
    }

    /// Create a block at the end of the pool.
    pub async fn quick_create(&mut self, title: impl Into<String>) -> Result<Block> {
        let order = tiers::next_order(&self.blocks, Level::POOL);
        self.create_block(NewBlock::pooled(title, order)).await
    }

    /// Update a block's fields. An empty patch writes nothing.
    pub async fn edit_block(&mut self, id: &BlockId, patch: BlockPatch) -> Result<Block> {
        let current = self.require(id)?.clone();
        patch.validate()?;
        if patch.is_empty() {
            return Ok(current);
        }
        let block = self.store.update_block(&self.project, id, patch).await?;
        self.replace(block.clone());
        Ok(block)
    }

    /// Move a block to `level` at position `index` (default: end).
    pub async fn move_block(
        &mut self,
        id: &BlockId,
        level: Level,
        index: Option<usize>,
    ) -> Result<MovePlan> {
        let plan = plan_move(&self.blocks, id, level, index)?;
        if plan.is_noop() {
            return Ok(plan);
        }
        self.issue(plan.writes.clone()).await?;
        info!(block = %id, from = %plan.from, to = %plan.to, writes = plan.writes.len(), "moved block");
        Ok(plan)
    }

    /// Delete a block, drop its edges and close the gap in its tier.
    pub async fn delete_block(&mut self, id: &BlockId) -> Result<()> {
        let deleted = self.require(id)?.clone();
        self.store.delete_block(&self.project, id).await?;

        self.blocks.retain(|b| &b.id != id);
        for block in &mut self.blocks {
            block.dependencies.retain(|d| d != id);
        }
        self.graph.remove_block(id);
        if self.connecting_from.as_ref() == Some(id) {
            self.connecting_from = None;
        }

        let writes = plan_deletion(&self.blocks, &deleted);
        info!(block = %id, level = %deleted.level, compacted = writes.len(), "deleted block");
        self.issue(writes).await
    }

    /// Delete every block and clear the arrangement note.
    pub async fn reset(&mut self) -> Result<()> {
        let store = self.store.as_ref();
        let project = &self.project;
        let results = join_all(self.blocks.iter().map(|b| async move {
            (b.id.clone(), store.delete_block(project, &b.id).await)
        }))
        .await;

        let total = results.len();
        let mut failures: Vec<StoreError> = Vec::new();
        let mut deleted: Vec<BlockId> = Vec::new();
        for (id, result) in results {
            match result {
                Ok(()) => deleted.push(id),
                Err(e) => {
                    warn!(block = %id, error = %e, "reset failed to delete block");
                    failures.push(e);
                }
            }
        }

        self.blocks.retain(|b| !deleted.contains(&b.id));
        self.graph.refresh(&self.blocks);
        self.connecting_from = None;

        if let Some(first) = failures.into_iter().next() {
            return Err(EngineError::BatchFailed {
                failed: total - deleted.len(),
                total,
                first: Box::new(first),
            });
        }

        self.store
            .set_arrangement_reasoning(&self.project, None)
            .await?;
        self.note = None;
        info!(project = %self.project, deleted = total, "reset project");
        Ok(())
    }

    // ========================================================================
    // Dependencies
    // ========================================================================

    /// Start a connection gesture at `from`.
    pub fn begin_connection(&mut self, from: &BlockId) -> Result<()> {
        self.require(from)?;
        self.connecting_from = Some(from.clone());
        Ok(())
    }

    /// Finish a connection gesture at `to`, using the selected color.
    ///
    /// Returns `None` when nothing was pending or `to` is the source block
    /// (which cancels the gesture). The gesture ends either way.
    pub async fn complete_connection(&mut self, to: &BlockId) -> Result<Option<DependencyEdge>> {
        let Some(from) = self.connecting_from.take() else {
            return Ok(None);
        };
        if &from == to {
            debug!(block = %to, "connection cancelled on source block");
            return Ok(None);
        }
        let color = self.palette.selected();
        self.add_dependency(&from, to, Some(color)).await.map(Some)
    }

    /// Abandon a connection gesture. Returns whether one was pending.
    pub fn cancel_connection(&mut self) -> bool {
        self.connecting_from.take().is_some()
    }

    pub fn pending_connection(&self) -> Option<&BlockId> {
        self.connecting_from.as_ref()
    }

    /// Add or recolor the edge `from -> to`.
    pub async fn add_dependency(
        &mut self,
        from: &BlockId,
        to: &BlockId,
        color: Option<Color>,
    ) -> Result<DependencyEdge> {
        if from == to {
            return Err(EngineError::SelfDependency(from.clone()));
        }
        self.require(from)?;
        self.require(to)?;
        if let Some(color) = color
            && !self.palette.contains(color)
        {
            return Err(EngineError::ColorNotInPalette(color));
        }

        let block = self
            .store
            .add_dependency(&self.project, from, to, color)
            .await?;
        self.replace(block);
        self.graph.add_edge(from, to, color)?;
        self.resync().await;

        info!(from = %from, to = %to, color = ?color, "added dependency");
        Ok(DependencyEdge {
            from: from.clone(),
            to: to.clone(),
            color,
        })
    }

    /// Remove the edge `from -> to`. Returns `false` (and writes nothing)
    /// when there is no such edge.
    pub async fn remove_dependency(&mut self, from: &BlockId, to: &BlockId) -> Result<bool> {
        let source = self.require(from)?;
        if !source.depends_on(to) && !self.graph.contains(from, to) {
            return Ok(false);
        }

        let block = self
            .store
            .remove_dependency(&self.project, from, to)
            .await?;
        self.replace(block);
        self.graph.remove_edge(from, to);
        self.resync().await;

        info!(from = %from, to = %to, "removed dependency");
        Ok(true)
    }

    // ========================================================================
    // Palette
    // ========================================================================

    /// Select an enabled color for new connections.
    pub fn select_color(&mut self, color: Color) -> Result<()> {
        self.palette.select(color)
    }

    /// Enable and select a master color. Returns `false` if already enabled.
    pub async fn add_color(&mut self, color: Color) -> Result<bool> {
        palette::add_color(self.store.as_ref(), &self.project, &mut self.palette, color).await
    }

    // ========================================================================
    // Arrangement
    // ========================================================================

    /// Run a bulk arrangement over `ids` and merge the result.
    ///
    /// The returned reasoning replaces the project's note; blank reasoning
    /// clears it.
    pub async fn arrange(&mut self, ids: &[BlockId]) -> Result<ReconcileReport> {
        for id in ids {
            self.require(id)?;
        }
        if ids.is_empty() {
            return Ok(ReconcileReport::default());
        }

        let response = self
            .store
            .run_bulk_arrangement(&self.project, ids)
            .await?;
        let result = ArrangementResult::from(response);
        let report = reconcile(&mut self.blocks, ids, &result);

        let note = result.note().map(str::to_string);
        self.store
            .set_arrangement_reasoning(&self.project, note.clone())
            .await?;
        self.note = note;

        info!(
            project = %self.project,
            applied = report.applied.len(),
            ignored = report.ignored.len(),
            missing = report.missing.len(),
            "applied arrangement"
        );
        Ok(report)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn store(&self) -> &Arc<dyn PersistenceService> {
        &self.store
    }

    /// All blocks in the working copy, in no particular order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    /// Assigned tiers, each sorted by order key.
    pub fn tiers(&self) -> BTreeMap<Level, Vec<&Block>> {
        tiers::group_by_level(&self.blocks)
    }

    pub fn tier(&self, level: Level) -> Vec<&Block> {
        tiers::tier(&self.blocks, level)
    }

    pub fn pool(&self) -> Vec<&Block> {
        tiers::pool(&self.blocks)
    }

    /// Highest tier to draw.
    pub fn max_display_level(&self) -> i32 {
        tiers::max_display_level(&self.blocks, self.min_display_level)
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Reasoning from the last arrangement, if any.
    pub fn arrangement_note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require(&self, id: &BlockId) -> Result<&Block> {
        self.block(id)
            .ok_or_else(|| EngineError::BlockNotFound(id.clone()))
    }

    fn replace(&mut self, block: Block) {
        match self.blocks.iter_mut().find(|b| b.id == block.id) {
            Some(slot) => *slot = block,
            None => self.blocks.push(block),
        }
    }

    /// Issue a write batch and patch in whatever succeeded.
    async fn issue(&mut self, writes: Vec<BlockWrite>) -> Result<()> {
        let outcome = batch::execute(self.store.as_ref(), &self.project, writes).await;
        for block in &outcome.applied {
            self.replace(block.clone());
        }
        outcome.into_result().map(|_| ())
    }

    /// Best-effort re-list after an edge change. The working copy is
    /// already patched, so a failed read only leaves it slightly stale.
    async fn resync(&mut self) {
        if let Err(e) = self.refresh().await {
            warn!(project = %self.project, error = %e, "re-fetch after edge change failed");
        }
    }
}
