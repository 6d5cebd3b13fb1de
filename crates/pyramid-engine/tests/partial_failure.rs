//! Failure handling: partial batches, degraded reads, validation before I/O.
//!
//! `FlakyStore` wraps a `MemoryStore` and fails selected calls on demand.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use pyramid_engine::{
    ColorPalette, EngineError, MemoryStore, PersistenceService, ProjectSession, StoreError,
    StoreResult,
};
use pyramid_types::{
    ArrangementResponse, Block, BlockId, BlockPatch, Color, Level, NewBlock, ProjectId,
};

// ============================================================================
// FlakyStore
// ============================================================================

#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    /// Updates to these blocks fail.
    fail_updates: Mutex<HashSet<BlockId>>,
    /// Palette, color-map and note reads fail.
    fail_reads: AtomicBool,
    /// Palette writes fail.
    fail_palette_writes: AtomicBool,
    /// Count of every write call, successful or not.
    writes: AtomicUsize,
}

impl FlakyStore {
    fn fail_update(&self, id: &BlockId) {
        self.fail_updates.lock().insert(id.clone());
    }

    fn heal(&self) {
        self.fail_updates.lock().clear();
        self.fail_reads.store(false, Ordering::SeqCst);
        self.fail_palette_writes.store(false, Ordering::SeqCst);
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn read_guard(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("read timed out".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceService for FlakyStore {
    async fn list_blocks(&self, project: &ProjectId) -> StoreResult<Vec<Block>> {
        self.inner.list_blocks(project).await
    }

    async fn create_block(&self, project: &ProjectId, block: NewBlock) -> StoreResult<Block> {
        self.count_write();
        self.inner.create_block(project, block).await
    }

    async fn update_block(
        &self,
        project: &ProjectId,
        id: &BlockId,
        patch: BlockPatch,
    ) -> StoreResult<Block> {
        self.count_write();
        if self.fail_updates.lock().contains(id) {
            return Err(StoreError::Transport(format!("update of {id} dropped")));
        }
        self.inner.update_block(project, id, patch).await
    }

    async fn delete_block(&self, project: &ProjectId, id: &BlockId) -> StoreResult<()> {
        self.count_write();
        self.inner.delete_block(project, id).await
    }

    async fn add_dependency(
        &self,
        project: &ProjectId,
        from: &BlockId,
        to: &BlockId,
        color: Option<Color>,
    ) -> StoreResult<Block> {
        self.count_write();
        self.inner.add_dependency(project, from, to, color).await
    }

    async fn remove_dependency(
        &self,
        project: &ProjectId,
        from: &BlockId,
        to: &BlockId,
    ) -> StoreResult<Block> {
        self.count_write();
        self.inner.remove_dependency(project, from, to).await
    }

    async fn get_dependency_colors(
        &self,
        project: &ProjectId,
    ) -> StoreResult<HashMap<String, String>> {
        self.read_guard()?;
        self.inner.get_dependency_colors(project).await
    }

    async fn get_color_palette(&self, project: &ProjectId) -> StoreResult<Vec<String>> {
        self.read_guard()?;
        self.inner.get_color_palette(project).await
    }

    async fn set_color_palette(
        &self,
        project: &ProjectId,
        colors: Vec<String>,
    ) -> StoreResult<Vec<String>> {
        self.count_write();
        if self.fail_palette_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("palette is read-only".into()));
        }
        self.inner.set_color_palette(project, colors).await
    }

    async fn run_bulk_arrangement(
        &self,
        project: &ProjectId,
        ids: &[BlockId],
    ) -> StoreResult<ArrangementResponse> {
        self.count_write();
        self.inner.run_bulk_arrangement(project, ids).await
    }

    async fn get_arrangement_reasoning(&self, project: &ProjectId) -> StoreResult<Option<String>> {
        self.read_guard()?;
        self.inner.get_arrangement_reasoning(project).await
    }

    async fn set_arrangement_reasoning(
        &self,
        project: &ProjectId,
        reasoning: Option<String>,
    ) -> StoreResult<()> {
        self.count_write();
        self.inner.set_arrangement_reasoning(project, reasoning).await
    }
}

fn project() -> ProjectId {
    ProjectId::new("flaky")
}

async fn open(store: &Arc<FlakyStore>) -> ProjectSession {
    ProjectSession::open(store.clone(), project()).await.unwrap()
}

async fn seed(session: &mut ProjectSession, level: Level, titles: &[&str]) -> Vec<Block> {
    let mut blocks = Vec::new();
    for (order, title) in titles.iter().enumerate() {
        blocks.push(
            session
                .create_block(NewBlock::new(*title).at(level, order as i64))
                .await
                .unwrap(),
        );
    }
    blocks
}

// ============================================================================
// Partial batches
// ============================================================================

#[tokio::test]
async fn test_partial_move_reports_and_refresh_resyncs() {
    let store = Arc::new(FlakyStore::default());
    let mut session = open(&store).await;
    let blocks = seed(&mut session, Level::tier(0), &["A", "B", "C"]).await;

    // Moving C to the front shifts A and B; make B's shift fail.
    store.fail_update(&blocks[1].id);
    let err = session
        .move_block(&blocks[2].id, Level::tier(0), Some(0))
        .await
        .unwrap_err();

    match &err {
        EngineError::BatchFailed { failed, total, first } => {
            assert_eq!(*failed, 1);
            assert_eq!(*total, 3);
            assert!(matches!(**first, StoreError::Transport(_)));
        }
        other => panic!("expected BatchFailed, got {other:?}"),
    }
    assert!(err.needs_refresh());

    // The successful writes landed at the service and were not rolled back.
    let stored = store.inner.snapshot(&project());
    let stored_order = |id: &BlockId| stored.blocks.iter().find(|b| &b.id == id).unwrap().order;
    assert_ne!(stored_order(&blocks[2].id), 2);
    assert_eq!(stored_order(&blocks[1].id), 1);

    // The working copy carries the successful writes too.
    let local = session.block(&blocks[2].id).unwrap().order;
    assert_eq!(local, stored_order(&blocks[2].id));

    store.heal();
    session.refresh().await.unwrap();
    let served = store.inner.list_blocks(&project()).await.unwrap();
    for block in &served {
        assert_eq!(session.block(&block.id), Some(block));
    }
}

#[tokio::test]
async fn test_partial_compaction_after_delete() {
    let store = Arc::new(FlakyStore::default());
    let mut session = open(&store).await;
    let blocks = seed(&mut session, Level::tier(1), &["A", "B", "C", "D"]).await;

    store.fail_update(&blocks[3].id);
    let err = session.delete_block(&blocks[1].id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::BatchFailed {
            failed: 1,
            total: 2,
            ..
        }
    ));

    // The delete itself and C's compaction stuck; D kept its key.
    assert!(session.block(&blocks[1].id).is_none());
    assert_eq!(session.block(&blocks[2].id).unwrap().order, 1);
    assert_eq!(session.block(&blocks[3].id).unwrap().order, 3);
}

// ============================================================================
// Validation before I/O
// ============================================================================

#[tokio::test]
async fn test_validation_errors_issue_no_writes() {
    let store = Arc::new(FlakyStore::default());
    let mut session = open(&store).await;
    let blocks = seed(&mut session, Level::tier(0), &["A", "B"]).await;
    let before = store.writes();

    let a = &blocks[0].id;
    let b = &blocks[1].id;
    assert!(session.add_dependency(a, a, None).await.is_err());
    assert!(session.add_dependency(a, b, Some(Color::Orange)).await.is_err());
    assert!(
        session
            .add_dependency(a, &BlockId::new("ghost"), None)
            .await
            .is_err()
    );
    assert!(session.move_block(a, Level::tier(0), Some(9)).await.is_err());
    assert!(session.create_block(NewBlock::new("")).await.is_err());
    assert!(session.delete_block(&BlockId::new("ghost")).await.is_err());

    assert_eq!(store.writes(), before);
}

#[tokio::test]
async fn test_noop_move_issues_no_writes() {
    let store = Arc::new(FlakyStore::default());
    let mut session = open(&store).await;
    let blocks = seed(&mut session, Level::tier(0), &["A", "B"]).await;
    let before = store.writes();

    let plan = session
        .move_block(&blocks[0].id, Level::tier(0), Some(0))
        .await
        .unwrap();
    assert!(plan.is_noop());
    assert_eq!(store.writes(), before);
}

// ============================================================================
// Degraded reads
// ============================================================================

#[tokio::test]
async fn test_open_degrades_when_reads_fail() {
    let store = Arc::new(FlakyStore::default());
    store
        .inner
        .set_color_palette(&project(), vec!["#ef4444".into()])
        .await
        .unwrap();
    store.fail_reads.store(true, Ordering::SeqCst);
    let before = store.writes();

    let session = open(&store).await;
    assert_eq!(session.palette(), &ColorPalette::seed());
    assert!(session.arrangement_note().is_none());
    assert!(session.graph().is_empty());
    // A failed palette read never overwrites what is stored.
    assert_eq!(store.writes(), before);
    assert_eq!(
        store.inner.get_color_palette(&project()).await.unwrap(),
        vec!["#ef4444".to_string()]
    );
}

#[tokio::test]
async fn test_seed_persist_failure_is_ignored() {
    let store = Arc::new(FlakyStore::default());
    store.fail_palette_writes.store(true, Ordering::SeqCst);

    let session = open(&store).await;
    assert_eq!(session.palette().selected(), Color::Indigo);
    assert!(
        store
            .inner
            .get_color_palette(&project())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_failed_add_color_leaves_palette_unchanged() {
    let store = Arc::new(FlakyStore::default());
    let mut session = open(&store).await;
    store.fail_palette_writes.store(true, Ordering::SeqCst);

    let err = session.add_color(Color::Blue).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Rejected(_))));
    assert_eq!(session.palette().colors(), &[Color::Indigo]);
    assert_eq!(session.palette().selected(), Color::Indigo);
}
