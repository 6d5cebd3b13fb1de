//! Sessions over the file-backed store survive a process restart.

use std::sync::Arc;

use pyramid_engine::{FileStore, ProjectSession};
use pyramid_types::{Color, Level, ProjectId};
use tempfile::TempDir;

async fn open(dir: &TempDir) -> ProjectSession {
    let store = Arc::new(FileStore::new(dir.path()));
    ProjectSession::open(store, ProjectId::new("launch")).await.unwrap()
}

#[tokio::test]
async fn test_session_state_persists_across_reopen() {
    let dir = TempDir::new().unwrap();

    let (base, top) = {
        let mut session = open(&dir).await;
        let base = session.quick_create("Base").await.unwrap();
        let top = session.quick_create("Top").await.unwrap();
        session
            .move_block(&base.id, Level::FOUNDATION, None)
            .await
            .unwrap();
        session.add_color(Color::Emerald).await.unwrap();
        session.begin_connection(&top.id).unwrap();
        session.complete_connection(&base.id).await.unwrap();
        session
            .arrange(&[base.id.clone(), top.id.clone()])
            .await
            .unwrap();
        (base.id, top.id)
    };

    let session = open(&dir).await;
    assert_eq!(session.block(&base).unwrap().level, Level::FOUNDATION);
    assert_eq!(session.block(&top).unwrap().level, Level::tier(1));
    assert_eq!(session.graph().color_of(&top, &base), Some(Color::Emerald));
    assert_eq!(session.palette().colors(), &[Color::Indigo, Color::Emerald]);
    assert!(session.arrangement_note().is_some());
    assert!(dir.path().join("launch.json").exists());
}

#[tokio::test]
async fn test_reset_empties_document() {
    let dir = TempDir::new().unwrap();
    let mut session = open(&dir).await;
    for title in ["a", "b", "c"] {
        session.quick_create(title).await.unwrap();
    }
    session.reset().await.unwrap();

    let session = open(&dir).await;
    assert!(session.blocks().is_empty());
    assert!(session.pool().is_empty());
}
