//! Block arrangement and dependency-graph engine.
//!
//! Turns user gestures on a pyramid of blocks into persistence writes and
//! keeps a per-project working copy in step with the service:
//!
//! - **order**: order-key allocation for one insertion
//! - **coordinator**: tier moves, planned as a complete write set
//! - **compactor**: closing the gap after a deletion
//! - **graph**: directed, colorable dependency edges
//! - **palette**: the project's enabled colors and selection
//! - **reconciler**: merging bulk arrangement results
//! - **session**: the working copy that drives all of the above
//!
//! Planning is pure and synchronous; only [`batch`], [`palette`] loading and
//! [`session`] talk to a [`PersistenceService`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pyramid_engine::{MemoryStore, ProjectSession};
//! use pyramid_types::{Level, ProjectId};
//!
//! # async fn demo() -> pyramid_engine::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let mut session = ProjectSession::open(store, ProjectId::new("roadmap")).await?;
//! let block = session.quick_create("Write the parser").await?;
//! session.move_block(&block.id, Level::FOUNDATION, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod arranger;
pub mod batch;
pub mod compactor;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod graph;
pub mod order;
pub mod palette;
pub mod reconciler;
pub mod session;
pub mod store;
pub mod tiers;

pub use arranger::{Arranger, LayeredArranger};
pub use batch::{BatchOutcome, BlockWrite};
pub use compactor::plan_deletion;
pub use config::{ConfigError, EngineConfig};
pub use coordinator::{MovePlan, plan_move};
pub use error::{EngineError, Result};
pub use graph::DependencyGraph;
pub use order::{Allocation, OrderShift, allocate};
pub use palette::ColorPalette;
pub use reconciler::{ReconcileReport, reconcile};
pub use session::ProjectSession;
pub use store::{FileStore, MemoryStore, PersistenceService, ProjectData, StoreError, StoreResult};
