//! Shared block, tier and edge types for the pyramid engine.
//!
//! This crate is the leaf of the workspace: typed IDs, blocks and their
//! tiers, connection colors, dependency edges and arrangement results. It has
//! **no internal dependencies**; the engine, the CLI and every persistence
//! implementation build on it.
//!
//! # Model Overview
//!
//! ```text
//! Project (ProjectId)
//!     └── Block (BlockId)           ← level: pool (-1) or tier 0..K, order key
//!           └── dependencies        ← outgoing DependencyEdge, optional Color
//!     └── palette                   ← ordered subset of the 10 master Colors
//!     └── arrangement note          ← reasoning from the last bulk arrangement
//! ```
//!
//! # Key Types
//!
//! |-------------------------|----------------------------------------------|
//! | Type                    | Purpose                                      |
//! |-------------------------|----------------------------------------------|
//! | [`Block`]               | A work item with its level and order key     |
//! | [`Level`]               | Pyramid tier, or the unassigned pool         |
//! | [`NewBlock`]            | Creation request                             |
//! | [`BlockPatch`]          | Partial update                               |
//! | [`Color`]               | One of the ten canonical connection colors   |
//! | [`EdgeKey`]             | Ordered `(from, to)` pair                    |
//! | [`ArrangementResult`]   | Bulk placements plus reasoning               |
//! |-------------------------|----------------------------------------------|

pub mod arrangement;
pub mod block;
pub mod color;
pub mod edge;
pub mod ids;

// Re-export primary types at crate root for convenience.
pub use arrangement::{ArrangementResponse, ArrangementResult, Placement};
pub use block::{Block, BlockError, BlockPatch, Level, MIN_DISPLAY_LEVEL, NewBlock};
pub use color::Color;
pub use edge::{DependencyEdge, EdgeKey};
pub use ids::{BlockId, PrefixError, ProjectId, resolve_block_prefix};
