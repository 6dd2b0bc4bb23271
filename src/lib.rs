//! ProdFlow - workflow graph orchestration engine
//!
//! A directed graph of production nodes and edges with optimistic
//! in-memory commits, bounded undo/redo, scan-based resource scheduling,
//! and single-hop status propagation.

pub mod core;
pub mod engine;
pub mod gateway;
pub mod roster;

// Re-exports
pub use crate::core::{
    AdvanceOutcome, CascadeOutcome, Edge, EdgeKind, Graph, GraphStore, Node, NodeKind, NodePatch,
    NodeStatus, Position, ResourceAllocation, StoreError,
};
pub use engine::WorkflowEngine;
pub use gateway::{JsonStore, NotificationManager, SyncStatus};
pub use roster::{Professional, Role, Roster};

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
