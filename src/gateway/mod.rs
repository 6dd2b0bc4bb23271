//! External gateways - durable persistence and fire-and-forget alerting
//!
//! Both collaborators sit outside the transactional path: the in-memory
//! graph commits first and stays authoritative; gateway failures degrade
//! the sync indicator, never correctness.

pub mod json_store;
pub mod notify;

pub use json_store::JsonStore;
pub use notify::{
    scan_deadlines, ChannelNotifier, DeadlineAlert, LogNotifier, NotificationConfig,
    NotificationManager, NotifyEvent, NotifyKind,
};

use crate::core::graph::{Edge, Graph, Node};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse durable-write health indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    Synced,
    Syncing,
    Error,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::Synced
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synced => write!(f, "synced"),
            Self::Syncing => write!(f, "syncing"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Durable store behind the engine. Every write must be idempotent under
/// retry: the same node written twice is harmless.
pub trait PersistenceGateway {
    /// Read the whole graph at startup
    fn load_all(&self) -> Result<Graph>;

    fn upsert_node(&mut self, node: &Node) -> Result<()>;
    fn delete_node(&mut self, id: &str) -> Result<()>;
    fn upsert_edge(&mut self, edge: &Edge) -> Result<()>;
    fn delete_edge(&mut self, id: &str) -> Result<()>;
}

/// Alerting sink. May fail silently; callers never await or retry.
pub trait NotificationGateway {
    fn notify(&mut self, event: &NotifyEvent);
}
