//! Workflow engine - wires the graph store to its gateways
//!
//! The in-memory commit is synchronous and authoritative. Durable writes
//! happen best-effort after each commit and are reported through the
//! coarse sync indicator; notifications ride the same path but can never
//! block or fail a mutation.

use crate::core::graph::{EdgeKind, Graph, Node, NodeKind, NodeStatus, Position};
use crate::core::store::{AdvanceOutcome, GraphStore, Result as StoreResult};
use crate::core::validation::{Capabilities, NodePatch};
use crate::gateway::{
    scan_deadlines, DeadlineAlert, NotificationManager, PersistenceGateway, SyncStatus,
};
use crate::roster::Roster;
use chrono::{DateTime, Duration, Utc};
use std::time::Instant;

/// How long rapid-fire writes (node dragging) coalesce at the I/O
/// boundary. The in-memory model is never coalesced.
const WRITE_DEBOUNCE: std::time::Duration = std::time::Duration::from_millis(400);

/// Facade owning the store and its external collaborators
pub struct WorkflowEngine {
    store: GraphStore,
    persistence: Box<dyn PersistenceGateway + Send>,
    notifications: NotificationManager,
    /// Last durably-written state; each sync diffs against it, so a
    /// failed write stays stale here and is retried on the next sync
    shadow: Graph,
    sync_status: SyncStatus,
    last_write: Instant,
}

impl WorkflowEngine {
    /// Load the graph from the durable store and stand the engine up.
    /// A failed load degrades the sync indicator and starts empty; it
    /// never blocks startup.
    pub fn new(
        roster: Roster,
        persistence: Box<dyn PersistenceGateway + Send>,
        notifications: NotificationManager,
    ) -> Self {
        let (graph, sync_status) = match persistence.load_all() {
            Ok(graph) => {
                log::info!(
                    "Loaded {} nodes, {} edges",
                    graph.nodes.len(),
                    graph.edges.len()
                );
                (graph, SyncStatus::Synced)
            }
            Err(e) => {
                log::error!("Durable load failed, starting empty: {}", e);
                (Graph::new(), SyncStatus::Error)
            }
        };

        let store = GraphStore::from_loaded(graph, roster);
        let shadow = store.graph().clone();
        Self {
            store,
            persistence,
            notifications,
            shadow,
            sync_status,
            last_write: Instant::now(),
        }
    }

    pub fn graph(&self) -> &Graph {
        self.store.graph()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.store.node(id)
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    pub fn add_node(&mut self, kind: NodeKind, position: Position, initial: NodePatch) -> String {
        let id = self.store.add_node(kind, position, initial);
        self.sync(false);
        id
    }

    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> StoreResult<()> {
        self.update_node_with(id, patch, Capabilities::default())
    }

    pub fn update_node_with(
        &mut self,
        id: &str,
        patch: NodePatch,
        caps: Capabilities,
    ) -> StoreResult<()> {
        let prior = self.store.node(id).map(|n| n.status);
        self.store.update_node_with(id, patch, caps)?;
        self.notify_if_parked(id, prior);
        self.sync(false);
        Ok(())
    }

    /// Position-only update used by canvas dragging; the durable write is
    /// debounced, every intermediate state is still real and undoable.
    pub fn move_node(&mut self, id: &str, position: Position) -> StoreResult<()> {
        self.store
            .update_node(id, NodePatch::new().with_position(position))?;
        self.sync(true);
        Ok(())
    }

    pub fn remove_node(&mut self, id: &str) {
        self.store.remove_node(id);
        self.sync(false);
    }

    pub fn add_edge(&mut self, source: &str, target: &str, kind: EdgeKind) -> StoreResult<String> {
        let id = self.store.add_edge(source, target, kind)?;
        self.sync(false);
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: &str) {
        self.store.remove_edge(id);
        self.sync(false);
    }

    /// The supported entry point for cascading propagation. Fires one
    /// handover event for the triggering node; downstream activations do
    /// not individually re-notify.
    pub fn advance_status(&mut self, id: &str, status: NodeStatus) -> StoreResult<AdvanceOutcome> {
        let prior = self.store.node(id).map(|n| n.status);
        let outcome = self.store.advance_status(id, status)?;

        if outcome.applied == NodeStatus::Done {
            self.notifications
                .notify_handover(id, &outcome.cascade.activated);
        }
        self.notify_if_parked(id, prior);
        self.sync(false);
        Ok(outcome)
    }

    pub fn expand_meeting(&mut self, id: &str) -> StoreResult<Vec<String>> {
        let created = self.store.expand_meeting(id)?;
        if !created.is_empty() {
            self.sync(false);
        }
        Ok(created)
    }

    pub fn duplicate_node(&mut self, id: &str) -> StoreResult<String> {
        let copy = self.store.duplicate_node(id)?;
        self.sync(false);
        Ok(copy)
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.store.undo();
        if changed {
            self.sync(false);
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.store.redo();
        if changed {
            self.sync(false);
        }
        changed
    }

    /// Scan the deadline feed and alert on anything due within `horizon`
    pub fn check_deadlines(
        &mut self,
        now: DateTime<Utc>,
        horizon: Duration,
    ) -> Vec<DeadlineAlert> {
        let alerts = scan_deadlines(self.store.graph(), now, horizon);
        for alert in &alerts {
            self.notifications.notify_deadline(alert);
        }
        alerts
    }

    /// Force any coalesced writes out to the durable store
    pub fn flush(&mut self) {
        self.sync(false);
    }

    fn notify_if_parked(&mut self, id: &str, prior: Option<NodeStatus>) {
        let Some(node) = self.store.node(id) else {
            return;
        };
        if node.status == NodeStatus::ResourceConflict
            && prior != Some(NodeStatus::ResourceConflict)
        {
            let resource = node
                .allocation
                .as_ref()
                .map(|a| a.resource_id.clone())
                .unwrap_or_else(|| "squad".to_string());
            self.notifications.notify_conflict(id, &resource);
        }
    }

    /// Best-effort durable sync: diff the live graph against the shadow
    /// of the last successful write, push the difference, and record the
    /// outcome. Failures leave the shadow stale so the same entities are
    /// retried on the next sync. Last writer wins; nothing is merged.
    fn sync(&mut self, debounced: bool) {
        if debounced && self.last_write.elapsed() < WRITE_DEBOUNCE {
            self.sync_status = SyncStatus::Syncing;
            return;
        }
        self.last_write = Instant::now();
        self.sync_status = SyncStatus::Syncing;

        let current = self.store.graph().clone();
        let mut ok = true;

        let stale_nodes: Vec<String> = self
            .shadow
            .nodes
            .keys()
            .filter(|id| !current.nodes.contains_key(*id))
            .cloned()
            .collect();
        for id in stale_nodes {
            match self.persistence.delete_node(&id) {
                Ok(()) => {
                    self.shadow.nodes.remove(&id);
                }
                Err(e) => {
                    ok = false;
                    log::warn!("Durable delete of node {} failed: {}", id, e);
                }
            }
        }

        let stale_edges: Vec<String> = self
            .shadow
            .edges
            .keys()
            .filter(|id| !current.edges.contains_key(*id))
            .cloned()
            .collect();
        for id in stale_edges {
            match self.persistence.delete_edge(&id) {
                Ok(()) => {
                    self.shadow.edges.remove(&id);
                }
                Err(e) => {
                    ok = false;
                    log::warn!("Durable delete of edge {} failed: {}", id, e);
                }
            }
        }

        for node in current.nodes.values() {
            if self.shadow.nodes.get(&node.id) != Some(node) {
                match self.persistence.upsert_node(node) {
                    Ok(()) => {
                        self.shadow.nodes.insert(node.id.clone(), node.clone());
                    }
                    Err(e) => {
                        ok = false;
                        log::warn!("Durable write of node {} failed: {}", node.id, e);
                    }
                }
            }
        }

        for edge in current.edges.values() {
            if self.shadow.edges.get(&edge.id) != Some(edge) {
                match self.persistence.upsert_edge(edge) {
                    Ok(()) => {
                        self.shadow.edges.insert(edge.id.clone(), edge.clone());
                    }
                    Err(e) => {
                        ok = false;
                        log::warn!("Durable write of edge {} failed: {}", edge.id, e);
                    }
                }
            }
        }

        self.sync_status = if ok {
            self.store.clear_pending_sync();
            SyncStatus::Synced
        } else {
            SyncStatus::Error
        };
    }
}
