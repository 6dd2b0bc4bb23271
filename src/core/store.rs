//! GraphStore - owns the canonical graph and dispatches every mutation
//!
//! Each accepted intent fully commits or is fully rejected. Effective
//! structural mutations snapshot to history first and raise the pending
//! sync flag that persistence consumers observe.

use super::graph::{Edge, EdgeKind, Graph, Node, NodeKind, NodeStatus, Position};
use super::history::HistoryManager;
use super::propagator::{cascade_done, CascadeOutcome};
use super::validation::{Capabilities, NodePatch, RoiFn, ValidationError, ValidationPipeline};
use crate::roster::Roster;

/// Typed failures of structural mutations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Mutation referenced an unknown node or edge
    #[error("not found: {0}")]
    NotFound(String),

    /// Edge creation referenced a missing endpoint
    #[error("dangling endpoint: {0}")]
    DanglingEndpoint(String),

    /// A governance rule blocked the mutation; nothing was applied
    #[error("validation rejected: {0}")]
    ValidationRejected(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// What `advance_status` committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceOutcome {
    /// The status validation actually landed on (a conflicted request
    /// lands on `resource-conflict`, not the requested status)
    pub applied: NodeStatus,
    /// Non-empty only when the node reached done
    pub cascade: CascadeOutcome,
}

fn default_roi(investment: f64) -> f64 {
    investment * 1.25
}

/// The canonical store. Mutations are serialized: each runs to completion
/// on the owning thread before the next is accepted.
pub struct GraphStore {
    graph: Graph,
    history: HistoryManager,
    roster: Roster,
    pipeline: ValidationPipeline,
    node_seq: u64,
    edge_seq: u64,
    pending_sync: bool,
}

impl GraphStore {
    pub fn new(roster: Roster) -> Self {
        Self::with_roi(roster, default_roi)
    }

    /// Inject the external ROI derivative function
    pub fn with_roi(roster: Roster, roi: RoiFn) -> Self {
        Self {
            graph: Graph::new(),
            history: HistoryManager::new(),
            roster,
            pipeline: ValidationPipeline::standard(roi),
            node_seq: 0,
            edge_seq: 0,
            pending_sync: false,
        }
    }

    /// Adopt a graph loaded from the durable store. Id sequences resume
    /// past the highest loaded id; edge emphasis is recomputed since it
    /// is derived state.
    pub fn from_loaded(mut graph: Graph, roster: Roster) -> Self {
        graph.recompute_emphasis();
        let node_seq = max_seq(graph.nodes.keys(), "node-");
        let edge_seq = max_seq(graph.edges.keys(), "edge-");
        Self {
            graph,
            history: HistoryManager::new(),
            roster,
            pipeline: ValidationPipeline::standard(default_roi),
            node_seq,
            edge_seq,
            pending_sync: false,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.graph.node(id)
    }

    /// Coarse dirty flag for persistence consumers
    pub fn pending_sync(&self) -> bool {
        self.pending_sync
    }

    pub fn clear_pending_sync(&mut self) {
        self.pending_sync = false;
    }

    fn next_node_id(&mut self) -> String {
        loop {
            self.node_seq += 1;
            let id = format!("node-{}", self.node_seq);
            if !self.graph.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    fn next_edge_id(&mut self) -> String {
        loop {
            self.edge_seq += 1;
            let id = format!("edge-{}", self.edge_seq);
            if !self.graph.edges.contains_key(&id) {
                return id;
            }
        }
    }

    /// Add a node. Always succeeds; the initial patch seeds optional
    /// fields (status defaults to todo unless overridden).
    pub fn add_node(&mut self, kind: NodeKind, position: Position, initial: NodePatch) -> String {
        let id = self.next_node_id();
        self.history.snapshot(&self.graph);

        let mut node = Node::new(id.clone(), kind, position);
        apply_patch(&mut node, initial);
        log::debug!("Added node {} ({})", id, kind);
        self.graph.nodes.insert(id.clone(), node);
        self.pending_sync = true;
        id
    }

    /// Update a node through the validation pipeline with default
    /// (unprivileged) capabilities.
    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<()> {
        self.update_node_with(id, patch, Capabilities::default())
    }

    /// Update a node through the validation pipeline. Validation may
    /// rewrite the patch; a rejection aborts with prior state untouched.
    pub fn update_node_with(
        &mut self,
        id: &str,
        patch: NodePatch,
        caps: Capabilities,
    ) -> Result<()> {
        let node = self
            .graph
            .node(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?
            .clone();

        let mut patch = patch;
        self.pipeline
            .run(&node, &mut patch, &self.graph, &self.roster, caps)?;

        self.history.snapshot(&self.graph);
        let status_changed = patch.status.is_some();
        if let Some(node) = self.graph.node_mut(id) {
            apply_patch(node, patch);
        }
        if status_changed {
            self.graph.recompute_emphasis();
        }
        self.pending_sync = true;
        Ok(())
    }

    /// Remove a node and every edge touching it. No-op when already absent.
    pub fn remove_node(&mut self, id: &str) {
        if !self.graph.nodes.contains_key(id) {
            return;
        }
        self.history.snapshot(&self.graph);
        for edge_id in self.graph.incident_edge_ids(id) {
            self.graph.edges.remove(&edge_id);
        }
        self.graph.nodes.remove(id);
        log::debug!("Removed node {} and its incident edges", id);
        self.pending_sync = true;
    }

    /// Add a directed edge. Both endpoints must already exist.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: EdgeKind) -> Result<String> {
        for endpoint in [source, target] {
            if !self.graph.nodes.contains_key(endpoint) {
                return Err(StoreError::DanglingEndpoint(endpoint.to_string()));
            }
        }
        let id = self.next_edge_id();
        self.history.snapshot(&self.graph);

        let emphasized = self
            .graph
            .node(source)
            .map(|n| n.status == NodeStatus::Done)
            .unwrap_or(false);
        self.graph.edges.insert(
            id.clone(),
            Edge {
                id: id.clone(),
                source: source.to_string(),
                target: target.to_string(),
                kind,
                emphasized,
            },
        );
        self.pending_sync = true;
        Ok(id)
    }

    /// Remove an edge. Idempotent.
    pub fn remove_edge(&mut self, id: &str) {
        if !self.graph.edges.contains_key(id) {
            return;
        }
        self.history.snapshot(&self.graph);
        self.graph.edges.remove(id);
        self.pending_sync = true;
    }

    /// The only entry point that triggers cascading propagation. Setting
    /// `status` directly via `update_node` never cascades.
    pub fn advance_status(&mut self, id: &str, status: NodeStatus) -> Result<AdvanceOutcome> {
        let node = self
            .graph
            .node(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?
            .clone();

        let mut patch = NodePatch::new().with_status(status);
        self.pipeline.run(
            &node,
            &mut patch,
            &self.graph,
            &self.roster,
            Capabilities::default(),
        )?;

        // One snapshot covers the update and its cascade: undo reverts
        // the whole intent
        self.history.snapshot(&self.graph);
        if let Some(node) = self.graph.node_mut(id) {
            apply_patch(node, patch);
        }

        let applied = self
            .graph
            .node(id)
            .map(|n| n.status)
            .unwrap_or(NodeStatus::Todo);
        let cascade = if applied == NodeStatus::Done {
            cascade_done(&mut self.graph, id)
        } else {
            CascadeOutcome {
                node_id: id.to_string(),
                ..Default::default()
            }
        };
        self.graph.recompute_emphasis();
        self.pending_sync = true;
        Ok(AdvanceOutcome { applied, cascade })
    }

    /// Generate follow-up action nodes from a processed meeting's
    /// `action_items` payload, each linked from the meeting.
    pub fn expand_meeting(&mut self, id: &str) -> Result<Vec<String>> {
        let meeting = self
            .graph
            .node(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?
            .clone();
        if meeting.kind != NodeKind::Meeting {
            log::warn!("Node {} is {}, not a meeting; nothing to expand", id, meeting.kind);
            return Ok(Vec::new());
        }

        let items: Vec<String> = meeting
            .payload
            .get("action_items")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        if items.is_empty() {
            return Ok(Vec::new());
        }

        self.history.snapshot(&self.graph);
        let mut created = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let node_id = self.next_node_id();
            let position = Position::new(
                meeting.position.x + 60.0,
                meeting.position.y + 80.0 * (i as f64 + 1.0),
            );
            let mut node = Node::new(node_id.clone(), NodeKind::CustomAction, position);
            node.label = item.clone();
            self.graph.nodes.insert(node_id.clone(), node);

            let edge_id = self.next_edge_id();
            self.graph.edges.insert(
                edge_id.clone(),
                Edge {
                    id: edge_id,
                    source: id.to_string(),
                    target: node_id.clone(),
                    kind: EdgeKind::Default,
                    emphasized: meeting.status == NodeStatus::Done,
                },
            );
            created.push(node_id);
        }
        log::info!("Expanded meeting {} into {} actions", id, created.len());
        self.pending_sync = true;
        Ok(created)
    }

    /// Clone a node with a fresh id and offset position. Status resets to
    /// todo and the allocation is dropped - the copy claims nothing.
    pub fn duplicate_node(&mut self, id: &str) -> Result<String> {
        let source = self
            .graph
            .node(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?
            .clone();

        let new_id = self.next_node_id();
        self.history.snapshot(&self.graph);

        let mut copy = source;
        copy.id = new_id.clone();
        copy.position = Position::new(copy.position.x + 40.0, copy.position.y + 40.0);
        copy.status = NodeStatus::Todo;
        copy.allocation = None;
        self.graph.nodes.insert(new_id.clone(), copy);
        self.pending_sync = true;
        Ok(new_id)
    }

    /// Restore the previous snapshot. Returns false when there is none.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(&self.graph) {
            Some(previous) => {
                self.graph = previous;
                self.pending_sync = true;
                true
            }
            None => false,
        }
    }

    /// Re-apply the state undone last. Returns false when there is none.
    pub fn redo(&mut self) -> bool {
        match self.history.redo(&self.graph) {
            Some(next) => {
                self.graph = next;
                self.pending_sync = true;
                true
            }
            None => false,
        }
    }
}

/// Merge a (validated) patch into a node
fn apply_patch(node: &mut Node, patch: NodePatch) {
    if let Some(status) = patch.status {
        node.status = status;
    }
    if let Some(position) = patch.position {
        node.position = position;
    }
    if let Some(label) = patch.label {
        node.label = label;
    }
    if let Some(description) = patch.description {
        node.description = Some(description);
    }
    if let Some(allocation) = patch.allocation {
        node.allocation = Some(allocation);
    }
    if let Some(deadline) = patch.deadline {
        node.deadline = Some(deadline);
    }
    if let Some(investment) = patch.investment {
        node.investment = Some(investment);
    }
    if let Some(roi) = patch.projected_roi {
        node.projected_roi = Some(roi);
    }
    if let Some(budget) = patch.approved_budget {
        node.approved_budget = Some(budget);
    }
    for (key, value) in patch.payload {
        node.payload.insert(key, value);
    }
}

fn max_seq<'a>(ids: impl Iterator<Item = &'a String>, prefix: &str) -> u64 {
    ids.filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}
