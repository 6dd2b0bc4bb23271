//! Production graph model - nodes, edges, and the graph container

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Node status enum — replaces raw status strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeStatus {
    Todo,
    Doing,
    Done,
    Backlog,
    OrderExtra,
    ResourceConflict,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Todo => write!(f, "todo"),
            Self::Doing => write!(f, "doing"),
            Self::Done => write!(f, "done"),
            Self::Backlog => write!(f, "backlog"),
            Self::OrderExtra => write!(f, "order-extra"),
            Self::ResourceConflict => write!(f, "resource-conflict"),
        }
    }
}

impl NodeStatus {
    /// Terminal states release their resource allocations
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Kind of production work a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Campaign,
    ProductionOrder,
    MediaEdition,
    SocialOutput,
    Creative,
    CustomAction,
    Meeting,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Campaign => write!(f, "campaign"),
            Self::ProductionOrder => write!(f, "production-order"),
            Self::MediaEdition => write!(f, "media-edition"),
            Self::SocialOutput => write!(f, "social-output"),
            Self::Creative => write!(f, "creative"),
            Self::CustomAction => write!(f, "custom-action"),
            Self::Meeting => write!(f, "meeting"),
        }
    }
}

/// Canvas coordinate. Presentation-only; the engine never interprets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Time-bounded claim on a physical or team resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub resource_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub assigned_professional_ids: Vec<String>,
    #[serde(default)]
    pub conflict: bool,
}

impl ResourceAllocation {
    pub fn new(resource_id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            resource_id: resource_id.into(),
            start,
            end,
            assigned_professional_ids: Vec::new(),
            conflict: false,
        }
    }

    /// Half-open `[start, end)` window test — touching endpoints do not overlap
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        (start >= self.start && start < self.end) || (end > self.start && end <= self.end)
    }

    /// Whether concrete professionals have been assigned
    pub fn is_staffed(&self) -> bool {
        !self.assigned_professional_ids.is_empty()
    }
}

/// A unit of editorial/production work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default)]
    pub label: String,
    pub description: Option<String>,
    pub allocation: Option<ResourceAllocation>,
    /// Read-only here; owned by the deadline feed
    pub deadline: Option<DateTime<Utc>>,
    pub investment: Option<f64>,
    pub projected_roi: Option<f64>,
    pub approved_budget: Option<f64>,
    /// Opaque domain attributes (checklists, briefs, ...) — never interpreted
    /// by the engine except where a validation rule names a key
    #[serde(default)]
    pub payload: HashMap<String, serde_json::Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, position: Position) -> Self {
        Self {
            id: id.into(),
            kind,
            position,
            status: NodeStatus::default(),
            label: String::new(),
            description: None,
            allocation: None,
            deadline: None,
            investment: None,
            projected_roi: None,
            approved_budget: None,
            payload: HashMap::new(),
        }
    }
}

/// Kind tag on a directed dependency/flow relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    Default,
    Dependency,
    Blocking,
    Critical,
}

impl Default for EdgeKind {
    fn default() -> Self {
        Self::Default
    }
}

/// Directed dependency/flow relation `source -> target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub kind: EdgeKind,
    /// Derived from the source node's status — never persisted independently
    #[serde(default)]
    pub emphasized: bool,
}

/// The canonical in-memory directed production graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: HashMap<String, Node>,
    #[serde(default)]
    pub edges: HashMap<String, Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get node by ID
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get node by ID, mutable
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Get edge by ID
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Outgoing edges of a node, in stable ID order
    pub fn outgoing_edges(&self, node_id: &str) -> Vec<&Edge> {
        let mut out: Vec<&Edge> = self
            .edges
            .values()
            .filter(|e| e.source == node_id)
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// IDs of every edge touching a node as source or target
    pub fn incident_edge_ids(&self, node_id: &str) -> Vec<String> {
        self.edges
            .values()
            .filter(|e| e.source == node_id || e.target == node_id)
            .map(|e| e.id.clone())
            .collect()
    }

    /// Recompute the derived emphasis flag on every edge.
    /// Idempotent; an edge is emphasized iff its source node is done.
    pub fn recompute_emphasis(&mut self) {
        let done: Vec<String> = self
            .nodes
            .values()
            .filter(|n| n.status == NodeStatus::Done)
            .map(|n| n.id.clone())
            .collect();
        for edge in self.edges.values_mut() {
            edge.emphasized = done.iter().any(|id| *id == edge.source);
        }
    }
}
