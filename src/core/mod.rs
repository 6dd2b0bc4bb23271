//! Core workflow engine - graph model, mutation dispatch, scheduling,
//! history, and status propagation

pub mod graph;
pub mod history;
pub mod propagator;
pub mod scheduler;
pub mod store;
pub mod validation;

pub use graph::{Edge, EdgeKind, Graph, Node, NodeKind, NodeStatus, Position, ResourceAllocation};
pub use history::HistoryManager;
pub use propagator::{cascade_done, CascadeOutcome};
pub use scheduler::{infer_squad_request, ResourceScheduler, SquadDecision, SquadRequest};
pub use store::{AdvanceOutcome, GraphStore, StoreError};
pub use validation::{Capabilities, NodePatch, ValidationError, ValidationPipeline};
