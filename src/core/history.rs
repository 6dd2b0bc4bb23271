//! Undo/redo history - bounded stacks of full graph snapshots

use super::graph::Graph;
use std::collections::VecDeque;

/// Maximum retained undo snapshots; the oldest is evicted past this
const MAX_SNAPSHOTS: usize = 20;

/// Bounded undo/redo stacks of deep-copied graph snapshots.
///
/// Snapshots are taken strictly before a mutation is applied, so redo
/// replays the exact post-mutation state without re-deriving it.
#[derive(Debug)]
pub struct HistoryManager {
    undo_stack: VecDeque<Graph>,
    redo_stack: Vec<Graph>,
    max_snapshots: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryManager {
    pub fn new() -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_snapshots: MAX_SNAPSHOTS,
        }
    }

    /// Push a pre-mutation snapshot. Linear history: any pending redo
    /// branch is discarded.
    pub fn snapshot(&mut self, graph: &Graph) {
        self.undo_stack.push_back(graph.clone());
        if self.undo_stack.len() > self.max_snapshots {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
    }

    /// Pop the most recent snapshot, parking `current` on the redo stack.
    /// Returns `None` (no-op) when there is nothing to undo.
    pub fn undo(&mut self, current: &Graph) -> Option<Graph> {
        let restored = self.undo_stack.pop_back()?;
        self.redo_stack.push(current.clone());
        Some(restored)
    }

    /// Symmetric to [`undo`](Self::undo): re-applies the state that was
    /// current immediately before the last undo.
    pub fn redo(&mut self, current: &Graph) -> Option<Graph> {
        let restored = self.redo_stack.pop()?;
        self.undo_stack.push_back(current.clone());
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
}
