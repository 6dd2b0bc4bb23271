//! JSON persistence - single-document durable store
//!
//! Keeps the whole graph in one pretty-printed JSON file, default
//! `~/.prodflow/graph.json`. Per-entity writes read-modify-write the
//! document, which makes every operation idempotent under retry.

use super::PersistenceGateway;
use crate::core::graph::{Edge, Graph, Node};
use anyhow::Result;
use std::path::PathBuf;

/// File-backed persistence gateway
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Get the default store path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".prodflow")
            .join("graph.json")
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_default() -> Self {
        Self::new(Self::default_path())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_document(&self) -> Result<Graph> {
        if !self.path.exists() {
            return Ok(Graph::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let graph: Graph = serde_json::from_str(&content)?;
        Ok(graph)
    }

    fn write_document(&self, graph: &Graph) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(graph)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PersistenceGateway for JsonStore {
    fn load_all(&self) -> Result<Graph> {
        self.read_document()
    }

    fn upsert_node(&mut self, node: &Node) -> Result<()> {
        let mut doc = self.read_document()?;
        doc.nodes.insert(node.id.clone(), node.clone());
        self.write_document(&doc)
    }

    fn delete_node(&mut self, id: &str) -> Result<()> {
        let mut doc = self.read_document()?;
        doc.nodes.remove(id);
        self.write_document(&doc)
    }

    fn upsert_edge(&mut self, edge: &Edge) -> Result<()> {
        let mut doc = self.read_document()?;
        doc.edges.insert(edge.id.clone(), edge.clone());
        self.write_document(&doc)
    }

    fn delete_edge(&mut self, id: &str) -> Result<()> {
        let mut doc = self.read_document()?;
        doc.edges.remove(id);
        self.write_document(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::{NodeKind, Position};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_empty_graph() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonStore::new(temp_dir.path().join("graph.json"));
        let graph = store.load_all().unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_upsert_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonStore::new(temp_dir.path().join("graph.json"));

        let node = Node::new("node-1", NodeKind::Campaign, Position::new(3.0, 4.0));
        store.upsert_node(&node).unwrap();
        // Writing the same node twice is harmless
        store.upsert_node(&node).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.nodes.len(), 1);
        assert_eq!(loaded.nodes["node-1"].kind, NodeKind::Campaign);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonStore::new(temp_dir.path().join("graph.json"));
        let node = Node::new("node-1", NodeKind::Creative, Position::default());
        store.upsert_node(&node).unwrap();

        store.delete_node("node-1").unwrap();
        store.delete_node("node-1").unwrap();
        assert!(store.load_all().unwrap().nodes.is_empty());
    }
}
