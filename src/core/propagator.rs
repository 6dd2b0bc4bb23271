//! Workflow propagation - single-hop activation when a node completes
//!
//! Work pulls forward one stage at a time: a node reaching done advances
//! its direct `todo` successors to `doing` and emphasizes its outgoing
//! edges. Never transitive; each hop needs its own done event.

use super::graph::{Graph, NodeStatus};

/// What a done-cascade actually touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    /// The node whose completion triggered the cascade
    pub node_id: String,
    /// Direct successors advanced from todo to doing
    pub activated: Vec<String>,
    /// Outgoing edges restyled as emphasized
    pub emphasized_edges: Vec<String>,
}

/// Cascade from a node that just reached done. Only direct successors in
/// exactly `todo` are advanced; `doing`, `done`, `backlog`, `order-extra`
/// and `resource-conflict` targets are left alone.
pub fn cascade_done(graph: &mut Graph, node_id: &str) -> CascadeOutcome {
    let outgoing: Vec<(String, String)> = graph
        .outgoing_edges(node_id)
        .iter()
        .map(|e| (e.id.clone(), e.target.clone()))
        .collect();

    let mut outcome = CascadeOutcome {
        node_id: node_id.to_string(),
        ..Default::default()
    };

    for (edge_id, target_id) in outgoing {
        if let Some(target) = graph.node_mut(&target_id) {
            if target.status == NodeStatus::Todo {
                target.status = NodeStatus::Doing;
                outcome.activated.push(target_id.clone());
            }
        }
        if let Some(edge) = graph.edges.get_mut(&edge_id) {
            edge.emphasized = true;
            outcome.emphasized_edges.push(edge_id);
        }
    }

    log::info!(
        "Handover from {}: activated {:?}",
        node_id,
        outcome.activated
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::{Edge, EdgeKind, Node, NodeKind, Position};

    fn chain(statuses: &[(&str, NodeStatus)], edges: &[(&str, &str, &str)]) -> Graph {
        let mut graph = Graph::new();
        for (id, status) in statuses {
            let mut node = Node::new(*id, NodeKind::ProductionOrder, Position::default());
            node.status = *status;
            graph.nodes.insert(id.to_string(), node);
        }
        for (eid, source, target) in edges {
            graph.edges.insert(
                eid.to_string(),
                Edge {
                    id: eid.to_string(),
                    source: source.to_string(),
                    target: target.to_string(),
                    kind: EdgeKind::Default,
                    emphasized: false,
                },
            );
        }
        graph
    }

    #[test]
    fn test_cascade_is_single_hop() {
        let mut graph = chain(
            &[
                ("a", NodeStatus::Done),
                ("b", NodeStatus::Todo),
                ("c", NodeStatus::Todo),
            ],
            &[("e1", "a", "b"), ("e2", "b", "c")],
        );

        let outcome = cascade_done(&mut graph, "a");

        assert_eq!(outcome.activated, vec!["b"]);
        assert_eq!(graph.node("b").unwrap().status, NodeStatus::Doing);
        // c is two hops away - untouched
        assert_eq!(graph.node("c").unwrap().status, NodeStatus::Todo);
        assert_eq!(outcome.emphasized_edges, vec!["e1"]);
        assert!(graph.edge("e1").unwrap().emphasized);
        assert!(!graph.edge("e2").unwrap().emphasized);
    }

    #[test]
    fn test_no_double_activation() {
        let mut graph = chain(
            &[("a", NodeStatus::Done), ("b", NodeStatus::Done)],
            &[("e1", "a", "b")],
        );

        let outcome = cascade_done(&mut graph, "a");

        assert!(outcome.activated.is_empty());
        assert_eq!(graph.node("b").unwrap().status, NodeStatus::Done);
        // Edge is still emphasized - derived styling, not activation
        assert!(graph.edge("e1").unwrap().emphasized);
    }

    #[test]
    fn test_blocked_and_inactive_targets_untouched() {
        let mut graph = chain(
            &[
                ("a", NodeStatus::Done),
                ("b", NodeStatus::ResourceConflict),
                ("c", NodeStatus::Backlog),
                ("d", NodeStatus::Doing),
            ],
            &[("e1", "a", "b"), ("e2", "a", "c"), ("e3", "a", "d")],
        );

        let outcome = cascade_done(&mut graph, "a");

        assert!(outcome.activated.is_empty());
        assert_eq!(
            graph.node("b").unwrap().status,
            NodeStatus::ResourceConflict
        );
        assert_eq!(graph.node("c").unwrap().status, NodeStatus::Backlog);
        assert_eq!(graph.node("d").unwrap().status, NodeStatus::Doing);
    }
}
