//! Resource scheduling - asset availability and squad staffing
//!
//! Every check scans the live node set; mutations are serialized, so the
//! scan is race-free by construction. Allocations on done nodes no longer
//! hold their resources.

use super::graph::{Graph, NodeKind};
use crate::roster::{Role, Roster};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashSet;

/// Fixed squad size for capture work
pub const CAPTURE_SQUAD_SIZE: usize = 3;
/// Fixed squad size for editing work
pub const EDITING_SQUAD_SIZE: usize = 2;

/// A role-typed staffing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquadRequest {
    pub role: Role,
    pub required: usize,
}

/// Outcome of a squad availability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquadDecision {
    pub available: bool,
    pub assigned_ids: Vec<String>,
}

/// Availability checks against the current graph and roster snapshot
pub struct ResourceScheduler<'a> {
    graph: &'a Graph,
    roster: &'a Roster,
}

impl<'a> ResourceScheduler<'a> {
    pub fn new(graph: &'a Graph, roster: &'a Roster) -> Self {
        Self { graph, roster }
    }

    /// Whether `[start, end)` is free on a resource and every coupled
    /// peripheral it consumes. `exclude_node` skips the node whose own
    /// allocation is being (re)validated.
    pub fn check_asset_availability(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_node: Option<&str>,
    ) -> bool {
        let wanted = self.roster.consumed_resources(resource_id);

        for node in self.graph.nodes.values() {
            if exclude_node == Some(node.id.as_str()) {
                continue;
            }
            if node.status.is_terminal() {
                continue;
            }
            let Some(alloc) = &node.allocation else {
                continue;
            };
            if !alloc.overlaps(start, end) {
                continue;
            }
            let held = self.roster.consumed_resources(&alloc.resource_id);
            if held.iter().any(|r| wanted.contains(r)) {
                log::debug!(
                    "Resource {} busy: window collides with node {} on {}",
                    resource_id,
                    node.id,
                    alloc.resource_id
                );
                return false;
            }
        }
        true
    }

    /// Whether `required` professionals of `role` are free over the window.
    /// On success, assigns the first `required` eligible professionals in
    /// stable roster order — deterministic, never a random subset.
    pub fn check_squad_availability(
        &self,
        role: Role,
        required: usize,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_node: Option<&str>,
    ) -> SquadDecision {
        let mut committed: HashSet<&str> = HashSet::new();
        for node in self.graph.nodes.values() {
            if exclude_node == Some(node.id.as_str()) {
                continue;
            }
            if node.status.is_terminal() {
                continue;
            }
            let Some(alloc) = &node.allocation else {
                continue;
            };
            if !alloc.overlaps(start, end) {
                continue;
            }
            for id in &alloc.assigned_professional_ids {
                committed.insert(id.as_str());
            }
        }

        let eligible: Vec<String> = self
            .roster
            .with_role(role)
            .filter(|p| !committed.contains(p.id.as_str()))
            .map(|p| p.id.clone())
            .collect();

        if eligible.len() >= required {
            SquadDecision {
                available: true,
                assigned_ids: eligible.into_iter().take(required).collect(),
            }
        } else {
            log::debug!(
                "Squad {} short-staffed: need {}, only {} free",
                role,
                required,
                eligible.len()
            );
            SquadDecision {
                available: false,
                assigned_ids: Vec::new(),
            }
        }
    }
}

/// Keyword matchers for role inference from node labels
struct RoleMatcher {
    capture_re: Regex,
    editing_re: Regex,
}

impl RoleMatcher {
    fn new() -> Self {
        Self {
            capture_re: Regex::new(r"(?i)\b(captur\w*|shoot\w*|film\w*|record\w*)").unwrap(),
            editing_re: Regex::new(r"(?i)\b(edit\w*|cut\b|montage)").unwrap(),
        }
    }
}

/// Squad a node's work calls for, from its label keywords first and its
/// kind as fallback. Returns `None` for work with no staffing policy.
pub fn infer_squad_request(kind: NodeKind, label: &str) -> Option<SquadRequest> {
    let matcher = RoleMatcher::new();

    if matcher.capture_re.is_match(label) {
        return Some(SquadRequest {
            role: Role::Capture,
            required: CAPTURE_SQUAD_SIZE,
        });
    }
    if matcher.editing_re.is_match(label) {
        return Some(SquadRequest {
            role: Role::Editing,
            required: EDITING_SQUAD_SIZE,
        });
    }

    match kind {
        NodeKind::ProductionOrder => Some(SquadRequest {
            role: Role::Capture,
            required: CAPTURE_SQUAD_SIZE,
        }),
        NodeKind::MediaEdition => Some(SquadRequest {
            role: Role::Editing,
            required: EDITING_SQUAD_SIZE,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::{Node, NodeStatus, Position, ResourceAllocation};
    use crate::roster::Professional;
    use chrono::TimeZone;

    fn t(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, min, 0).unwrap()
    }

    fn node_with_alloc(id: &str, resource: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Node {
        let mut node = Node::new(id, NodeKind::ProductionOrder, Position::default());
        node.status = NodeStatus::Doing;
        node.allocation = Some(ResourceAllocation::new(resource, start, end));
        node
    }

    fn roster_with_editors(count: usize) -> Roster {
        Roster::new(
            (1..=count)
                .map(|i| Professional {
                    id: format!("ed{}", i),
                    role: Role::Editing,
                    name: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_asset_overlap_conflicts() {
        let mut graph = Graph::new();
        graph.nodes.insert(
            "a".into(),
            node_with_alloc("a", "studio-a", t(10, 0), t(11, 0)),
        );
        let roster = Roster::default();
        let scheduler = ResourceScheduler::new(&graph, &roster);

        assert!(!scheduler.check_asset_availability("studio-a", t(10, 30), t(11, 30), None));
        // Touching windows are fine
        assert!(scheduler.check_asset_availability("studio-a", t(11, 0), t(12, 0), None));
        // Different resource is fine
        assert!(scheduler.check_asset_availability("studio-b", t(10, 30), t(11, 30), None));
    }

    #[test]
    fn test_done_nodes_release_resources() {
        let mut graph = Graph::new();
        let mut node = node_with_alloc("a", "studio-a", t(10, 0), t(11, 0));
        node.status = NodeStatus::Done;
        graph.nodes.insert("a".into(), node);
        let roster = Roster::default();
        let scheduler = ResourceScheduler::new(&graph, &roster);

        assert!(scheduler.check_asset_availability("studio-a", t(10, 0), t(11, 0), None));
    }

    #[test]
    fn test_coupled_peripheral_blocks_both_ways() {
        let mut graph = Graph::new();
        graph.nodes.insert(
            "a".into(),
            node_with_alloc("a", "capture-kit", t(10, 0), t(11, 0)),
        );
        let roster = Roster::default();
        let scheduler = ResourceScheduler::new(&graph, &roster);

        // The capture kit holds the shared audio peripheral too
        assert!(!scheduler.check_asset_availability(
            "external-audio-kit",
            t(10, 30),
            t(11, 30),
            None
        ));
        // And a held peripheral blocks a new capture-kit reservation
        let mut graph2 = Graph::new();
        graph2.nodes.insert(
            "b".into(),
            node_with_alloc("b", "external-audio-kit", t(10, 0), t(11, 0)),
        );
        let scheduler2 = ResourceScheduler::new(&graph2, &roster);
        assert!(!scheduler2.check_asset_availability("capture-kit", t(10, 30), t(11, 30), None));
    }

    #[test]
    fn test_exclude_node_skips_own_allocation() {
        let mut graph = Graph::new();
        graph.nodes.insert(
            "a".into(),
            node_with_alloc("a", "studio-a", t(10, 0), t(11, 0)),
        );
        let roster = Roster::default();
        let scheduler = ResourceScheduler::new(&graph, &roster);

        assert!(scheduler.check_asset_availability("studio-a", t(10, 0), t(11, 0), Some("a")));
    }

    #[test]
    fn test_squad_assignment_deterministic() {
        let graph = Graph::new();
        let roster = roster_with_editors(3);
        let scheduler = ResourceScheduler::new(&graph, &roster);

        for _ in 0..3 {
            let decision =
                scheduler.check_squad_availability(Role::Editing, 2, t(9, 0), t(12, 0), None);
            assert!(decision.available);
            assert_eq!(decision.assigned_ids, vec!["ed1", "ed2"]);
        }
    }

    #[test]
    fn test_squad_subtracts_committed_professionals() {
        let mut graph = Graph::new();
        let mut node = node_with_alloc("a", "suite-1", t(9, 0), t(12, 0));
        node.allocation.as_mut().unwrap().assigned_professional_ids =
            vec!["ed1".into(), "ed2".into()];
        graph.nodes.insert("a".into(), node);

        let roster = roster_with_editors(3);
        let scheduler = ResourceScheduler::new(&graph, &roster);

        let decision =
            scheduler.check_squad_availability(Role::Editing, 2, t(10, 0), t(11, 0), None);
        assert!(!decision.available);
        assert!(decision.assigned_ids.is_empty());

        // A non-overlapping window sees the full pool again
        let decision =
            scheduler.check_squad_availability(Role::Editing, 2, t(12, 0), t(14, 0), None);
        assert!(decision.available);
        assert_eq!(decision.assigned_ids, vec!["ed1", "ed2"]);
    }

    #[test]
    fn test_infer_squad_request() {
        let req = infer_squad_request(NodeKind::ProductionOrder, "").unwrap();
        assert_eq!(req.role, Role::Capture);
        assert_eq!(req.required, CAPTURE_SQUAD_SIZE);

        let req = infer_squad_request(NodeKind::MediaEdition, "").unwrap();
        assert_eq!(req.role, Role::Editing);
        assert_eq!(req.required, EDITING_SQUAD_SIZE);

        // Label keywords win over kind
        let req = infer_squad_request(NodeKind::CustomAction, "Edit the teaser cut").unwrap();
        assert_eq!(req.role, Role::Editing);
        let req = infer_squad_request(NodeKind::CustomAction, "Studio capture session").unwrap();
        assert_eq!(req.role, Role::Capture);

        assert!(infer_squad_request(NodeKind::Meeting, "Weekly sync").is_none());
    }
}
