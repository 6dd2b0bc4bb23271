//! Mutation validation - ordered, named rules run before a node update commits
//!
//! Each rule is a pure function over `(current node, proposed patch)` that
//! may rewrite the patch or reject the whole update. Rejection aborts the
//! mutation; nothing is partially applied.

use super::graph::{Graph, Node, NodeKind, NodeStatus, Position, ResourceAllocation};
use super::scheduler::{infer_squad_request, ResourceScheduler};
use crate::roster::Roster;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Partial node update. `None` fields are left untouched; `payload`
/// entries are merged key by key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodePatch {
    pub status: Option<NodeStatus>,
    pub position: Option<Position>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub allocation: Option<ResourceAllocation>,
    pub deadline: Option<DateTime<Utc>>,
    pub investment: Option<f64>,
    /// Derived; written by the pipeline, not by callers
    pub projected_roi: Option<f64>,
    pub approved_budget: Option<f64>,
    #[serde(default)]
    pub payload: HashMap<String, serde_json::Value>,
}

impl NodePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_allocation(mut self, allocation: ResourceAllocation) -> Self {
        self.allocation = Some(allocation);
        self
    }

    pub fn with_investment(mut self, investment: f64) -> Self {
        self.investment = Some(investment);
        self
    }

    pub fn with_approved_budget(mut self, budget: f64) -> Self {
        self.approved_budget = Some(budget);
        self
    }
}

/// Authorization held by the caller of an update
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    /// May edit protected financial fields
    pub finance: bool,
}

impl Capabilities {
    pub fn finance() -> Self {
        Self { finance: true }
    }
}

/// A governance rule blocked the mutation
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field `{field}` is protected; caller lacks the `{capability}` capability")]
    ProtectedField {
        field: &'static str,
        capability: &'static str,
    },
}

/// External pure function computing the ROI derivative of an investment
pub type RoiFn = fn(f64) -> f64;

/// Read-only context a rule runs against
pub struct ValidationCtx<'a> {
    pub graph: &'a Graph,
    pub roster: &'a Roster,
    pub caps: Capabilities,
    pub roi: RoiFn,
}

type RuleFn = fn(&Node, &mut NodePatch, &ValidationCtx) -> Result<(), ValidationError>;

struct ValidationRule {
    name: &'static str,
    run: RuleFn,
}

/// Ordered validation pipeline applied to every node update
pub struct ValidationPipeline {
    rules: Vec<ValidationRule>,
    roi: RoiFn,
}

impl ValidationPipeline {
    /// The standard rule set, in execution order
    pub fn standard(roi: RoiFn) -> Self {
        Self {
            rules: vec![
                ValidationRule {
                    name: "protect-financial-fields",
                    run: protect_financial_fields,
                },
                ValidationRule {
                    name: "recompute-roi",
                    run: recompute_roi,
                },
                ValidationRule {
                    name: "allocate-resources",
                    run: allocate_resources,
                },
            ],
            roi,
        }
    }

    /// Run every rule in order. Rules rewrite the patch in place; the
    /// first rejection aborts the run.
    pub fn run(
        &self,
        node: &Node,
        patch: &mut NodePatch,
        graph: &Graph,
        roster: &Roster,
        caps: Capabilities,
    ) -> Result<(), ValidationError> {
        let ctx = ValidationCtx {
            graph,
            roster,
            caps,
            roi: self.roi,
        };
        for rule in &self.rules {
            log::debug!("Validation rule {} on node {}", rule.name, node.id);
            (rule.run)(node, patch, &ctx)?;
        }
        Ok(())
    }
}

/// Protected financial fields require the finance capability
fn protect_financial_fields(
    _node: &Node,
    patch: &mut NodePatch,
    ctx: &ValidationCtx,
) -> Result<(), ValidationError> {
    if patch.approved_budget.is_some() && !ctx.caps.finance {
        return Err(ValidationError::ProtectedField {
            field: "approved_budget",
            capability: "finance",
        });
    }
    Ok(())
}

/// A campaign investment change injects the computed ROI derivative
fn recompute_roi(
    node: &Node,
    patch: &mut NodePatch,
    ctx: &ValidationCtx,
) -> Result<(), ValidationError> {
    if node.kind != NodeKind::Campaign {
        return Ok(());
    }
    if let Some(investment) = patch.investment {
        patch.projected_roi = Some((ctx.roi)(investment));
    }
    Ok(())
}

/// Asset-window and squad-staffing checks. A failed check never rejects
/// the mutation; it parks the node in `resource-conflict` instead.
fn allocate_resources(
    node: &Node,
    patch: &mut NodePatch,
    ctx: &ValidationCtx,
) -> Result<(), ValidationError> {
    let Some(mut alloc) = patch
        .allocation
        .clone()
        .or_else(|| node.allocation.clone())
    else {
        return Ok(());
    };

    let scheduler = ResourceScheduler::new(ctx.graph, ctx.roster);
    let mut conflicted = false;
    let mut checked = false;

    // A window entering the graph must be free on its resource and any
    // coupled peripheral. A parked allocation is re-checked only when the
    // mutation is retried (a new allocation or an explicit status change),
    // never as a side effect of unrelated edits.
    if patch.allocation.is_some() || (alloc.conflict && patch.status.is_some()) {
        checked = true;
        if !scheduler.check_asset_availability(
            &alloc.resource_id,
            alloc.start,
            alloc.end,
            Some(&node.id),
        ) {
            conflicted = true;
        }
    }

    // Setting a node to doing with an unstaffed allocation requests a squad
    if !conflicted && patch.status == Some(NodeStatus::Doing) && !alloc.is_staffed() {
        let label = patch.label.as_deref().unwrap_or(&node.label);
        if let Some(req) = infer_squad_request(node.kind, label) {
            checked = true;
            let decision = scheduler.check_squad_availability(
                req.role,
                req.required,
                alloc.start,
                alloc.end,
                Some(&node.id),
            );
            if decision.available {
                alloc.assigned_professional_ids = decision.assigned_ids;
            } else {
                conflicted = true;
            }
        }
    }

    if conflicted {
        alloc.conflict = true;
        patch.status = Some(NodeStatus::ResourceConflict);
        patch.allocation = Some(alloc);
        log::info!("Node {} parked in resource-conflict", node.id);
    } else if checked {
        alloc.conflict = false;
        patch.allocation = Some(alloc);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{Professional, Role};
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn flat_roi(investment: f64) -> f64 {
        investment * 1.5
    }

    fn pipeline() -> ValidationPipeline {
        ValidationPipeline::standard(flat_roi)
    }

    #[test]
    fn test_protected_field_rejected_without_capability() {
        let node = Node::new("n", NodeKind::Campaign, Position::default());
        let graph = Graph::new();
        let roster = Roster::default();
        let mut patch = NodePatch::new().with_approved_budget(5000.0);

        let err = pipeline()
            .run(&node, &mut patch, &graph, &roster, Capabilities::default())
            .unwrap_err();
        assert!(matches!(err, ValidationError::ProtectedField { .. }));

        // Same patch passes with the finance capability
        let mut patch = NodePatch::new().with_approved_budget(5000.0);
        pipeline()
            .run(&node, &mut patch, &graph, &roster, Capabilities::finance())
            .unwrap();
    }

    #[test]
    fn test_roi_injected_on_campaign_investment() {
        let node = Node::new("n", NodeKind::Campaign, Position::default());
        let graph = Graph::new();
        let roster = Roster::default();
        let mut patch = NodePatch::new().with_investment(1000.0);

        pipeline()
            .run(&node, &mut patch, &graph, &roster, Capabilities::default())
            .unwrap();
        assert_eq!(patch.projected_roi, Some(1500.0));
    }

    #[test]
    fn test_roi_not_injected_off_campaign() {
        let node = Node::new("n", NodeKind::Creative, Position::default());
        let graph = Graph::new();
        let roster = Roster::default();
        let mut patch = NodePatch::new().with_investment(1000.0);

        pipeline()
            .run(&node, &mut patch, &graph, &roster, Capabilities::default())
            .unwrap();
        assert_eq!(patch.projected_roi, None);
    }

    #[test]
    fn test_unstaffable_squad_parks_in_conflict() {
        let node = Node::new("n", NodeKind::MediaEdition, Position::default());
        let graph = Graph::new();
        // One editor on the roster; editing needs two
        let roster = Roster::new(vec![Professional {
            id: "ed1".into(),
            role: Role::Editing,
            name: None,
        }]);
        let mut patch = NodePatch::new()
            .with_status(NodeStatus::Doing)
            .with_allocation(ResourceAllocation::new("suite-1", t(9), t(12)));

        pipeline()
            .run(&node, &mut patch, &graph, &roster, Capabilities::default())
            .unwrap();

        assert_eq!(patch.status, Some(NodeStatus::ResourceConflict));
        assert!(patch.allocation.as_ref().unwrap().conflict);
    }

    #[test]
    fn test_staffing_success_assigns_squad() {
        let node = Node::new("n", NodeKind::MediaEdition, Position::default());
        let graph = Graph::new();
        let roster = Roster::new(
            (1..=3)
                .map(|i| Professional {
                    id: format!("ed{}", i),
                    role: Role::Editing,
                    name: None,
                })
                .collect(),
        );
        let mut patch = NodePatch::new()
            .with_status(NodeStatus::Doing)
            .with_allocation(ResourceAllocation::new("suite-1", t(9), t(12)));

        pipeline()
            .run(&node, &mut patch, &graph, &roster, Capabilities::default())
            .unwrap();

        assert_eq!(patch.status, Some(NodeStatus::Doing));
        let alloc = patch.allocation.unwrap();
        assert!(!alloc.conflict);
        assert_eq!(alloc.assigned_professional_ids, vec!["ed1", "ed2"]);
    }
}
