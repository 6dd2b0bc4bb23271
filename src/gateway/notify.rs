//! Notification fan-out - handover, conflict, and deadline alerting
//!
//! Sends events when:
//! - A node completes and hands work to its successors
//! - A mutation parks a node in resource-conflict
//! - A deadline is approaching or already missed
//!
//! Dispatch is fire-and-forget; a failed or suppressed notification never
//! touches the mutation path.

use super::NotificationGateway;
use crate::core::graph::{Graph, NodeStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::mpsc;

/// Notification event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyKind {
    /// Upstream work completed and activated successors
    Handover,
    /// A mutation landed in the blocked resource-conflict state
    ResourceConflict,
    /// Deadline within the alert horizon
    DeadlineApproaching,
    /// Deadline already missed
    Overdue,
}

/// A single alerting event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyEvent {
    pub kind: NotifyKind,
    pub node_id: String,
    pub details: String,
}

impl NotifyEvent {
    pub fn new(kind: NotifyKind, node_id: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            kind,
            node_id: node_id.into(),
            details: details.into(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Enable notifications
    pub enabled: bool,
    /// Notify on handover events
    pub on_handover: bool,
    /// Notify on resource conflicts
    pub on_conflict: bool,
    /// Notify on deadline events
    pub on_deadline: bool,
    /// Minimum interval between duplicate notifications (seconds)
    pub dedup_interval_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            on_handover: true,
            on_conflict: true,
            on_deadline: true,
            dedup_interval_secs: 30,
        }
    }
}

impl NotificationConfig {
    /// Check if a notification should be sent for an event kind
    pub fn should_notify(&self, kind: NotifyKind) -> bool {
        if !self.enabled {
            return false;
        }
        match kind {
            NotifyKind::Handover => self.on_handover,
            NotifyKind::ResourceConflict => self.on_conflict,
            NotifyKind::DeadlineApproaching | NotifyKind::Overdue => self.on_deadline,
        }
    }
}

/// Gates, deduplicates, and dispatches events to a gateway
pub struct NotificationManager {
    config: NotificationConfig,
    gateway: Box<dyn NotificationGateway + Send>,
    /// Track recent notifications to avoid spam
    recent: Vec<(String, Instant)>,
}

impl NotificationManager {
    pub fn new(gateway: Box<dyn NotificationGateway + Send>) -> Self {
        Self {
            config: NotificationConfig::default(),
            gateway,
            recent: Vec::new(),
        }
    }

    pub fn with_config(
        gateway: Box<dyn NotificationGateway + Send>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            config,
            gateway,
            recent: Vec::new(),
        }
    }

    pub fn set_config(&mut self, config: NotificationConfig) {
        self.config = config;
    }

    /// Send an event through the gateway, subject to config and dedup
    pub fn send(&mut self, event: NotifyEvent) {
        if !self.config.should_notify(event.kind) {
            log::debug!("Notification suppressed: {:?}", event.kind);
            return;
        }

        let key = format!("{:?}:{}:{}", event.kind, event.node_id, event.details);
        let now = Instant::now();
        let window = std::time::Duration::from_secs(self.config.dedup_interval_secs);
        self.recent.retain(|(_, t)| now.duration_since(*t) < window);
        if self.recent.iter().any(|(k, _)| k == &key) {
            log::debug!("Notification deduplicated: {}", key);
            return;
        }
        self.recent.push((key, now));

        self.gateway.notify(&event);
    }

    /// Handover event for a node that just completed
    pub fn notify_handover(&mut self, node_id: &str, activated: &[String]) {
        self.send(NotifyEvent::new(
            NotifyKind::Handover,
            node_id,
            format!("activated {} successor(s)", activated.len()),
        ));
    }

    /// Conflict event for a node parked in resource-conflict
    pub fn notify_conflict(&mut self, node_id: &str, resource_id: &str) {
        self.send(NotifyEvent::new(
            NotifyKind::ResourceConflict,
            node_id,
            format!("blocked on {}", resource_id),
        ));
    }

    /// Deadline event from the overdue feed
    pub fn notify_deadline(&mut self, alert: &DeadlineAlert) {
        let kind = if alert.overdue {
            NotifyKind::Overdue
        } else {
            NotifyKind::DeadlineApproaching
        };
        self.send(NotifyEvent::new(
            kind,
            alert.node_id.clone(),
            format!("due {}", alert.deadline.to_rfc3339()),
        ));
    }
}

/// Default sink - writes events to the log
pub struct LogNotifier;

impl NotificationGateway for LogNotifier {
    fn notify(&mut self, event: &NotifyEvent) {
        log::info!(
            "[notify] {:?} node={} {}",
            event.kind,
            event.node_id,
            event.details
        );
    }
}

/// Channel sink for automation consumers. Dropped receivers lose events
/// silently - fire-and-forget by design.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<NotifyEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotifyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationGateway for ChannelNotifier {
    fn notify(&mut self, event: &NotifyEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// A deadline hit from scanning the graph against the overdue feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineAlert {
    pub node_id: String,
    pub label: String,
    pub deadline: DateTime<Utc>,
    pub overdue: bool,
}

/// Scan open nodes for deadlines past or within `horizon` of `now`,
/// soonest first. Done nodes never alert.
pub fn scan_deadlines(graph: &Graph, now: DateTime<Utc>, horizon: Duration) -> Vec<DeadlineAlert> {
    let mut alerts: Vec<DeadlineAlert> = graph
        .nodes
        .values()
        .filter(|n| n.status != NodeStatus::Done)
        .filter_map(|n| {
            let deadline = n.deadline?;
            if deadline <= now + horizon {
                Some(DeadlineAlert {
                    node_id: n.id.clone(),
                    label: n.label.clone(),
                    deadline,
                    overdue: deadline < now,
                })
            } else {
                None
            }
        })
        .collect();
    alerts.sort_by_key(|a| a.deadline);
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::{Node, NodeKind, Position};
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    struct RecordingGateway(Arc<Mutex<Vec<NotifyEvent>>>);

    impl NotificationGateway for RecordingGateway {
        fn notify(&mut self, event: &NotifyEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    fn recording_manager() -> (NotificationManager, Arc<Mutex<Vec<NotifyEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let manager = NotificationManager::new(Box::new(RecordingGateway(events.clone())));
        (manager, events)
    }

    #[test]
    fn test_config_gating() {
        let config = NotificationConfig {
            on_handover: false,
            ..Default::default()
        };
        assert!(!config.should_notify(NotifyKind::Handover));
        assert!(config.should_notify(NotifyKind::ResourceConflict));

        let disabled = NotificationConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!disabled.should_notify(NotifyKind::Overdue));
    }

    #[test]
    fn test_duplicate_events_are_suppressed() {
        let (mut manager, events) = recording_manager();
        manager.notify_conflict("node-1", "studio-a");
        manager.notify_conflict("node-1", "studio-a");
        manager.notify_conflict("node-2", "studio-a");
        assert_eq!(events.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_channel_notifier_delivers() {
        let (gateway, mut rx) = ChannelNotifier::new();
        let mut manager = NotificationManager::new(Box::new(gateway));
        manager.notify_handover("node-1", &["node-2".to_string()]);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, NotifyKind::Handover);
        assert_eq!(event.node_id, "node-1");
    }

    #[test]
    fn test_scan_deadlines_orders_and_flags() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut graph = Graph::new();

        let mut overdue = Node::new("late", NodeKind::SocialOutput, Position::default());
        overdue.deadline = Some(now - Duration::hours(2));
        let mut soon = Node::new("soon", NodeKind::SocialOutput, Position::default());
        soon.deadline = Some(now + Duration::hours(12));
        let mut far = Node::new("far", NodeKind::SocialOutput, Position::default());
        far.deadline = Some(now + Duration::days(30));
        let mut done = Node::new("done", NodeKind::SocialOutput, Position::default());
        done.deadline = Some(now - Duration::hours(1));
        done.status = NodeStatus::Done;

        for n in [overdue, soon, far, done] {
            graph.nodes.insert(n.id.clone(), n);
        }

        let alerts = scan_deadlines(&graph, now, Duration::hours(48));
        let ids: Vec<&str> = alerts.iter().map(|a| a.node_id.as_str()).collect();
        assert_eq!(ids, vec!["late", "soon"]);
        assert!(alerts[0].overdue);
        assert!(!alerts[1].overdue);
    }
}
