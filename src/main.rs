//! ProdFlow CLI entry point

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use prodflow::gateway::{JsonStore, LogNotifier, NotificationManager};
use prodflow::{EdgeKind, NodeKind, NodePatch, NodeStatus, Position, Roster, WorkflowEngine};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "prodflow", version, about = "Workflow graph orchestration engine")]
struct Cli {
    /// Graph store path (defaults to ~/.prodflow/graph.json)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Roster YAML path
    #[arg(long)]
    roster: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List nodes and edges
    Show,
    /// Add a node
    AddNode {
        /// Node kind (campaign, production-order, media-edition, ...)
        kind: String,
        /// Node label
        #[arg(default_value = "")]
        label: String,
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        #[arg(long, default_value_t = 0.0)]
        y: f64,
    },
    /// Link two nodes with a directed edge
    Link {
        source: String,
        target: String,
        #[arg(long, default_value = "default")]
        kind: String,
    },
    /// Advance a node's status (cascades on done)
    SetStatus { id: String, status: String },
    /// Undo the last mutation
    Undo,
    /// Redo the last undone mutation
    Redo,
    /// List deadlines due within the horizon
    Deadlines {
        #[arg(long, default_value_t = 48)]
        horizon_hours: i64,
    },
}

fn parse_kind(s: &str) -> Result<NodeKind> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| anyhow::anyhow!("unknown node kind: {}", s))
}

fn parse_edge_kind(s: &str) -> Result<EdgeKind> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| anyhow::anyhow!("unknown edge kind: {}", s))
}

fn parse_status(s: &str) -> Result<NodeStatus> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| anyhow::anyhow!("unknown status: {}", s))
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let roster = match &cli.roster {
        Some(path) => Roster::from_file(path)?,
        None => Roster::default(),
    };
    let store = match &cli.store {
        Some(path) => JsonStore::new(path.clone()),
        None => JsonStore::at_default(),
    };
    log::debug!("Using store at {}", store.path().display());

    let notifications = NotificationManager::new(Box::new(LogNotifier));
    let mut engine = WorkflowEngine::new(roster, Box::new(store), notifications);

    match cli.command {
        Command::Show => {
            let graph = engine.graph();
            let mut nodes: Vec<_> = graph.nodes.values().collect();
            nodes.sort_by(|a, b| a.id.cmp(&b.id));
            for node in nodes {
                println!("{}  [{}]  {}  {}", node.id, node.kind, node.status, node.label);
            }
            let mut edges: Vec<_> = graph.edges.values().collect();
            edges.sort_by(|a, b| a.id.cmp(&b.id));
            for edge in edges {
                let marker = if edge.emphasized { "==>" } else { "-->" };
                println!("{}  {} {} {}", edge.id, edge.source, marker, edge.target);
            }
        }
        Command::AddNode { kind, label, x, y } => {
            let kind = parse_kind(&kind)?;
            let id = engine.add_node(
                kind,
                Position::new(x, y),
                NodePatch::new().with_label(label),
            );
            println!("{}", id);
        }
        Command::Link {
            source,
            target,
            kind,
        } => {
            let id = engine.add_edge(&source, &target, parse_edge_kind(&kind)?)?;
            println!("{}", id);
        }
        Command::SetStatus { id, status } => {
            let outcome = engine.advance_status(&id, parse_status(&status)?)?;
            println!("{} -> {}", id, outcome.applied);
            for activated in &outcome.cascade.activated {
                println!("activated {}", activated);
            }
        }
        Command::Undo => {
            if !engine.undo() {
                println!("nothing to undo");
            }
        }
        Command::Redo => {
            if !engine.redo() {
                println!("nothing to redo");
            }
        }
        Command::Deadlines { horizon_hours } => {
            let alerts = engine.check_deadlines(Utc::now(), Duration::hours(horizon_hours));
            if alerts.is_empty() {
                println!("no deadlines within {}h", horizon_hours);
            }
            for alert in alerts {
                let flag = if alert.overdue { "OVERDUE" } else { "due" };
                println!("{}  {}  {} {}", alert.node_id, alert.label, flag, alert.deadline);
            }
        }
    }

    engine.flush();
    if engine.sync_status() != prodflow::SyncStatus::Synced {
        log::warn!("Durable store sync incomplete: {}", engine.sync_status());
    }

    Ok(())
}
