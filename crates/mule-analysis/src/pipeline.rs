//! End-to-end detection pipeline.
//!
//! 1. Build the [`AccountGraph`] once from the ledger.
//! 2. Run every [`Detector`] over the same read-only snapshot, either
//!    sequentially or on the rayon pool (`DetectionConfig::parallel`).
//!    Output order is detector order in both modes.
//! 3. Concatenate rings and score accounts.
//! 4. Project the graph for visualisation and count the summary.

use std::collections::HashMap;
use std::io::Read;

use eyre::{Context, Result};
use mule_data::ingest::read_transactions;
use mule_data::types::TransactionRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DetectionConfig;
use crate::cycle_detector::CycleDetector;
use crate::detector::{DetectionInput, Detector, FraudRing};
use crate::graph::AccountGraph;
use crate::scoring::{score_accounts, SuspiciousAccount};
use crate::shell_detector::ShellDetector;
use crate::smurfing_detector::SmurfingDetector;

/// One account in the visualisation graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub account_id: String,
    /// 0.0 for accounts in no ring.
    pub suspicion_score: f64,
    pub suspicious: bool,
    pub ring_id: Option<String>,
}

/// One collapsed sender→receiver edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// Graph projection handed to the delivery layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Run-level counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
}

/// Everything one detection run produces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionOutcome {
    pub graph: GraphView,
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: Summary,
}

/// The built-in detectors, in concatenation order.
pub fn default_detectors(config: &DetectionConfig) -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(CycleDetector::from_config(config)),
        Box::new(SmurfingDetector::from_config(config)),
        Box::new(ShellDetector::from_config(config)),
    ]
}

/// Run the built-in detectors over a validated ledger.
pub fn run_detection(transactions: &[TransactionRecord], config: &DetectionConfig) -> DetectionOutcome {
    run_with_detectors(transactions, &default_detectors(config), config.parallel)
}

/// Run an arbitrary detector set over a validated ledger.
#[tracing::instrument(skip_all, fields(txs = transactions.len(), detectors = detectors.len(), parallel = parallel))]
pub fn run_with_detectors(
    transactions: &[TransactionRecord],
    detectors: &[Box<dyn Detector>],
    parallel: bool,
) -> DetectionOutcome {
    let graph = AccountGraph::from_transactions(transactions);
    info!(
        accounts = graph.node_count(),
        edges = graph.edge_count(),
        "account graph built"
    );

    let input = DetectionInput {
        graph: &graph,
        transactions,
    };

    let per_detector: Vec<Vec<FraudRing>> = if parallel {
        detectors.par_iter().map(|d| d.detect(&input)).collect()
    } else {
        detectors.iter().map(|d| d.detect(&input)).collect()
    };

    for (detector, rings) in detectors.iter().zip(&per_detector) {
        info!(detector = detector.name(), rings = rings.len(), "detector finished");
    }

    let fraud_rings: Vec<FraudRing> = per_detector.into_iter().flatten().collect();
    let suspicious_accounts = score_accounts(&graph, &fraud_rings);
    let graph_view = build_graph_view(&graph, &suspicious_accounts, &fraud_rings);

    let summary = Summary {
        total_accounts_analyzed: graph.node_count(),
        suspicious_accounts_flagged: suspicious_accounts.len(),
        fraud_rings_detected: fraud_rings.len(),
    };
    info!(
        accounts = summary.total_accounts_analyzed,
        flagged = summary.suspicious_accounts_flagged,
        rings = summary.fraud_rings_detected,
        "detection run completed"
    );

    DetectionOutcome {
        graph: graph_view,
        suspicious_accounts,
        fraud_rings,
        summary,
    }
}

/// Ingest a CSV ledger and run detection on it.
///
/// # Errors
///
/// Returns an error if `config` fails [`DetectionConfig::validate`] or the
/// ledger is rejected by schema validation. Detection itself does not fail.
pub fn analyze_reader<R: Read>(reader: R, config: &DetectionConfig) -> Result<DetectionOutcome> {
    config.validate().wrap_err("invalid detection config")?;
    let transactions =
        read_transactions(reader).wrap_err("invalid CSV format or schema mismatch")?;
    Ok(run_detection(&transactions, config))
}

fn build_graph_view(
    graph: &AccountGraph,
    accounts: &[SuspiciousAccount],
    rings: &[FraudRing],
) -> GraphView {
    let scores: HashMap<&str, f64> = accounts
        .iter()
        .map(|a| (a.account_id.as_str(), a.suspicion_score))
        .collect();

    // Last ring listing an account wins, same as scoring.
    let mut ring_lookup: HashMap<&str, &str> = HashMap::new();
    for ring in rings {
        for account in &ring.member_accounts {
            ring_lookup.insert(account.as_str(), ring.ring_id.as_str());
        }
    }

    let nodes = graph
        .accounts()
        .map(|account| GraphNode {
            account_id: account.to_string(),
            suspicion_score: scores.get(account).copied().unwrap_or(0.0),
            suspicious: scores.contains_key(account),
            ring_id: ring_lookup.get(account).map(|id| id.to_string()),
        })
        .collect();

    let edges = graph
        .edges()
        .map(|(from, to, _)| GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
        })
        .collect();

    GraphView { nodes, edges }
}
