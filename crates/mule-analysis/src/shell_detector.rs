//! Layered shell-chain detection.
//!
//! A *shell node* is an account whose total degree (distinct in + out edges)
//! lies in `[shell_degree_min, shell_degree_max]`, i.e. a low-activity relay.
//! A shell ring is a directed simple path of at least `shell_min_path_len`
//! accounts whose interior holds at least `shell_min_shell_nodes` shell nodes.
//!
//! ## Search
//!
//! From each of the first `shell_max_sources` nodes (graph order) an explicit
//! stack DFS extends paths along outgoing edges. A frame is the path itself,
//! and the visited set is exactly the path's members, so cyclic subgraphs
//! cannot loop. Every path of qualifying length is checked. The search keeps
//! going past a qualifying path and stops extending at
//! `shell_min_path_len + shell_extra_depth` nodes.
//!
//! Paths are collected first and numbered afterwards, one id per distinct
//! path across the whole run.
//!
//! ## Failure policy
//!
//! Exploring one source either completes or fails with a [`DetectorFailure`].
//! On failure that source's paths are dropped and the search moves on to the
//! next source. Nothing is retried.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DetectionConfig;
use crate::detector::{DetectionInput, Detector, FraudRing, PatternType, RingCandidate, RingCounter};
use crate::graph::AccountGraph;

/// Unexpected condition while exploring one shell source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectorFailure {
    /// The source produced more paths than the configured budget.
    #[error("source `{account}` explored more than {limit} paths")]
    PathBudgetExceeded { account: String, limit: usize },

    /// A node index could not be resolved against the graph.
    #[error("node index {index} is not in the graph")]
    MissingNode { index: usize },
}

/// Detector for source→…→sink chains relayed through shell accounts.
#[derive(Clone, Debug)]
pub struct ShellDetector {
    min_path_len: usize,
    max_path_len: usize,
    degree_min: usize,
    degree_max: usize,
    min_shell_nodes: usize,
    max_sources: usize,
    max_paths_per_source: Option<usize>,
}

/// A qualifying path and its interior shell-node count.
type ShellPath = (Vec<NodeIndex>, usize);

impl ShellDetector {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            min_path_len: config.shell_min_path_len,
            max_path_len: config.shell_max_path_len(),
            degree_min: config.shell_degree_min,
            degree_max: config.shell_degree_max,
            min_shell_nodes: config.shell_min_shell_nodes,
            max_sources: config.shell_max_sources,
            max_paths_per_source: config.shell_max_paths_per_source,
        }
    }

    /// Run the DFS from one source and return every qualifying path.
    fn explore_source(
        &self,
        graph: &AccountGraph,
        degrees: &[usize],
        source: NodeIndex,
    ) -> Result<Vec<ShellPath>, DetectorFailure> {
        let is_shell = |ix: &NodeIndex| -> Result<bool, DetectorFailure> {
            let degree = degrees
                .get(ix.index())
                .ok_or(DetectorFailure::MissingNode { index: ix.index() })?;
            Ok((self.degree_min..=self.degree_max).contains(degree))
        };

        let mut found = Vec::new();
        let mut explored = 0usize;
        let mut stack: Vec<Vec<NodeIndex>> = vec![vec![source]];

        while let Some(path) = stack.pop() {
            explored += 1;
            if let Some(limit) = self.max_paths_per_source {
                if explored > limit {
                    let account = graph
                        .account(source)
                        .ok_or(DetectorFailure::MissingNode {
                            index: source.index(),
                        })?
                        .to_string();
                    return Err(DetectorFailure::PathBudgetExceeded { account, limit });
                }
            }

            if path.len() >= self.min_path_len {
                let mut shells = 0usize;
                for ix in &path[1..path.len() - 1] {
                    if is_shell(ix)? {
                        shells += 1;
                    }
                }
                if shells >= self.min_shell_nodes {
                    found.push((path.clone(), shells));
                }
            }

            if path.len() >= self.max_path_len {
                continue;
            }
            let Some(&last) = path.last() else {
                continue;
            };
            // Reverse push so the first successor is explored first.
            for next in graph.successors(last).into_iter().rev() {
                if !path.contains(&next) {
                    let mut extended = Vec::with_capacity(path.len() + 1);
                    extended.extend_from_slice(&path);
                    extended.push(next);
                    stack.push(extended);
                }
            }
        }

        Ok(found)
    }
}

impl Default for ShellDetector {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl Detector for ShellDetector {
    fn name(&self) -> &'static str {
        "layered_shell"
    }

    #[tracing::instrument(name = "shell_detector", skip_all, fields(nodes = input.graph.node_count()))]
    fn detect(&self, input: &DetectionInput<'_>) -> Vec<FraudRing> {
        let graph = input.graph;
        if self.min_path_len < 2 {
            return Vec::new();
        }

        let degrees: Vec<usize> = graph.node_indices().map(|ix| graph.degree(ix)).collect();
        let mut seen: HashSet<Vec<NodeIndex>> = HashSet::new();
        let mut candidates = Vec::new();
        let mut skipped = 0usize;

        for source in graph.node_indices().take(self.max_sources) {
            let paths = match self.explore_source(graph, &degrees, source) {
                Ok(paths) => paths,
                Err(failure) => {
                    skipped += 1;
                    warn!(%failure, "skipping shell source");
                    continue;
                }
            };

            for (path, shells) in paths {
                if !seen.insert(path.clone()) {
                    continue;
                }
                let members: Vec<String> = path
                    .iter()
                    .filter_map(|&ix| graph.account(ix))
                    .map(str::to_string)
                    .collect();
                candidates.push(RingCandidate {
                    member_accounts: members,
                    risk_score: 75.0 + 2.5 * shells as f64,
                });
            }
        }

        let rings = RingCounter::new(PatternType::LayeredShell).assign(candidates);
        for ring in &rings {
            debug!(ring_id = %ring.ring_id, len = ring.member_accounts.len(), "shell ring");
        }
        info!(rings = rings.len(), skipped_sources = skipped, "shell detection finished");
        rings
    }
}
