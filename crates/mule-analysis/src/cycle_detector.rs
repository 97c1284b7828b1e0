//! Circular fund-routing detection.
//!
//! Enumerates elementary directed cycles (no repeated account) whose length
//! falls in `[cycle_min_len, cycle_max_len]` and emits one ring per cycle.
//!
//! ## Algorithm
//!
//! 1. Partition the graph into strongly connected components (Tarjan's SCC).
//!    Every cycle of length ≥ 2 lies inside a single SCC.
//! 2. For each start node `s` in node order, run a depth-first search that
//!    only steps onto nodes of the same SCC with an index greater than `s`.
//!    Each cycle is therefore reported exactly once, rooted at its
//!    lowest-index member, in a reproducible order.
//! 3. Paths never grow past `cycle_max_len`. Only cycles that would be
//!    filtered out anyway are pruned.
//!
//! ## Cost
//!
//! The number of elementary cycles is exponential in the worst case. The
//! length bound keeps each search at depth ≤ 5, but dense components still
//! produce `O(n · d^5)` work. Callers wrapping this behind a service are
//! responsible for capping input size or imposing a wall-clock limit.

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use tracing::{debug, info};

use crate::config::DetectionConfig;
use crate::detector::{DetectionInput, Detector, FraudRing, PatternType, RingCandidate, RingCounter};
use crate::graph::AccountGraph;

/// Detector for closed loops of 3–5 accounts.
#[derive(Clone, Debug)]
pub struct CycleDetector {
    min_len: usize,
    max_len: usize,
}

impl CycleDetector {
    pub fn new(min_len: usize, max_len: usize) -> Self {
        Self { min_len, max_len }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.cycle_min_len, config.cycle_max_len)
    }
}

impl Default for CycleDetector {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl Detector for CycleDetector {
    fn name(&self) -> &'static str {
        "cycle"
    }

    #[tracing::instrument(name = "cycle_detector", skip_all, fields(nodes = input.graph.node_count()))]
    fn detect(&self, input: &DetectionInput<'_>) -> Vec<FraudRing> {
        let graph = input.graph;
        let candidates: Vec<RingCandidate> = find_cycles(graph, self.min_len, self.max_len)
            .into_iter()
            .map(|cycle| {
                let members: Vec<String> = cycle
                    .iter()
                    .filter_map(|&ix| graph.account(ix))
                    .map(str::to_string)
                    .collect();
                let risk_score = 80.0 + 3.0 * members.len() as f64;
                RingCandidate {
                    member_accounts: members,
                    risk_score,
                }
            })
            .collect();

        let rings = RingCounter::new(PatternType::Cycle).assign(candidates);
        for ring in &rings {
            debug!(ring_id = %ring.ring_id, len = ring.member_accounts.len(), "cycle ring");
        }
        info!(rings = rings.len(), "cycle detection finished");
        rings
    }
}

/// Enumerate elementary cycles with `min_len ≤ len ≤ max_len`.
///
/// Each cycle is returned in traversal order starting from its lowest-index
/// node. Output order is fixed by node order and edge-insertion order.
pub fn find_cycles(graph: &AccountGraph, min_len: usize, max_len: usize) -> Vec<Vec<NodeIndex>> {
    let node_count = graph.node_count();
    if node_count == 0 || max_len == 0 || min_len > max_len {
        return Vec::new();
    }

    let sccs = tarjan_scc(graph.inner());
    let mut component = vec![0usize; node_count];
    let mut component_size = Vec::with_capacity(sccs.len());
    for (id, scc) in sccs.iter().enumerate() {
        component_size.push(scc.len());
        for ix in scc {
            component[ix.index()] = id;
        }
    }

    let mut cycles = Vec::new();

    for start in graph.node_indices() {
        let comp = component[start.index()];
        if component_size[comp] < min_len {
            continue;
        }

        let mut path = vec![start];
        let mut stack: Vec<(Vec<NodeIndex>, usize)> = vec![(graph.successors(start), 0)];

        while let Some(frame) = stack.last_mut() {
            let Some(&next) = frame.0.get(frame.1) else {
                stack.pop();
                path.pop();
                continue;
            };
            frame.1 += 1;

            if next == start {
                if path.len() >= min_len {
                    cycles.push(path.clone());
                }
                continue;
            }

            let eligible = next.index() > start.index() && component[next.index()] == comp;
            if eligible && path.len() < max_len && !path.contains(&next) {
                path.push(next);
                stack.push((graph.successors(next), 0));
            }
        }
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mule_data::types::TransactionRecord;

    fn graph_of(edges: &[(&str, &str)]) -> AccountGraph {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let txs: Vec<TransactionRecord> = edges
            .iter()
            .enumerate()
            .map(|(i, (from, to))| TransactionRecord::new(format!("T{i}"), *from, *to, 1.0, ts))
            .collect();
        AccountGraph::from_transactions(&txs)
    }

    fn detect(graph: &AccountGraph) -> Vec<FraudRing> {
        CycleDetector::default().detect(&DetectionInput {
            graph,
            transactions: &[],
        })
    }

    fn assert_closed_walk(graph: &AccountGraph, members: &[String]) {
        for pair in 0..members.len() {
            let from = &members[pair];
            let to = &members[(pair + 1) % members.len()];
            assert!(graph.edge(from, to).is_some(), "missing edge {from}->{to}");
        }
        let mut unique = members.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), members.len(), "repeated node in {members:?}");
    }

    #[test]
    fn triangle_is_one_ring_scored_89() {
        let graph = graph_of(&[("A", "B"), ("B", "C"), ("C", "A")]);
        let rings = detect(&graph);

        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].ring_id, "RING_CYCLE_001");
        assert_eq!(rings[0].member_accounts, vec!["A", "B", "C"]);
        assert_eq!(rings[0].pattern_type, PatternType::Cycle);
        assert_eq!(rings[0].risk_score, 89.0);
    }

    #[test]
    fn two_cycles_and_self_loops_are_ignored() {
        let graph = graph_of(&[("A", "B"), ("B", "A"), ("C", "C")]);
        assert!(detect(&graph).is_empty());
    }

    #[test]
    fn six_cycle_is_too_long() {
        let graph = graph_of(&[
            ("A", "B"),
            ("B", "C"),
            ("C", "D"),
            ("D", "E"),
            ("E", "F"),
            ("F", "A"),
        ]);
        assert!(detect(&graph).is_empty());
    }

    #[test]
    fn five_cycle_scores_95() {
        let graph = graph_of(&[("A", "B"), ("B", "C"), ("C", "D"), ("D", "E"), ("E", "A")]);
        let rings = detect(&graph);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].risk_score, 95.0);
    }

    #[test]
    fn overlapping_cycles_each_reported_once() {
        // A→B→C→A and A→B→D→A share A→B; C→D closes A→B→C→D→A
        let graph = graph_of(&[
            ("A", "B"),
            ("B", "C"),
            ("C", "A"),
            ("B", "D"),
            ("D", "A"),
            ("C", "D"),
        ]);
        let rings = detect(&graph);

        let lens: Vec<usize> = rings.iter().map(|r| r.member_accounts.len()).collect();
        assert_eq!(lens, vec![3, 4, 3]);
        for (i, ring) in rings.iter().enumerate() {
            assert_eq!(ring.ring_id, format!("RING_CYCLE_{:03}", i + 1));
            assert_closed_walk(&graph, &ring.member_accounts);
            assert!((3..=5).contains(&ring.member_accounts.len()));
        }
    }

    #[test]
    fn acyclic_graph_has_no_rings() {
        let graph = graph_of(&[("A", "B"), ("B", "C"), ("A", "C")]);
        assert!(detect(&graph).is_empty());
        assert!(find_cycles(&AccountGraph::default(), 3, 5).is_empty());
    }

    #[test]
    fn enumeration_is_reproducible() {
        let edges = [
            ("A", "B"),
            ("B", "C"),
            ("C", "A"),
            ("C", "D"),
            ("D", "B"),
            ("D", "A"),
        ];
        let first = detect(&graph_of(&edges));
        let second = detect(&graph_of(&edges));
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
