//! Account graph construction from ledger transactions.
//!
//! Builds a directed graph where nodes are account identifiers and each edge
//! is the money flow for one ordered `(sender, receiver)` pair. All detectors
//! run over this graph.
//!
//! ## Edge collapse
//!
//! Unlike a per-transaction multigraph, repeated transactions between the
//! same ordered pair collapse into a single edge whose `amount`,
//! `timestamp` and `transaction_id` come from the **last** record in input
//! order. Node degree therefore counts distinct counterparties per direction,
//! not raw transaction volume. This is what the shell detector's degree rule
//! is calibrated against. `tx_count` keeps the collapsed volume for reporting.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mule_data::types::TransactionRecord;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Edge weight: the last transaction observed for a sender→receiver pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowEdge {
    /// Amount of the last transaction for this pair.
    pub amount: f64,
    /// Timestamp of the last transaction for this pair.
    pub timestamp: DateTime<Utc>,
    /// Identifier of the last transaction for this pair.
    pub transaction_id: String,
    /// Number of transactions collapsed into this edge.
    pub tx_count: u32,
}

/// Directed account graph, built once per run and read-only afterwards.
///
/// Node indices follow first-appearance order in the ledger (sender before
/// receiver within a record), which is the iteration order every detector
/// relies on for deterministic output.
#[derive(Debug, Clone, Default)]
pub struct AccountGraph {
    graph: DiGraph<String, FlowEdge>,
    account_to_ix: HashMap<String, NodeIndex>,
}

impl AccountGraph {
    /// Build the graph from transactions in input order.
    ///
    /// Later records overwrite the attributes of earlier ones for the same
    /// ordered pair.
    pub fn from_transactions(transactions: &[TransactionRecord]) -> Self {
        let mut out = Self::default();

        for tx in transactions {
            let from_ix = out.ensure_node(&tx.sender_id);
            let to_ix = out.ensure_node(&tx.receiver_id);

            match out.graph.find_edge(from_ix, to_ix) {
                Some(edge_ix) => {
                    let edge = &mut out.graph[edge_ix];
                    edge.amount = tx.amount;
                    edge.timestamp = tx.timestamp;
                    edge.transaction_id.clone_from(&tx.transaction_id);
                    edge.tx_count += 1;
                }
                None => {
                    out.graph.add_edge(
                        from_ix,
                        to_ix,
                        FlowEdge {
                            amount: tx.amount,
                            timestamp: tx.timestamp,
                            transaction_id: tx.transaction_id.clone(),
                            tx_count: 1,
                        },
                    );
                }
            }
        }

        out
    }

    fn ensure_node(&mut self, account: &str) -> NodeIndex {
        if let Some(&ix) = self.account_to_ix.get(account) {
            return ix;
        }
        let ix = self.graph.add_node(account.to_string());
        self.account_to_ix.insert(account.to_string(), ix);
        ix
    }

    /// The underlying petgraph graph.
    pub fn inner(&self) -> &DiGraph<String, FlowEdge> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node indices in first-appearance order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Look up an account's node index.
    pub fn index_of(&self, account: &str) -> Option<NodeIndex> {
        self.account_to_ix.get(account).copied()
    }

    /// Account identifier for a node, or `None` for an index outside the graph.
    pub fn account(&self, ix: NodeIndex) -> Option<&str> {
        self.graph.node_weight(ix).map(String::as_str)
    }

    pub fn contains(&self, account: &str) -> bool {
        self.account_to_ix.contains_key(account)
    }

    /// Account identifiers in first-appearance order.
    pub fn accounts(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_weights().map(String::as_str)
    }

    /// Total degree: distinct incoming plus distinct outgoing edges.
    ///
    /// A self-loop counts once in each direction.
    pub fn degree(&self, ix: NodeIndex) -> usize {
        self.graph.edges_directed(ix, Direction::Incoming).count()
            + self.graph.edges_directed(ix, Direction::Outgoing).count()
    }

    /// Direct successors in edge-insertion order.
    ///
    /// petgraph walks adjacency lists newest-first; reversing restores the
    /// order in which the ledger introduced each edge.
    pub fn successors(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(ix, Direction::Outgoing)
            .collect();
        out.reverse();
        out
    }

    /// Collapsed edge between two accounts, if any.
    pub fn edge(&self, from: &str, to: &str) -> Option<&FlowEdge> {
        let from_ix = self.index_of(from)?;
        let to_ix = self.index_of(to)?;
        let edge_ix = self.graph.find_edge(from_ix, to_ix)?;
        self.graph.edge_weight(edge_ix)
    }

    /// All edges as `(from, to, weight)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &FlowEdge)> + '_ {
        self.graph.edge_references().map(move |edge_ref| {
            (
                self.graph[edge_ref.source()].as_str(),
                self.graph[edge_ref.target()].as_str(),
                edge_ref.weight(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn mk(id: &str, from: &str, to: &str, amount: f64, hours: i64) -> TransactionRecord {
        TransactionRecord::new(id, from, to, amount, base() + Duration::hours(hours))
    }

    #[test]
    fn builds_nodes_in_first_appearance_order() {
        let txs = vec![mk("1", "A", "B", 1.0, 0), mk("2", "C", "A", 1.0, 1)];
        let graph = AccountGraph::from_transactions(&txs);

        let accounts: Vec<&str> = graph.accounts().collect();
        assert_eq!(accounts, vec!["A", "B", "C"]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn repeated_pair_collapses_last_write_wins() {
        let txs = vec![
            mk("1", "A", "B", 100.0, 0),
            mk("2", "A", "B", 250.0, 5),
            mk("3", "B", "A", 7.0, 6),
        ];
        let graph = AccountGraph::from_transactions(&txs);

        assert_eq!(graph.node_count(), 2);
        // A→B collapsed, B→A is a separate direction
        assert_eq!(graph.edge_count(), 2);

        let edge = graph.edge("A", "B").expect("A→B edge");
        assert_eq!(edge.amount, 250.0);
        assert_eq!(edge.transaction_id, "2");
        assert_eq!(edge.timestamp, base() + Duration::hours(5));
        assert_eq!(edge.tx_count, 2);
    }

    #[test]
    fn degree_counts_distinct_edges_not_transactions() {
        let txs = vec![
            mk("1", "A", "B", 1.0, 0),
            mk("2", "A", "B", 1.0, 1),
            mk("3", "A", "B", 1.0, 2),
            mk("4", "C", "B", 1.0, 3),
        ];
        let graph = AccountGraph::from_transactions(&txs);

        let b = graph.index_of("B").unwrap();
        assert_eq!(graph.degree(b), 2);
        let a = graph.index_of("A").unwrap();
        assert_eq!(graph.degree(a), 1);
    }

    #[test]
    fn self_loop_counts_in_both_directions() {
        let graph = AccountGraph::from_transactions(&[mk("1", "A", "A", 1.0, 0)]);
        let a = graph.index_of("A").unwrap();
        assert_eq!(graph.degree(a), 2);
    }

    #[test]
    fn successors_follow_insertion_order() {
        let txs = vec![
            mk("1", "A", "B", 1.0, 0),
            mk("2", "A", "C", 1.0, 1),
            mk("3", "A", "D", 1.0, 2),
        ];
        let graph = AccountGraph::from_transactions(&txs);
        let a = graph.index_of("A").unwrap();

        let names: Vec<&str> = graph
            .successors(a)
            .into_iter()
            .filter_map(|ix| graph.account(ix))
            .collect();
        assert_eq!(names, vec!["B", "C", "D"]);
    }

    #[test]
    fn empty_ledger_empty_graph() {
        let graph = AccountGraph::from_transactions(&[]);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.edges().next().is_none());
    }
}
