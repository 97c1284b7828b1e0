//! Per-account suspicion scoring.
//!
//! Each ring membership adds the ring pattern's weight to the account's
//! running score (`cycle` 40, `smurfing_fan_in`/`smurfing_fan_out` 30,
//! `layered_shell` 20, anything else 10). The final score is capped at 100
//! and rounded to 2 decimals.
//!
//! An account remembers only the id of the **last** ring (in ring order)
//! that listed it. This single-field model is intentional.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::detector::{round2, FraudRing, PatternType};
use crate::graph::AccountGraph;

/// Cap applied to the summed ring weights.
pub const MAX_SUSPICION_SCORE: f64 = 100.0;

/// An account that belongs to at least one ring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousAccount {
    pub account_id: String,
    /// Capped, weighted membership score in `[0, 100]`.
    pub suspicion_score: f64,
    /// Distinct patterns across all of the account's rings.
    pub detected_patterns: BTreeSet<PatternType>,
    /// Last ring processed that contains this account.
    pub ring_id: Option<String>,
}

#[derive(Default)]
struct Tally {
    score: f64,
    patterns: BTreeSet<PatternType>,
    ring_id: Option<String>,
}

/// Aggregate ring memberships into a ranked list of suspicious accounts.
///
/// Sorted by `suspicion_score` descending. The sort is stable, so equal
/// scores keep first-seen order (walking `rings`, then each ring's members).
/// Accounts in no ring are never listed. Members missing from `graph` are
/// skipped.
pub fn score_accounts(graph: &AccountGraph, rings: &[FraudRing]) -> Vec<SuspiciousAccount> {
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut tallies: Vec<(&str, Tally)> = Vec::new();

    for ring in rings {
        let weight = ring.pattern_type.weight();
        for account in &ring.member_accounts {
            if !graph.contains(account) {
                continue;
            }
            let idx = *slot.entry(account.as_str()).or_insert_with(|| {
                tallies.push((account.as_str(), Tally::default()));
                tallies.len() - 1
            });

            let tally = &mut tallies[idx].1;
            tally.score += weight;
            tally.patterns.insert(ring.pattern_type.clone());
            tally.ring_id = Some(ring.ring_id.clone());
        }
    }

    let mut accounts: Vec<SuspiciousAccount> = tallies
        .into_iter()
        .map(|(account_id, tally)| SuspiciousAccount {
            account_id: account_id.to_string(),
            suspicion_score: round2(tally.score.min(MAX_SUSPICION_SCORE)),
            detected_patterns: tally.patterns,
            ring_id: tally.ring_id,
        })
        .collect();

    accounts.sort_by(|a, b| {
        b.suspicion_score
            .partial_cmp(&a.suspicion_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    accounts
}
