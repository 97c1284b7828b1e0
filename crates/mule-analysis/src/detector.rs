//! Common detector abstraction and fraud-ring types.
//!
//! Every structural detector implements [`Detector`] so the pipeline can run
//! any number of them over the same read-only [`AccountGraph`] snapshot and
//! simply concatenate their output.
//!
//! Ring numbering is local to one detector invocation: a detector collects
//! [`RingCandidate`]s in discovery order and hands them to a fresh
//! [`RingCounter`] per pattern namespace. No counter outlives or crosses a
//! detector call.

use std::fmt;

use mule_data::types::TransactionRecord;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::graph::AccountGraph;

/// Structural pattern a ring was flagged for.
///
/// Variant order is the sort order of `detected_patterns` in reports
/// (alphabetical for the built-in patterns).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatternType {
    /// Closed fund-routing loop.
    Cycle,
    /// Pass-through chain of low-activity intermediaries.
    LayeredShell,
    /// Many senders into one receiver within a window.
    SmurfingFanIn,
    /// One sender out to many receivers within a window.
    SmurfingFanOut,
    /// Pattern emitted by a detector outside the built-in set.
    Custom(String),
}

impl PatternType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cycle => "cycle",
            Self::LayeredShell => "layered_shell",
            Self::SmurfingFanIn => "smurfing_fan_in",
            Self::SmurfingFanOut => "smurfing_fan_out",
            Self::Custom(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "cycle" => Self::Cycle,
            "layered_shell" => Self::LayeredShell,
            "smurfing_fan_in" => Self::SmurfingFanIn,
            "smurfing_fan_out" => Self::SmurfingFanOut,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Per-membership contribution to an account's suspicion score.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Cycle => 40.0,
            Self::SmurfingFanIn | Self::SmurfingFanOut => 30.0,
            Self::LayeredShell => 20.0,
            Self::Custom(_) => 10.0,
        }
    }

    /// Ring-id namespace, e.g. `RING_CYCLE_001`.
    pub fn ring_prefix(&self) -> String {
        match self {
            Self::Cycle => "CYCLE".to_string(),
            Self::LayeredShell => "SHELL".to_string(),
            Self::SmurfingFanIn => "SMURF_IN".to_string(),
            Self::SmurfingFanOut => "SMURF_OUT".to_string(),
            Self::Custom(name) => name.to_uppercase(),
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PatternType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PatternType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// A flagged group of accounts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FraudRing {
    /// Namespaced identifier, unique per pattern within one run.
    pub ring_id: String,
    /// Members in pattern-specific order (traversal order for cycles,
    /// source→sink for shells, counterparties around the focal account for
    /// smurfing).
    pub member_accounts: Vec<String>,
    pub pattern_type: PatternType,
    /// Pattern risk, rounded to 2 decimals.
    pub risk_score: f64,
}

/// A ring found during traversal, before it is numbered.
#[derive(Clone, Debug, PartialEq)]
pub struct RingCandidate {
    pub member_accounts: Vec<String>,
    pub risk_score: f64,
}

/// Sequential ring-id allocator for one pattern namespace.
#[derive(Debug)]
pub struct RingCounter {
    pattern: PatternType,
    prefix: String,
    next: usize,
}

impl RingCounter {
    pub fn new(pattern: PatternType) -> Self {
        let prefix = pattern.ring_prefix();
        Self {
            pattern,
            prefix,
            next: 1,
        }
    }

    /// Allocate the next id (`RING_<PREFIX>_<NNN>`).
    pub fn next_id(&mut self) -> String {
        let id = format!("RING_{}_{:03}", self.prefix, self.next);
        self.next += 1;
        id
    }

    /// Number candidates in discovery order.
    pub fn assign(&mut self, candidates: Vec<RingCandidate>) -> Vec<FraudRing> {
        candidates
            .into_iter()
            .map(|candidate| FraudRing {
                ring_id: self.next_id(),
                member_accounts: candidate.member_accounts,
                pattern_type: self.pattern.clone(),
                risk_score: round2(candidate.risk_score),
            })
            .collect()
    }
}

/// Read-only data shared by all detectors in one run.
#[derive(Clone, Copy, Debug)]
pub struct DetectionInput<'a> {
    pub graph: &'a AccountGraph,
    /// Ledger in input order. Detectors needing time order sort their own copy.
    pub transactions: &'a [TransactionRecord],
}

/// A structural fraud-ring detector.
///
/// Implementations must not fail on a well-formed graph and must be
/// deterministic for a fixed input order.
pub trait Detector: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Find rings in the input snapshot.
    fn detect(&self, input: &DetectionInput<'_>) -> Vec<FraudRing>;
}

/// Round half away from zero to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_zero_pads_and_increments() {
        let mut counter = RingCounter::new(PatternType::SmurfingFanOut);
        assert_eq!(counter.next_id(), "RING_SMURF_OUT_001");
        assert_eq!(counter.next_id(), "RING_SMURF_OUT_002");
    }

    #[test]
    fn assign_numbers_in_discovery_order() {
        let candidates = vec![
            RingCandidate {
                member_accounts: vec!["A".into()],
                risk_score: 89.004,
            },
            RingCandidate {
                member_accounts: vec!["B".into()],
                risk_score: 92.0,
            },
        ];
        let rings = RingCounter::new(PatternType::Cycle).assign(candidates);

        assert_eq!(rings[0].ring_id, "RING_CYCLE_001");
        assert_eq!(rings[0].risk_score, 89.0);
        assert_eq!(rings[1].ring_id, "RING_CYCLE_002");
        assert_eq!(rings[1].member_accounts, vec!["B"]);
    }

    #[test]
    fn pattern_names_round_trip_through_serde() {
        let json = serde_json::to_string(&PatternType::LayeredShell).unwrap();
        assert_eq!(json, "\"layered_shell\"");

        let custom: PatternType = serde_json::from_str("\"round_tripping\"").unwrap();
        assert_eq!(custom, PatternType::Custom("round_tripping".into()));
        assert_eq!(custom.weight(), 10.0);
        assert_eq!(custom.ring_prefix(), "ROUND_TRIPPING");
    }

    #[test]
    fn builtin_patterns_sort_alphabetically() {
        let mut patterns = vec![
            PatternType::SmurfingFanOut,
            PatternType::LayeredShell,
            PatternType::SmurfingFanIn,
            PatternType::Cycle,
        ];
        patterns.sort();
        let names: Vec<&str> = patterns.iter().map(PatternType::as_str).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
