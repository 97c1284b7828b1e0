//! Fan-in / fan-out smurfing detection.
//!
//! Works on the time-ordered ledger rather than the collapsed graph, because
//! repeated transfers and their timestamps matter here.
//!
//! For each focal account (receiver for fan-in, sender for fan-out) its
//! transactions are walked chronologically. Each transaction in turn opens a
//! window of `smurf_window_hours` (inclusive). Distinct counterparties inside
//! the window are collected until the first transaction past the window end.
//! The first window holding at least `smurf_threshold` counterparties yields
//! the account's single ring, and no further windows are checked for it.
//!
//! The two directions are independent passes with their own id namespace
//! (`RING_SMURF_IN_*`, `RING_SMURF_OUT_*`), each numbered from 001.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use mule_data::types::TransactionRecord;
use tracing::{debug, info};

use crate::config::DetectionConfig;
use crate::detector::{DetectionInput, Detector, FraudRing, PatternType, RingCandidate, RingCounter};

/// Which side of a transaction is the focal account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowDirection {
    /// Many senders → one receiver.
    FanIn,
    /// One sender → many receivers.
    FanOut,
}

impl FlowDirection {
    fn pattern(self) -> PatternType {
        match self {
            Self::FanIn => PatternType::SmurfingFanIn,
            Self::FanOut => PatternType::SmurfingFanOut,
        }
    }

    /// `(focal, counterparty)` for a transaction.
    fn split(self, tx: &TransactionRecord) -> (&str, &str) {
        match self {
            Self::FanIn => (&tx.receiver_id, &tx.sender_id),
            Self::FanOut => (&tx.sender_id, &tx.receiver_id),
        }
    }
}

/// A focal account's chronological `(counterparty, timestamp)` events.
type FocalEvents<'a> = (&'a str, Vec<(&'a str, DateTime<Utc>)>);

/// Detector for time-windowed aggregation through many counterparties.
#[derive(Clone, Debug)]
pub struct SmurfingDetector {
    window: Duration,
    threshold: usize,
}

impl SmurfingDetector {
    pub fn new(window: Duration, threshold: usize) -> Self {
        Self { window, threshold }
    }

    /// Build from config. Hour counts chrono cannot represent clamp to the
    /// widest window; [`DetectionConfig::validate`] rejects them earlier.
    pub fn from_config(config: &DetectionConfig) -> Self {
        let hours = config.smurf_window_hours;
        let window = Duration::try_hours(hours).unwrap_or(if hours < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        });
        Self::new(window, config.smurf_threshold)
    }

    /// Run one direction over an already time-sorted ledger.
    pub fn scan(&self, ordered: &[&TransactionRecord], direction: FlowDirection) -> Vec<FraudRing> {
        let mut candidates = Vec::new();

        for (focal, events) in group_by_focal(ordered, direction) {
            let Some(counterparties) = self.first_qualifying_window(&events) else {
                continue;
            };

            let count = counterparties.len();
            let sorted = counterparties.into_iter().map(str::to_string);
            let member_accounts: Vec<String> = match direction {
                FlowDirection::FanIn => sorted.chain(std::iter::once(focal.to_string())).collect(),
                FlowDirection::FanOut => std::iter::once(focal.to_string()).chain(sorted).collect(),
            };

            debug!(focal, counterparties = count, ?direction, "smurfing window hit");
            candidates.push(RingCandidate {
                member_accounts,
                risk_score: 80.0 + 0.5 * count as f64,
            });
        }

        RingCounter::new(direction.pattern()).assign(candidates)
    }

    /// Distinct counterparties of the earliest window that meets the threshold.
    ///
    /// A zero threshold never qualifies.
    fn first_qualifying_window<'a>(
        &self,
        events: &[(&'a str, DateTime<Utc>)],
    ) -> Option<BTreeSet<&'a str>> {
        if self.threshold == 0 || events.is_empty() {
            return None;
        }

        for (start_idx, &(_, window_start)) in events.iter().enumerate() {
            let mut counterparties = BTreeSet::new();
            for &(counterparty, ts) in &events[start_idx..] {
                if ts - window_start > self.window {
                    break;
                }
                counterparties.insert(counterparty);
            }

            if counterparties.len() >= self.threshold {
                return Some(counterparties);
            }
        }

        None
    }
}

impl Default for SmurfingDetector {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl Detector for SmurfingDetector {
    fn name(&self) -> &'static str {
        "smurfing"
    }

    #[tracing::instrument(name = "smurfing_detector", skip_all, fields(txs = input.transactions.len()))]
    fn detect(&self, input: &DetectionInput<'_>) -> Vec<FraudRing> {
        let mut ordered: Vec<&TransactionRecord> = input.transactions.iter().collect();
        // Stable: equal timestamps keep ledger order.
        ordered.sort_by_key(|tx| tx.timestamp);

        let mut rings = self.scan(&ordered, FlowDirection::FanIn);
        let fan_in = rings.len();
        rings.extend(self.scan(&ordered, FlowDirection::FanOut));

        info!(fan_in, fan_out = rings.len() - fan_in, "smurfing detection finished");
        rings
    }
}

/// Group time-sorted transactions by focal account, keeping the order in
/// which focal accounts first appear.
fn group_by_focal<'a>(
    ordered: &[&'a TransactionRecord],
    direction: FlowDirection,
) -> Vec<FocalEvents<'a>> {
    let mut slot: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<FocalEvents<'a>> = Vec::new();

    for &tx in ordered {
        let (focal, counterparty) = direction.split(tx);
        let idx = *slot.entry(focal).or_insert_with(|| {
            groups.push((focal, Vec::new()));
            groups.len() - 1
        });
        groups[idx].1.push((counterparty, tx.timestamp));
    }

    groups
}
