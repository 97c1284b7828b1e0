//! Canonical report document.
//!
//! A pure projection of a detection run into the delivery JSON layout. Field
//! names are part of the downstream contract and must not change.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::detector::{round2, FraudRing};
use crate::pipeline::Summary;
use crate::scoring::SuspiciousAccount;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportAccount {
    pub account_id: String,
    pub suspicion_score: f64,
    /// Sorted pattern names.
    pub detected_patterns: Vec<String>,
    pub ring_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRing {
    pub ring_id: String,
    pub member_accounts: Vec<String>,
    pub pattern_type: String,
    pub risk_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub processing_time_seconds: f64,
}

/// The downloadable report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub suspicious_accounts: Vec<ReportAccount>,
    pub fraud_rings: Vec<ReportRing>,
    pub summary: ReportSummary,
}

impl Report {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).wrap_err("failed to serialize report")
    }
}

/// Build the report from run results.
///
/// `processing_time_seconds` is measured by the caller around the whole run
/// and rounded to 2 decimals here.
pub fn build_report(
    suspicious_accounts: &[SuspiciousAccount],
    fraud_rings: &[FraudRing],
    summary: &Summary,
    processing_time_seconds: f64,
) -> Report {
    let suspicious_accounts = suspicious_accounts
        .iter()
        .map(|account| ReportAccount {
            account_id: account.account_id.clone(),
            suspicion_score: account.suspicion_score,
            detected_patterns: account
                .detected_patterns
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
            ring_id: account.ring_id.clone(),
        })
        .collect();

    let fraud_rings = fraud_rings
        .iter()
        .map(|ring| ReportRing {
            ring_id: ring.ring_id.clone(),
            member_accounts: ring.member_accounts.clone(),
            pattern_type: ring.pattern_type.as_str().to_string(),
            risk_score: ring.risk_score,
        })
        .collect();

    Report {
        suspicious_accounts,
        fraud_rings,
        summary: ReportSummary {
            total_accounts_analyzed: summary.total_accounts_analyzed,
            suspicious_accounts_flagged: summary.suspicious_accounts_flagged,
            fraud_rings_detected: summary.fraud_rings_detected,
            processing_time_seconds: round2(processing_time_seconds),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::PatternType;
    use std::collections::BTreeSet;

    fn sample() -> (Vec<SuspiciousAccount>, Vec<FraudRing>, Summary) {
        let accounts = vec![SuspiciousAccount {
            account_id: "A".into(),
            suspicion_score: 70.0,
            detected_patterns: BTreeSet::from([
                PatternType::SmurfingFanIn,
                PatternType::Cycle,
            ]),
            ring_id: Some("RING_SMURF_IN_001".into()),
        }];
        let rings = vec![FraudRing {
            ring_id: "RING_CYCLE_001".into(),
            member_accounts: vec!["A".into(), "B".into(), "C".into()],
            pattern_type: PatternType::Cycle,
            risk_score: 89.0,
        }];
        let summary = Summary {
            total_accounts_analyzed: 3,
            suspicious_accounts_flagged: 1,
            fraud_rings_detected: 1,
        };
        (accounts, rings, summary)
    }

    #[test]
    fn document_has_exact_field_layout() {
        let (accounts, rings, summary) = sample();
        let report = build_report(&accounts, &rings, &summary, 0.4567);
        let value = serde_json::to_value(&report).unwrap();

        let account = &value["suspicious_accounts"][0];
        let mut keys: Vec<&str> = account.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["account_id", "detected_patterns", "ring_id", "suspicion_score"]
        );
        assert_eq!(
            account["detected_patterns"],
            serde_json::json!(["cycle", "smurfing_fan_in"])
        );

        let ring = &value["fraud_rings"][0];
        assert_eq!(ring["pattern_type"], "cycle");
        assert_eq!(ring["member_accounts"], serde_json::json!(["A", "B", "C"]));
        assert_eq!(ring["risk_score"], 89.0);

        assert_eq!(value["summary"]["processing_time_seconds"], 0.46);
        assert_eq!(value["summary"]["fraud_rings_detected"], 1);
    }

    #[test]
    fn missing_ring_id_serializes_as_null() {
        let (mut accounts, rings, summary) = sample();
        accounts[0].ring_id = None;
        let json = build_report(&accounts, &rings, &summary, 0.0)
            .to_json_pretty()
            .unwrap();
        assert!(json.contains("\"ring_id\": null"));
    }
}
