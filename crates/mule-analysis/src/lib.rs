//! mule-analysis crate
//!
//! Account-graph construction, structural fraud-ring detectors (cycles,
//! layered shells, smurfing), suspicion scoring and report formatting.

pub mod config;
pub mod cycle_detector;
pub mod detector;
pub mod graph;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod shell_detector;
pub mod smurfing_detector;

pub use config::DetectionConfig;
pub use detector::{DetectionInput, Detector, FraudRing, PatternType};
pub use graph::AccountGraph;
pub use pipeline::{analyze_reader, run_detection, DetectionOutcome, Summary};
pub use scoring::SuspiciousAccount;
