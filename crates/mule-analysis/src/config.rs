//! Detection thresholds.
//!
//! Defaults are the standard money-muling rule set. A JSON file may override any
//! subset of fields (`#[serde(default)]`).

use std::path::Path;

use chrono::Duration;
use eyre::{ensure, eyre, Context, Result};
use serde::{Deserialize, Serialize};

/// Tunable parameters for all detectors and the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Shortest cycle reported.
    pub cycle_min_len: usize,
    /// Longest cycle reported. Longer cycles are never enumerated.
    pub cycle_max_len: usize,

    /// Minimum path length (nodes) for a shell chain.
    pub shell_min_path_len: usize,
    /// Extra depth explored past the minimum (max path = min + extra).
    pub shell_extra_depth: usize,
    /// Inclusive lower bound of a shell node's total degree.
    pub shell_degree_min: usize,
    /// Inclusive upper bound of a shell node's total degree.
    pub shell_degree_max: usize,
    /// Interior shell nodes required for a chain to qualify.
    pub shell_min_shell_nodes: usize,
    /// Number of leading nodes (graph order) used as DFS sources.
    pub shell_max_sources: usize,
    /// Per-source path budget; exceeding it skips that source.
    pub shell_max_paths_per_source: Option<usize>,

    /// Sliding window length for smurfing, in hours (inclusive).
    pub smurf_window_hours: i64,
    /// Distinct counterparties needed inside one window.
    pub smurf_threshold: usize,

    /// Run detectors on the rayon pool instead of sequentially.
    pub parallel: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cycle_min_len: 3,
            cycle_max_len: 5,
            shell_min_path_len: 5,
            shell_extra_depth: 3,
            shell_degree_min: 2,
            shell_degree_max: 3,
            shell_min_shell_nodes: 2,
            shell_max_sources: 50,
            shell_max_paths_per_source: None,
            smurf_window_hours: 72,
            smurf_threshold: 10,
            parallel: false,
        }
    }
}

impl DetectionConfig {
    /// Longest path (in nodes) the shell search will build.
    ///
    /// Saturates instead of overflowing; [`validate`](Self::validate) rejects
    /// such configs up front.
    pub fn shell_max_path_len(&self) -> usize {
        self.shell_min_path_len.saturating_add(self.shell_extra_depth)
    }

    /// The smurfing window, or `None` if the hour count is out of range.
    pub fn smurf_window(&self) -> Option<Duration> {
        if self.smurf_window_hours < 0 {
            return None;
        }
        Duration::try_hours(self.smurf_window_hours)
    }

    /// Reject values the detectors cannot run with.
    ///
    /// # Errors
    ///
    /// Names the first offending field.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.cycle_min_len <= self.cycle_max_len,
            "cycle_min_len ({}) exceeds cycle_max_len ({})",
            self.cycle_min_len,
            self.cycle_max_len
        );
        self.shell_min_path_len
            .checked_add(self.shell_extra_depth)
            .ok_or_else(|| {
                eyre!(
                    "shell_min_path_len + shell_extra_depth overflows ({} + {})",
                    self.shell_min_path_len,
                    self.shell_extra_depth
                )
            })?;
        ensure!(
            self.shell_degree_min <= self.shell_degree_max,
            "shell_degree_min ({}) exceeds shell_degree_max ({})",
            self.shell_degree_min,
            self.shell_degree_max
        );
        ensure!(
            self.smurf_window().is_some(),
            "smurf_window_hours must be a non-negative hour count chrono can represent, got {}",
            self.smurf_window_hours
        );
        ensure!(self.smurf_threshold >= 1, "smurf_threshold must be at least 1");
        Ok(())
    }

    /// Load overrides from a JSON file on top of the defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .wrap_err_with(|| format!("failed to parse config {}", path.display()))?;
        config
            .validate()
            .wrap_err_with(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }
}
