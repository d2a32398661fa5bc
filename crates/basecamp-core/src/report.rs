//! Verification report accumulation
//!
//! The aggregator is an explicit value threaded through a verification run,
//! not process-wide mutable state. It is strictly additive: every check
//! records exactly one result, results are never re-evaluated or discarded,
//! and the exit code is computed purely from the failure count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::health::{CheckResult, CheckStatus};

/// Final report of one verification run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Every recorded result, in check order
    pub results: Vec<CheckResult>,
    pub pass_count: usize,
    pub fail_count: usize,
    pub warn_count: usize,
    /// When the report was finalized
    pub checked_at: DateTime<Utc>,
}

impl Report {
    /// Process exit code: 1 iff at least one FAIL was recorded. Warnings
    /// never affect the exit code.
    pub fn exit_code(&self) -> i32 {
        if self.fail_count > 0 { 1 } else { 0 }
    }

    /// Whether every check passed or warned
    pub fn is_healthy(&self) -> bool {
        self.fail_count == 0
    }
}

/// Accumulates check results across one verification run
#[derive(Debug, Default)]
pub struct ReportAggregator {
    results: Vec<CheckResult>,
    pass_count: usize,
    fail_count: usize,
    warn_count: usize,
}

impl ReportAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one check result, incrementing exactly one counter
    pub fn record(&mut self, result: CheckResult) {
        match result.status {
            CheckStatus::Pass => self.pass_count += 1,
            CheckStatus::Fail => self.fail_count += 1,
            CheckStatus::Warn => self.warn_count += 1,
        }
        self.results.push(result);
    }

    /// Number of results recorded so far
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether any results have been recorded
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Finalize into a report; the aggregator is consumed
    pub fn finalize(self) -> Report {
        Report {
            results: self.results,
            pass_count: self.pass_count,
            fail_count: self.fail_count,
            warn_count: self.warn_count,
            checked_at: Utc::now(),
        }
    }
}
