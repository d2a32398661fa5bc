//! Pod health classification
//!
//! Verification reads raw pod phases out of a namespace and needs a single
//! PASS/FAIL/WARN verdict per component. `classify_pods` is a fixed decision
//! table evaluated in priority order; the ordering is load-bearing (a
//! namespace with both failed and pending pods classifies as FAIL, never
//! WARN).

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a workload instance, as reported by the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Running,
    Pending,
    Failed,
    Succeeded,
    Unknown,
}

impl PodPhase {
    /// Parse a phase string from the cluster API. Anything unrecognized maps
    /// to `Unknown` rather than failing the read.
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Running" => PodPhase::Running,
            "Pending" => PodPhase::Pending,
            "Failed" => PodPhase::Failed,
            "Succeeded" => PodPhase::Succeeded,
            _ => PodPhase::Unknown,
        }
    }
}

/// Pod counts for one namespace, derived from a single point-in-time read
///
/// `running + pending + failed <= total`; Succeeded and Unknown pods fall
/// into the remainder and are not separately tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodCounts {
    pub total: usize,
    pub running: usize,
    pub pending: usize,
    pub failed: usize,
}

impl PodCounts {
    /// Derive counts from a list of phases
    pub fn from_phases(phases: &[PodPhase]) -> Self {
        let mut counts = PodCounts {
            total: phases.len(),
            ..Default::default()
        };
        for phase in phases {
            match phase {
                PodPhase::Running => counts.running += 1,
                PodPhase::Pending => counts.pending += 1,
                PodPhase::Failed => counts.failed += 1,
                PodPhase::Succeeded | PodPhase::Unknown => {}
            }
        }
        counts
    }
}

/// Verdict of a single verification check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
}

/// Result of one verification check; exactly one status per result, never
/// combined or upgraded after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// Component the check examined
    pub component: String,
    /// Verdict
    pub status: CheckStatus,
    /// Human-readable reason
    pub message: String,
}

impl CheckResult {
    pub fn pass(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: CheckStatus::Pass,
            message: message.into(),
        }
    }

    pub fn fail(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: CheckStatus::Fail,
            message: message.into(),
        }
    }

    pub fn warn(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: CheckStatus::Warn,
            message: message.into(),
        }
    }
}

/// Classify a component's pod counts into a check result.
///
/// Decision table, first match wins:
/// 1. no pods at all -> WARN (the component may simply not be deployed yet)
/// 2. any failed pod -> FAIL, regardless of how many are running
/// 3. everything running -> PASS
/// 4. any pending pod -> WARN
/// 5. anything else (Succeeded/Unknown remainder) -> WARN
pub fn classify_pods(component: &str, counts: PodCounts) -> CheckResult {
    let PodCounts {
        total,
        running,
        pending,
        failed,
    } = counts;

    if total == 0 {
        return CheckResult::warn(component, "no pods present");
    }
    if failed > 0 {
        return CheckResult::fail(component, format!("{failed} failed pods (out of {total})"));
    }
    if running == total {
        return CheckResult::pass(component, format!("all pods running ({running}/{total})"));
    }
    if pending > 0 {
        return CheckResult::warn(
            component,
            format!("{pending} pods pending ({running}/{total})"),
        );
    }
    CheckResult::warn(
        component,
        format!("pods in an unrecognized state ({running}/{total})"),
    )
}
