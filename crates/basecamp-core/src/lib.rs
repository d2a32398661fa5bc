//! Basecamp Core - engine types for staged cluster provisioning
//!
//! This crate provides the foundational machinery used throughout Basecamp:
//! - `Stage`/`StageRunner`: idempotent, fail-fast sequencing of deployment steps
//! - `wait_for`: bounded readiness polling with a fixed resample interval
//! - `classify_pods`: turns raw pod counts into PASS/FAIL/WARN outcomes
//! - `ReportAggregator`: folds check outcomes into a report with a deterministic exit code
//!
//! Nothing in this crate talks to a cluster. Guards, actions, and poll
//! predicates are boxed async closures supplied by the caller, so the engine
//! can be exercised end to end without any Kubernetes dependency.

pub mod error;
pub mod health;
pub mod poll;
pub mod report;
pub mod stage;

pub use error::ActionError;
pub use health::{CheckResult, CheckStatus, PodCounts, PodPhase, classify_pods};
pub use poll::{PollOutcome, PollSpec, wait_for};
pub use report::{Report, ReportAggregator};
pub use stage::{
    GuardOutcome, RunOutcome, Stage, StageEvent, StageRecord, StageRunner, StageStatus,
};
