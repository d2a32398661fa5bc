//! Bounded readiness polling
//!
//! After a mutating action, cluster state converges eventually (image pulls,
//! scheduler placement, CNI rollout). `wait_for` samples a predicate at a
//! fixed interval until it holds or a deadline elapses. It never busy-spins
//! and never re-runs the action that triggered the wait; it only observes.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::{Instant, sleep};

/// Async predicate over freshly sampled cluster state
pub type PredicateFn = Box<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

/// Result of a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The predicate held before the deadline
    Ready,
    /// The deadline elapsed without the predicate holding
    TimedOut,
}

impl PollOutcome {
    /// Whether the awaited condition was observed
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready)
    }
}

/// A postcondition poll attached to a stage
///
/// Interval and deadline are stage-specific: a package install settles in
/// seconds, a model-server rollout can legitimately take minutes.
pub struct PollSpec {
    /// Condition to wait for
    pub predicate: PredicateFn,
    /// Fixed sleep between samples
    pub interval: Duration,
    /// Total time budget for the wait
    pub deadline: Duration,
}

impl PollSpec {
    /// Create a poll spec from a predicate closure
    pub fn new(predicate: PredicateFn, interval: Duration, deadline: Duration) -> Self {
        Self {
            predicate,
            interval,
            deadline,
        }
    }

    /// Run the wait described by this spec
    pub async fn wait(&self) -> PollOutcome {
        wait_for(|| (self.predicate)(), self.interval, self.deadline).await
    }
}

/// Sample `predicate` every `interval` until it returns true or `deadline`
/// elapses.
///
/// The predicate is evaluated once immediately; with a predicate that never
/// holds, the total elapsed time lands in `[deadline, deadline + interval)`.
pub async fn wait_for<F>(mut predicate: F, interval: Duration, deadline: Duration) -> PollOutcome
where
    F: FnMut() -> BoxFuture<'static, bool>,
{
    let started = Instant::now();

    loop {
        if predicate().await {
            return PollOutcome::Ready;
        }

        if started.elapsed() >= deadline {
            return PollOutcome::TimedOut;
        }

        sleep(interval).await;
    }
}
