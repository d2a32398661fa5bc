//! Staged deployment with idempotency guards and fail-fast sequencing
//!
//! A `Stage` is one deployment step: a guard that decides whether the desired
//! end state already holds, an optional mutating action, and an optional
//! readiness poll over the action's observable effects. The `StageRunner`
//! executes stages strictly in declared order and aborts the whole run on the
//! first action failure, because every stage assumes all prior stages fully
//! succeeded.
//!
//! Guards are evaluated against live cluster state on every run, never local
//! memory, which is what makes re-running a partially provisioned deployment
//! safe.

use futures::future::BoxFuture;

use crate::error::ActionError;
use crate::poll::{PollOutcome, PollSpec};

/// Async idempotency guard for a stage
pub type GuardFn = Box<dyn Fn() -> BoxFuture<'static, GuardOutcome> + Send + Sync>;

/// Async mutating action for a stage
pub type ActionFn = Box<dyn Fn() -> BoxFuture<'static, Result<(), ActionError>> + Send + Sync>;

/// Callback receiving live stage progress
pub type ObserverFn = Box<dyn Fn(StageEvent<'_>) + Send + Sync>;

/// What a guard observed about the desired end state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The end state already holds; skip the action and any postcondition
    AlreadySatisfied,
    /// The end state does not hold; the action must run
    NotSatisfied,
    /// The guard query itself could not complete (e.g. resource missing vs.
    /// transport failure is not distinguishable); treated as `NotSatisfied`
    /// because re-attempting an idempotent action is safer than silently
    /// skipping it on ambiguous evidence
    Unknown,
}

impl GuardOutcome {
    /// Whether the stage's action should run for this outcome
    pub fn requires_action(&self) -> bool {
        !matches!(self, GuardOutcome::AlreadySatisfied)
    }
}

/// One idempotent deployment step
pub struct Stage {
    name: String,
    guard: GuardFn,
    action: Option<ActionFn>,
    postcondition: Option<PollSpec>,
}

impl Stage {
    /// Create a stage with a guard and no action
    pub fn new(name: impl Into<String>, guard: GuardFn) -> Self {
        Self {
            name: name.into(),
            guard,
            action: None,
            postcondition: None,
        }
    }

    /// Attach the mutating action
    pub fn with_action(mut self, action: ActionFn) -> Self {
        self.action = Some(action);
        self
    }

    /// Attach a readiness poll over the action's effects
    pub fn with_postcondition(mut self, spec: PollSpec) -> Self {
        self.postcondition = Some(spec);
        self
    }

    /// Stage name, as shown in progress output
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Terminal status of one stage in the linear run log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// Guard reported the end state already holds; nothing ran
    Skipped,
    /// Action ran (and postcondition, if any, was observed)
    Applied,
    /// Action ran but the postcondition was not observed within its deadline
    AppliedWithWarning,
    /// Action failed; the run was aborted here
    Fatal,
}

/// One entry of the per-stage run log
#[derive(Debug, Clone)]
pub struct StageRecord {
    /// Stage name
    pub stage: String,
    /// Terminal status
    pub status: StageStatus,
    /// Warning or failure detail, if any
    pub detail: Option<String>,
}

/// Live progress event emitted while a run executes
#[derive(Debug, Clone, Copy)]
pub enum StageEvent<'a> {
    /// A stage's guard is about to be evaluated
    Started { stage: &'a str },
    /// The guard reported `AlreadySatisfied`; informational, not pass/fail
    Skipped { stage: &'a str },
    /// The stage's action (and postcondition, if any) completed
    Applied { stage: &'a str },
    /// The action succeeded but its postcondition timed out
    Warned { stage: &'a str, detail: &'a str },
    /// The action failed; the run aborts after this event
    Failed { stage: &'a str, error: &'a str },
}

/// Outcome of running an ordered stage list
#[derive(Debug)]
pub enum RunOutcome {
    /// Every stage reached a non-fatal status
    Completed { records: Vec<StageRecord> },
    /// A stage's action failed; later stages were not attempted
    Fatal {
        records: Vec<StageRecord>,
        stage: String,
        error: ActionError,
    },
}

impl RunOutcome {
    /// Whether the run was aborted by an action failure
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunOutcome::Fatal { .. })
    }

    /// The linear per-stage log, including the fatal entry if any
    pub fn records(&self) -> &[StageRecord] {
        match self {
            RunOutcome::Completed { records } | RunOutcome::Fatal { records, .. } => records,
        }
    }

    /// Number of stages that applied with a postcondition warning
    pub fn warning_count(&self) -> usize {
        self.records()
            .iter()
            .filter(|r| r.status == StageStatus::AppliedWithWarning)
            .count()
    }
}

/// Executes stages strictly in declared order, fail-fast
pub struct StageRunner {
    stages: Vec<Stage>,
    observer: Option<ObserverFn>,
}

impl StageRunner {
    /// Create a runner over an ordered stage list
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            stages,
            observer: None,
        }
    }

    /// Attach a progress observer
    pub fn with_observer(mut self, observer: ObserverFn) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run all stages. Consumes the runner: stages are executed in one pass,
    /// with no retry across separate stages.
    pub async fn run(self) -> RunOutcome {
        fn emit(observer: &Option<ObserverFn>, event: StageEvent<'_>) {
            if let Some(observer) = observer {
                observer(event);
            }
        }

        let StageRunner { stages, observer } = self;
        let mut records = Vec::with_capacity(stages.len());

        for stage in stages {
            emit(&observer, StageEvent::Started { stage: &stage.name });

            if !(stage.guard)().await.requires_action() {
                emit(&observer, StageEvent::Skipped { stage: &stage.name });
                records.push(StageRecord {
                    stage: stage.name,
                    status: StageStatus::Skipped,
                    detail: None,
                });
                continue;
            }

            if let Some(action) = &stage.action
                && let Err(error) = action().await
            {
                emit(&observer, StageEvent::Failed {
                    stage: &stage.name,
                    error: &error.message,
                });
                records.push(StageRecord {
                    stage: stage.name.clone(),
                    status: StageStatus::Fatal,
                    detail: Some(error.message.clone()),
                });
                return RunOutcome::Fatal {
                    records,
                    stage: stage.name,
                    error,
                };
            }

            match &stage.postcondition {
                Some(spec) => match spec.wait().await {
                    PollOutcome::Ready => {
                        emit(&observer, StageEvent::Applied { stage: &stage.name });
                        records.push(StageRecord {
                            stage: stage.name,
                            status: StageStatus::Applied,
                            detail: None,
                        });
                    }
                    PollOutcome::TimedOut => {
                        let detail = format!(
                            "readiness not observed within {}s (may still converge)",
                            spec.deadline.as_secs()
                        );
                        emit(&observer, StageEvent::Warned {
                            stage: &stage.name,
                            detail: &detail,
                        });
                        records.push(StageRecord {
                            stage: stage.name,
                            status: StageStatus::AppliedWithWarning,
                            detail: Some(detail),
                        });
                    }
                },
                None => {
                    emit(&observer, StageEvent::Applied { stage: &stage.name });
                    records.push(StageRecord {
                        stage: stage.name,
                        status: StageStatus::Applied,
                        detail: None,
                    });
                }
            }
        }

        RunOutcome::Completed { records }
    }

    /// Evaluate every guard without running any action or poll.
    ///
    /// Used by `--dry-run`: reports which stages would be skipped and which
    /// would apply, mutating nothing.
    pub async fn dry_run(self) -> Vec<(String, GuardOutcome)> {
        let mut outcomes = Vec::with_capacity(self.stages.len());
        for stage in self.stages {
            let outcome = (stage.guard)().await;
            outcomes.push((stage.name, outcome));
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fixed_guard(outcome: GuardOutcome) -> GuardFn {
        Box::new(move || async move { outcome }.boxed())
    }

    fn counting_action(counter: Arc<AtomicUsize>) -> ActionFn {
        Box::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            .boxed()
        })
    }

    fn failing_action(message: &str) -> ActionFn {
        let message = message.to_string();
        Box::new(move || {
            let message = message.clone();
            async move { Err(ActionError::new(message)) }.boxed()
        })
    }

    #[tokio::test]
    async fn test_satisfied_guard_skips_action_and_postcondition() {
        let ran = Arc::new(AtomicUsize::new(0));
        let polled = Arc::new(AtomicUsize::new(0));
        let polled_clone = polled.clone();

        let stage = Stage::new("install runtime", fixed_guard(GuardOutcome::AlreadySatisfied))
            .with_action(counting_action(ran.clone()))
            .with_postcondition(PollSpec::new(
                Box::new(move || {
                    let polled = polled_clone.clone();
                    async move {
                        polled.fetch_add(1, Ordering::SeqCst);
                        true
                    }
                    .boxed()
                }),
                Duration::from_millis(1),
                Duration::from_millis(10),
            ));

        let outcome = StageRunner::new(vec![stage]).run().await;

        assert!(!outcome.is_fatal());
        assert_eq!(outcome.records().len(), 1);
        assert_eq!(outcome.records()[0].status, StageStatus::Skipped);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(polled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_satisfied_runs_action() {
        let ran = Arc::new(AtomicUsize::new(0));
        let stage = Stage::new("create namespace", fixed_guard(GuardOutcome::NotSatisfied))
            .with_action(counting_action(ran.clone()));

        let outcome = StageRunner::new(vec![stage]).run().await;

        assert!(!outcome.is_fatal());
        assert_eq!(outcome.records()[0].status, StageStatus::Applied);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_guard_runs_action() {
        // Ambiguous evidence must re-attempt, not silently skip
        let ran = Arc::new(AtomicUsize::new(0));
        let stage = Stage::new("configure storage", fixed_guard(GuardOutcome::Unknown))
            .with_action(counting_action(ran.clone()));

        let outcome = StageRunner::new(vec![stage]).run().await;

        assert!(!outcome.is_fatal());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_later_stages() {
        let third_ran = Arc::new(AtomicUsize::new(0));

        let stages = vec![
            Stage::new("first", fixed_guard(GuardOutcome::NotSatisfied))
                .with_action(counting_action(Arc::new(AtomicUsize::new(0)))),
            Stage::new("second", fixed_guard(GuardOutcome::NotSatisfied))
                .with_action(failing_action("connection refused")),
            Stage::new("third", fixed_guard(GuardOutcome::NotSatisfied))
                .with_action(counting_action(third_ran.clone())),
        ];

        let outcome = StageRunner::new(stages).run().await;

        match &outcome {
            RunOutcome::Fatal {
                records,
                stage,
                error,
            } => {
                assert_eq!(stage, "second");
                assert_eq!(error.message, "connection refused");
                assert_eq!(records.len(), 2);
                assert_eq!(records[1].status, StageStatus::Fatal);
            }
            RunOutcome::Completed { .. } => panic!("run should have aborted"),
        }
        assert_eq!(third_ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_postcondition_timeout_is_warning_not_failure() {
        let after_ran = Arc::new(AtomicUsize::new(0));

        let stages = vec![
            Stage::new("install network", fixed_guard(GuardOutcome::NotSatisfied))
                .with_action(counting_action(Arc::new(AtomicUsize::new(0))))
                .with_postcondition(PollSpec::new(
                    Box::new(|| async { false }.boxed()),
                    Duration::from_secs(1),
                    Duration::from_secs(5),
                )),
            Stage::new("after", fixed_guard(GuardOutcome::NotSatisfied))
                .with_action(counting_action(after_ran.clone())),
        ];

        let outcome = StageRunner::new(stages).run().await;

        assert!(!outcome.is_fatal());
        assert_eq!(outcome.warning_count(), 1);
        assert_eq!(
            outcome.records()[0].status,
            StageStatus::AppliedWithWarning
        );
        // Deployment continues past an advisory timeout
        assert_eq!(after_ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stage_without_action_applies() {
        let stage = Stage::new("wait only", fixed_guard(GuardOutcome::NotSatisfied))
            .with_postcondition(PollSpec::new(
                Box::new(|| async { true }.boxed()),
                Duration::from_millis(1),
                Duration::from_millis(10),
            ));

        let outcome = StageRunner::new(vec![stage]).run().await;
        assert_eq!(outcome.records()[0].status, StageStatus::Applied);
    }

    #[tokio::test]
    async fn test_dry_run_evaluates_guards_only() {
        let ran = Arc::new(AtomicUsize::new(0));
        let stages = vec![
            Stage::new("a", fixed_guard(GuardOutcome::AlreadySatisfied))
                .with_action(counting_action(ran.clone())),
            Stage::new("b", fixed_guard(GuardOutcome::NotSatisfied))
                .with_action(counting_action(ran.clone())),
        ];

        let outcomes = StageRunner::new(stages).dry_run().await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0], ("a".to_string(), GuardOutcome::AlreadySatisfied));
        assert_eq!(outcomes[1], ("b".to_string(), GuardOutcome::NotSatisfied));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_observer_sees_linear_log() {
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let events_clone = events.clone();

        let stages = vec![
            Stage::new("skipped", fixed_guard(GuardOutcome::AlreadySatisfied)),
            Stage::new("applied", fixed_guard(GuardOutcome::NotSatisfied))
                .with_action(counting_action(Arc::new(AtomicUsize::new(0)))),
        ];

        let outcome = StageRunner::new(stages)
            .with_observer(Box::new(move |event| {
                let label = match event {
                    StageEvent::Started { stage } => format!("start:{stage}"),
                    StageEvent::Skipped { stage } => format!("skip:{stage}"),
                    StageEvent::Applied { stage } => format!("apply:{stage}"),
                    StageEvent::Warned { stage, .. } => format!("warn:{stage}"),
                    StageEvent::Failed { stage, .. } => format!("fail:{stage}"),
                };
                events_clone.lock().unwrap().push(label);
            }))
            .run()
            .await;

        assert!(!outcome.is_fatal());
        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["start:skipped", "skip:skipped", "start:applied", "apply:applied"]
        );
    }
}
