//! CLI commands

pub mod cluster;
pub mod node;
pub mod platform;
pub mod verify;

use basecamp_core::{RunOutcome, Stage, StageRunner};
use basecamp_kube::{Mirror, Profile};

use crate::display;
use crate::error::{CliError, Result};
use crate::exit_codes;

/// Build a deployment profile from the shared CLI selections
pub(crate) fn build_profile(mirror: Option<String>, model: Option<String>) -> Result<Profile> {
    let mirror = match mirror {
        Some(value) => Some(value.parse::<Mirror>().map_err(|e| CliError::Input {
            message: e.to_string(),
            help: Some("Available mirrors: global, cn".to_string()),
        })?),
        None => None,
    };
    Ok(Profile::new(mirror, model))
}

/// Execute (or dry-run) one deployment phase's stage list
pub(crate) async fn execute(phase: &str, stages: Vec<Stage>, dry_run: bool) -> Result<i32> {
    let runner = StageRunner::new(stages);
    display::print_plan(phase, &runner.stage_names());

    if dry_run {
        let outcomes = runner.dry_run().await;
        display::print_dry_run(&outcomes);
        return Ok(exit_codes::SUCCESS);
    }

    let outcome = runner
        .with_observer(Box::new(display::print_stage_event))
        .run()
        .await;

    match outcome {
        RunOutcome::Completed { records } => {
            display::print_run_summary(&records);
            Ok(exit_codes::SUCCESS)
        }
        RunOutcome::Fatal { stage, error, .. } => Err(CliError::deploy(stage, error.message)),
    }
}
