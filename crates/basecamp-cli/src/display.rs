//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Deployment plans and live per-stage progress
//! - Verification reports with status glyphs and a summary line
//! - The informational release/access section after verification

use console::style;

use basecamp_core::{
    CheckStatus, GuardOutcome, Report, StageEvent, StageRecord, StageStatus,
};
use basecamp_kube::ReleaseCheck;
use basecamp_kube::plan::{CONSOLE_RELEASE, INFERENCE_NAMESPACE};

/// Print the ordered stage list before a phase executes
pub fn print_plan(phase: &str, stages: &[&str]) {
    println!(
        "{} {} ({} stages)",
        style("→").blue().bold(),
        style(phase).cyan(),
        stages.len()
    );
    for stage in stages {
        println!("    - {stage}");
    }
}

/// Live progress line for one stage event
pub fn print_stage_event(event: StageEvent<'_>) {
    match event {
        StageEvent::Started { stage } => {
            println!("{} {}", style("→").blue().bold(), stage);
        }
        StageEvent::Skipped { stage } => {
            println!("  {} {} (already in place)", style("⊘").dim(), style(stage).dim());
        }
        StageEvent::Applied { stage } => {
            println!("  {} {}", style("✓").green(), stage);
        }
        StageEvent::Warned { stage, detail } => {
            println!("  {} {} - {}", style("⚠").yellow(), stage, style(detail).dim());
        }
        StageEvent::Failed { stage, error } => {
            println!("  {} {} - {}", style("✗").red().bold(), stage, error);
        }
    }
}

/// Print guard outcomes for a dry run
pub fn print_dry_run(outcomes: &[(String, GuardOutcome)]) {
    for (stage, outcome) in outcomes {
        match outcome {
            GuardOutcome::AlreadySatisfied => {
                println!("  {} {} (already in place)", style("⊘").dim(), style(stage).dim());
            }
            GuardOutcome::NotSatisfied => {
                println!("  {} {} (would apply)", style("→").blue(), stage);
            }
            GuardOutcome::Unknown => {
                println!(
                    "  {} {} (state unknown, would apply)",
                    style("?").yellow(),
                    stage
                );
            }
        }
    }
    println!(
        "{} Dry run - nothing was changed",
        style("✓").green().bold()
    );
}

/// Print the one-line summary after a deployment run completes
pub fn print_run_summary(records: &[StageRecord]) {
    let applied = records
        .iter()
        .filter(|r| {
            matches!(
                r.status,
                StageStatus::Applied | StageStatus::AppliedWithWarning
            )
        })
        .count();
    let skipped = records
        .iter()
        .filter(|r| r.status == StageStatus::Skipped)
        .count();
    let warned = records
        .iter()
        .filter(|r| r.status == StageStatus::AppliedWithWarning)
        .count();

    if warned > 0 {
        println!(
            "{} Phase complete: {applied} applied ({warned} with warnings), {skipped} already in place",
            style("⚠").yellow().bold()
        );
    } else {
        println!(
            "{} Phase complete: {applied} applied, {skipped} already in place",
            style("✓").green().bold()
        );
    }
}

fn status_glyph(status: CheckStatus) -> console::StyledObject<&'static str> {
    match status {
        CheckStatus::Pass => style("✓").green(),
        CheckStatus::Fail => style("✗").red(),
        CheckStatus::Warn => style("⚠").yellow(),
    }
}

/// Print the verification report
pub fn print_report(report: &Report) {
    println!("{}", style("CHECKS").bold().underlined());
    for result in &report.results {
        println!(
            "  {} {}: {}",
            status_glyph(result.status),
            style(&result.component).cyan(),
            result.message
        );
    }

    println!();
    if report.fail_count > 0 {
        println!(
            "{} {} failed, {} warnings, {} passed",
            style("✗").red().bold(),
            report.fail_count,
            report.warn_count,
            report.pass_count
        );
    } else if report.warn_count > 0 {
        println!(
            "{} All checks passed with {} warning(s)",
            style("⚠").yellow().bold(),
            report.warn_count
        );
    } else {
        println!("{} All checks passed!", style("✓").green().bold());
    }
}

/// Print the informational release section; never affects the exit code
pub fn print_releases(releases: &[ReleaseCheck]) {
    println!("\n{}", style("RELEASES").bold().underlined());
    for release in releases {
        let status = if release.status == "deployed" {
            style(release.status.as_str()).green()
        } else {
            style(release.status.as_str()).dim()
        };
        println!(
            "  {} ({}): {}",
            style(&release.release).cyan(),
            style(&release.namespace).yellow(),
            status
        );
    }
}

/// Print how to reach the web console and retrieve its credentials
pub fn print_access_instructions() {
    println!("\n{}", style("ACCESS").bold().underlined());
    println!("  Reach the web console with:");
    println!(
        "    kubectl -n {INFERENCE_NAMESPACE} port-forward svc/{CONSOLE_RELEASE}-open-webui 8080:80"
    );
    println!("  then open http://localhost:8080. Retrieve the initial admin credential with:");
    println!(
        "    kubectl -n {INFERENCE_NAMESPACE} get secret {CONSOLE_RELEASE}-open-webui -o jsonpath='{{.data.admin-password}}' | base64 -d"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_glyphs_are_distinct() {
        let pass = format!("{}", status_glyph(CheckStatus::Pass));
        let fail = format!("{}", status_glyph(CheckStatus::Fail));
        let warn = format!("{}", status_glyph(CheckStatus::Warn));

        assert!(pass.contains('✓'));
        assert!(fail.contains('✗'));
        assert!(warn.contains('⚠'));
    }
}
