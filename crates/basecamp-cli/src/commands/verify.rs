//! Verify command - exhaustive, non-destructive platform health report

use basecamp_kube::{KubeCluster, run_verification};

use crate::display;
use crate::error::Result;

/// Run verification and report. The exit code reflects failures only;
/// warnings are advisory.
pub async fn run(json: bool) -> Result<i32> {
    let client = KubeCluster::new().await?;
    let verification = run_verification(&client).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&verification)?);
    } else {
        display::print_report(&verification.report);
        display::print_releases(&verification.releases);
        display::print_access_instructions();
    }

    Ok(verification.exit_code())
}
