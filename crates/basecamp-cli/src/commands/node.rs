//! Node command - prepare this host for cluster bootstrap

use std::sync::Arc;

use basecamp_kube::host::HostRunner;
use basecamp_kube::{Shell, node_plan};

use crate::error::Result;

/// Run the node preparation phase
pub async fn run(mirror: Option<String>, model: Option<String>, dry_run: bool) -> Result<i32> {
    let profile = super::build_profile(mirror, model)?;
    let host: Arc<dyn HostRunner> = Arc::new(Shell::new());

    super::execute("node preparation", node_plan(&host, &profile), dry_run).await
}
