//! Cluster command - initialize the control plane and pod network

use std::sync::Arc;

use basecamp_kube::host::HostRunner;
use basecamp_kube::{ClusterClient, KubeCluster, Shell, cluster_plan};

use crate::error::Result;

/// Run the cluster bootstrap phase
pub async fn run(mirror: Option<String>, model: Option<String>, dry_run: bool) -> Result<i32> {
    let profile = super::build_profile(mirror, model)?;
    let host: Arc<dyn HostRunner> = Arc::new(Shell::new());
    let client: Arc<dyn ClusterClient> = Arc::new(KubeCluster::new().await?);

    super::execute(
        "cluster bootstrap",
        cluster_plan(&host, &client, &profile),
        dry_run,
    )
    .await
}
