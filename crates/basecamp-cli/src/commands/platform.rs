//! Platform command - install the storage, inference, and console components

use std::sync::Arc;

use basecamp_kube::{ClusterClient, KubeCluster, platform_plan};

use crate::error::Result;

/// Run the platform installation phase
pub async fn run(mirror: Option<String>, model: Option<String>, dry_run: bool) -> Result<i32> {
    let profile = super::build_profile(mirror, model)?;
    let client: Arc<dyn ClusterClient> = Arc::new(KubeCluster::new().await?);

    super::execute("platform installation", platform_plan(&client, &profile), dry_run).await
}
