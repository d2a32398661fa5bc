//! Non-destructive platform verification
//!
//! Verification is the mirror image of deployment's fail-fast policy: it is
//! exhaustive. Every component is queried, classified, and recorded, no
//! matter what happened to the components before it; a query failure becomes
//! a FAIL result, never an aborted run. The final report's exit code
//! reflects failures only; warnings are advisory.
//!
//! A trailing informational section queries release existence so the
//! operator can see what is installed; it never influences counts or exit
//! code.

use serde::Serialize;

use basecamp_core::{CheckResult, PodCounts, Report, ReportAggregator, classify_pods};

use crate::client::{ClusterClient, ReleaseStatus};
use crate::plan::{
    CONSOLE_RELEASE, INFERENCE_NAMESPACE, INFERENCE_RELEASE, NETWORK_NAMESPACE, STORAGE_NAMESPACE,
    STORAGE_RELEASE,
};

/// One pod-backed component and where its pods live
#[derive(Debug, Clone, Copy)]
pub struct ComponentCheck {
    pub component: &'static str,
    pub namespace: &'static str,
    pub selector: Option<&'static str>,
}

/// Pod-backed components examined by verification, in report order
pub const COMPONENT_CHECKS: &[ComponentCheck] = &[
    ComponentCheck {
        component: "control-plane",
        namespace: "kube-system",
        selector: Some("tier=control-plane"),
    },
    ComponentCheck {
        component: "pod-network",
        namespace: NETWORK_NAMESPACE,
        selector: None,
    },
    ComponentCheck {
        component: "storage",
        namespace: STORAGE_NAMESPACE,
        selector: None,
    },
    ComponentCheck {
        component: "inference-server",
        namespace: INFERENCE_NAMESPACE,
        selector: Some("app.kubernetes.io/name=ollama"),
    },
    ComponentCheck {
        component: "web-console",
        namespace: INFERENCE_NAMESPACE,
        selector: Some("app.kubernetes.io/name=open-webui"),
    },
];

/// Releases reported in the informational section
const RELEASE_CHECKS: &[(&str, &str)] = &[
    (STORAGE_RELEASE, STORAGE_NAMESPACE),
    (INFERENCE_RELEASE, INFERENCE_NAMESPACE),
    (CONSOLE_RELEASE, INFERENCE_NAMESPACE),
];

/// Observed release existence, informational only
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseCheck {
    pub release: String,
    pub namespace: String,
    pub status: String,
}

/// Everything one verification run produces
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    /// The pass/fail/warn report; owns the exit code
    pub report: Report,
    /// Informational release existence, decoupled from the report
    pub releases: Vec<ReleaseCheck>,
}

impl Verification {
    /// Process exit code for the run
    pub fn exit_code(&self) -> i32 {
        self.report.exit_code()
    }
}

/// Run all checks against live cluster state and build the report.
///
/// Checks are mutually independent and run in declared order; nothing here
/// mutates the cluster.
pub async fn run_verification(client: &dyn ClusterClient) -> Verification {
    let mut aggregator = ReportAggregator::new();

    aggregator.record(check_nodes(client).await);

    for check in COMPONENT_CHECKS {
        aggregator.record(check_component(client, check).await);
    }

    aggregator.record(check_default_storage_class(client).await);

    let mut releases = Vec::with_capacity(RELEASE_CHECKS.len());
    for (release, namespace) in RELEASE_CHECKS {
        let status = match client.release_status(release, namespace).await {
            Ok(ReleaseStatus::Deployed) => "deployed".to_string(),
            Ok(ReleaseStatus::NotFound) => "not installed".to_string(),
            Ok(ReleaseStatus::Error(message)) => message,
            Err(e) => e.to_string(),
        };
        releases.push(ReleaseCheck {
            release: release.to_string(),
            namespace: namespace.to_string(),
            status,
        });
    }

    Verification {
        report: aggregator.finalize(),
        releases,
    }
}

async fn check_nodes(client: &dyn ClusterClient) -> CheckResult {
    match client.nodes().await {
        Ok(nodes) if nodes.is_empty() => CheckResult::fail("nodes", "no nodes found"),
        Ok(nodes) => {
            let total = nodes.len();
            let not_ready: Vec<&str> = nodes
                .iter()
                .filter(|n| !n.ready)
                .map(|n| n.name.as_str())
                .collect();
            if not_ready.is_empty() {
                CheckResult::pass("nodes", format!("all {total} nodes ready"))
            } else {
                CheckResult::fail(
                    "nodes",
                    format!(
                        "{} of {total} nodes not ready ({})",
                        not_ready.len(),
                        not_ready.join(", ")
                    ),
                )
            }
        }
        Err(e) => CheckResult::fail("nodes", format!("node query failed: {e}")),
    }
}

async fn check_component(client: &dyn ClusterClient, check: &ComponentCheck) -> CheckResult {
    match client.namespace_exists(check.namespace).await {
        Ok(false) => CheckResult::fail(
            check.component,
            format!("namespace '{}' does not exist", check.namespace),
        ),
        Err(e) => CheckResult::fail(
            check.component,
            format!("namespace query failed: {e}"),
        ),
        Ok(true) => match client.pods(check.namespace, check.selector).await {
            Ok(phases) => classify_pods(check.component, PodCounts::from_phases(&phases)),
            Err(e) => CheckResult::fail(check.component, format!("pod query failed: {e}")),
        },
    }
}

async fn check_default_storage_class(client: &dyn ClusterClient) -> CheckResult {
    match client.storage_classes().await {
        Ok(classes) => {
            let defaults: Vec<&str> = classes
                .iter()
                .filter(|sc| sc.is_default)
                .map(|sc| sc.name.as_str())
                .collect();
            match defaults.as_slice() {
                [] => CheckResult::warn("storage-class", "no default storage class configured"),
                [single] => CheckResult::pass(
                    "storage-class",
                    format!("default storage class is '{single}'"),
                ),
                many => CheckResult::fail(
                    "storage-class",
                    format!(
                        "{} storage classes marked default ({})",
                        many.len(),
                        many.join(", ")
                    ),
                ),
            }
        }
        Err(e) => CheckResult::fail("storage-class", format!("storage class query failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basecamp_core::{CheckStatus, PodPhase};

    use crate::mock::MockCluster;
    use crate::plan::DEFAULT_STORAGE_CLASS;

    fn healthy_cluster() -> MockCluster {
        MockCluster::new()
            .with_node("cp-1", true)
            .with_namespace("kube-system")
            .with_namespace(NETWORK_NAMESPACE)
            .with_namespace(STORAGE_NAMESPACE)
            .with_namespace(INFERENCE_NAMESPACE)
            .with_pods("kube-system", vec![PodPhase::Running; 4])
            .with_pods(NETWORK_NAMESPACE, vec![PodPhase::Running])
            .with_pods(STORAGE_NAMESPACE, vec![PodPhase::Running])
            .with_pods(INFERENCE_NAMESPACE, vec![PodPhase::Running, PodPhase::Running])
            .with_storage_class(DEFAULT_STORAGE_CLASS, true)
            .with_release(STORAGE_NAMESPACE, STORAGE_RELEASE, ReleaseStatus::Deployed)
            .with_release(INFERENCE_NAMESPACE, INFERENCE_RELEASE, ReleaseStatus::Deployed)
            .with_release(INFERENCE_NAMESPACE, CONSOLE_RELEASE, ReleaseStatus::Deployed)
    }

    #[tokio::test]
    async fn test_healthy_cluster_passes() {
        let cluster = healthy_cluster();
        let verification = run_verification(&cluster).await;

        assert_eq!(verification.report.fail_count, 0);
        assert_eq!(verification.exit_code(), 0);
        // nodes + five components + storage class
        assert_eq!(verification.report.results.len(), 7);
        assert!(verification.releases.iter().all(|r| r.status == "deployed"));
    }

    #[tokio::test]
    async fn test_query_failure_is_recorded_not_fatal() {
        // One component's pod query fails; every component still produces a
        // result
        let cluster = healthy_cluster().with_failing_pod_queries(NETWORK_NAMESPACE);
        let verification = run_verification(&cluster).await;

        assert_eq!(verification.report.results.len(), 7);
        let network = verification
            .report
            .results
            .iter()
            .find(|r| r.component == "pod-network")
            .unwrap();
        assert_eq!(network.status, CheckStatus::Fail);
        assert!(network.message.contains("pod query failed"));
        assert_eq!(verification.exit_code(), 1);

        // Checks after the failing one still ran
        let console = verification
            .report
            .results
            .iter()
            .find(|r| r.component == "web-console")
            .unwrap();
        assert_eq!(console.status, CheckStatus::Pass);
    }

    #[tokio::test]
    async fn test_missing_namespace_fails_component() {
        let cluster = MockCluster::new()
            .with_node("cp-1", true)
            .with_namespace("kube-system")
            .with_pods("kube-system", vec![PodPhase::Running])
            .with_storage_class(DEFAULT_STORAGE_CLASS, true);
        let verification = run_verification(&cluster).await;

        let storage = verification
            .report
            .results
            .iter()
            .find(|r| r.component == "storage")
            .unwrap();
        assert_eq!(storage.status, CheckStatus::Fail);
        assert!(storage.message.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_empty_namespace_warns() {
        let cluster = healthy_cluster().with_pods(STORAGE_NAMESPACE, vec![]);
        let verification = run_verification(&cluster).await;

        let storage = verification
            .report
            .results
            .iter()
            .find(|r| r.component == "storage")
            .unwrap();
        assert_eq!(storage.status, CheckStatus::Warn);
        assert_eq!(storage.message, "no pods present");
        // Warnings never flip the exit code
        assert_eq!(verification.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_unready_node_fails() {
        let cluster = healthy_cluster().with_node("worker-1", false);
        let verification = run_verification(&cluster).await;

        let nodes = verification
            .report
            .results
            .iter()
            .find(|r| r.component == "nodes")
            .unwrap();
        assert_eq!(nodes.status, CheckStatus::Fail);
        assert!(nodes.message.contains("worker-1"));
    }

    #[tokio::test]
    async fn test_competing_defaults_fail() {
        let cluster = healthy_cluster().with_storage_class("ceph-rbd", true);
        let verification = run_verification(&cluster).await;

        let storage_class = verification
            .report
            .results
            .iter()
            .find(|r| r.component == "storage-class")
            .unwrap();
        assert_eq!(storage_class.status, CheckStatus::Fail);
    }

    #[tokio::test]
    async fn test_missing_release_is_informational_only() {
        let cluster = MockCluster::new()
            .with_node("cp-1", true)
            .with_namespace("kube-system")
            .with_namespace(NETWORK_NAMESPACE)
            .with_namespace(STORAGE_NAMESPACE)
            .with_namespace(INFERENCE_NAMESPACE)
            .with_pods("kube-system", vec![PodPhase::Running])
            .with_pods(NETWORK_NAMESPACE, vec![PodPhase::Running])
            .with_pods(STORAGE_NAMESPACE, vec![PodPhase::Running])
            .with_pods(INFERENCE_NAMESPACE, vec![PodPhase::Running])
            .with_storage_class(DEFAULT_STORAGE_CLASS, true);
        let verification = run_verification(&cluster).await;

        // No release is installed, yet the report is clean: release
        // existence is decoupled from pass/fail accounting
        assert_eq!(verification.report.fail_count, 0);
        assert_eq!(verification.exit_code(), 0);
        assert!(
            verification
                .releases
                .iter()
                .all(|r| r.status == "not installed")
        );
    }

    #[tokio::test]
    async fn test_verification_never_mutates() {
        let cluster = healthy_cluster();
        let _ = run_verification(&cluster).await;
        assert_eq!(cluster.operation_counts().mutations(), 0);
    }

    #[tokio::test]
    async fn test_verification_serializes_to_json() {
        let cluster = healthy_cluster();
        let verification = run_verification(&cluster).await;

        let json = serde_json::to_string_pretty(&verification).unwrap();
        assert!(json.contains("\"passCount\""));
        assert!(json.contains("\"releases\""));
    }
}
