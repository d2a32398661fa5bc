//! Mock cluster and host for testing
//!
//! `MockCluster` keeps the whole cluster in memory and counts every
//! operation, so tests can assert not just on end state but on what was
//! (or was not) mutated. `ScriptedHost` answers host commands from a
//! substring-matched script table. Neither requires a cluster or root
//! access.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use basecamp_core::PodPhase;

use crate::client::{ClusterClient, NodeInfo, ReleaseSpec, ReleaseStatus, StorageClassInfo};
use crate::error::{KubeError, Result};
use crate::host::{HostOutput, HostRunner};

/// Counts of operations performed, for testing assertions
#[derive(Debug, Default, Clone)]
pub struct OperationCounts {
    pub node_lists: usize,
    pub pod_lists: usize,
    pub namespace_gets: usize,
    pub storage_class_lists: usize,
    pub release_queries: usize,
    pub namespace_creates: usize,
    pub storage_class_patches: usize,
    pub release_installs: usize,
    pub taint_removals: usize,
}

impl OperationCounts {
    /// Total mutating operations (reads excluded)
    pub fn mutations(&self) -> usize {
        self.namespace_creates
            + self.storage_class_patches
            + self.release_installs
            + self.taint_removals
    }
}

#[derive(Debug, Default)]
struct MockState {
    nodes: Vec<NodeInfo>,
    taints: HashMap<String, Vec<String>>,
    namespaces: BTreeSet<String>,
    pods: HashMap<String, Vec<PodPhase>>,
    storage_classes: Vec<StorageClassInfo>,
    releases: BTreeMap<(String, String), ReleaseStatus>,
    fail_pod_queries: BTreeSet<String>,
    counts: OperationCounts,
}

/// In-memory cluster for unit tests
#[derive(Clone, Default)]
pub struct MockCluster {
    state: Arc<RwLock<MockState>>,
}

impl MockCluster {
    /// Create an empty cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node
    pub fn with_node(self, name: &str, ready: bool) -> Self {
        self.state.write().unwrap().nodes.push(NodeInfo {
            name: name.to_string(),
            ready,
        });
        self
    }

    /// Add a taint to a node
    pub fn with_taint(self, node: &str, taint_key: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .taints
            .entry(node.to_string())
            .or_default()
            .push(taint_key.to_string());
        self
    }

    /// Add an existing namespace
    pub fn with_namespace(self, name: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .namespaces
            .insert(name.to_string());
        self
    }

    /// Set the pods visible in a namespace
    pub fn with_pods(self, namespace: &str, phases: Vec<PodPhase>) -> Self {
        self.state
            .write()
            .unwrap()
            .pods
            .insert(namespace.to_string(), phases);
        self
    }

    /// Add a storage class
    pub fn with_storage_class(self, name: &str, is_default: bool) -> Self {
        self.state
            .write()
            .unwrap()
            .storage_classes
            .push(StorageClassInfo {
                name: name.to_string(),
                is_default,
            });
        self
    }

    /// Set the status of a release
    pub fn with_release(self, namespace: &str, release: &str, status: ReleaseStatus) -> Self {
        self.state
            .write()
            .unwrap()
            .releases
            .insert((namespace.to_string(), release.to_string()), status);
        self
    }

    /// Make pod queries against a namespace fail
    pub fn with_failing_pod_queries(self, namespace: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .fail_pod_queries
            .insert(namespace.to_string());
        self
    }

    /// Operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.state.read().unwrap().counts.clone()
    }

    /// Current taint keys on a node
    pub fn taint_keys(&self, node: &str) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .taints
            .get(node)
            .cloned()
            .unwrap_or_default()
    }

    /// Current storage classes
    pub fn current_storage_classes(&self) -> Vec<StorageClassInfo> {
        self.state.read().unwrap().storage_classes.clone()
    }

    /// Current namespaces
    pub fn current_namespaces(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .namespaces
            .iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ClusterClient for MockCluster {
    async fn nodes(&self) -> Result<Vec<NodeInfo>> {
        let mut state = self.state.write().unwrap();
        state.counts.node_lists += 1;
        Ok(state.nodes.clone())
    }

    async fn pods(&self, namespace: &str, _label_selector: Option<&str>) -> Result<Vec<PodPhase>> {
        let mut state = self.state.write().unwrap();
        state.counts.pod_lists += 1;
        if state.fail_pod_queries.contains(namespace) {
            return Err(KubeError::InvalidConfig(format!(
                "pod query for namespace '{namespace}' failed"
            )));
        }
        Ok(state.pods.get(namespace).cloned().unwrap_or_default())
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        let mut state = self.state.write().unwrap();
        state.counts.namespace_gets += 1;
        Ok(state.namespaces.contains(name))
    }

    async fn storage_classes(&self) -> Result<Vec<StorageClassInfo>> {
        let mut state = self.state.write().unwrap();
        state.counts.storage_class_lists += 1;
        Ok(state.storage_classes.clone())
    }

    async fn set_default_storage_class(&self, name: &str, value: bool) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.counts.storage_class_patches += 1;
        match state.storage_classes.iter_mut().find(|sc| sc.name == name) {
            Some(sc) => {
                sc.is_default = value;
                Ok(())
            }
            None => Err(KubeError::InvalidConfig(format!(
                "storage class '{name}' not found"
            ))),
        }
    }

    async fn release_status(&self, release: &str, namespace: &str) -> Result<ReleaseStatus> {
        let mut state = self.state.write().unwrap();
        state.counts.release_queries += 1;
        Ok(state
            .releases
            .get(&(namespace.to_string(), release.to_string()))
            .cloned()
            .unwrap_or(ReleaseStatus::NotFound))
    }

    async fn install_or_upgrade_release(&self, spec: &ReleaseSpec) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.counts.release_installs += 1;
        state.releases.insert(
            (spec.namespace.clone(), spec.release.clone()),
            ReleaseStatus::Deployed,
        );
        Ok(())
    }

    async fn create_namespace(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.counts.namespace_creates += 1;
        if !state.namespaces.insert(name.to_string()) {
            return Err(KubeError::InvalidConfig(format!(
                "namespace '{name}' already exists"
            )));
        }
        Ok(())
    }

    async fn tainted_nodes(&self, taint_key: &str) -> Result<Vec<String>> {
        let state = self.state.read().unwrap();
        Ok(state
            .taints
            .iter()
            .filter(|(_, keys)| keys.iter().any(|k| k == taint_key))
            .map(|(node, _)| node.clone())
            .collect())
    }

    async fn remove_taint(&self, node: &str, taint_key: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.counts.taint_removals += 1;
        if let Some(keys) = state.taints.get_mut(node) {
            keys.retain(|k| k != taint_key);
        }
        Ok(())
    }
}

/// Scripted host runner answering commands from a substring table
#[derive(Clone, Default)]
pub struct ScriptedHost {
    inner: Arc<RwLock<ScriptedHostState>>,
}

#[derive(Default)]
struct ScriptedHostState {
    responses: Vec<(String, HostOutput)>,
    executed: Vec<String>,
}

impl ScriptedHost {
    /// Create a host where every command succeeds with empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `pattern` with a successful exit and the
    /// given stdout
    pub fn on_success(self, pattern: &str, stdout: &str) -> Self {
        self.on(
            pattern,
            HostOutput {
                status: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    /// Answer commands containing `pattern` with a failing exit
    pub fn on_failure(self, pattern: &str, stderr: &str) -> Self {
        self.on(
            pattern,
            HostOutput {
                status: 1,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Answer commands containing `pattern` with a fixed output
    pub fn on(self, pattern: &str, output: HostOutput) -> Self {
        self.inner
            .write()
            .unwrap()
            .responses
            .push((pattern.to_string(), output));
        self
    }

    /// Scripts executed so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.inner.read().unwrap().executed.clone()
    }

    /// Whether any executed script contains `pattern`
    pub fn ran(&self, pattern: &str) -> bool {
        self.inner
            .read()
            .unwrap()
            .executed
            .iter()
            .any(|s| s.contains(pattern))
    }
}

#[async_trait]
impl HostRunner for ScriptedHost {
    async fn run(&self, script: &str) -> Result<HostOutput> {
        let mut inner = self.inner.write().unwrap();
        inner.executed.push(script.to_string());
        let output = inner
            .responses
            .iter()
            .find(|(pattern, _)| script.contains(pattern))
            .map(|(_, output)| output.clone())
            .unwrap_or(HostOutput {
                status: 0,
                stdout: String::new(),
                stderr: String::new(),
            });
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_namespace_lifecycle() {
        let cluster = MockCluster::new().with_namespace("kube-system");

        assert!(cluster.namespace_exists("kube-system").await.unwrap());
        assert!(!cluster.namespace_exists("platform").await.unwrap());

        cluster.create_namespace("platform").await.unwrap();
        assert!(cluster.namespace_exists("platform").await.unwrap());

        // Creating a namespace that exists is an error, like the real API
        assert!(cluster.create_namespace("platform").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_counts_mutations() {
        let cluster = MockCluster::new().with_storage_class("local-path", false);

        let _ = cluster.nodes().await.unwrap();
        let _ = cluster.storage_classes().await.unwrap();
        cluster
            .set_default_storage_class("local-path", true)
            .await
            .unwrap();

        let counts = cluster.operation_counts();
        assert_eq!(counts.node_lists, 1);
        assert_eq!(counts.storage_class_lists, 1);
        assert_eq!(counts.storage_class_patches, 1);
        assert_eq!(counts.mutations(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing_pod_query() {
        let cluster = MockCluster::new().with_failing_pod_queries("broken");

        assert!(cluster.pods("broken", None).await.is_err());
        assert!(cluster.pods("fine", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_release_install_updates_status() {
        let cluster = MockCluster::new();
        assert_eq!(
            cluster.release_status("storage", "platform").await.unwrap(),
            ReleaseStatus::NotFound
        );

        let spec = ReleaseSpec {
            release: "storage".to_string(),
            chart: "charts/local-path-provisioner".to_string(),
            namespace: "platform".to_string(),
            values: serde_json::Value::Null,
            timeout: std::time::Duration::from_secs(60),
        };
        cluster.install_or_upgrade_release(&spec).await.unwrap();

        assert_eq!(
            cluster.release_status("storage", "platform").await.unwrap(),
            ReleaseStatus::Deployed
        );
    }

    #[tokio::test]
    async fn test_mock_remove_taint() {
        let cluster = MockCluster::new()
            .with_node("cp-1", true)
            .with_taint("cp-1", "node-role.kubernetes.io/control-plane");

        cluster
            .remove_taint("cp-1", "node-role.kubernetes.io/control-plane")
            .await
            .unwrap();

        assert!(cluster.taint_keys("cp-1").is_empty());
    }

    #[tokio::test]
    async fn test_scripted_host_matches_patterns() {
        let host = ScriptedHost::new()
            .on_success("swapon", "/dev/sda2 partition")
            .on_failure("modprobe", "module not found");

        let swap = host.run("swapon --noheadings").await.unwrap();
        assert!(swap.success());
        assert_eq!(swap.stdout, "/dev/sda2 partition");

        let module = host.run("modprobe br_netfilter").await.unwrap();
        assert!(!module.success());

        // Unmatched commands succeed with empty output
        let other = host.run("true").await.unwrap();
        assert!(other.success());

        assert!(host.ran("swapon"));
        assert_eq!(host.executed().len(), 3);
    }
}
