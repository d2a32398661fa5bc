//! Cluster access for Basecamp operations
//!
//! `ClusterClient` is the single seam between the deployment/verification
//! engine and the outside world. The production implementation
//! (`KubeCluster`) reads and patches resources through the Kubernetes API
//! and drives release operations through the `helm` binary; tests use the
//! in-memory `MockCluster` instead.
//!
//! Every call is a fresh read. Nothing is cached across stages or checks:
//! idempotency and health are always derived from live cluster state.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, Taint};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use serde::{Deserialize, Serialize};

use basecamp_core::PodPhase;

use crate::error::Result;
use crate::helm::Helm;

/// Annotation marking a StorageClass as the cluster default
pub const DEFAULT_STORAGE_CLASS_ANNOTATION: &str = "storageclass.kubernetes.io/is-default-class";

/// A node and its readiness, from one point-in-time read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub ready: bool,
}

/// A storage class and whether it carries the default annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClassInfo {
    pub name: String,
    pub is_default: bool,
}

/// Observed state of a named release
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseStatus {
    /// The release exists and reports deployed
    Deployed,
    /// No release by that name in the namespace
    NotFound,
    /// The release exists but reports a non-deployed state, or the query
    /// returned something unexpected
    Error(String),
}

/// Everything needed to install or upgrade one release
#[derive(Debug, Clone)]
pub struct ReleaseSpec {
    /// Release name
    pub release: String,
    /// Chart reference (repo/chart or OCI URL)
    pub chart: String,
    /// Target namespace
    pub namespace: String,
    /// Values overriding the chart defaults
    pub values: serde_json::Value,
    /// Time budget handed to the release tool
    pub timeout: Duration,
}

/// Read/write access to the cluster resources Basecamp manages
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List all nodes with their readiness
    async fn nodes(&self) -> Result<Vec<NodeInfo>>;

    /// List pod phases in a namespace, optionally filtered by label selector
    async fn pods(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<PodPhase>>;

    /// Whether a namespace exists
    async fn namespace_exists(&self, name: &str) -> Result<bool>;

    /// List all storage classes with their default annotation
    async fn storage_classes(&self) -> Result<Vec<StorageClassInfo>>;

    /// Set or clear the default annotation on one storage class
    async fn set_default_storage_class(&self, name: &str, value: bool) -> Result<()>;

    /// Query the status of a release
    async fn release_status(&self, release: &str, namespace: &str) -> Result<ReleaseStatus>;

    /// Install a release, or upgrade it in place if it already exists
    async fn install_or_upgrade_release(&self, spec: &ReleaseSpec) -> Result<()>;

    /// Create a namespace
    async fn create_namespace(&self, name: &str) -> Result<()>;

    /// Names of nodes currently carrying a taint with the given key
    async fn tainted_nodes(&self, taint_key: &str) -> Result<Vec<String>>;

    /// Remove a taint (by key) from a node; removing an absent taint is not
    /// an error
    async fn remove_taint(&self, node: &str, taint_key: &str) -> Result<()>;
}

/// Production client backed by the Kubernetes API and the `helm` binary
pub struct KubeCluster {
    client: kube::Client,
    helm: Helm,
}

impl KubeCluster {
    /// Connect using the default kubeconfig resolution
    pub async fn new() -> Result<Self> {
        let client = kube::Client::try_default().await?;
        Ok(Self {
            client,
            helm: Helm::new(),
        })
    }

    /// Create with an existing Kubernetes client
    pub fn with_client(client: kube::Client) -> Self {
        Self {
            client,
            helm: Helm::new(),
        }
    }

    fn node_is_ready(node: &Node) -> bool {
        node.status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .any(|c| c.type_ == "Ready" && c.status == "True")
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn nodes(&self) -> Result<Vec<NodeInfo>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&ListParams::default()).await?;

        Ok(nodes
            .items
            .iter()
            .map(|node| NodeInfo {
                name: node.metadata.name.clone().unwrap_or_default(),
                ready: Self::node_is_ready(node),
            })
            .collect())
    }

    async fn pods(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<PodPhase>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let pods = api.list(&params).await?;

        Ok(pods
            .items
            .iter()
            .map(|pod| {
                pod.status
                    .as_ref()
                    .and_then(|s| s.phase.as_deref())
                    .map(PodPhase::parse)
                    .unwrap_or(PodPhase::Unknown)
            })
            .collect())
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?.is_some())
    }

    async fn storage_classes(&self) -> Result<Vec<StorageClassInfo>> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        let classes = api.list(&ListParams::default()).await?;

        Ok(classes
            .items
            .iter()
            .map(|sc| {
                let is_default = sc
                    .metadata
                    .annotations
                    .as_ref()
                    .and_then(|a| a.get(DEFAULT_STORAGE_CLASS_ANNOTATION))
                    .map(|v| v == "true")
                    .unwrap_or(false);
                StorageClassInfo {
                    name: sc.metadata.name.clone().unwrap_or_default(),
                    is_default,
                }
            })
            .collect())
    }

    async fn set_default_storage_class(&self, name: &str, value: bool) -> Result<()> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        let patch = serde_json::json!({
            "metadata": {
                "annotations": {
                    DEFAULT_STORAGE_CLASS_ANNOTATION: value.to_string(),
                }
            }
        });
        api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn release_status(&self, release: &str, namespace: &str) -> Result<ReleaseStatus> {
        self.helm.status(release, namespace).await
    }

    async fn install_or_upgrade_release(&self, spec: &ReleaseSpec) -> Result<()> {
        self.helm.upgrade_install(spec).await
    }

    async fn create_namespace(&self, name: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(BTreeMap::from([(
                    "app.kubernetes.io/managed-by".to_string(),
                    "basecamp".to_string(),
                )])),
                ..Default::default()
            },
            ..Default::default()
        };
        api.create(&PostParams::default(), &namespace).await?;
        Ok(())
    }

    async fn tainted_nodes(&self, taint_key: &str) -> Result<Vec<String>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&ListParams::default()).await?;

        Ok(nodes
            .items
            .iter()
            .filter(|node| {
                node.spec
                    .as_ref()
                    .and_then(|s| s.taints.as_ref())
                    .map(|taints| taints.iter().any(|t| t.key == taint_key))
                    .unwrap_or(false)
            })
            .map(|node| node.metadata.name.clone().unwrap_or_default())
            .collect())
    }

    async fn remove_taint(&self, node: &str, taint_key: &str) -> Result<()> {
        let api: Api<Node> = Api::all(self.client.clone());
        let current = api.get(node).await?;

        let taints: Vec<Taint> = current
            .spec
            .as_ref()
            .and_then(|s| s.taints.clone())
            .unwrap_or_default();

        let remaining: Vec<Taint> = taints
            .into_iter()
            .filter(|t| t.key != taint_key)
            .collect();

        // Merge patches replace the whole taint list, which is exactly what
        // we want here
        let patch = serde_json::json!({
            "spec": {
                "taints": remaining,
            }
        });
        api.patch(node, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}
