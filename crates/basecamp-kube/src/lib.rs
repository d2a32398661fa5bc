//! Basecamp Kube - Kubernetes integration for Basecamp
//!
//! This crate provides:
//! - **Cluster Client**: one trait over every cluster read and write the
//!   orchestrator performs, with a `kube`-backed production implementation
//! - **Deployment Plans**: guarded, polled stage lists for the node,
//!   cluster, and platform phases
//! - **Verification**: exhaustive, non-destructive health reporting
//! - **Profiles**: mirror and model selection threaded into the plans
//! - **Mocks**: in-memory cluster and scripted host for tests

pub mod client;
pub mod error;
pub mod helm;
pub mod host;
pub mod mock;
pub mod plan;
pub mod profile;
pub mod verify;

pub use client::{
    ClusterClient, KubeCluster, NodeInfo, ReleaseSpec, ReleaseStatus, StorageClassInfo,
};
pub use error::{KubeError, Result};
pub use helm::Helm;
pub use host::{HostOutput, HostRunner, Shell};
pub use mock::{MockCluster, OperationCounts, ScriptedHost};
pub use plan::{cluster_plan, node_plan, platform_plan};
pub use profile::{DEFAULT_MODEL, Mirror, Profile};
pub use verify::{ComponentCheck, ReleaseCheck, Verification, run_verification};
