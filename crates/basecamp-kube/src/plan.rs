//! Deployment plans
//!
//! Each deployment phase is an ordered list of stages. A stage's guard reads
//! live state (host or cluster) and decides whether the mutating action can
//! be skipped; a stage's postcondition, where present, is an advisory
//! readiness poll with stage-specific interval and deadline. Plans are built
//! fresh per invocation and consumed in one pass by the `StageRunner`.
//!
//! Guard query failures map to `Unknown`, which the runner treats as
//! `NotSatisfied`: on ambiguous evidence the orchestrator re-attempts the
//! idempotent action rather than silently skipping it.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::json;

use basecamp_core::poll::PredicateFn;
use basecamp_core::stage::{ActionFn, GuardFn};
use basecamp_core::{ActionError, GuardOutcome, PodCounts, PollSpec, Stage};

use crate::client::{ClusterClient, ReleaseSpec, ReleaseStatus};
use crate::host::{HostOutput, HostRunner};
use crate::profile::Profile;

/// Pinned version for the kubeadm/kubelet/kubectl packages
pub const KUBE_PACKAGE_VERSION: &str = "1.31.6-1.1";

/// Taint kubeadm places on control-plane nodes
pub const CONTROL_PLANE_TAINT: &str = "node-role.kubernetes.io/control-plane";

/// Namespace the pod network deploys into
pub const NETWORK_NAMESPACE: &str = "kube-flannel";

/// Namespace for the storage provisioner
pub const STORAGE_NAMESPACE: &str = "basecamp-storage";

/// Namespace for the inference server and web console
pub const INFERENCE_NAMESPACE: &str = "basecamp-inference";

/// Storage class the provisioner creates; becomes the cluster default
pub const DEFAULT_STORAGE_CLASS: &str = "local-path";

/// Release names
pub const STORAGE_RELEASE: &str = "storage";
pub const INFERENCE_RELEASE: &str = "inference";
pub const CONSOLE_RELEASE: &str = "console";

/// Namespaces the platform phase owns
pub const PLATFORM_NAMESPACES: &[&str] = &[STORAGE_NAMESPACE, INFERENCE_NAMESPACE];

type Client = Arc<dyn ClusterClient>;
type Host = Arc<dyn HostRunner>;

// ========== Stage plumbing ==========

fn host_guard<F>(host: &Host, probe: impl Into<String>, satisfied: F) -> GuardFn
where
    F: Fn(&HostOutput) -> bool + Send + Sync + 'static,
{
    let host = host.clone();
    let probe: String = probe.into();
    let satisfied = Arc::new(satisfied);
    Box::new(move || {
        let host = host.clone();
        let probe = probe.clone();
        let satisfied = satisfied.clone();
        async move {
            match host.run(&probe).await {
                Ok(output) if satisfied(&output) => GuardOutcome::AlreadySatisfied,
                Ok(_) => GuardOutcome::NotSatisfied,
                Err(_) => GuardOutcome::Unknown,
            }
        }
        .boxed()
    })
}

fn host_action(host: &Host, what: impl Into<String>, script: impl Into<String>) -> ActionFn {
    let host = host.clone();
    let what: String = what.into();
    let script: String = script.into();
    Box::new(move || {
        let host = host.clone();
        let what = what.clone();
        let script = script.clone();
        async move {
            match host.run(&script).await {
                Ok(output) if output.success() => Ok(()),
                Ok(output) => Err(ActionError::new(format!(
                    "{what} exited {}: {}",
                    output.status,
                    output.stderr.trim()
                ))),
                Err(e) => Err(ActionError::new(format!("{what}: {e}"))),
            }
        }
        .boxed()
    })
}

fn release_guard(client: &Client, release: &'static str, namespace: &'static str) -> GuardFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        async move {
            match client.release_status(release, namespace).await {
                Ok(ReleaseStatus::Deployed) => GuardOutcome::AlreadySatisfied,
                Ok(ReleaseStatus::NotFound) => GuardOutcome::NotSatisfied,
                // A release stuck in failed/pending, or an unanswerable
                // query: re-running the upgrade is the safe path
                Ok(ReleaseStatus::Error(_)) | Err(_) => GuardOutcome::Unknown,
            }
        }
        .boxed()
    })
}

fn release_action(client: &Client, spec: ReleaseSpec) -> ActionFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        let spec = spec.clone();
        async move {
            client
                .install_or_upgrade_release(&spec)
                .await
                .map_err(|e| {
                    ActionError::new(format!("installing release '{}': {e}", spec.release))
                })
        }
        .boxed()
    })
}

fn namespaces_guard(client: &Client, namespaces: Vec<String>) -> GuardFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        let namespaces = namespaces.clone();
        async move {
            for namespace in &namespaces {
                match client.namespace_exists(namespace).await {
                    Ok(true) => {}
                    Ok(false) => return GuardOutcome::NotSatisfied,
                    Err(_) => return GuardOutcome::Unknown,
                }
            }
            GuardOutcome::AlreadySatisfied
        }
        .boxed()
    })
}

fn create_namespaces_action(client: &Client, namespaces: Vec<String>) -> ActionFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        let namespaces = namespaces.clone();
        async move {
            for namespace in &namespaces {
                let exists = client.namespace_exists(namespace).await.map_err(|e| {
                    ActionError::new(format!("querying namespace '{namespace}': {e}"))
                })?;
                if !exists {
                    client.create_namespace(namespace).await.map_err(|e| {
                        ActionError::new(format!("creating namespace '{namespace}': {e}"))
                    })?;
                }
            }
            Ok(())
        }
        .boxed()
    })
}

fn untainted_guard(client: &Client, taint_key: &'static str) -> GuardFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        async move {
            match client.tainted_nodes(taint_key).await {
                Ok(nodes) if nodes.is_empty() => GuardOutcome::AlreadySatisfied,
                Ok(_) => GuardOutcome::NotSatisfied,
                Err(_) => GuardOutcome::Unknown,
            }
        }
        .boxed()
    })
}

fn remove_taint_action(client: &Client, taint_key: &'static str) -> ActionFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        async move {
            let nodes = client
                .tainted_nodes(taint_key)
                .await
                .map_err(|e| ActionError::new(format!("listing tainted nodes: {e}")))?;
            for node in nodes {
                client.remove_taint(&node, taint_key).await.map_err(|e| {
                    ActionError::new(format!("removing taint from node '{node}': {e}"))
                })?;
            }
            Ok(())
        }
        .boxed()
    })
}

fn nodes_ready_guard(client: &Client) -> GuardFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        async move {
            match client.nodes().await {
                Ok(nodes) if !nodes.is_empty() && nodes.iter().all(|n| n.ready) => {
                    GuardOutcome::AlreadySatisfied
                }
                Ok(_) => GuardOutcome::NotSatisfied,
                Err(_) => GuardOutcome::Unknown,
            }
        }
        .boxed()
    })
}

fn default_class_guard(client: &Client, target: &'static str) -> GuardFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        async move {
            match client.storage_classes().await {
                Ok(classes) => {
                    let target_default =
                        classes.iter().any(|sc| sc.name == target && sc.is_default);
                    let others_default =
                        classes.iter().any(|sc| sc.name != target && sc.is_default);
                    if target_default && !others_default {
                        GuardOutcome::AlreadySatisfied
                    } else {
                        GuardOutcome::NotSatisfied
                    }
                }
                Err(_) => GuardOutcome::Unknown,
            }
        }
        .boxed()
    })
}

fn default_class_action(client: &Client, target: &'static str) -> ActionFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        async move {
            let classes = client
                .storage_classes()
                .await
                .map_err(|e| ActionError::new(format!("listing storage classes: {e}")))?;

            if !classes.iter().any(|sc| sc.name == target) {
                return Err(ActionError::new(format!(
                    "storage class '{target}' not found; was the storage provisioner installed?"
                )));
            }

            // Demote before promoting so at most one class is default at
            // every point in time
            for sc in classes.iter().filter(|sc| sc.is_default && sc.name != target) {
                client
                    .set_default_storage_class(&sc.name, false)
                    .await
                    .map_err(|e| {
                        ActionError::new(format!("demoting storage class '{}': {e}", sc.name))
                    })?;
            }
            if !classes.iter().any(|sc| sc.name == target && sc.is_default) {
                client
                    .set_default_storage_class(target, true)
                    .await
                    .map_err(|e| {
                        ActionError::new(format!("promoting storage class '{target}': {e}"))
                    })?;
            }
            Ok(())
        }
        .boxed()
    })
}

// ========== Readiness predicates ==========

fn pods_running(client: &Client, namespace: &'static str, selector: Option<&'static str>) -> PredicateFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        async move {
            match client.pods(namespace, selector).await {
                Ok(phases) if !phases.is_empty() => {
                    let counts = PodCounts::from_phases(&phases);
                    counts.running == counts.total
                }
                _ => false,
            }
        }
        .boxed()
    })
}

fn nodes_registered(client: &Client) -> PredicateFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        async move { matches!(client.nodes().await, Ok(nodes) if !nodes.is_empty()) }.boxed()
    })
}

fn nodes_ready(client: &Client) -> PredicateFn {
    let client = client.clone();
    Box::new(move || {
        let client = client.clone();
        async move {
            matches!(client.nodes().await,
                Ok(nodes) if !nodes.is_empty() && nodes.iter().all(|n| n.ready))
        }
        .boxed()
    })
}

// ========== Release specs ==========

fn storage_release(profile: &Profile) -> ReleaseSpec {
    ReleaseSpec {
        release: STORAGE_RELEASE.to_string(),
        chart: profile.mirror.chart("local-path-provisioner"),
        namespace: STORAGE_NAMESPACE.to_string(),
        values: json!({
            "storageClass": {
                "create": true,
                "name": DEFAULT_STORAGE_CLASS,
                // The dedicated configuration stage owns the default flag
                "defaultClass": false,
            },
        }),
        timeout: Duration::from_secs(120),
    }
}

fn inference_release(profile: &Profile) -> ReleaseSpec {
    ReleaseSpec {
        release: INFERENCE_RELEASE.to_string(),
        chart: profile.mirror.chart("ollama"),
        namespace: INFERENCE_NAMESPACE.to_string(),
        values: json!({
            "ollama": {
                "models": { "pull": [profile.model] },
            },
            "persistentVolume": {
                "enabled": true,
                "storageClass": DEFAULT_STORAGE_CLASS,
            },
        }),
        timeout: Duration::from_secs(600),
    }
}

fn console_release(profile: &Profile) -> ReleaseSpec {
    ReleaseSpec {
        release: CONSOLE_RELEASE.to_string(),
        chart: profile.mirror.chart("open-webui"),
        namespace: INFERENCE_NAMESPACE.to_string(),
        values: json!({
            "ollama": { "enabled": false },
            "ollamaUrls": [
                format!("http://{INFERENCE_RELEASE}-ollama.{INFERENCE_NAMESPACE}.svc:11434"),
            ],
        }),
        timeout: Duration::from_secs(300),
    }
}

// ========== Phase plans ==========

/// Host preparation: mirror config, swap, kernel modules, pinned packages.
///
/// These stages settle synchronously, so none carries a postcondition poll.
pub fn node_plan(host: &Host, profile: &Profile) -> Vec<Stage> {
    let repo = profile.mirror.package_repo();

    vec![
        Stage::new(
            "configure package mirror",
            host_guard(
                host,
                format!("grep -qs '{repo}' /etc/apt/sources.list.d/basecamp.list"),
                |out| out.success(),
            ),
        )
        .with_action(host_action(
            host,
            "configuring package mirror",
            format!(
                "mkdir -p /etc/apt/keyrings \
                 && curl -fsSL {repo}Release.key | gpg --dearmor -o /etc/apt/keyrings/basecamp.gpg \
                 && echo 'deb [signed-by=/etc/apt/keyrings/basecamp.gpg] {repo} /' > /etc/apt/sources.list.d/basecamp.list \
                 && apt-get update"
            ),
        )),
        Stage::new(
            "disable swap",
            host_guard(host, "swapon --noheadings", |out| {
                out.success() && out.stdout.trim().is_empty()
            }),
        )
        .with_action(host_action(
            host,
            "disabling swap",
            "swapoff -a && sed -ri 's|^([^#].*[[:space:]]swap[[:space:]])|#\\1|' /etc/fstab",
        )),
        Stage::new(
            "load kernel modules",
            host_guard(
                host,
                "lsmod | grep -q '^overlay' && lsmod | grep -q '^br_netfilter'",
                |out| out.success(),
            ),
        )
        .with_action(host_action(
            host,
            "loading kernel modules",
            "modprobe overlay && modprobe br_netfilter \
             && printf 'overlay\\nbr_netfilter\\n' > /etc/modules-load.d/basecamp.conf \
             && sysctl -q -w net.bridge.bridge-nf-call-iptables=1 net.ipv4.ip_forward=1",
        )),
        Stage::new(
            "install container runtime",
            host_guard(host, "apt-mark showhold | grep -qx containerd.io", |out| {
                out.success()
            }),
        )
        .with_action(host_action(
            host,
            "installing container runtime",
            "apt-get install -y containerd.io \
             && systemctl enable --now containerd \
             && apt-mark hold containerd.io",
        )),
        Stage::new(
            "install cluster packages",
            host_guard(
                host,
                "dpkg-query -W -f='${Version}' kubeadm 2>/dev/null",
                |out| out.success() && out.stdout.trim() == KUBE_PACKAGE_VERSION,
            ),
        )
        .with_action(host_action(
            host,
            "installing cluster packages",
            format!(
                "apt-get install -y kubeadm={v} kubelet={v} kubectl={v} \
                 && apt-mark hold kubeadm kubelet kubectl \
                 && systemctl enable --now kubelet",
                v = KUBE_PACKAGE_VERSION
            ),
        )),
    ]
}

/// Control plane bootstrap: init, pod network, taint removal, readiness.
pub fn cluster_plan(host: &Host, client: &Client, profile: &Profile) -> Vec<Stage> {
    vec![
        Stage::new(
            "initialize control plane",
            host_guard(host, "test -f /etc/kubernetes/admin.conf", |out| {
                out.success()
            }),
        )
        .with_action(host_action(
            host,
            "initializing control plane",
            format!(
                "kubeadm init --pod-network-cidr=10.244.0.0/16 --image-repository {}",
                profile.mirror.image_registry()
            ),
        ))
        // The API server comes up within a couple of minutes of kubeadm
        // returning; the node registering itself is the observable effect
        .with_postcondition(PollSpec::new(
            nodes_registered(client),
            Duration::from_secs(5),
            Duration::from_secs(120),
        )),
        Stage::new(
            "install pod network",
            namespaces_guard(client, vec![NETWORK_NAMESPACE.to_string()]),
        )
        .with_action(host_action(
            host,
            "installing pod network",
            format!(
                "kubectl --kubeconfig /etc/kubernetes/admin.conf apply -f {}",
                profile.mirror.network_manifest()
            ),
        ))
        .with_postcondition(PollSpec::new(
            pods_running(client, NETWORK_NAMESPACE, None),
            Duration::from_secs(5),
            Duration::from_secs(300),
        )),
        Stage::new(
            "remove control-plane taint",
            untainted_guard(client, CONTROL_PLANE_TAINT),
        )
        .with_action(remove_taint_action(client, CONTROL_PLANE_TAINT)),
        // Pure wait: kubelets flip Ready once the CNI is up
        Stage::new("wait for node readiness", nodes_ready_guard(client)).with_postcondition(
            PollSpec::new(
                nodes_ready(client),
                Duration::from_secs(5),
                Duration::from_secs(300),
            ),
        ),
    ]
}

/// Platform installation: namespaces, storage, default class, releases.
pub fn platform_plan(client: &Client, profile: &Profile) -> Vec<Stage> {
    let namespaces: Vec<String> = PLATFORM_NAMESPACES.iter().map(|s| s.to_string()).collect();

    vec![
        Stage::new(
            "create platform namespaces",
            namespaces_guard(client, namespaces.clone()),
        )
        .with_action(create_namespaces_action(client, namespaces)),
        Stage::new(
            "install storage provisioner",
            release_guard(client, STORAGE_RELEASE, STORAGE_NAMESPACE),
        )
        .with_action(release_action(client, storage_release(profile)))
        .with_postcondition(PollSpec::new(
            pods_running(client, STORAGE_NAMESPACE, None),
            Duration::from_secs(5),
            Duration::from_secs(180),
        )),
        Stage::new(
            "set default storage class",
            default_class_guard(client, DEFAULT_STORAGE_CLASS),
        )
        .with_action(default_class_action(client, DEFAULT_STORAGE_CLASS)),
        Stage::new(
            "install inference server",
            release_guard(client, INFERENCE_RELEASE, INFERENCE_NAMESPACE),
        )
        .with_action(release_action(client, inference_release(profile)))
        // Model pulls dominate here; give the rollout a long leash
        .with_postcondition(PollSpec::new(
            pods_running(
                client,
                INFERENCE_NAMESPACE,
                Some("app.kubernetes.io/name=ollama"),
            ),
            Duration::from_secs(10),
            Duration::from_secs(600),
        )),
        Stage::new(
            "install web console",
            release_guard(client, CONSOLE_RELEASE, INFERENCE_NAMESPACE),
        )
        .with_action(release_action(client, console_release(profile)))
        .with_postcondition(PollSpec::new(
            pods_running(
                client,
                INFERENCE_NAMESPACE,
                Some("app.kubernetes.io/name=open-webui"),
            ),
            Duration::from_secs(5),
            Duration::from_secs(300),
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use basecamp_core::{PodPhase, StageRunner, StageStatus};

    use crate::mock::{MockCluster, ScriptedHost};

    fn provisioned_cluster() -> MockCluster {
        MockCluster::new()
            .with_node("cp-1", true)
            .with_namespace(NETWORK_NAMESPACE)
            .with_namespace(STORAGE_NAMESPACE)
            .with_namespace(INFERENCE_NAMESPACE)
            .with_pods(NETWORK_NAMESPACE, vec![PodPhase::Running])
            .with_pods(STORAGE_NAMESPACE, vec![PodPhase::Running])
            .with_pods(INFERENCE_NAMESPACE, vec![PodPhase::Running, PodPhase::Running])
            .with_storage_class(DEFAULT_STORAGE_CLASS, true)
            .with_release(STORAGE_NAMESPACE, STORAGE_RELEASE, ReleaseStatus::Deployed)
            .with_release(INFERENCE_NAMESPACE, INFERENCE_RELEASE, ReleaseStatus::Deployed)
            .with_release(INFERENCE_NAMESPACE, CONSOLE_RELEASE, ReleaseStatus::Deployed)
    }

    #[tokio::test]
    async fn test_platform_plan_is_idempotent_when_provisioned() {
        let cluster = provisioned_cluster();
        let client: Client = Arc::new(cluster.clone());

        let outcome = StageRunner::new(platform_plan(&client, &Profile::default()))
            .run()
            .await;

        assert!(!outcome.is_fatal());
        assert!(
            outcome
                .records()
                .iter()
                .all(|r| r.status == StageStatus::Skipped)
        );
        assert_eq!(cluster.operation_counts().mutations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_platform_plan_provisions_from_empty_cluster() {
        let cluster = MockCluster::new()
            .with_node("cp-1", true)
            .with_pods(STORAGE_NAMESPACE, vec![PodPhase::Running])
            .with_pods(INFERENCE_NAMESPACE, vec![PodPhase::Running])
            .with_storage_class(DEFAULT_STORAGE_CLASS, false);
        let client: Client = Arc::new(cluster.clone());

        let outcome = StageRunner::new(platform_plan(&client, &Profile::default()))
            .run()
            .await;

        assert!(!outcome.is_fatal());
        assert_eq!(
            cluster.current_namespaces(),
            vec![INFERENCE_NAMESPACE.to_string(), STORAGE_NAMESPACE.to_string()]
        );
        let counts = cluster.operation_counts();
        assert_eq!(counts.namespace_creates, 2);
        assert_eq!(counts.release_installs, 3);
        assert_eq!(counts.storage_class_patches, 1);
    }

    #[tokio::test]
    async fn test_default_class_stage_leaves_exactly_one_default() {
        // Two classes both marked default: the stage must demote the
        // non-target and keep the target
        let cluster = provisioned_cluster().with_storage_class("ceph-rbd", true);
        let client: Client = Arc::new(cluster.clone());

        let outcome = StageRunner::new(platform_plan(&client, &Profile::default()))
            .run()
            .await;

        assert!(!outcome.is_fatal());
        let defaults: Vec<String> = cluster
            .current_storage_classes()
            .into_iter()
            .filter(|sc| sc.is_default)
            .map(|sc| sc.name)
            .collect();
        assert_eq!(defaults, vec![DEFAULT_STORAGE_CLASS.to_string()]);
    }

    #[tokio::test]
    async fn test_default_class_action_fails_without_target_class() {
        let cluster = provisioned_cluster();
        let client: Client = Arc::new(cluster);

        let outcome = StageRunner::new(vec![
            Stage::new("set default storage class", default_class_guard(&client, "missing"))
                .with_action(default_class_action(&client, "missing")),
        ])
        .run()
        .await;

        assert!(outcome.is_fatal());
    }

    #[tokio::test]
    async fn test_node_plan_skips_when_host_is_prepared() {
        let host_impl = ScriptedHost::new()
            .on_success("dpkg-query", KUBE_PACKAGE_VERSION);
        let host: Host = Arc::new(host_impl.clone());

        let outcome = StageRunner::new(node_plan(&host, &Profile::default()))
            .run()
            .await;

        assert!(!outcome.is_fatal());
        assert!(
            outcome
                .records()
                .iter()
                .all(|r| r.status == StageStatus::Skipped)
        );
        assert!(!host_impl.ran("apt-get install"));
    }

    #[tokio::test]
    async fn test_node_plan_installs_missing_packages() {
        // Version probe answers empty: packages missing, install must run
        let host_impl = ScriptedHost::new().on_success("dpkg-query", "");
        let host: Host = Arc::new(host_impl.clone());

        let outcome = StageRunner::new(node_plan(&host, &Profile::default()))
            .run()
            .await;

        assert!(!outcome.is_fatal());
        assert!(host_impl.ran(&format!("kubeadm={KUBE_PACKAGE_VERSION}")));
    }

    #[tokio::test]
    async fn test_node_plan_fail_fast_stops_before_cluster_packages() {
        let host_impl = ScriptedHost::new()
            .on_failure("showhold", "not held")
            .on_failure("apt-get install -y containerd.io", "mirror unreachable")
            .on_success("dpkg-query", "");
        let host: Host = Arc::new(host_impl.clone());

        let outcome = StageRunner::new(node_plan(&host, &Profile::default()))
            .run()
            .await;

        assert!(outcome.is_fatal());
        assert!(!host_impl.ran("kubeadm="));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cluster_plan_initializes_when_admin_conf_missing() {
        let host_impl = ScriptedHost::new().on_failure("test -f", "");
        let host: Host = Arc::new(host_impl.clone());
        let cluster = provisioned_cluster();
        let client: Client = Arc::new(cluster);

        let outcome = StageRunner::new(cluster_plan(&host, &client, &Profile::default()))
            .run()
            .await;

        assert!(!outcome.is_fatal());
        assert!(host_impl.ran("kubeadm init"));
    }

    #[tokio::test]
    async fn test_cluster_plan_removes_control_plane_taint() {
        let host_impl = ScriptedHost::new().on_success("test -f", "");
        let host: Host = Arc::new(host_impl);
        let cluster = provisioned_cluster().with_taint("cp-1", CONTROL_PLANE_TAINT);
        let client: Client = Arc::new(cluster.clone());

        let outcome = StageRunner::new(cluster_plan(&host, &client, &Profile::default()))
            .run()
            .await;

        assert!(!outcome.is_fatal());
        assert!(cluster.taint_keys("cp-1").is_empty());
        assert_eq!(cluster.operation_counts().taint_removals, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cluster_plan_warns_when_network_never_settles() {
        let host_impl = ScriptedHost::new().on_success("test -f", "");
        let host: Host = Arc::new(host_impl);
        // Network namespace missing, and its pods stay pending forever
        let cluster = MockCluster::new()
            .with_node("cp-1", true)
            .with_pods(NETWORK_NAMESPACE, vec![PodPhase::Pending]);
        let client: Client = Arc::new(cluster);

        let outcome = StageRunner::new(cluster_plan(&host, &client, &Profile::default()))
            .run()
            .await;

        // Poll timeouts are advisory: the run completes with warnings
        assert!(!outcome.is_fatal());
        assert!(outcome.warning_count() >= 1);
    }

    #[tokio::test]
    async fn test_inference_release_carries_selected_model() {
        let profile = Profile::new(None, Some("mistral:7b".to_string()));
        let spec = inference_release(&profile);

        assert_eq!(spec.namespace, INFERENCE_NAMESPACE);
        assert_eq!(
            spec.values["ollama"]["models"]["pull"][0],
            serde_json::json!("mistral:7b")
        );
    }

    #[tokio::test]
    async fn test_plan_stage_order_is_declared_order() {
        let host: Host = Arc::new(ScriptedHost::new());
        let client: Client = Arc::new(MockCluster::new());

        let runner = StageRunner::new(cluster_plan(&host, &client, &Profile::default()));
        assert_eq!(
            runner.stage_names(),
            vec![
                "initialize control plane",
                "install pod network",
                "remove control-plane taint",
                "wait for node readiness",
            ]
        );
    }
}
