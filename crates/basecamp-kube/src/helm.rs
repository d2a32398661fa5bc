//! Thin wrapper around the `helm` binary
//!
//! Release management is delegated to helm rather than reimplemented: the
//! orchestrator only needs "is this release deployed" and "install or
//! upgrade this release", both of which helm answers reliably. Values are
//! streamed over stdin so nothing is written to disk.

use std::process::Stdio;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::client::{ReleaseSpec, ReleaseStatus};
use crate::error::{KubeError, Result};

/// Shape of `helm status -o json` we care about
#[derive(Debug, Deserialize)]
struct HelmStatusOutput {
    info: HelmStatusInfo,
}

#[derive(Debug, Deserialize)]
struct HelmStatusInfo {
    status: String,
}

/// Helm CLI driver
#[derive(Debug, Clone, Default)]
pub struct Helm {
    /// Binary to invoke; defaults to `helm` on PATH
    binary: Option<String>,
}

impl Helm {
    /// Use `helm` from PATH
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific helm binary
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }

    fn command(&self) -> Command {
        Command::new(self.binary.as_deref().unwrap_or("helm"))
    }

    /// Query the status of a release.
    ///
    /// A missing release is a normal answer (`NotFound`), not an error; only
    /// unparseable output or unexpected failures surface as
    /// `ReleaseStatus::Error`.
    pub async fn status(&self, release: &str, namespace: &str) -> Result<ReleaseStatus> {
        let output = self
            .command()
            .args(["status", release, "--namespace", namespace, "-o", "json"])
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("not found") {
                return Ok(ReleaseStatus::NotFound);
            }
            return Ok(ReleaseStatus::Error(stderr.trim().to_string()));
        }

        match serde_json::from_slice::<HelmStatusOutput>(&output.stdout) {
            Ok(parsed) if parsed.info.status == "deployed" => Ok(ReleaseStatus::Deployed),
            Ok(parsed) => Ok(ReleaseStatus::Error(format!(
                "release reports status '{}'",
                parsed.info.status
            ))),
            Err(e) => Ok(ReleaseStatus::Error(format!(
                "unparseable status output: {e}"
            ))),
        }
    }

    /// Install a release, or upgrade it in place if it already exists.
    pub async fn upgrade_install(&self, spec: &ReleaseSpec) -> Result<()> {
        let values = serde_yaml::to_string(&spec.values)?;
        let timeout = format!("{}s", spec.timeout.as_secs());

        let mut child = self
            .command()
            .args([
                "upgrade",
                "--install",
                &spec.release,
                &spec.chart,
                "--namespace",
                &spec.namespace,
                "--timeout",
                &timeout,
                "--values",
                "-",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(values.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(KubeError::ReleaseFailed {
                release: spec.release.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::warn!(release = %spec.release, "helm wrote to stderr: {}", stderr.trim());
        }

        Ok(())
    }
}
