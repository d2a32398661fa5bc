//! Host-level command execution
//!
//! Node preparation (swap, kernel modules, package installs) and control
//! plane bootstrap happen outside the cluster API, as shell commands on the
//! host being provisioned. The commands themselves are opaque to the engine;
//! this module only runs them and reports outcomes. `HostRunner` is a trait
//! so deployment plans can be exercised against a scripted fake.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{KubeError, Result};

/// Outcome of one host command
#[derive(Debug, Clone)]
pub struct HostOutput {
    /// Process exit code (-1 if terminated by signal)
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl HostOutput {
    /// Whether the command exited zero
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs opaque commands on the host being provisioned
#[async_trait]
pub trait HostRunner: Send + Sync {
    /// Run a shell script fragment, capturing output. A non-zero exit is a
    /// normal answer for guard probes, so it is not an error here; callers
    /// decide what a failure means.
    async fn run(&self, script: &str) -> Result<HostOutput>;
}

/// Production runner: `sh -c` on the local host
#[derive(Debug, Clone, Default)]
pub struct Shell;

impl Shell {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HostRunner for Shell {
    async fn run(&self, script: &str) -> Result<HostOutput> {
        let output = Command::new("sh")
            .args(["-c", script])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| KubeError::CommandFailed {
                command: script.to_string(),
                message: e.to_string(),
            })?;

        Ok(HostOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
