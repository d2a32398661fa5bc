//! Deployment profiles: mirror selection and model selection
//!
//! A mirror decides where packages, images, manifests, and charts are pulled
//! from; operators behind restrictive networks pick `cn`. The model name is
//! threaded into the inference release values.

use std::fmt;
use std::str::FromStr;

use crate::error::KubeError;

/// Model served by default when none is selected
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Download source selection for packages, images, manifests, and charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mirror {
    /// Upstream sources
    #[default]
    Global,
    /// Mainland-China mirrors
    Cn,
}

impl Mirror {
    /// Apt repository carrying the pinned cluster packages
    pub fn package_repo(&self) -> &'static str {
        match self {
            Mirror::Global => "https://pkgs.k8s.io/core:/stable:/v1.31/deb/",
            Mirror::Cn => "https://mirrors.aliyun.com/kubernetes-new/core/stable/v1.31/deb/",
        }
    }

    /// Container image registry handed to the control plane bootstrap
    pub fn image_registry(&self) -> &'static str {
        match self {
            Mirror::Global => "registry.k8s.io",
            Mirror::Cn => "registry.aliyuncs.com/google_containers",
        }
    }

    /// Manifest URL for the pod network
    pub fn network_manifest(&self) -> &'static str {
        match self {
            Mirror::Global => {
                "https://github.com/flannel-io/flannel/releases/latest/download/kube-flannel.yml"
            }
            Mirror::Cn => "https://mirrors.basecamp-k8s.cn/manifests/kube-flannel.yml",
        }
    }

    /// OCI registry prefix for the platform charts
    pub fn chart_repo(&self) -> &'static str {
        match self {
            Mirror::Global => "oci://registry-1.docker.io/basecampcharts",
            Mirror::Cn => "oci://registry.cn-hangzhou.aliyuncs.com/basecampcharts",
        }
    }

    /// Chart reference for a named platform chart
    pub fn chart(&self, name: &str) -> String {
        format!("{}/{}", self.chart_repo(), name)
    }
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mirror::Global => write!(f, "global"),
            Mirror::Cn => write!(f, "cn"),
        }
    }
}

impl FromStr for Mirror {
    type Err = KubeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Mirror::Global),
            "cn" => Ok(Mirror::Cn),
            other => Err(KubeError::InvalidConfig(format!(
                "unknown mirror '{other}' (expected 'global' or 'cn')"
            ))),
        }
    }
}

/// Everything a deployment phase needs to parameterize its stages
#[derive(Debug, Clone)]
pub struct Profile {
    pub mirror: Mirror,
    pub model: String,
}

impl Profile {
    /// Build a profile from optional CLI selections
    pub fn new(mirror: Option<Mirror>, model: Option<String>) -> Self {
        Self {
            mirror: mirror.unwrap_or_default(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_parse() {
        assert_eq!("global".parse::<Mirror>().unwrap(), Mirror::Global);
        assert_eq!("cn".parse::<Mirror>().unwrap(), Mirror::Cn);
        assert!("eu".parse::<Mirror>().is_err());
    }

    #[test]
    fn test_mirror_round_trip() {
        for mirror in [Mirror::Global, Mirror::Cn] {
            assert_eq!(mirror.to_string().parse::<Mirror>().unwrap(), mirror);
        }
    }

    #[test]
    fn test_cn_mirror_avoids_upstream_hosts() {
        let mirror = Mirror::Cn;
        assert!(!mirror.package_repo().contains("pkgs.k8s.io"));
        assert!(!mirror.image_registry().contains("registry.k8s.io"));
        assert!(!mirror.network_manifest().contains("github.com"));
    }

    #[test]
    fn test_profile_defaults() {
        let profile = Profile::new(None, None);
        assert_eq!(profile.mirror, Mirror::Global);
        assert_eq!(profile.model, DEFAULT_MODEL);

        let profile = Profile::new(Some(Mirror::Cn), Some("mistral".to_string()));
        assert_eq!(profile.mirror, Mirror::Cn);
        assert_eq!(profile.model, "mistral");
    }

    #[test]
    fn test_chart_reference() {
        assert_eq!(
            Mirror::Global.chart("ollama"),
            "oci://registry-1.docker.io/basecampcharts/ollama"
        );
    }
}
