//! Configuration file support

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use kubecmd_k8s::ResourceKind;

/// Contents of the TOML config file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kubernetes: KubernetesConfig,
    pub logging: LoggingConfig,
    /// Extra resource kinds merged into the built-in table at start-up
    pub resources: Vec<ResourceConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    pub context: Option<String>,
    pub kubeconfig: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter directive, overridden by RUST_LOG
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    /// Plural resource name, also the command's resource type
    pub name: String,
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    #[serde(default = "default_namespaced")]
    pub namespaced: bool,
}

fn default_namespaced() -> bool {
    true
}

impl From<ResourceConfig> for ResourceKind {
    fn from(config: ResourceConfig) -> Self {
        ResourceKind {
            group: config.group,
            version: config.version,
            plural: config.name,
            kind: config.kind,
            namespaced: config.namespaced,
        }
    }
}

impl Config {
    /// Load the config file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file {}", path.display()))?;
        Self::parse(&contents).context(format!("Invalid config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.logging.filter, "info");
        assert!(config.kubernetes.context.is_none());
        assert!(config.resources.is_empty());
        assert!(Config::load(None).unwrap().resources.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [kubernetes]
            context = "kind-dev"
            kubeconfig = "/tmp/kubeconfig"

            [logging]
            filter = "kubecmd=debug"

            [[resources]]
            name = "cronjobs"
            group = "batch"
            version = "v1"
            kind = "CronJob"

            [[resources]]
            name = "storageclasses"
            group = "storage.k8s.io"
            version = "v1"
            kind = "StorageClass"
            namespaced = false
            "#,
        )
        .unwrap();

        assert_eq!(config.kubernetes.context.as_deref(), Some("kind-dev"));
        assert_eq!(config.logging.filter, "kubecmd=debug");

        let kinds: Vec<ResourceKind> = config.resources.into_iter().map(Into::into).collect();
        assert_eq!(kinds[0].coordinates(), ("batch", "v1", "cronjobs"));
        assert!(kinds[0].namespaced);
        assert!(!kinds[1].namespaced);
    }

    #[test]
    fn test_resource_requires_version() {
        let err = Config::parse(
            r#"
            [[resources]]
            name = "widgets"
            kind = "Widget"
            "#,
        );
        assert!(err.is_err());
    }
}
