//! Backend connection bootstrap

use std::path::PathBuf;

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

/// How to reach the cluster
#[derive(Clone, Debug, Default)]
pub struct ConnectOptions {
    /// Explicit kubeconfig file; otherwise KUBECONFIG, ~/.kube/config or in-cluster
    pub kubeconfig: Option<PathBuf>,
    /// Context name; otherwise the kubeconfig's current context
    pub context: Option<String>,
}

/// Kubernetes client wrapper
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    /// Build a client and check that the API server answers
    pub async fn connect(options: &ConnectOptions) -> Result<Self> {
        let config = Self::load_config(options).await?;
        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;

        let version = client
            .apiserver_version()
            .await
            .context("Failed to reach the Kubernetes API server")?;
        info!(
            version = %version.git_version,
            platform = %version.platform,
            "Connected to Kubernetes API server"
        );

        Ok(Self { client })
    }

    async fn load_config(options: &ConnectOptions) -> Result<Config> {
        let kube_options = KubeConfigOptions {
            context: options.context.clone(),
            ..Default::default()
        };

        match (&options.kubeconfig, &options.context) {
            (Some(path), _) => {
                let kubeconfig = Kubeconfig::read_from(path).context(format!(
                    "Failed to read kubeconfig from {}",
                    path.display()
                ))?;
                Config::from_custom_kubeconfig(kubeconfig, &kube_options)
                    .await
                    .context(format!(
                        "Failed to create config from {}",
                        path.display()
                    ))
            }
            (None, Some(context)) => Config::from_kubeconfig(&kube_options)
                .await
                .context(format!("Failed to create config for context: {}", context)),
            (None, None) => Config::infer()
                .await
                .context("Failed to infer Kubernetes config. Is kubectl configured?"),
        }
    }

    pub fn into_client(self) -> Client {
        self.client
    }
}
