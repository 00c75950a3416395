mod config;
mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kubecmd_dispatch::CommandDispatcher;
use kubecmd_k8s::{
    ConnectOptions, KubeClient, KubeLogSource, KubeResourceStore, ResourceKind,
    ResourceKindRegistry,
};

use crate::config::Config;

/// kubecmd - Command/response service for Kubernetes resources and pod logs
#[derive(Parser, Debug)]
#[command(name = "kubecmd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Kubeconfig context to use (overrides the config file)
    #[arg(long, global = true)]
    context: Option<String>,

    /// Path to a kubeconfig file (overrides the config file)
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Tracing filter directive, e.g. "kubecmd=debug" (RUST_LOG wins when set)
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Read command envelopes from stdin, one JSON object per line
    Serve,
    /// Run a single command envelope and print the response
    Exec {
        /// Command envelope as JSON
        command: String,
    },
    /// Print the supported resource types
    Kinds,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    // Logs go to stderr; stdout carries responses only
    let directive = args.log_filter.as_deref().unwrap_or(&config.logging.filter);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .context(format!("Invalid log filter: {}", directive))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let extra: Vec<ResourceKind> = config.resources.into_iter().map(Into::into).collect();
    for kind in &extra {
        if ResourceKindRegistry::builtin().resolve(&kind.plural).is_ok() {
            warn!(kind = %kind.plural, "Ignoring configured resource that shadows a built-in kind");
        }
    }
    let registry = Arc::new(ResourceKindRegistry::with_extra(extra));

    if let Mode::Kinds = args.mode {
        for name in registry.names() {
            let kind = registry.resolve(name)?;
            let scope = if kind.namespaced { "namespaced" } else { "cluster" };
            println!("{:<28} {:<32} {}", name, kind.api_version(), scope);
        }
        return Ok(());
    }

    let options = ConnectOptions {
        kubeconfig: args.kubeconfig.or(config.kubernetes.kubeconfig),
        context: args.context.or(config.kubernetes.context),
    };
    let client = KubeClient::connect(&options).await?.into_client();

    let store = Arc::new(KubeResourceStore::new(client.clone(), registry.clone()));
    let source = Arc::new(KubeLogSource::new(client));
    let dispatcher = CommandDispatcher::new(store, source);
    info!(kinds = registry.len(), "Dispatcher ready");

    match args.mode {
        Mode::Serve => serve::serve(dispatcher).await,
        Mode::Exec { command } => {
            let response = dispatcher.dispatch_json(command.as_bytes()).await;
            let text =
                serde_json::to_string_pretty(&response).context("Failed to encode response")?;
            println!("{}", text);
            if !response.success {
                std::process::exit(1);
            }
            Ok(())
        }
        Mode::Kinds => Ok(()),
    }
}
