//! Kubernetes backend for kubecmd
//!
//! This crate provides the resource kind registry, generic resource CRUD
//! through the dynamic API, and pod log streams.

mod client;
mod error;
mod registry;
mod source;
mod store;

pub use client::{ConnectOptions, KubeClient};
pub use registry::{ResourceKind, ResourceKindRegistry};
pub use source::{KubeLogSource, LineStream, LogRequest, LogSource, split_lines};
pub use store::{KubeResourceStore, ResourceStore};

// Re-export types that are used in our public API
pub use kubecmd_types::{Error, Result};
