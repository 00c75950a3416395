//! Command dispatch for kubecmd
//!
//! This crate validates command envelopes and routes them to the resource
//! store or the log pipeline, wrapping every outcome in a response envelope.

mod dispatcher;

pub use dispatcher::CommandDispatcher;

// Re-export the envelope types used in our public API
pub use kubecmd_types::{Command, CommandKind, Error, LogOptions, Response};
