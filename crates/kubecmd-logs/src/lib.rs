//! Log processing for kubecmd
//!
//! This crate provides log line parsing, filtering, retrieval and export.

mod export;
mod filter;
mod parser;
mod pipeline;
mod since;

pub use export::{ExportFormat, export, export_to};
pub use filter::CompiledFilter;
pub use parser::LogParser;
pub use pipeline::{EntryStream, LogPipeline, LogQuery};
pub use since::{Since, parse_duration};

// Re-export types used in our public API
pub use kubecmd_types::{LogEntry, LogLevel};
