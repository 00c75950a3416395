//! Shared types for kubecmd
//!
//! This crate contains the wire envelopes, log entry model and error taxonomy
//! used across the kubecmd crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Failure of a single command
///
/// Every variant carries a message that already includes the operation
/// context (resource kind, name, namespace, pod) where one exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed or missing command fields, bad regex, bad `since`
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Resource kind not present in the kind registry
    #[error("unsupported resource type: {0}")]
    UnsupportedKind(String),

    /// Unknown command `type`
    #[error("unsupported command type: {0}")]
    UnsupportedCommand(String),

    /// Unknown export format
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// Missing resource, pod or container
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate create
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend refused or could not be reached
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Log stream could not be opened or broke mid-read
    #[error("log stream error: {0}")]
    StreamError(String),
}

impl Error {
    /// Short machine-friendly name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UnsupportedKind(_) => "unsupported_kind",
            Self::UnsupportedCommand(_) => "unsupported_command",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::StreamError(_) => "stream_error",
        }
    }
}

/// Result type alias for kubecmd operations
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Command Envelope
// ============================================================================

/// Known command kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    List,
    Get,
    Create,
    Delete,
    Logs,
    SearchLogs,
    ExportLogs,
}

impl CommandKind {
    /// Parse the wire `type` value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(Self::List),
            "get" => Some(Self::Get),
            "create" => Some(Self::Create),
            "delete" => Some(Self::Delete),
            "logs" => Some(Self::Logs),
            "search_logs" => Some(Self::SearchLogs),
            "export_logs" => Some(Self::ExportLogs),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Logs => "logs",
            Self::SearchLogs => "search_logs",
            Self::ExportLogs => "export_logs",
        }
    }
}

/// Inbound command envelope
///
/// The envelope is permissive: which optional fields are required depends on
/// `kind` and is checked by the dispatcher. `kind` stays a raw string so an
/// unknown value is reported as an unsupported command rather than a parse
/// failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "resource", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Resource document for `create`
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_options: Option<LogOptions>,
}

impl Command {
    /// Create an empty command of the given kind
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_resource(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_log_options(mut self, options: LogOptions) -> Self {
        self.log_options = Some(options);
        self
    }
}

/// Log options carried by the log commands
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOptions {
    #[serde(default)]
    pub pod: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,

    /// Duration relative to now (`5m`, `1h30m`) or an RFC3339 timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,

    /// Number of most recent lines; 0 means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<u32>,

    /// Regular expression matched against each message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Export format (`json`, `ndjson`, `csv`, `plaintext`/`text`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl LogOptions {
    pub fn for_pod(pod: impl Into<String>) -> Self {
        Self {
            pod: pod.into(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Response Envelope
// ============================================================================

/// Outbound response envelope
///
/// `success == false` always comes with a non-empty `error` and no `data`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
            error: None,
        }
    }

    pub fn failure(err: &Error) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(err.to_string()),
        }
    }
}

impl From<Result<Response>> for Response {
    fn from(result: Result<Response>) -> Self {
        result.unwrap_or_else(|err| Self::failure(&err))
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// Log severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Parse one of the recognised severity words, ignoring case
    pub fn from_word(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed log line
///
/// Field order is the serialization order used by every structured export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub pod: String,
    pub container: String,
    pub namespace: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,

    pub message: String,
}

impl LogEntry {
    /// Level as rendered in text exports (empty when unknown)
    pub fn level_str(&self) -> &'static str {
        self.level.map(|l| l.as_str()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_wire_names() {
        let raw = json!({
            "type": "search_logs",
            "namespace": "default",
            "log_options": {"pod": "web-0", "tail": 10, "pattern": "fail", "log_level": "error"}
        });
        let cmd: Command = serde_json::from_value(raw).unwrap();
        assert_eq!(cmd.kind, "search_logs");
        assert_eq!(CommandKind::parse(&cmd.kind), Some(CommandKind::SearchLogs));
        let opts = cmd.log_options.unwrap();
        assert_eq!(opts.pod, "web-0");
        assert_eq!(opts.tail, Some(10));
        assert_eq!(opts.log_level.as_deref(), Some("error"));
    }

    #[test]
    fn test_unknown_kind_still_parses() {
        let cmd: Command = serde_json::from_str(r#"{"type":"explode"}"#).unwrap();
        assert_eq!(CommandKind::parse(&cmd.kind), None);
    }

    #[test]
    fn test_failure_response_shape() {
        let resp = Response::failure(&Error::NotFound("pods 'x'".to_string()));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value, json!({"success": false, "error": "not found: pods 'x'"}));
    }

    #[test]
    fn test_entry_field_order() {
        let entry = LogEntry {
            timestamp: "2024-01-01T10:00:00Z".parse().unwrap(),
            pod: "p".to_string(),
            container: "c".to_string(),
            namespace: "n".to_string(),
            level: Some(LogLevel::Info),
            message: "m".to_string(),
        };
        let text = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            text,
            r#"{"timestamp":"2024-01-01T10:00:00Z","pod":"p","container":"c","namespace":"n","level":"INFO","message":"m"}"#
        );
    }

    #[test]
    fn test_level_from_word() {
        assert_eq!(LogLevel::from_word("WaRn"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_word("warning"), None);
    }
}
