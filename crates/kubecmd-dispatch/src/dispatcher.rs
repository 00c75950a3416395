use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use kubecmd_k8s::{LogSource, ResourceStore};
use kubecmd_logs::{ExportFormat, LogPipeline, LogQuery, export};
use kubecmd_types::{Command, CommandKind, Error, LogEntry, LogOptions, Response, Result};

/// A command whose required fields have been checked
#[derive(Debug)]
enum Request<'a> {
    List {
        resource: &'a str,
        namespace: &'a str,
    },
    Get {
        resource: &'a str,
        namespace: &'a str,
        name: &'a str,
    },
    Create {
        resource: &'a str,
        namespace: &'a str,
        payload: Value,
    },
    Delete {
        resource: &'a str,
        namespace: &'a str,
        name: &'a str,
    },
    Logs(LogQuery),
    SearchLogs(LogQuery),
    ExportLogs(LogQuery, ExportFormat),
}

impl<'a> Request<'a> {
    /// Check the fields `kind` requires and parse typed values
    ///
    /// Runs entirely before any backend call.
    fn validate(kind: CommandKind, command: &'a Command) -> Result<Self> {
        let namespace = command.namespace.as_deref().unwrap_or_default();

        match kind {
            CommandKind::List => Ok(Self::List {
                resource: required(&command.resource_type, "resource type", kind)?,
                namespace,
            }),
            CommandKind::Get => Ok(Self::Get {
                resource: required(&command.resource_type, "resource type", kind)?,
                namespace,
                name: required(&command.name, "name", kind)?,
            }),
            CommandKind::Create => {
                let resource = required(&command.resource_type, "resource type", kind)?;
                Ok(Self::Create {
                    resource,
                    namespace,
                    payload: payload_document(command.payload.as_ref(), resource)?,
                })
            }
            CommandKind::Delete => Ok(Self::Delete {
                resource: required(&command.resource_type, "resource type", kind)?,
                namespace,
                name: required(&command.name, "name", kind)?,
            }),
            CommandKind::Logs => Ok(Self::Logs(log_query(command, kind)?)),
            CommandKind::SearchLogs => {
                let query = log_query(command, kind)?;
                if query.pattern.is_none() {
                    return Err(missing("search pattern", kind));
                }
                Ok(Self::SearchLogs(query))
            }
            CommandKind::ExportLogs => {
                let query = log_query(command, kind)?;
                let format = command
                    .log_options
                    .as_ref()
                    .and_then(|o| o.format.as_deref())
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| missing("export format", kind))?;
                Ok(Self::ExportLogs(query, ExportFormat::parse(format)?))
            }
        }
    }
}

fn missing(field: &str, kind: CommandKind) -> Error {
    Error::InvalidArgument(format!("{} is required for '{}'", field, kind.as_str()))
}

fn required<'a>(value: &'a Option<String>, field: &str, kind: CommandKind) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing(field, kind))
}

/// Namespace and pod are required for every log command
fn log_query(command: &Command, kind: CommandKind) -> Result<LogQuery> {
    let namespace = required(&command.namespace, "namespace", kind)?;
    let options: &LogOptions = command
        .log_options
        .as_ref()
        .filter(|o| !o.pod.is_empty())
        .ok_or_else(|| missing("pod", kind))?;
    LogQuery::from_options(namespace, options)
}

/// The create payload must be a JSON object, or a string holding one
fn payload_document(payload: Option<&Value>, resource: &str) -> Result<Value> {
    let document = match payload {
        None | Some(Value::Null) => return Err(missing("resource data", CommandKind::Create)),
        Some(Value::String(raw)) => serde_json::from_str(raw).map_err(|e| {
            Error::InvalidArgument(format!("invalid {} data: {}", resource, e))
        })?,
        Some(value) => value.clone(),
    };

    if document.is_object() {
        Ok(document)
    } else {
        Err(Error::InvalidArgument(format!(
            "invalid {} data: expected a JSON object",
            resource
        )))
    }
}

fn entries_document(entries: &[LogEntry]) -> Result<Value> {
    serde_json::to_value(entries)
        .map_err(|e| Error::StreamError(format!("failed to encode log entries: {}", e)))
}

/// Routes command envelopes to the resource store or the log pipeline
///
/// Every outcome, including validation failures, comes back as a response
/// envelope; a failing command never brings the caller down.
#[derive(Clone)]
pub struct CommandDispatcher {
    store: Arc<dyn ResourceStore>,
    logs: LogPipeline,
}

impl CommandDispatcher {
    pub fn new(store: Arc<dyn ResourceStore>, source: Arc<dyn LogSource>) -> Self {
        Self {
            store,
            logs: LogPipeline::new(source),
        }
    }

    /// Parse a raw JSON envelope and dispatch it
    pub async fn dispatch_json(&self, raw: &[u8]) -> Response {
        match serde_json::from_slice::<Command>(raw) {
            Ok(command) => self.dispatch(&command).await,
            Err(e) => {
                let err = Error::InvalidArgument(format!("failed to parse command: {}", e));
                warn!(error = %err, "Rejected malformed command");
                Response::failure(&err)
            }
        }
    }

    pub async fn dispatch(&self, command: &Command) -> Response {
        let result = self.route(command).await;
        match &result {
            Ok(_) => debug!(command = %command.kind, "Command succeeded"),
            Err(err) => warn!(
                command = %command.kind,
                resource = ?command.resource_type,
                namespace = ?command.namespace,
                error_kind = err.kind(),
                error = %err,
                "Command failed"
            ),
        }
        result.into()
    }

    async fn route(&self, command: &Command) -> Result<Response> {
        let kind = CommandKind::parse(&command.kind)
            .ok_or_else(|| Error::UnsupportedCommand(command.kind.clone()))?;

        match Request::validate(kind, command)? {
            Request::List {
                resource,
                namespace,
            } => {
                let documents = self.store.list(resource, namespace).await?;
                Ok(Response::success(
                    format!("Successfully listed {}", resource),
                    Some(Value::Array(documents)),
                ))
            }
            Request::Get {
                resource,
                namespace,
                name,
            } => {
                let document = self.store.get(resource, namespace, name).await?;
                Ok(Response::success(
                    format!("Successfully retrieved {} '{}'", resource, name),
                    Some(document),
                ))
            }
            Request::Create {
                resource,
                namespace,
                payload,
            } => {
                let created = self.store.create(resource, namespace, payload).await?;
                Ok(Response::success(
                    format!("Successfully created {}", resource),
                    Some(created),
                ))
            }
            Request::Delete {
                resource,
                namespace,
                name,
            } => {
                self.store.delete(resource, namespace, name).await?;
                Ok(Response::success(
                    format!("Successfully deleted {} '{}'", resource, name),
                    None,
                ))
            }
            Request::Logs(query) => {
                let entries = self.logs.retrieve(&query).await?;
                Ok(Response::success(
                    format!("Successfully retrieved logs from pod '{}'", query.pod),
                    Some(entries_document(&entries)?),
                ))
            }
            Request::SearchLogs(query) => {
                let entries = self.logs.retrieve(&query).await?;
                Ok(Response::success(
                    format!("Successfully searched logs from pod '{}'", query.pod),
                    Some(entries_document(&entries)?),
                ))
            }
            Request::ExportLogs(query, format) => {
                let entries = self.logs.retrieve(&query).await?;
                let exported = export(&entries, format.as_str())?;
                Ok(Response::success(
                    format!(
                        "Successfully exported logs from pod '{}' in {} format",
                        query.pod,
                        format.as_str()
                    ),
                    Some(json!({ "exported_logs": String::from_utf8_lossy(&exported) })),
                ))
            }
        }
    }
}
