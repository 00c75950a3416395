use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::{AsyncBufRead, AsyncBufReadExt, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::LogParams;
use kube::{Api, Client};
use tracing::debug;

use kubecmd_types::Result;

use crate::error::{Origin, classify};

/// Forward-only stream of raw log lines
///
/// Dropping the stream releases the underlying backend connection.
pub type LineStream = BoxStream<'static, io::Result<String>>;

/// Split a byte stream into lines, replacing invalid UTF-8
///
/// Line endings (`\n` or `\r\n`) are stripped. Only transport errors end
/// the stream with an error; undecodable bytes become U+FFFD.
pub fn split_lines<R>(reader: R) -> LineStream
where
    R: AsyncBufRead + Send + 'static,
{
    futures::stream::try_unfold(Box::pin(reader), next_line).boxed()
}

async fn next_line<R>(mut reader: Pin<Box<R>>) -> io::Result<Option<(String, Pin<Box<R>>)>>
where
    R: AsyncBufRead + Send,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some((String::from_utf8_lossy(&buf).into_owned(), reader)))
}

/// Parameters of a single log fetch
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogRequest {
    pub namespace: String,
    pub pod: String,
    pub container: Option<String>,
    pub since_time: Option<DateTime<Utc>>,
    pub since_seconds: Option<i64>,
    /// Line bound from the end of the stream, applied by the backend
    pub tail_lines: Option<i64>,
}

impl LogRequest {
    pub fn new(namespace: impl Into<String>, pod: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            ..Default::default()
        }
    }

    /// Backend parameters; an absolute time wins over a relative window
    pub fn log_params(&self) -> LogParams {
        LogParams {
            container: self.container.clone(),
            follow: false,
            since_time: self.since_time,
            since_seconds: if self.since_time.is_some() {
                None
            } else {
                self.since_seconds
            },
            tail_lines: self.tail_lines,
            ..Default::default()
        }
    }

    fn target(&self) -> String {
        match &self.container {
            Some(container) => format!(
                "pod '{}' container '{}' in namespace '{}'",
                self.pod, container, self.namespace
            ),
            None => format!("pod '{}' in namespace '{}'", self.pod, self.namespace),
        }
    }
}

/// Opens line-oriented log streams
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn open(&self, request: &LogRequest) -> Result<LineStream>;
}

/// [`LogSource`] reading pod logs through the Kubernetes API
#[derive(Clone)]
pub struct KubeLogSource {
    client: Client,
}

impl KubeLogSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogSource for KubeLogSource {
    async fn open(&self, request: &LogRequest) -> Result<LineStream> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &request.namespace);
        let params = request.log_params();

        debug!(
            namespace = %request.namespace,
            pod = %request.pod,
            container = ?request.container,
            since_seconds = ?params.since_seconds,
            since_time = ?params.since_time,
            tail_lines = ?params.tail_lines,
            "Opening log stream"
        );

        let reader = pods
            .log_stream(&request.pod, &params)
            .await
            .map_err(|e| {
                let context = format!("failed to open log stream for {}", request.target());
                classify(e, Origin::LogStream, &context)
            })?;

        Ok(split_lines(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_time_wins() {
        let mut request = LogRequest::new("default", "web-0");
        request.since_seconds = Some(300);
        request.since_time = Some("2024-01-01T10:00:00Z".parse().unwrap());

        let params = request.log_params();
        assert!(params.since_time.is_some());
        assert_eq!(params.since_seconds, None);
        assert!(!params.follow);
    }

    #[test]
    fn test_relative_window_and_tail() {
        let mut request = LogRequest::new("default", "web-0");
        request.container = Some("app".to_string());
        request.since_seconds = Some(60);
        request.tail_lines = Some(100);

        let params = request.log_params();
        assert_eq!(params.container.as_deref(), Some("app"));
        assert_eq!(params.since_seconds, Some(60));
        assert_eq!(params.tail_lines, Some(100));
        assert_eq!(params.since_time, None);
    }

    fn collect(bytes: &'static [u8]) -> Vec<io::Result<String>> {
        futures::executor::block_on(split_lines(futures::io::Cursor::new(bytes)).collect())
    }

    #[test]
    fn test_split_lines_tolerates_invalid_utf8() {
        let lines: Vec<String> = collect(b"INFO ok\nERROR bad \xff byte\nINFO after\n")
            .into_iter()
            .map(|line| line.unwrap())
            .collect();
        assert_eq!(lines, ["INFO ok", "ERROR bad \u{FFFD} byte", "INFO after"]);
    }

    #[test]
    fn test_split_lines_endings() {
        let lines: Vec<String> = collect(b"crlf line\r\n\nlast without newline")
            .into_iter()
            .map(|line| line.unwrap())
            .collect();
        assert_eq!(lines, ["crlf line", "", "last without newline"]);
        assert!(collect(b"").is_empty());
    }

    #[test]
    fn test_target_description() {
        let request = LogRequest::new("prod", "api-1");
        assert_eq!(request.target(), "pod 'api-1' in namespace 'prod'");
    }
}
