use std::sync::Arc;

use futures::future;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use tracing::debug;

use kubecmd_k8s::{LogRequest, LogSource};
use kubecmd_types::{Error, LogEntry, LogOptions, Result};

use crate::filter::CompiledFilter;
use crate::parser::LogParser;
use crate::since::Since;

/// Stream of parsed, filtered entries; the first error ends it
pub type EntryStream = BoxStream<'static, Result<LogEntry>>;

/// One log retrieval
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub namespace: String,
    pub pod: String,
    pub container: Option<String>,
    pub since: Option<Since>,
    pub tail: Option<u32>,
    pub pattern: Option<String>,
    pub level: Option<String>,
}

impl LogQuery {
    pub fn new(namespace: impl Into<String>, pod: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            ..Default::default()
        }
    }

    /// Build a query from wire options, parsing `since`
    ///
    /// Empty strings and a zero tail count as unset.
    pub fn from_options(namespace: &str, options: &LogOptions) -> Result<Self> {
        let since = match non_empty(&options.since) {
            Some(s) => Some(Since::parse(s)?),
            None => None,
        };

        Ok(Self {
            namespace: namespace.to_string(),
            pod: options.pod.clone(),
            container: non_empty(&options.container).map(str::to_string),
            since,
            tail: options.tail.filter(|t| *t > 0),
            pattern: non_empty(&options.pattern).map(str::to_string),
            level: non_empty(&options.log_level).map(str::to_string),
        })
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Backend request for this query
    pub fn request(&self) -> LogRequest {
        let mut request = LogRequest::new(self.namespace.clone(), self.pod.clone());
        request.container = self.container.clone();
        request.tail_lines = self.tail.map(i64::from);
        if let Some(since) = &self.since {
            since.apply(&mut request);
        }
        request
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Retrieves, parses and filters pod logs
#[derive(Clone)]
pub struct LogPipeline {
    source: Arc<dyn LogSource>,
}

impl LogPipeline {
    pub fn new(source: Arc<dyn LogSource>) -> Self {
        Self { source }
    }

    /// Lazy, single-pass retrieval
    ///
    /// The filter is compiled before the backend is contacted, so an invalid
    /// pattern fails without opening a stream. A read error is yielded as the
    /// stream's last item.
    pub async fn stream(&self, query: &LogQuery) -> Result<EntryStream> {
        let filter = CompiledFilter::new(query.pattern.as_deref(), query.level.as_deref())?;
        let request = query.request();

        let lines = self.source.open(&request).await?;
        debug!(
            namespace = %request.namespace,
            pod = %request.pod,
            filter = ?filter,
            "Log stream opened"
        );

        let LogRequest {
            namespace,
            pod,
            container,
            ..
        } = request;
        let container = container.unwrap_or_default();
        let read_context = format!(
            "error reading logs from pod '{}' in namespace '{}'",
            pod, namespace
        );

        Ok(lines
            .map_err(move |e| Error::StreamError(format!("{}: {}", read_context, e)))
            .map_ok(move |line| LogParser::parse(&line, &pod, &container, &namespace))
            .try_filter(move |entry| future::ready(filter.matches(entry)))
            .boxed())
    }

    /// Materialize the whole filtered log
    ///
    /// A mid-stream read error fails the whole retrieval; no partial result
    /// is returned.
    pub async fn retrieve(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        let entries: Vec<LogEntry> = self.stream(query).await?.try_collect().await?;
        debug!(
            namespace = %query.namespace,
            pod = %query.pod,
            count = entries.len(),
            "Log retrieval complete"
        );
        Ok(entries)
    }
}
