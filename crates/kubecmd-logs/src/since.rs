use std::time::Duration;

use chrono::{DateTime, Utc};

use kubecmd_k8s::LogRequest;
use kubecmd_types::{Error, Result};

/// Lower bound of a log window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Since {
    /// Window ending now (`5m`, `1h30m`)
    Relative(Duration),
    /// Absolute start time
    Absolute(DateTime<Utc>),
}

impl Since {
    /// Parse a duration first, then an RFC3339 timestamp
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(duration) = parse_duration(s) {
            return Ok(Self::Relative(duration));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|ts| Self::Absolute(ts.with_timezone(&Utc)))
            .map_err(|e| {
                Error::InvalidArgument(format!(
                    "invalid 'since' parameter '{}': not a duration or RFC3339 timestamp ({})",
                    s, e
                ))
            })
    }

    /// Set the matching window field on a backend request
    pub fn apply(&self, request: &mut LogRequest) {
        match self {
            Self::Relative(duration) => {
                // The API only accepts whole, positive seconds
                let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
                request.since_seconds = Some(i64::try_from(secs.max(1)).unwrap_or(i64::MAX));
            }
            Self::Absolute(ts) => request.since_time = Some(*ts),
        }
    }
}

/// Parse durations such as `300ms`, `1.5h` or `2h45m`
///
/// Accepted units are `ns`, `us`/`µs`, `ms`, `s`, `m` and `h`. A bare `0` is
/// allowed; negative durations are not.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_end == 0 {
            return None;
        }
        let value: f64 = rest[..num_end].parse().ok()?;
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        total_nanos += value * scale;
        rest = &rest[unit_end..];
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(total_nanos as u64))
}
