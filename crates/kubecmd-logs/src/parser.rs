use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use kubecmd_types::{LogEntry, LogLevel};

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})?")
        .expect("timestamp pattern is valid")
});

static LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(info|error|warn|debug|fatal)\b").expect("level pattern is valid")
});

/// Log parser for extracting structure from raw log lines
///
/// Extraction is heuristic and never fails: a line without a recognisable
/// timestamp gets the parse-time clock, a line without a severity word gets
/// no level. Only the first match of each heuristic is considered.
pub struct LogParser;

impl LogParser {
    /// Parse a raw log line into a LogEntry
    pub fn parse(raw: &str, pod: &str, container: &str, namespace: &str) -> LogEntry {
        Self::parse_at(raw, pod, container, namespace, Utc::now())
    }

    /// Parse with an explicit fallback timestamp
    pub fn parse_at(
        raw: &str,
        pod: &str,
        container: &str,
        namespace: &str,
        now: DateTime<Utc>,
    ) -> LogEntry {
        LogEntry {
            timestamp: Self::extract_timestamp(raw).unwrap_or(now),
            pod: pod.to_string(),
            container: container.to_string(),
            namespace: namespace.to_string(),
            level: Self::extract_level(raw),
            message: raw.trim().to_string(),
        }
    }

    /// First ISO-8601 date-time in the line; a bare date-time is taken as UTC
    fn extract_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let found = TIMESTAMP_RE.find(raw)?.as_str();

        if let Ok(ts) = DateTime::parse_from_rfc3339(found) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(found, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    fn extract_level(raw: &str) -> Option<LogLevel> {
        LEVEL_RE
            .find(raw)
            .and_then(|m| LogLevel::from_word(m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        "2030-06-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_parse_bare_timestamp_and_level() {
        let entry = LogParser::parse_at(
            "2024-01-01T10:00:00 INFO starting\n",
            "web-0",
            "app",
            "default",
            fixed_now(),
        );
        assert_eq!(entry.level, Some(LogLevel::Info));
        assert_eq!(
            entry.timestamp,
            "2024-01-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(entry.message, "2024-01-01T10:00:00 INFO starting");
        assert_eq!(entry.pod, "web-0");
        assert_eq!(entry.container, "app");
        assert_eq!(entry.namespace, "default");
    }

    #[test]
    fn test_parse_without_timestamp_uses_now() {
        let entry = LogParser::parse_at(
            "no timestamp here ERROR failed",
            "web-0",
            "app",
            "default",
            fixed_now(),
        );
        assert_eq!(entry.level, Some(LogLevel::Error));
        assert_eq!(entry.timestamp, fixed_now());
    }

    #[test]
    fn test_parse_uses_wall_clock() {
        let before = Utc::now();
        let entry = LogParser::parse("plain line", "p", "c", "n");
        let after = Utc::now();
        assert!(entry.timestamp >= before && entry.timestamp <= after);
        assert_eq!(entry.level, None);
    }

    #[test]
    fn test_parse_rfc3339_with_offset_and_fraction() {
        let entry = LogParser::parse_at(
            "2024-01-15T10:30:00.123456789+02:00 warn disk low",
            "p",
            "c",
            "n",
            fixed_now(),
        );
        assert_eq!(
            entry.timestamp,
            "2024-01-15T08:30:00.123456789Z"
                .parse::<DateTime<Utc>>()
                .unwrap()
        );
        assert_eq!(entry.level, Some(LogLevel::Warn));
    }

    #[test]
    fn test_first_match_wins() {
        let entry = LogParser::parse_at(
            "2024-01-01T00:00:00Z debug retry after error at 2024-02-02T00:00:00Z",
            "p",
            "c",
            "n",
            fixed_now(),
        );
        assert_eq!(entry.level, Some(LogLevel::Debug));
        assert_eq!(
            entry.timestamp,
            "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_unparseable_timestamp_keeps_default() {
        let entry = LogParser::parse_at("2024-13-45T99:00:00 boom", "p", "c", "n", fixed_now());
        assert_eq!(entry.timestamp, fixed_now());
    }

    #[test]
    fn test_level_requires_whole_word() {
        let entry = LogParser::parse_at("information warning", "p", "c", "n", fixed_now());
        assert_eq!(entry.level, None);
    }

    #[test]
    fn test_parse_multibyte_utf8_no_panic() {
        let entry = LogParser::parse_at("─────── Fatal ───────", "p", "c", "n", fixed_now());
        assert_eq!(entry.level, Some(LogLevel::Fatal));
        assert_eq!(entry.timestamp, fixed_now());
    }
}
