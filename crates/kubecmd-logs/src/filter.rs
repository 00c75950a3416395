use regex::Regex;

use kubecmd_types::{Error, LogEntry, Result};

/// Compiled filter for log entries
#[derive(Clone)]
pub struct CompiledFilter {
    /// Regex pattern (if any)
    regex: Option<Regex>,

    /// Original pattern string
    pattern: String,

    /// Level to keep, compared case-insensitively (if any)
    level: Option<String>,
}

impl CompiledFilter {
    /// Compile a filter; empty strings count as unset
    pub fn new(pattern: Option<&str>, level: Option<&str>) -> Result<Self> {
        let pattern = pattern.unwrap_or_default();
        let regex = if pattern.is_empty() {
            None
        } else {
            Some(Regex::new(pattern).map_err(|e| {
                Error::InvalidArgument(format!("invalid regex pattern '{}': {}", pattern, e))
            })?)
        };

        Ok(Self {
            regex,
            pattern: pattern.to_string(),
            level: level.filter(|l| !l.is_empty()).map(str::to_string),
        })
    }

    /// Check if a log entry matches this filter
    ///
    /// Entries without a level never match a level filter.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(re) = &self.regex
            && !re.is_match(&entry.message)
        {
            return false;
        }

        match &self.level {
            Some(level) => entry.level_str().eq_ignore_ascii_case(level),
            None => true,
        }
    }
}

impl std::fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("pattern", &self.pattern)
            .field("level", &self.level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogParser;

    fn entry(line: &str) -> LogEntry {
        LogParser::parse(line, "pod", "app", "default")
    }

    #[test]
    fn test_regex_filter() {
        let filter = CompiledFilter::new(Some("fail"), None).unwrap();
        assert!(!filter.matches(&entry("2024-01-01T10:00:00 INFO starting")));
        assert!(filter.matches(&entry("no timestamp here ERROR failed")));
    }

    #[test]
    fn test_level_filter_is_case_insensitive() {
        let filter = CompiledFilter::new(None, Some("error")).unwrap();
        assert!(filter.matches(&entry("ERROR failed")));
        assert!(!filter.matches(&entry("INFO ok")));
        assert!(!filter.matches(&entry("no level at all")));
    }

    #[test]
    fn test_combined_filter() {
        let filter = CompiledFilter::new(Some("disk"), Some("WARN")).unwrap();
        assert!(filter.matches(&entry("warn disk at 91%")));
        assert!(!filter.matches(&entry("warn memory at 91%")));
        assert!(!filter.matches(&entry("error disk gone")));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = CompiledFilter::new(Some("("), None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let filter = CompiledFilter::new(Some(""), Some("")).unwrap();
        assert!(filter.regex.is_none());
        assert!(filter.level.is_none());
        assert!(filter.matches(&entry("anything")));
        assert!(filter.matches(&entry("no level at all")));
    }
}
