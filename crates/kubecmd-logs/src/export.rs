use std::io::Write;
use std::str::FromStr;

use chrono::SecondsFormat;

use kubecmd_types::{Error, LogEntry, Result};

const CSV_HEADER: [&str; 6] = ["Timestamp", "Pod", "Container", "Namespace", "Level", "Message"];

/// Supported export formats
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// One JSON array
    Json,
    /// One JSON object per line
    Ndjson,
    Csv,
    /// `[ts] [namespace] [pod/container] [level] message`
    Plaintext,
}

impl ExportFormat {
    /// Case-insensitive parse; `text` is an alias of `plaintext`
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            "csv" => Ok(Self::Csv),
            "plaintext" | "text" => Ok(Self::Plaintext),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            Self::Csv => "csv",
            Self::Plaintext => "plaintext",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Serialize entries in the named format
pub fn export(entries: &[LogEntry], format: &str) -> Result<Vec<u8>> {
    let format = ExportFormat::parse(format)?;
    let mut buf = Vec::new();
    export_to(entries, format, &mut buf)?;
    Ok(buf)
}

/// Write entries to `writer` in input order
///
/// Output already written when an error occurs is not rolled back.
pub fn export_to<W: Write>(
    entries: &[LogEntry],
    format: ExportFormat,
    writer: &mut W,
) -> Result<()> {
    let written = match format {
        ExportFormat::Json => write_json(entries, writer),
        ExportFormat::Ndjson => write_ndjson(entries, writer),
        ExportFormat::Csv => write_csv(entries, writer),
        ExportFormat::Plaintext => write_plaintext(entries, writer),
    };
    written.map_err(|e| {
        Error::StreamError(format!("error writing {} export: {}", format.as_str(), e))
    })
}

fn write_json<W: Write>(entries: &[LogEntry], writer: &mut W) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, entries)?;
    writer.write_all(b"\n")
}

fn write_ndjson<W: Write>(entries: &[LogEntry], writer: &mut W) -> std::io::Result<()> {
    for entry in entries {
        serde_json::to_writer(&mut *writer, entry)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

fn write_csv<W: Write>(entries: &[LogEntry], writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "{}", CSV_HEADER.join(","))?;

    for entry in entries {
        let timestamp = rfc3339(entry);
        let row: [&str; 6] = [
            timestamp.as_str(),
            &entry.pod,
            &entry.container,
            &entry.namespace,
            entry.level_str(),
            &entry.message,
        ];
        let escaped: Vec<String> = row.iter().map(|val| csv_field(val)).collect();
        writeln!(writer, "{}", escaped.join(","))?;
    }
    Ok(())
}

/// Quote a field containing a delimiter, quote or line break; double inner quotes
fn csv_field(val: &str) -> String {
    if val.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", val.replace('"', "\"\""))
    } else {
        val.to_string()
    }
}

fn write_plaintext<W: Write>(entries: &[LogEntry], writer: &mut W) -> std::io::Result<()> {
    for entry in entries {
        writeln!(
            writer,
            "[{}] [{}] [{}/{}] [{}] {}",
            rfc3339(entry),
            entry.namespace,
            entry.pod,
            entry.container,
            entry.level_str(),
            entry.message
        )?;
    }
    Ok(())
}

fn rfc3339(entry: &LogEntry) -> String {
    entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
