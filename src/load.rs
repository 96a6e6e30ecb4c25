//! End-to-end loading: extraction, normalization and multi-stream merge.

use crate::error::LoadError;
use crate::extract::{extract_from_str, load_data};
use crate::normalize::normalize;
use crate::record::TraceOptions;
use crate::table::LogTable;
use regex::Regex;
use std::path::{Path, PathBuf};

/// A log file and the stream label its rows are tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    pub path: PathBuf,
    pub stream: String,
}

impl LogSource {
    pub fn new(path: impl Into<PathBuf>, stream: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stream: stream.into(),
        }
    }
}

/// Load one (possibly rolled-over) log into a table.
pub fn load_log(path: &Path, opts: &TraceOptions) -> Result<LogTable, LoadError> {
    let payloads = load_data(path, &opts.marker)?;
    let records =
        normalize(&payloads, opts.episodes_per_iteration).map_err(|source| LoadError::Normalize {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(
        file = %path.display(),
        payloads = payloads.len(),
        records = records.len(),
        "loaded trace log"
    );
    Ok(LogTable::from_records(records))
}

/// Load log text that has already been fetched into memory.
pub fn load_buffer(text: &str, opts: &TraceOptions) -> Result<LogTable, LoadError> {
    let mut payloads = Vec::new();
    extract_from_str(text, &opts.marker, &mut payloads);
    let records =
        normalize(&payloads, opts.episodes_per_iteration).map_err(LoadError::NormalizeBuffer)?;
    Ok(LogTable::from_records(records))
}

/// Load every source, tag it with its stream, and merge into one ordered table.
///
/// Each source is loaded independently; the first failure aborts the merge.
pub fn load_streams(sources: &[LogSource], opts: &TraceOptions) -> Result<LogTable, LoadError> {
    let mut tables = Vec::with_capacity(sources.len());
    for source in sources {
        let table = load_log(&source.path, opts)?.tag_stream(&source.stream);
        tables.push(table);
    }
    let merged = LogTable::merge(tables);
    tracing::info!(
        streams = sources.len(),
        rows = merged.len(),
        "merged trace streams"
    );
    Ok(merged)
}

/// Expand `pattern` and label each match.
///
/// With a `stream_regex` the first capture group (or the whole match when
/// the regex has no groups) is the label; a path the regex does not match is
/// an error. Without one the file stem is used. Rollover parts (`*.log.1`)
/// are never returned as sources of their own.
pub fn discover_sources(
    pattern: &str,
    stream_regex: Option<&Regex>,
) -> Result<Vec<LogSource>, LoadError> {
    let paths = glob::glob(pattern).map_err(|source| LoadError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut sources = Vec::new();
    for entry in paths {
        let path = entry?;
        if !path.is_file() || is_rollover_part(&path) {
            tracing::debug!(file = %path.display(), "skipping discovered path");
            continue;
        }
        let stream = stream_label(&path, stream_regex)?;
        sources.push(LogSource::new(path, stream));
    }

    if sources.is_empty() {
        tracing::warn!(pattern, "no log files matched");
    }
    Ok(sources)
}

fn is_rollover_part(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let name = name.strip_suffix(".zst").unwrap_or(name);
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_digit()))
}

fn stream_label(path: &Path, stream_regex: Option<&Regex>) -> Result<String, LoadError> {
    let text = path.to_string_lossy();
    let label = match stream_regex {
        Some(re) => re.captures(&text).and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().to_string())
        }),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned()),
    };
    label.ok_or_else(|| LoadError::StreamLabel {
        path: path.to_path_buf(),
    })
}
