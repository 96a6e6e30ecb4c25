//! Trace-line extraction: pull marker-tagged payloads out of raw log text.
//!
//! Logs written by local training are split into numbered parts when they
//! reach a size limit (`robomaker.log.1`, `robomaker.log.2`, ...). Parts
//! archived with zstd keep the same name plus `.zst`.

use crate::error::LoadError;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Marker printed by the simulation harness ahead of every trace record.
pub const DEFAULT_MARKER: &str = "SIM_TRACE_LOG";

/// Extract the payload from one log line, or `None` if the marker is absent.
///
/// The payload is everything after the marker (and its `:` separator) up to
/// the first tab.
pub fn payload_from_line<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let idx = line.find(marker)?;
    let rest = &line[idx + marker.len()..];
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    Some(rest.split('\t').next().unwrap_or(rest))
}

/// Append every payload found in `text` to `data`, in line order.
pub fn extract_from_str(text: &str, marker: &str, data: &mut Vec<String>) {
    data.extend(
        text.lines()
            .filter_map(|line| payload_from_line(line, marker))
            .map(str::to_string),
    );
}

/// Read `reader` to the end and append its payloads to `data`.
pub fn extract_from_reader<R: Read>(
    mut reader: R,
    marker: &str,
    data: &mut Vec<String>,
) -> std::io::Result<()> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    extract_from_str(&String::from_utf8_lossy(&bytes), marker, data);
    Ok(())
}

/// Read a whole log file into memory, decompressing `.zst` archives.
pub fn read_log_text(path: &Path) -> Result<String, LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let bytes = std::fs::read(path).map_err(io_err)?;
    let bytes = if is_zstd(path) {
        zstd::decode_all(bytes.as_slice()).map_err(io_err)?
    } else {
        bytes
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn is_zstd(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("zst")
}

/// Append the payloads of a single file to `data`.
pub fn extract_file(path: &Path, marker: &str, data: &mut Vec<String>) -> Result<(), LoadError> {
    let before = data.len();
    let text = read_log_text(path)?;
    extract_from_str(&text, marker, data);
    tracing::debug!(
        file = %path.display(),
        payloads = data.len() - before,
        "extracted trace payloads"
    );
    Ok(())
}

/// Numbered rollover parts of `base`, in ascending order.
///
/// Probing starts at `.1` and stops at the first number with neither a plain
/// nor a `.zst` part on disk.
pub fn rolled_parts(base: &Path) -> Vec<PathBuf> {
    let mut parts = Vec::new();
    for n in 1.. {
        let plain = suffixed(base, &n.to_string());
        let archived = suffixed(base, &format!("{n}.zst"));
        if plain.is_file() {
            parts.push(plain);
        } else if archived.is_file() {
            parts.push(archived);
        } else {
            break;
        }
    }
    parts
}

fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Load every payload of a possibly rolled-over log.
///
/// Numbered parts are read in ascending order, then the base file itself.
/// Only a missing base file is an error.
pub fn load_data(base: &Path, marker: &str) -> Result<Vec<String>, LoadError> {
    if !base.is_file() {
        return Err(LoadError::MissingBaseFile {
            path: base.to_path_buf(),
        });
    }

    let parts = rolled_parts(base);
    let mut data = Vec::new();
    for part in &parts {
        extract_file(part, marker, &mut data)?;
    }
    extract_file(base, marker, &mut data)?;

    if !parts.is_empty() {
        tracing::info!(
            file = %base.display(),
            files = parts.len() + 1,
            "loaded rolled-over log files"
        );
    }

    Ok(data)
}
