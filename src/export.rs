//! Table output formats.

use crate::config::OutputFormat;
use crate::table::{LogTable, TraceRow};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Column order of every exported table, before the optional `stream` column.
pub const COLUMNS: [&str; 18] = [
    "iteration",
    "episode",
    "steps",
    "x",
    "y",
    "yaw",
    "steering_angle",
    "speed",
    "action",
    "reward",
    "done",
    "on_track",
    "progress",
    "closest_waypoint",
    "track_len",
    "tstamp",
    "episode_status",
    "pause_duration",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error during export: {0}")]
    Io(#[from] io::Error),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `table` to `out` in the requested format.
pub fn write_table<W: Write>(
    table: &LogTable,
    format: OutputFormat,
    out: W,
) -> Result<(), ExportError> {
    match format {
        OutputFormat::Csv => write_csv(table, out)?,
        OutputFormat::Json => write_json(table, out)?,
    }
    Ok(())
}

/// Write `table` to a file, or to stdout when `path` is `None`.
pub fn write_table_to(
    table: &LogTable,
    format: OutputFormat,
    path: Option<&Path>,
) -> Result<(), ExportError> {
    match path {
        Some(p) => {
            let file = std::fs::File::create(p)?;
            write_table(table, format, BufWriter::new(file))
        }
        None => write_table(table, format, io::stdout().lock()),
    }
}

/// Write `table` as CSV with a header row.
///
/// Floats use shortest round-trip formatting, `done` is `0`/`1`, `tstamp`
/// is written verbatim.
pub fn write_csv<W: Write>(table: &LogTable, out: W) -> io::Result<()> {
    let mut w = BufWriter::new(out);
    let with_stream = table.has_stream();

    write!(w, "{}", COLUMNS.join(","))?;
    if with_stream {
        write!(w, ",stream")?;
    }
    writeln!(w)?;

    for row in table.rows() {
        write_csv_row(&mut w, row, with_stream)?;
    }
    w.flush()
}

fn write_csv_row<W: Write>(w: &mut W, row: &TraceRow, with_stream: bool) -> io::Result<()> {
    let r = &row.record;
    write!(
        w,
        "{},{},{},{:?},{:?},{:?},{:?},{:?},{},{:?},{},{},{:?},{},{:?},{},{},{:?}",
        r.iteration,
        r.episode,
        r.steps,
        r.x,
        r.y,
        r.yaw,
        r.steering_angle,
        r.speed,
        r.action,
        r.reward,
        u8::from(r.done),
        csv_field(&r.on_track),
        r.progress,
        r.closest_waypoint,
        r.track_len,
        r.tstamp,
        csv_field(&r.episode_status),
        r.pause_duration,
    )?;
    if with_stream {
        write!(w, ",{}", csv_field(row.stream.as_deref().unwrap_or("")))?;
    }
    writeln!(w)
}

/// Quote a text field when it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> std::borrow::Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\"")).into()
    } else {
        value.into()
    }
}

/// Write `table` as a pretty-printed JSON array of row objects.
pub fn write_json<W: Write>(table: &LogTable, out: W) -> serde_json::Result<()> {
    let mut w = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut w, table.rows())?;
    writeln!(w).map_err(serde_json::Error::io)?;
    w.flush().map_err(serde_json::Error::io)
}
