//! End-to-end load of rolled-over and multi-stream simulation logs.

use pretty_assertions::assert_eq;
use simtrace::config::OutputFormat;
use simtrace::export::write_table;
use simtrace::{load_log, load_streams, LoadError, LogSource, TraceOptions};
use std::io::Write;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn trace(episode: u32, steps: u32, reward: f64) -> String {
    format!(
        "SIM_TRACE_LOG:{episode},{steps},0.5,0.25,1.5,-10.0,2.0,3,{reward},False,True,12.5,7,17.67,1626179493.123456,in_progress\tsim_time: 1.0"
    )
}

fn write_lines(path: &Path, lines: &[String]) {
    let mut f = std::fs::File::create(path).unwrap();
    for line in lines {
        writeln!(f, "{line}").unwrap();
    }
}

/// Three-part training log: `f.1` holds the run start, `f.2` the middle,
/// `f` the tail.
fn rolled_over_run(dir: &Path) -> PathBuf {
    let base = dir.join("robomaker.log");
    write_lines(
        &dir.join("robomaker.log.1"),
        &[
            "Using the following hyper-parameters".to_string(),
            trace(0, 0, 0.0),
            trace(0, 0, 0.0),
            trace(0, 1, 1.0),
            trace(0, 2, 1.5),
        ],
    );
    write_lines(
        &dir.join("robomaker.log.2"),
        &[trace(19, 1, 2.0), "noise line".to_string(), trace(20, 1, 2.5)],
    );
    write_lines(&base, &[trace(41, 1, 3.0)]);
    base
}

#[test]
fn rolled_over_parts_load_in_order() {
    let dir = TempDir::new().unwrap();
    let base = rolled_over_run(dir.path());

    let table = load_log(&base, &TraceOptions::default()).unwrap();
    let rows: Vec<(u32, u32, u32)> = table
        .rows()
        .iter()
        .map(|r| (r.record.iteration, r.record.episode, r.record.steps))
        .collect();
    assert_eq!(
        rows,
        vec![(1, 0, 1), (1, 0, 2), (1, 19, 1), (2, 20, 1), (3, 41, 1)]
    );
    assert!(table.rows().iter().all(|r| r.record.tstamp.as_str() == "1626179493.123456"));
}

#[test]
fn episodes_per_iteration_changes_iteration_only() {
    let dir = TempDir::new().unwrap();
    let base = rolled_over_run(dir.path());
    let opts = TraceOptions {
        episodes_per_iteration: NonZeroU32::new(10).unwrap(),
        ..TraceOptions::default()
    };
    let table = load_log(&base, &opts).unwrap();
    assert_eq!(table.iterations(), vec![1, 2, 3, 5]);
}

#[test]
fn missing_base_file_is_fatal_even_with_parts() {
    let dir = TempDir::new().unwrap();
    let base = rolled_over_run(dir.path());
    std::fs::remove_file(&base).unwrap();
    let err = load_log(&base, &TraceOptions::default()).unwrap_err();
    assert!(matches!(err, LoadError::MissingBaseFile { .. }));
}

#[test]
fn merged_streams_export_sorted_csv() {
    let dir = TempDir::new().unwrap();
    let placeholders = [trace(0, 0, 0.0), trace(0, 0, 0.0)];
    let mut b = placeholders.to_vec();
    b.extend([trace(2, 1, 4.0), trace(1, 1, 2.0)]);
    let mut a = placeholders.to_vec();
    a.extend([trace(2, 1, 3.0), trace(1, 1, 1.0)]);
    write_lines(&dir.path().join("b.log"), &b);
    write_lines(&dir.path().join("a.log"), &a);

    let sources = [
        LogSource::new(dir.path().join("b.log"), "eval-b"),
        LogSource::new(dir.path().join("a.log"), "eval-a"),
    ];
    let mut table = load_streams(&sources, &TraceOptions::default()).unwrap();
    table.normalize_rewards();

    let mut out = Vec::new();
    write_table(&table, OutputFormat::Csv, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 5);
    assert!(lines[0].ends_with(",pause_duration,stream"));
    let keys: Vec<(&str, &str, &str)> = lines[1..]
        .iter()
        .map(|l| {
            let cols: Vec<&str> = l.split(',').collect();
            (cols[18], cols[1], cols[9])
        })
        .collect();
    assert_eq!(
        keys,
        vec![
            ("eval-a", "1", "0.0"),
            ("eval-a", "2", "0.6666666666666666"),
            ("eval-b", "1", "0.3333333333333333"),
            ("eval-b", "2", "1.0"),
        ]
    );
}
