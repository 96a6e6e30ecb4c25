//! Ordered table of decoded trace records, optionally tagged by stream.

use crate::record::TraceRecord;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

/// One table row: a record plus the stream it was loaded from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRow {
    #[serde(flatten)]
    pub record: TraceRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
}

/// Rows in load order until [`LogTable::merge`] sorts them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogTable {
    rows: Vec<TraceRow>,
}

impl LogTable {
    pub fn from_records(records: Vec<TraceRecord>) -> Self {
        Self {
            rows: records
                .into_iter()
                .map(|record| TraceRow {
                    record,
                    stream: None,
                })
                .collect(),
        }
    }

    pub fn rows(&self) -> &[TraceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when any row carries a stream label.
    pub fn has_stream(&self) -> bool {
        self.rows.iter().any(|r| r.stream.is_some())
    }

    /// Label every row with `stream`.
    pub fn tag_stream(mut self, stream: &str) -> Self {
        for row in &mut self.rows {
            row.stream = Some(stream.to_string());
        }
        self
    }

    /// Concatenate tables and sort by (stream, episode, steps), stable.
    pub fn merge(tables: impl IntoIterator<Item = LogTable>) -> Self {
        let mut rows: Vec<TraceRow> = tables.into_iter().flat_map(|t| t.rows).collect();
        rows.sort_by(compare_rows);
        Self { rows }
    }

    /// Drop rows repeating an earlier (stream, episode, steps) key.
    ///
    /// The first occurrence of each key is kept and row order is preserved,
    /// so this works on unsorted single-source tables too. Returns the number
    /// of rows dropped.
    pub fn dedup(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<(Option<String>, u32, u32)> = HashSet::new();
        self.rows.retain(|row| {
            seen.insert((row.stream.clone(), row.record.episode, row.record.steps))
        });
        before - self.rows.len()
    }

    /// Min-max rescale the reward column into [0, 1], fit on this table.
    ///
    /// When every reward is equal the range is zero and every reward becomes
    /// `0.0`. An empty table is left untouched.
    pub fn normalize_rewards(&mut self) {
        let (min, max) = self
            .rows
            .iter()
            .map(|r| r.record.reward)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if self.rows.is_empty() {
            return;
        }
        let range = max - min;
        for row in &mut self.rows {
            row.record.reward = if range > 0.0 {
                (row.record.reward - min) / range
            } else {
                0.0
            };
        }
    }

    /// Distinct iteration numbers, ascending.
    pub fn iterations(&self) -> Vec<u32> {
        let mut its: Vec<u32> = self.rows.iter().map(|r| r.record.iteration).collect();
        its.sort_unstable();
        its.dedup();
        its
    }
}

fn compare_rows(a: &TraceRow, b: &TraceRow) -> Ordering {
    a.stream
        .cmp(&b.stream)
        .then(a.record.episode.cmp(&b.record.episode))
        .then(a.record.steps.cmp(&b.record.steps))
}
