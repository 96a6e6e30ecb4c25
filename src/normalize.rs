//! Payload decoding: turn extracted payload strings into [`TraceRecord`]s.

use crate::error::{FieldError, NormalizeError};
use crate::record::{decode_action, decode_done, iteration_for, Schema, Timestamp, TraceRecord};
use std::num::NonZeroU32;
use std::str::FromStr;

/// The harness prints two placeholder trace lines at the start of every run.
pub const LEADING_PLACEHOLDERS: usize = 2;

/// Positional view over one payload's comma-separated fields.
struct Fields<'a> {
    parts: Vec<&'a str>,
    offset: usize,
}

impl<'a> Fields<'a> {
    fn new(payload: &'a str) -> Self {
        let parts: Vec<&str> = payload.trim_end().split(',').collect();
        let offset = Schema::detect(parts.len()).offset();
        Self { parts, offset }
    }

    /// Raw field at a schema-stable position (before `reward`).
    fn fixed(&self, index: usize, name: &'static str) -> Result<&'a str, FieldError> {
        self.parts
            .get(index)
            .copied()
            .ok_or(FieldError::MissingField { index, name })
    }

    /// Raw field at a position that shifts with the schema variant.
    fn shifted(&self, index: usize, name: &'static str) -> Result<&'a str, FieldError> {
        self.fixed(index + self.offset, name)
    }

    fn optional_shifted(&self, index: usize) -> Option<&'a str> {
        self.parts.get(index + self.offset).copied()
    }
}

fn number<T: FromStr>(raw: &str, name: &'static str) -> Result<T, FieldError> {
    raw.trim().parse().map_err(|_| FieldError::InvalidNumber {
        name,
        value: raw.to_string(),
    })
}

/// Decode a single payload.
pub fn decode_payload(
    payload: &str,
    episodes_per_iteration: NonZeroU32,
) -> Result<TraceRecord, FieldError> {
    let f = Fields::new(payload);

    let episode: u32 = number(f.fixed(0, "episode")?, "episode")?;
    let steps = number(f.fixed(1, "steps")?, "steps")?;
    let x = number(f.fixed(2, "x")?, "x")?;
    let y = number(f.fixed(3, "y")?, "y")?;
    let yaw = number(f.fixed(4, "yaw")?, "yaw")?;
    let steering_angle = number(f.fixed(5, "steering_angle")?, "steering_angle")?;
    let speed = number(f.fixed(6, "speed")?, "speed")?;
    let action = decode_action(f.fixed(7, "action")?);

    let reward = number(f.shifted(8, "reward")?, "reward")?;
    let done_raw = f.shifted(9, "done")?;
    let done = decode_done(done_raw).map_err(|value| FieldError::UnrecognizedDone { value })?;
    let on_track = f.shifted(10, "on_track")?.to_string();
    let progress = number(f.shifted(11, "progress")?, "progress")?;
    let closest_waypoint = number(f.shifted(12, "closest_waypoint")?, "closest_waypoint")?;
    let track_len = number(f.shifted(13, "track_len")?, "track_len")?;
    let tstamp_raw = f.shifted(14, "tstamp")?;
    let tstamp = Timestamp::from_str(tstamp_raw)
        .map_err(|value| FieldError::InvalidTimestamp { value })?;
    let episode_status = f.shifted(15, "episode_status")?.to_string();
    let pause_duration = match f.optional_shifted(16) {
        Some(raw) => number(raw, "pause_duration")?,
        None => 0.0,
    };

    Ok(TraceRecord {
        iteration: iteration_for(episode, episodes_per_iteration),
        episode,
        steps,
        x,
        y,
        yaw,
        steering_angle,
        speed,
        action,
        reward,
        done,
        on_track,
        progress,
        closest_waypoint,
        track_len,
        tstamp,
        episode_status,
        pause_duration,
    })
}

/// Decode every payload of one source, dropping the leading placeholders.
///
/// Output order equals input order, one record per remaining payload.
pub fn normalize<S: AsRef<str>>(
    payloads: &[S],
    episodes_per_iteration: NonZeroU32,
) -> Result<Vec<TraceRecord>, NormalizeError> {
    payloads
        .iter()
        .enumerate()
        .skip(LEADING_PLACEHOLDERS)
        .map(|(position, payload)| {
            decode_payload(payload.as_ref(), episodes_per_iteration)
                .map_err(|kind| NormalizeError { position, kind })
        })
        .collect()
}
