//! Typed trace records and the field-level decoders they are built from.

use serde::{Serialize, Serializer};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

pub const DEFAULT_EPISODES_PER_ITERATION: NonZeroU32 = match NonZeroU32::new(20) {
    Some(n) => n,
    None => panic!("default episodes per iteration must be non-zero"),
};

/// Explicit extraction and normalization settings, passed into every load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOptions {
    /// Token identifying a trace line.
    pub marker: String,
    /// Training hyperparameter used to derive `iteration` from `episode`.
    pub episodes_per_iteration: NonZeroU32,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            marker: crate::extract::DEFAULT_MARKER.to_string(),
            episodes_per_iteration: DEFAULT_EPISODES_PER_ITERATION,
        }
    }
}

/// Positional layout of a trace payload.
///
/// Some harness versions emit one extra field between `action` and `reward`.
/// The two layouts are told apart purely by field count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// 16 or 17 fields: `reward` at index 8.
    V1,
    /// More than 17 fields: `reward` at index 9.
    V1Extended,
}

impl Schema {
    /// Field counts above this select [`Schema::V1Extended`].
    pub const V1_MAX_FIELDS: usize = 17;

    pub fn detect(field_count: usize) -> Self {
        if field_count > Self::V1_MAX_FIELDS {
            Schema::V1Extended
        } else {
            Schema::V1
        }
    }

    /// Shift applied to every field from `reward` onward.
    pub fn offset(self) -> usize {
        match self {
            Schema::V1 => 0,
            Schema::V1Extended => 1,
        }
    }
}

/// Decode the `done` column.
///
/// Accepted tokens, surrounding whitespace ignored: `False` and `false`
/// decode to `false`; `True` and `true` decode to `true`. Numeric tokens
/// are not flags here and are rejected like anything else, returned as `Err`
/// with the trimmed token.
pub fn decode_done(token: &str) -> Result<bool, String> {
    match token.trim() {
        "False" | "false" => Ok(false),
        "True" | "true" => Ok(true),
        other => Err(other.to_string()),
    }
}

/// Decode the `action` column. Non-integer tokens become `-1`.
pub fn decode_action(token: &str) -> i32 {
    token.trim().parse().unwrap_or(-1)
}

/// Wall-clock timestamp kept as its exact decimal text.
///
/// The harness prints `time.time()` with full precision; holding the text
/// avoids losing digits to a float round-trip. Accepted grammar: optional
/// sign, digits with an optional fraction, optional `e`/`E` exponent.
/// `NaN` and `inf` are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_f64(&self) -> f64 {
        // Validated in from_str, so this parse cannot fail.
        self.0.parse().unwrap_or(f64::NAN)
    }
}

impl FromStr for Timestamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(i) => (&unsigned[..i], Some(&unsigned[i + 1..])),
            None => (unsigned, None),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (mantissa, None),
        };
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        let mantissa_ok = all_digits(int_part)
            && frac_part.map_or(true, all_digits)
            && (!int_part.is_empty() || frac_part.is_some_and(|f| !f.is_empty()));
        let exponent_ok = exponent.map_or(true, |e| {
            let e = e.strip_prefix(['+', '-']).unwrap_or(e);
            !e.is_empty() && all_digits(e)
        });
        if mantissa_ok && exponent_ok {
            Ok(Timestamp(text.to_string()))
        } else {
            Err(text.to_string())
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

fn serialize_done<S: Serializer>(done: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*done))
}

/// One decoded simulation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    /// `episode / episodes_per_iteration + 1`.
    pub iteration: u32,
    pub episode: u32,
    pub steps: u32,
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub steering_angle: f64,
    pub speed: f64,
    /// `-1` when the harness logged a non-integer action.
    pub action: i32,
    pub reward: f64,
    #[serde(serialize_with = "serialize_done")]
    pub done: bool,
    /// Kept verbatim; harness versions disagree on its encoding.
    pub on_track: String,
    pub progress: f64,
    pub closest_waypoint: u32,
    pub track_len: f64,
    pub tstamp: Timestamp,
    pub episode_status: String,
    /// `0.0` when the payload predates the field.
    pub pause_duration: f64,
}

/// Derive the training iteration an episode belongs to.
pub fn iteration_for(episode: u32, episodes_per_iteration: NonZeroU32) -> u32 {
    episode / episodes_per_iteration.get() + 1
}
