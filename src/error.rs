use std::path::PathBuf;

/// Why a single payload could not be decoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("missing field {name} at position {index}")]
    MissingField { index: usize, name: &'static str },
    #[error("field {name} is not a valid number: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("tstamp is not a decimal timestamp: {value:?}")]
    InvalidTimestamp { value: String },
    #[error("done flag is not one of False/false/True/true: {value:?}")]
    UnrecognizedDone { value: String },
}

/// A payload that failed to decode, with its position in the payload list.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("payload {position}: {kind}")]
pub struct NormalizeError {
    pub position: usize,
    pub kind: FieldError,
}

/// Errors that abort loading a log source.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("log file not found: {}", path.display())]
    MissingBaseFile { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", path.display())]
    Normalize {
        path: PathBuf,
        source: NormalizeError,
    },
    #[error("failed to decode buffered log: {0}")]
    NormalizeBuffer(NormalizeError),
    #[error("invalid glob pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("failed to expand glob: {0}")]
    Glob(#[from] glob::GlobError),
    #[error("could not derive a stream label for {}", path.display())]
    StreamLabel { path: PathBuf },
}
