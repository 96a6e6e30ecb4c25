//! simtrace: turn reinforcement-learning simulation logs into tables.
//!
//! ```text
//! rolled-over parts ──► extract ──► normalize ──► LogTable ──► export
//!                                                    ▲
//!                          other streams ──► load ───┘ (merge)
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod load;
pub mod normalize;
pub mod record;
pub mod table;

pub use error::{FieldError, LoadError, NormalizeError};
pub use load::{discover_sources, load_buffer, load_log, load_streams, LogSource};
pub use record::{Schema, Timestamp, TraceOptions, TraceRecord};
pub use table::{LogTable, TraceRow};
