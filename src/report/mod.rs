//! Stale-user report: selection rule and CSV output.

pub mod csv_sink;
pub mod filter;

pub use csv_sink::CsvSink;
pub use filter::{Clock, FixedClock, OutputRow, StaleUserFilter, SystemClock, NO_EMAIL, NO_SIGN_IN};
