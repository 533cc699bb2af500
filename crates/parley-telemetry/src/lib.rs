//! On-disk persistence for conversation history

mod error;
mod io;
mod paths;

pub use error::TelemetryError;
pub use io::{append_jsonl, atomic_write, read_jsonl};
pub use paths::{Paths, HOME_ENV};
