// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`executor`] runs one command, waits for exit / drain / cancellation and
//!   turns the outcome into an [`ExecutionError`](crate::errors::ExecutionError).
//! - [`capture`] holds the bounded ring buffer and the tee reader that feeds it.
//! - [`sink`] provides the `OutputSink` trait lines are streamed to, with a
//!   `tracing`-backed default.

pub mod capture;
pub mod executor;
pub mod sink;

pub use capture::{RingBuffer, SharedCapture, TeeReader};
pub use executor::{execute, Executor, CAPTURE_CAPACITY};
pub use sink::{OutputSink, TracingSink};
