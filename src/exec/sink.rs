// src/exec/sink.rs

//! Observability sinks receiving child output one line at a time.

use tokio::sync::mpsc;
use tracing::info;

/// Receives each completed line of combined child output, in stream order,
/// while the child is still running.
///
/// Sinks are moved into the drain task, hence `Send + 'static`.
pub trait OutputSink: Send + 'static {
    fn emit_line(&mut self, line: &str);
}

/// Default sink: one INFO event per line on target `localrun::output`.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    label: Option<String>,
}

impl TracingSink {
    /// Tag every event with `step = <label>`.
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

impl OutputSink for TracingSink {
    fn emit_line(&mut self, line: &str) {
        match self.label {
            Some(ref step) => info!(target: "localrun::output", step = %step, "{}", line),
            None => info!(target: "localrun::output", "{}", line),
        }
    }
}

/// Forwards lines over an unbounded channel. Lines sent after the receiver
/// is gone are dropped.
impl OutputSink for mpsc::UnboundedSender<String> {
    fn emit_line(&mut self, line: &str) {
        let _ = self.send(line.to_string());
    }
}
