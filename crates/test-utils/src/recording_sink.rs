use std::sync::{Arc, Mutex};

use localrun::exec::OutputSink;

/// A sink that records every emitted line.
///
/// Clones share the same line list, so keep one clone in the test and hand
/// the other to the executor.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl OutputSink for RecordingSink {
    fn emit_line(&mut self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
