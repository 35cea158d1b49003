//! Destinations for live deploy progress.

use std::io::Write;
use std::sync::Mutex;

use tracing::debug;

/// Receives display lines as soon as they are complete.
///
/// Implementations must write each line as one unit: lines coming from
/// concurrent deploys may alternate but never mix within a line.
pub trait ProgressSink: Send + Sync {
    fn line(&self, text: &str);
}

/// Writes progress to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn line(&self, text: &str) {
        let mut buf = String::with_capacity(text.len() + 1);
        buf.push_str(text);
        buf.push('\n');

        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(buf.as_bytes()).and_then(|()| out.flush()) {
            debug!(error = %e, "failed to write progress line");
        }
    }
}

/// Collects progress in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ProgressSink for MemorySink {
    fn line(&self, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(text.to_string());
    }
}
