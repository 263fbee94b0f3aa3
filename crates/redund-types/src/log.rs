//! [`RunLog`] – the human-readable progress/timing log collaborator.
//!
//! Both pipeline stages take a `&dyn RunLog` and report their milestones
//! through it ("Graph construction took …", "found a shorter path …").  The
//! collaborator is passed explicitly instead of living in a process-wide
//! singleton, so tests can capture messages with a [`MemoryLog`] and the CLI
//! can fan out to the console and a log file with a [`TeeLog`].

use std::sync::{Arc, Mutex};

/// Append-only sink for progress and timing messages.
pub trait RunLog: Send + Sync {
    /// Record one message.
    fn log(&self, message: &str);
}

impl<T: RunLog + ?Sized> RunLog for Arc<T> {
    fn log(&self, message: &str) {
        (**self).log(message);
    }
}

/// Forwards every message to `tracing::info!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl RunLog for TracingLog {
    fn log(&self, message: &str) {
        tracing::info!(target: "redund::run", "{message}");
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl RunLog for NullLog {
    fn log(&self, _message: &str) {}
}

/// Keeps every message in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the messages recorded so far.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// True when any recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl RunLog for MemoryLog {
    fn log(&self, message: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push(message.to_string());
    }
}

/// Sends every message to each of its inner logs, in registration order.
#[derive(Default)]
pub struct TeeLog {
    sinks: Vec<Box<dyn RunLog>>,
}

impl TeeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn with(mut self, sink: Box<dyn RunLog>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl RunLog for TeeLog {
    fn log(&self, message: &str) {
        for sink in &self.sinks {
            sink.log(message);
        }
    }
}
