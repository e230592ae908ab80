//! Vectorization progress reporting.
//!
//! The vectorizer pushes one event after every item, success or failure, so
//! a caller can drive a progress bar. CLI reporters write to **stderr** so
//! stdout stays parseable for scripts.

use std::io::Write;
use std::sync::Mutex;

/// Progress after one item has been processed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorizeProgress {
    pub processed: usize,
    pub total: usize,
    /// `round(processed / total * 100)`.
    pub percent: u8,
}

impl VectorizeProgress {
    pub fn new(processed: usize, total: usize) -> Self {
        Self {
            processed,
            total,
            percent: percent(processed, total),
        }
    }
}

/// Integer percentage, rounded half away from zero. An empty run is complete.
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((processed as f64 / total as f64) * 100.0).round() as u8
}

/// Receives progress events. Called from the vectorize loop.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: VectorizeProgress);
}

/// Human-friendly progress on stderr: "vectorize  3 / 7 items  43%".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: VectorizeProgress) {
        let line = format!(
            "vectorize  {} / {} items  {}%\n",
            event.processed, event.total, event.percent
        );
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: VectorizeProgress) {
        let obj = serde_json::json!({
            "event": "progress",
            "processed": event.processed,
            "total": event.total,
            "percent": event.percent,
        });
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", obj);
        let _ = stderr.flush();
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: VectorizeProgress) {}
}

/// Keeps every event in memory. Used by the HTTP handler to return the
/// progress sequence, and by tests.
#[derive(Default)]
pub struct CollectingProgress {
    events: Mutex<Vec<VectorizeProgress>>,
}

impl CollectingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<VectorizeProgress> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.events().iter().map(|e| e.percent).collect()
    }
}

impl ProgressReporter for CollectingProgress {
    fn report(&self, event: VectorizeProgress) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
