use std::sync::{Arc, Mutex};

use crate::report::MatchRecord;

/// Where a pipeline run reports to. The hosting application decides how
/// progress, results and narrative lines are surfaced.
pub trait PipelineSink {
    /// Percentage 0..=100, never decreasing within a run; the last call is 100.
    fn report_progress(&self, percent: u8);
    /// One call per match, in discovery order.
    fn emit_result(&self, record: &MatchRecord);
    /// Free-text run narrative.
    fn emit_log(&self, line: &str);
}

impl<S: PipelineSink + ?Sized> PipelineSink for &S {
    fn report_progress(&self, percent: u8) {
        (**self).report_progress(percent)
    }
    fn emit_result(&self, record: &MatchRecord) {
        (**self).emit_result(record)
    }
    fn emit_log(&self, line: &str) {
        (**self).emit_log(line)
    }
}

impl<S: PipelineSink + ?Sized> PipelineSink for Arc<S> {
    fn report_progress(&self, percent: u8) {
        (**self).report_progress(percent)
    }
    fn emit_result(&self, record: &MatchRecord) {
        (**self).emit_result(record)
    }
    fn emit_log(&self, line: &str) {
        (**self).emit_log(line)
    }
}

/// Sink that drops everything.
pub struct NullSink;

impl PipelineSink for NullSink {
    fn report_progress(&self, _percent: u8) {}
    fn emit_result(&self, _record: &MatchRecord) {}
    fn emit_log(&self, _line: &str) {}
}

/// In-memory sink; the shared state a polling front-end would read.
#[derive(Default)]
pub struct RecordingSink {
    progress: Mutex<Vec<u8>>,
    results: Mutex<Vec<MatchRecord>>,
    log: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.progress.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn latest_progress(&self) -> u8 {
        self.progress().last().copied().unwrap_or(0)
    }

    pub fn results(&self) -> Vec<MatchRecord> {
        self.results.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl PipelineSink for RecordingSink {
    fn report_progress(&self, percent: u8) {
        if let Ok(mut p) = self.progress.lock() {
            p.push(percent);
        }
    }

    fn emit_result(&self, record: &MatchRecord) {
        if let Ok(mut r) = self.results.lock() {
            r.push(record.clone());
        }
    }

    fn emit_log(&self, line: &str) {
        if let Ok(mut l) = self.log.lock() {
            l.push(line.to_string());
        }
    }
}
