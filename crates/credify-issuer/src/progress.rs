//! Per-student progress reporting

use credify_core::IssuanceStage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Receives every stage transition of every student in a run
pub trait ProgressObserver: Send + Sync {
    /// `index` is the student's position in the input rows
    fn on_stage(&self, index: usize, student: &str, stage: IssuanceStage);

    /// Called once per student when it reaches a terminal stage
    fn on_finished(&self, _completed: usize, _total: usize) {}
}

/// Default observer: stage transitions become tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_stage(&self, index: usize, student: &str, stage: IssuanceStage) {
        debug!(index, student, stage = %stage, "Stage transition");
    }
}

/// Observer that records transitions, for tests and status snapshots
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(usize, IssuanceStage)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(usize, IssuanceStage)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Stages seen for one student, in order
    pub fn stages_for(&self, index: usize) -> Vec<IssuanceStage> {
        self.events()
            .into_iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, s)| s)
            .collect()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_stage(&self, index: usize, _student: &str, stage: IssuanceStage) {
        if let Ok(mut events) = self.events.lock() {
            events.push((index, stage));
        }
    }
}

/// Shared progress state of one run
pub struct ProgressTracker {
    observer: Arc<dyn ProgressObserver>,
    completed: AtomicUsize,
    total: usize,
}

impl ProgressTracker {
    pub fn new(observer: Arc<dyn ProgressObserver>, total: usize) -> Self {
        Self {
            observer,
            completed: AtomicUsize::new(0),
            total,
        }
    }

    pub fn stage(&self, index: usize, student: &str, stage: IssuanceStage) {
        self.observer.on_stage(index, student, stage);
        if stage.is_terminal() {
            let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
            self.observer.on_finished(completed, self.total);
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
