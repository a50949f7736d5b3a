use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tradesignal_common::{PipelineError, Stage};

/// Cooperative stop signal shared between the orchestrator and the stage
/// workers. Workers poll it between items; an in-flight item always finishes.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Point-in-time view of pipeline execution, for status polling.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub is_running: bool,
    pub run_id: Option<i64>,
    pub current_stage: Option<String>,
    pub message: Option<String>,
    pub items_done: u32,
    pub items_total: u32,
    pub stop_requested: bool,
    /// Per-source new-link counts from the discovery stage.
    pub source_counts: BTreeMap<String, u32>,
    /// When this snapshot was taken.
    pub as_of: DateTime<Utc>,
}

#[derive(Default)]
struct TrackerInner {
    is_running: bool,
    run_id: Option<i64>,
    current_stage: Option<Stage>,
    message: Option<String>,
    items_done: u32,
    items_total: u32,
    source_counts: BTreeMap<String, u32>,
}

/// In-process execution state: the single-flight lock plus everything the
/// status endpoint reports. Persisted run records live in the store; this is
/// the live view only.
#[derive(Default)]
pub struct StatusTracker {
    inner: Mutex<TrackerInner>,
    cancel: CancelFlag,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the single-flight lock. Fails with `Busy` if a run is in flight.
    /// On success the cancel flag and progress fields are reset.
    pub fn acquire(&self) -> Result<(), PipelineError> {
        let mut inner = self.lock();
        if inner.is_running {
            let stage = inner
                .current_stage
                .map(|s| s.display_name().to_string())
                .unwrap_or_else(|| "starting".to_string());
            return Err(PipelineError::Busy { stage });
        }

        *inner = TrackerInner {
            is_running: true,
            ..TrackerInner::default()
        };
        self.cancel.reset();
        Ok(())
    }

    /// Release the lock after the run record is finalized. The run id and
    /// stage are cleared; the last message and counts stay visible until the
    /// next acquire.
    pub fn release(&self) {
        let mut inner = self.lock();
        inner.is_running = false;
        inner.current_stage = None;
        inner.run_id = None;
    }

    pub fn attach_run(&self, run_id: i64) {
        self.lock().run_id = Some(run_id);
    }

    pub fn set_stage(&self, stage: Stage) {
        let mut inner = self.lock();
        inner.current_stage = Some(stage);
        inner.message = Some(stage.display_name().to_string());
        inner.items_done = 0;
        inner.items_total = 0;
    }

    pub fn update_progress(&self, done: u32, total: u32) {
        let mut inner = self.lock();
        inner.items_done = done;
        inner.items_total = total;
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.lock().message = Some(message.into());
    }

    pub fn record_source_count(&self, source: &str, new_links: u32) {
        self.lock()
            .source_counts
            .insert(source.to_string(), new_links);
    }

    /// Signal the running pipeline to stop after its in-flight item.
    pub fn request_cancel(&self) -> Result<(), PipelineError> {
        let inner = self.lock();
        if !inner.is_running {
            return Err(PipelineError::NotRunning);
        }
        self.cancel.request();
        Ok(())
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_running
    }

    pub fn snapshot(&self) -> PipelineStatus {
        let inner = self.lock();
        PipelineStatus {
            is_running: inner.is_running,
            run_id: inner.run_id,
            current_stage: inner.current_stage.map(|s| s.display_name().to_string()),
            message: inner.message.clone(),
            items_done: inner.items_done,
            items_total: inner.items_total,
            stop_requested: self.cancel.is_cancelled(),
            source_counts: inner.source_counts.clone(),
            as_of: Utc::now(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerInner> {
        // Inner never panics while holding the lock; recover rather than
        // poison the whole control surface.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
