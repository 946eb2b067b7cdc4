//! Pipeline Orchestrator: drives generation across a whole project.
//!
//! The full run has two strictly ordered phases. Every character portrait
//! reaches a terminal state before the first shot image is requested,
//! because shot images use portraits as identity references. Tasks run one
//! at a time with [`Pacing`] between them, and each task reads the store
//! just before it issues its request, so edits made mid-batch are honored.
//!
//! Only one batch runs at a time. There is no cancellation: a batch runs
//! through every entity, recording failures without stopping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use aniflow_core::project::Shot;
use aniflow_core::task::{ArtifactKind, TaskKey};
use aniflow_core::types::ShotId;
use aniflow_events::{EventBus, EventKind};
use uuid::Uuid;

use crate::pacing::Pacing;
use crate::tasks::{GenerationTasks, TaskError, TaskOutcome};

/// Errors that prevent a batch from starting.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("A batch is already in progress")]
    AlreadyRunning,
}

/// What happened to one entity in a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    /// The task ran; see the outcome.
    Ran(TaskOutcome),
    /// The task was refused before any external call.
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub key: TaskKey,
    pub result: EntryResult,
}

/// Summary of a finished batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub entries: Vec<BatchEntry>,
    pub elapsed: Duration,
}

impl BatchReport {
    fn new(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            entries: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(&e.result, EntryResult::Ran(o) if o.is_success()))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(&e.result, EntryResult::Ran(o) if !o.is_success()))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.result, EntryResult::Skipped(_)))
            .count()
    }

    fn record(&mut self, key: TaskKey, result: Result<TaskOutcome, TaskError>) {
        let result = match result {
            Ok(outcome) => EntryResult::Ran(outcome),
            Err(e) => {
                tracing::warn!(batch_id = %self.batch_id, error = %e, "Task skipped");
                EntryResult::Skipped(e.to_string())
            }
        };
        self.entries.push(BatchEntry { key, result });
    }
}

/// Clears the batch flag when the batch ends, however it ends.
struct BatchGuard<'a> {
    flag: &'a AtomicBool,
    bus: &'a EventBus,
}

impl<'a> BatchGuard<'a> {
    fn acquire(flag: &'a AtomicBool, bus: &'a EventBus) -> Result<Self, BatchError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BatchError::AlreadyRunning)?;
        bus.emit(EventKind::BatchStateChanged { in_progress: true });
        Ok(Self { flag, bus })
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.bus.emit(EventKind::BatchStateChanged { in_progress: false });
    }
}

pub struct PipelineOrchestrator {
    tasks: Arc<GenerationTasks>,
    pacing: Pacing,
    in_progress: AtomicBool,
}

impl PipelineOrchestrator {
    pub fn new(tasks: Arc<GenerationTasks>, pacing: Pacing) -> Self {
        Self {
            tasks,
            pacing,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn tasks(&self) -> &Arc<GenerationTasks> {
        &self.tasks
    }

    /// Whether a batch is running. Callers use this to disable conflicting
    /// manual actions.
    pub fn is_batch_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Portraits for every character, then a still for every shot.
    pub async fn run_full(&self) -> Result<BatchReport, BatchError> {
        let _guard = self.begin()?;
        let started = Instant::now();
        let mut report = BatchReport::new(Uuid::new_v4());
        let store = self.tasks.store();

        let names: Vec<String> = store
            .read(|p| p.characters.iter().map(|c| c.name.clone()).collect())
            .await;
        tracing::info!(
            batch_id = %report.batch_id,
            characters = names.len(),
            "Anchor phase started",
        );
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.pacing.wait().await;
            }
            let result = self.tasks.generate_portrait(name).await;
            report.record(TaskKey::portrait(name.clone()), result);
        }

        self.pacing.wait().await;

        // Shot order is read after the anchor phase so shots added or
        // removed meanwhile are respected.
        let shot_ids: Vec<ShotId> = store.read(|p| p.shots.iter().map(|s| s.id).collect()).await;
        tracing::info!(
            batch_id = %report.batch_id,
            shots = shot_ids.len(),
            "Shot phase started",
        );
        for (i, id) in shot_ids.into_iter().enumerate() {
            if i > 0 {
                self.pacing.wait().await;
            }
            let result = self.tasks.generate_shot_image(id).await;
            report.record(TaskKey::shot(id, ArtifactKind::Image), result);
        }

        Ok(self.finish(report, started))
    }

    /// Stills for every shot that has none yet.
    pub async fn batch_missing_images(&self) -> Result<BatchReport, BatchError> {
        self.run_missing(ArtifactKind::Image, |shot| {
            !shot.has_artifact(ArtifactKind::Image)
        })
        .await
    }

    /// Narration for every shot with dialogue and no audio yet.
    pub async fn batch_missing_narration(&self) -> Result<BatchReport, BatchError> {
        self.run_missing(ArtifactKind::Narration, |shot| {
            shot.has_dialogue() && !shot.has_artifact(ArtifactKind::Narration)
        })
        .await
    }

    // ---- private helpers ----

    fn begin(&self) -> Result<BatchGuard<'_>, BatchError> {
        BatchGuard::acquire(&self.in_progress, self.tasks.store().bus())
    }

    async fn run_missing<P>(&self, kind: ArtifactKind, missing: P) -> Result<BatchReport, BatchError>
    where
        P: Fn(&Shot) -> bool,
    {
        let _guard = self.begin()?;
        let started = Instant::now();
        let mut report = BatchReport::new(Uuid::new_v4());
        let store = self.tasks.store();

        let candidates: Vec<ShotId> = store
            .read(|p| p.shots.iter().filter(|&s| missing(s)).map(|s| s.id).collect())
            .await;
        tracing::info!(
            batch_id = %report.batch_id,
            kind = kind.as_str(),
            shots = candidates.len(),
            "Batch started",
        );

        let mut issued = 0usize;
        for id in candidates {
            // Re-check against the live store: the artifact may have been
            // produced manually while the batch was waiting.
            let still_missing = store.read(|p| p.shot(id).map(|s| missing(s))).await;
            if still_missing != Some(true) {
                continue;
            }

            if issued > 0 {
                self.pacing.wait().await;
            }
            issued += 1;

            let result = match kind {
                ArtifactKind::Narration => self.tasks.generate_narration(id).await,
                _ => self.tasks.generate_shot_image(id).await,
            };
            report.record(TaskKey::shot(id, kind), result);
        }

        Ok(self.finish(report, started))
    }

    fn finish(&self, mut report: BatchReport, started: Instant) -> BatchReport {
        report.elapsed = started.elapsed();
        tracing::info!(
            batch_id = %report.batch_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Batch finished",
        );
        report
    }
}
