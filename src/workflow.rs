//! Workflow state machine: owns the batch, the state and the status line.
//!
//! ## Transitions
//!
//! ```text
//!            submit(empty)                 transfer failed
//!   idle ─────────────────▶ error ◀──────────────────────┐
//!    │ ▲                      │                           │
//!    │ └──── intake / clear ──┘                           │
//!    │ submit(non-empty)                                  │
//!    └──────────────────────▶ loading ────────────────────┤
//!                               │ transfer ok             │
//!                               ▼                         │
//!                            success ── intake / clear ──▶ idle
//! ```
//!
//! While `loading`, every intake mutation and any resubmission is refused
//! with [`BatchError::Busy`]. Entering `loading` wipes the previous status
//! message so a stale error never lingers during a new attempt. On failure
//! the batch is kept as-is so the user can retry.
//!
//! Front ends drive a workflow either with the one-shot [`Workflow::submit`]
//! or with [`Workflow::begin_submit`] / [`Workflow::finish_submit`] when the
//! transfer runs somewhere else (a spawned task, a UI worker).

use crate::error::BatchError;
use crate::intake::{AdmissionReport, Batch, Candidate};
use crate::observer::{NoopObserver, SharedObserver};
use crate::save::ArchiveSink;
use crate::transfer::{SavedArchive, TransferClient};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Presentation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    Loading,
    Success,
    Error,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Loading => "loading",
            WorkflowState::Success => "success",
            WorkflowState::Error => "error",
        };
        f.write_str(s)
    }
}

/// The message shown to the user. Replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    Error(String),
    Success(String),
}

impl Status {
    pub fn message(&self) -> Option<&str> {
        match self {
            Status::Idle => None,
            Status::Error(m) | Status::Success(m) => Some(m),
        }
    }
}

/// Batch intake plus submission, as one explicit state machine.
pub struct Workflow {
    batch: Batch,
    state: WorkflowState,
    status: Status,
    client: TransferClient,
    sink: Arc<dyn ArchiveSink>,
    observer: SharedObserver,
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("batch", &self.batch)
            .field("state", &self.state)
            .field("status", &self.status)
            .field("endpoint", &self.client.config().endpoint)
            .finish()
    }
}

impl Workflow {
    /// A workflow with an empty batch sized from the client's config.
    pub fn new(client: TransferClient, sink: Arc<dyn ArchiveSink>) -> Self {
        Self {
            batch: Batch::new(client.config().capacity),
            state: WorkflowState::Idle,
            status: Status::Idle,
            client,
            sink,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.state == WorkflowState::Loading
    }

    /// Whether a submit button should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_busy() && !self.batch.is_empty()
    }

    // ── Intake ───────────────────────────────────────────────────────────

    /// Offer files to the batch. Both input adapters land here.
    pub fn offer<I>(&mut self, files: I) -> Result<AdmissionReport, BatchError>
    where
        I: IntoIterator<Item = Candidate>,
    {
        self.ensure_not_busy()?;
        let report = self.batch.attempt_add(files);
        if report.added > 0 {
            self.notify_batch();
        }
        match report.capacity_error() {
            Some(err) => self.transition(WorkflowState::Error, Status::Error(err.user_message())),
            None => self.transition(WorkflowState::Idle, Status::Idle),
        }
        Ok(report)
    }

    /// Remove the file at `index`. Out of range is a no-op.
    pub fn remove_at(&mut self, index: usize) -> Result<Option<Candidate>, BatchError> {
        self.ensure_not_busy()?;
        let removed = self.batch.remove_at(index);
        if let Some(ref c) = removed {
            debug!("Removed '{}' from batch", c.name());
            self.notify_batch();
        }
        self.transition(WorkflowState::Idle, Status::Idle);
        Ok(removed)
    }

    /// Empty the batch and reset the status.
    pub fn clear(&mut self) -> Result<(), BatchError> {
        self.ensure_not_busy()?;
        self.batch.clear();
        self.notify_batch();
        self.transition(WorkflowState::Idle, Status::Idle);
        Ok(())
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// Send the batch, save the archive, and settle the state.
    pub async fn submit(&mut self) -> Result<SavedArchive, BatchError> {
        let snapshot = self.begin_submit()?;
        let result = self.client.submit(&snapshot, self.sink.as_ref()).await;
        if let Ok(ref saved) = result {
            self.observer.on_archive_saved(&saved.path, saved.bytes);
        }
        self.finish_submit(result)
    }

    /// Enter `loading` and return the snapshot to transfer.
    ///
    /// An empty batch moves straight to `error` and no snapshot is returned.
    pub fn begin_submit(&mut self) -> Result<Vec<Candidate>, BatchError> {
        self.ensure_not_busy()?;
        if self.batch.is_empty() {
            let err = BatchError::EmptySubmission;
            self.transition(WorkflowState::Error, Status::Error(err.user_message()));
            return Err(err);
        }

        self.transition(WorkflowState::Loading, Status::Idle);
        self.observer
            .on_transfer_start(self.batch.len(), self.batch.total_bytes());
        Ok(self.batch.snapshot())
    }

    /// Apply the outcome of a transfer started with [`Self::begin_submit`].
    ///
    /// Success clears the batch; failure keeps it. The result is passed
    /// through so callers can `?` it.
    ///
    /// Outside `loading` there is no transfer to settle: the result is
    /// refused and the batch and state are left as they are.
    pub fn finish_submit(
        &mut self,
        result: Result<SavedArchive, BatchError>,
    ) -> Result<SavedArchive, BatchError> {
        if !self.is_busy() {
            warn!("Transfer result received in state {}; ignored", self.state);
            return Err(BatchError::Unexpected("no transfer in progress".into()));
        }
        match result {
            Ok(saved) => {
                info!(
                    "Converted {} files, saved '{}' to {}",
                    saved.files,
                    saved.filename,
                    saved.path.display()
                );
                self.batch.clear();
                self.notify_batch();
                self.transition(
                    WorkflowState::Success,
                    Status::Success(format!(
                        "Conversion complete! Your archive was saved as {}.",
                        saved.filename
                    )),
                );
                Ok(saved)
            }
            Err(err) => {
                debug!("Submission failed ({}): batch kept", err.kind());
                self.transition(WorkflowState::Error, Status::Error(err.user_message()));
                Err(err)
            }
        }
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn ensure_not_busy(&self) -> Result<(), BatchError> {
        if self.is_busy() {
            Err(BatchError::Busy)
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, state: WorkflowState, status: Status) {
        if self.state != state {
            debug!("Workflow {} → {}", self.state, state);
        }
        self.state = state;
        self.status = status;
        self.observer.on_state_changed(self.state, &self.status);
    }

    fn notify_batch(&self) {
        self.observer
            .on_batch_changed(self.batch.len(), self.batch.capacity());
    }
}
