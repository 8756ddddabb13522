//! Observer trait through which a front end watches the workflow.
//!
//! The core never renders anything. A terminal, desktop shell or web bridge
//! implements [`WorkflowObserver`] and is handed every state change, batch
//! change and transfer event as it happens. All methods default to no-ops so
//! implementors override only what they display.
//!
//! # Example
//!
//! ```rust
//! use docbatch::{WorkflowObserver, WorkflowState, Status};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct StateLog {
//!     seen: Mutex<Vec<WorkflowState>>,
//! }
//!
//! impl WorkflowObserver for StateLog {
//!     fn on_state_changed(&self, state: WorkflowState, _status: &Status) {
//!         self.seen.lock().unwrap().push(state);
//!     }
//! }
//!
//! let log = Arc::new(StateLog::default());
//! log.on_state_changed(WorkflowState::Loading, &Status::Idle);
//! assert_eq!(log.seen.lock().unwrap().len(), 1);
//! ```

use crate::workflow::{Status, WorkflowState};
use std::path::Path;
use std::sync::Arc;

/// Receives workflow events.
///
/// Implementations must be `Send + Sync` so a workflow holding one can be
/// moved onto a tokio task.
pub trait WorkflowObserver: Send + Sync {
    /// Called after every batch mutation.
    fn on_batch_changed(&self, len: usize, capacity: usize) {
        let _ = (len, capacity);
    }

    /// Called after every state or status change.
    fn on_state_changed(&self, state: WorkflowState, status: &Status) {
        let _ = (state, status);
    }

    /// Called just before the request is sent.
    ///
    /// # Arguments
    /// * `files` — number of files in the request
    /// * `bytes` — total size of all file bodies
    fn on_transfer_start(&self, files: usize, bytes: u64) {
        let _ = (files, bytes);
    }

    /// Called once the archive has been saved.
    fn on_archive_saved(&self, path: &Path, bytes: u64) {
        let _ = (path, bytes);
    }
}

/// Observer that ignores every event. The default.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Convenience alias for the type stored in [`crate::workflow::Workflow`].
pub type SharedObserver = Arc<dyn WorkflowObserver>;
