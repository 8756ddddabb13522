//! # docbatch
//!
//! Assemble a bounded batch of `.docx` files, send them to a remote
//! conversion service in one multipart request, and save the archive it
//! returns.
//!
//! ## Workflow Overview
//!
//! ```text
//! picker / dropped folder
//!  │
//!  ├─ 1. Sources   read files into candidates (both paths identical)
//!  ├─ 2. Intake    type gate → duplicate gate → capacity gate (30)
//!  ├─ 3. Workflow  idle → loading → success | error
//!  ├─ 4. Transfer  one POST, field `files` per candidate, batch order
//!  └─ 5. Save      Content-Disposition filename → sink, temp released
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docbatch::{ClientConfig, DirectorySink, FileSource, TransferClient, Workflow};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .endpoint("http://localhost:8000/convert")
//!         .build()?;
//!     let client = TransferClient::new(config)?;
//!     let mut workflow = Workflow::new(client, Arc::new(DirectorySink::new(".")));
//!
//!     let files = FileSource::Drop(PathBuf::from("reports")).load().await;
//!     let report = workflow.offer(files)?;
//!     if let Some(msg) = report.message() {
//!         eprintln!("{msg}");
//!     }
//!
//!     let saved = workflow.submit().await?;
//!     println!("saved {}", saved.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docbatch` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod intake;
pub mod observer;
pub mod save;
pub mod sources;
pub mod transfer;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_CAPACITY, DOCX_MIME};
pub use error::{BatchError, FailureKind};
pub use intake::{AdmissionOutcome, AdmissionReport, Batch, Candidate};
pub use observer::{NoopObserver, SharedObserver, WorkflowObserver};
pub use save::{ArchiveSink, DirectorySink, MemorySink};
pub use sources::FileSource;
pub use transfer::{Download, SavedArchive, TransferClient};
pub use workflow::{Status, Workflow, WorkflowState};
