//! Intake: the candidate collection and its admission policy.
//!
//! Every insertion, whichever input path it came from, goes through
//! [`Batch::attempt_add`]. Each offered file passes three gates:
//!
//! ```text
//! offered ──▶ type gate ──▶ duplicate gate ──▶ capacity gate ──▶ batch
//!              (.docx or     ((name, size) not   (live length
//!               DOCX mime)    in batch/offer)     < capacity)
//! ```
//!
//! Type and duplicate rejections are silent. Only a file that would
//! otherwise have been accepted can be rejected by capacity, so the report
//! never blames the limit for a file that was never eligible.

use crate::config::{DEFAULT_CAPACITY, DOCX_EXTENSION, DOCX_MIME};
use crate::error::BatchError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// One file under consideration for the batch.
///
/// Identity is the `(name, size)` pair; there is no other identifier.
#[derive(Clone, PartialEq, Eq)]
pub struct Candidate {
    name: String,
    media_type: Option<String>,
    content: Bytes,
}

impl Candidate {
    /// Create a candidate with no declared media type.
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            content: content.into(),
        }
    }

    /// Attach the media type declared by the input source.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// The file body. Cloning is cheap (reference counted).
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// The `(name, size)` identity key.
    pub fn key(&self) -> (&str, u64) {
        (&self.name, self.size())
    }

    /// Whether the type gate lets this file through.
    pub fn is_document(&self) -> bool {
        has_docx_extension(&self.name)
            || self
                .media_type
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case(DOCX_MIME))
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("media_type", &self.media_type)
            .finish()
    }
}

fn has_docx_extension(name: &str) -> bool {
    let suffix_len = DOCX_EXTENSION.len();
    name.len() >= suffix_len
        && name
            .get(name.len() - suffix_len..)
            .is_some_and(|s| s.eq_ignore_ascii_case(DOCX_EXTENSION))
}

// ── Admission report ─────────────────────────────────────────────────────

/// Summary of one [`Batch::attempt_add`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionOutcome {
    /// Every eligible, non-duplicate file was added.
    AllAdded,
    /// Some files were added before the capacity was reached.
    PartiallyAdded,
    /// Nothing was added because the batch was already full.
    LimitReached,
    /// Nothing new: every file was a duplicate or not a document.
    NothingNew,
}

/// What happened to each offered file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionReport {
    pub offered: usize,
    pub added: usize,
    pub rejected_type: usize,
    pub rejected_duplicate: usize,
    pub rejected_capacity: usize,
}

impl AdmissionReport {
    pub fn outcome(&self) -> AdmissionOutcome {
        match (self.added, self.rejected_capacity) {
            (0, 0) => AdmissionOutcome::NothingNew,
            (_, 0) => AdmissionOutcome::AllAdded,
            (0, _) => AdmissionOutcome::LimitReached,
            (_, _) => AdmissionOutcome::PartiallyAdded,
        }
    }

    /// Whether capacity was the limiting factor.
    pub fn hit_capacity(&self) -> bool {
        self.rejected_capacity > 0
    }

    /// The capacity error to surface, if the limit was hit.
    ///
    /// `offered` in the error counts only files that would otherwise have
    /// been accepted.
    pub fn capacity_error(&self) -> Option<BatchError> {
        self.hit_capacity().then(|| BatchError::CapacityExceeded {
            added: self.added,
            offered: self.added + self.rejected_capacity,
        })
    }

    /// User-facing message for this report, if any.
    pub fn message(&self) -> Option<String> {
        match self.outcome() {
            AdmissionOutcome::AllAdded if self.added == 1 => Some("Added 1 file.".to_string()),
            AdmissionOutcome::AllAdded => Some(format!("Added {} files.", self.added)),
            AdmissionOutcome::PartiallyAdded | AdmissionOutcome::LimitReached => {
                self.capacity_error().map(|e| e.user_message())
            }
            AdmissionOutcome::NothingNew => None,
        }
    }
}

// ── Batch ────────────────────────────────────────────────────────────────

/// The ordered, deduplicated, capacity-bounded set of files staged for one
/// conversion request.
#[derive(Debug, Clone)]
pub struct Batch {
    items: Vec<Candidate>,
    capacity: usize,
}

impl Default for Batch {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Batch {
    /// Create an empty batch. A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Free slots left, derived from the live length.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.items
    }

    /// Sum of all candidate sizes.
    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(Candidate::size).sum()
    }

    pub fn contains(&self, name: &str, size: u64) -> bool {
        self.items.iter().any(|c| c.key() == (name, size))
    }

    /// Apply the admission policy to `offered`, appending accepted files in
    /// offer order.
    pub fn attempt_add<I>(&mut self, offered: I) -> AdmissionReport
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut report = AdmissionReport::default();
        let mut seen: HashSet<(String, u64)> = self
            .items
            .iter()
            .map(|c| (c.name.clone(), c.size()))
            .collect();

        for candidate in offered {
            report.offered += 1;

            if !candidate.is_document() {
                debug!("Skipping '{}': not a .docx document", candidate.name);
                report.rejected_type += 1;
                continue;
            }

            let key = (candidate.name.clone(), candidate.size());
            if seen.contains(&key) {
                debug!(
                    "Skipping '{}' ({} bytes): already in batch",
                    candidate.name, key.1
                );
                report.rejected_duplicate += 1;
                continue;
            }

            // Room comes from the live length, which already includes
            // everything staged earlier in this offer.
            if self.is_full() {
                debug!("Skipping '{}': batch is full", candidate.name);
                report.rejected_capacity += 1;
                continue;
            }

            seen.insert(key);
            self.items.push(candidate);
            report.added += 1;
        }

        debug!(
            "Admission: offered={} added={} type={} dup={} capacity={} (batch {}/{})",
            report.offered,
            report.added,
            report.rejected_type,
            report.rejected_duplicate,
            report.rejected_capacity,
            self.items.len(),
            self.capacity
        );
        report
    }

    /// Remove the candidate at `index`. Out-of-range indices are a no-op.
    pub fn remove_at(&mut self, index: usize) -> Option<Candidate> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Clone of the current contents, for handing to a transfer.
    pub fn snapshot(&self) -> Vec<Candidate> {
        self.items.clone()
    }
}
