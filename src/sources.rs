//! Input adapters: turn what the user pointed at into candidates.
//!
//! There are two ways files reach the batch, and both end in the same
//! [`crate::workflow::Workflow::offer`] call:
//!
//! * [`FileSource::Picker`]: an explicit list of files, as from a file
//!   picker or command-line arguments.
//! * [`FileSource::Drop`]: a dropped folder. Its direct file entries are
//!   offered in name order; subfolders are ignored.
//!
//! Neither adapter filters by type. That is the admission policy's job, so
//! the rules live in exactly one place.

use crate::intake::Candidate;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where a set of offered files comes from.
#[derive(Debug, Clone)]
pub enum FileSource {
    Picker(Vec<PathBuf>),
    Drop(PathBuf),
}

impl FileSource {
    /// Build a source from a mixed list of paths: directories become drops,
    /// everything else is picked.
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Vec<FileSource> {
        let mut sources = Vec::new();
        let mut picked = Vec::new();
        for path in paths {
            if path.is_dir() {
                sources.push(FileSource::Drop(path));
            } else {
                picked.push(path);
            }
        }
        if !picked.is_empty() {
            sources.insert(0, FileSource::Picker(picked));
        }
        sources
    }

    /// Read every file this source names.
    ///
    /// Unreadable entries are logged and skipped so one bad path never
    /// blocks the rest of the offer.
    pub async fn load(&self) -> Vec<Candidate> {
        let paths = match self {
            FileSource::Picker(paths) => paths.clone(),
            FileSource::Drop(dir) => list_dropped(dir).await,
        };

        let mut out = Vec::with_capacity(paths.len());
        for path in &paths {
            match read_candidate(path).await {
                Ok(c) => out.push(c),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        out
    }
}

/// Read one file into a [`Candidate`], declaring the media type guessed from
/// its extension.
pub async fn read_candidate(path: &Path) -> std::io::Result<Candidate> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
        })?;
    let content = tokio::fs::read(path).await?;
    debug!("Read {} ({} bytes)", path.display(), content.len());

    let candidate = Candidate::new(name, content);
    Ok(match mime_guess::from_path(path).first_raw() {
        Some(mime) => candidate.with_media_type(mime),
        None => candidate,
    })
}

/// Direct file entries of `dir`, sorted by file name.
async fn list_dropped(dir: &Path) -> Vec<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) => {
            warn!("Cannot read folder {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let is_file = entry
                    .file_type()
                    .await
                    .map(|t| t.is_file())
                    .unwrap_or(false);
                if is_file {
                    files.push(entry.path());
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error listing {}: {}", dir.display(), e);
                break;
            }
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}
