//! Save capability: hand a named binary payload to the user.
//!
//! In a browser this is an object URL plus a temporary anchor; in a desktop
//! shell it is a save dialog; on a terminal it is a file in a directory. The
//! workflow only knows [`ArchiveSink`], so each platform plugs in its own
//! implementation without touching the submit path.
//!
//! [`DirectorySink`] writes through a temporary file in the destination
//! directory and then links it into place. The temporary file is owned by a
//! [`tempfile::NamedTempFile`], so it is removed on every early return and
//! nothing is left behind whether the save succeeds or not.

use crate::error::BatchError;
use bytes::Bytes;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Highest numeric suffix tried before giving up on a free name.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Destination for the archive returned by the conversion service.
pub trait ArchiveSink: Send + Sync {
    /// Save `payload` under `filename`, returning where it ended up.
    ///
    /// `filename` has already been reduced to a bare file name.
    fn save(&self, filename: &str, payload: &Bytes) -> Result<PathBuf, BatchError>;
}

/// Saves archives into a directory, never overwriting existing files.
///
/// A name collision gets a numeric suffix: `out.zip`, `out (1).zip`, …
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArchiveSink for DirectorySink {
    fn save(&self, filename: &str, payload: &Bytes) -> Result<PathBuf, BatchError> {
        let save_err = |path: &Path, source: std::io::Error| BatchError::SaveFailed {
            path: path.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| save_err(&self.dir, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".docbatch-")
            .suffix(".part")
            .tempfile_in(&self.dir)
            .map_err(|e| save_err(&self.dir, e))?;
        tmp.write_all(payload)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| save_err(tmp.path(), e))?;
        debug!("Wrote {} bytes to {}", payload.len(), tmp.path().display());

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let target = self.dir.join(numbered_name(filename, attempt));
            match tmp.persist_noclobber(&target) {
                Ok(_) => {
                    info!("Saved archive to {}", target.display());
                    return Ok(target);
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next name", target.display());
                    tmp = e.file;
                }
                Err(e) => return Err(save_err(&target, e.error)),
            }
        }

        Err(BatchError::Unexpected(format!(
            "No free file name for '{filename}' in {}",
            self.dir.display()
        )))
    }
}

/// `out.zip` → `out (n).zip`; `n == 0` returns the name unchanged.
fn numbered_name(filename: &str, n: usize) -> String {
    if n == 0 {
        return filename.to_string();
    }
    match filename.rfind('.') {
        Some(dot) if dot > 0 => format!("{} ({n}){}", &filename[..dot], &filename[dot..]),
        _ => format!("{filename} ({n})"),
    }
}

/// Keeps saved archives in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<(String, Bytes)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything saved so far, in order.
    pub fn saved(&self) -> Vec<(String, Bytes)> {
        self.saved
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl ArchiveSink for MemorySink {
    fn save(&self, filename: &str, payload: &Bytes) -> Result<PathBuf, BatchError> {
        self.saved
            .lock()
            .map_err(|_| BatchError::Unexpected("memory sink lock poisoned".into()))?
            .push((filename.to_string(), payload.clone()));
        Ok(PathBuf::from(filename))
    }
}
