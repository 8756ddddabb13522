//! Transfer client: one multipart POST per batch, one archive back.
//!
//! ## Protocol
//!
//! ```text
//! POST {endpoint}
//! Content-Type: multipart/form-data
//!   files = a.docx   (one part per candidate, batch order)
//!   files = b.docx
//!   …
//!
//! 2xx  → binary body, optional Content-Disposition: attachment; filename="x.zip"
//! else → body is opaque diagnostic text
//! ```
//!
//! ## Failure classification
//!
//! | What happened                              | Error                 |
//! |--------------------------------------------|-----------------------|
//! | empty batch (no request made)              | `EmptySubmission`     |
//! | no response: refused, DNS, TLS, timeout    | `NetworkUnreachable`  |
//! | response with non-2xx status               | `ServerError`         |
//! | anything else (body read, save, builder)   | `Unexpected` / `SaveFailed` |
//!
//! Nothing is retried. The user decides whether to submit again.

use crate::config::{ClientConfig, DOCX_MIME};
use crate::error::BatchError;
use crate::intake::Candidate;
use crate::save::ArchiveSink;
use bytes::Bytes;
use mime_guess::mime::Mime;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

static RE_FILENAME: Lazy<Regex> = Lazy::new(|| Regex::new(r#"filename="([^"]*)""#).unwrap());

/// A successful response: the archive bytes and the name to save them under.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub payload: Bytes,
}

/// Where a completed transfer ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedArchive {
    /// Name resolved from the response (or the default).
    pub filename: String,
    /// Location reported by the sink.
    pub path: PathBuf,
    /// Archive size in bytes.
    pub bytes: u64,
    /// Number of files that were converted.
    pub files: usize,
    pub duration_ms: u64,
}

/// HTTP client for the conversion endpoint.
#[derive(Debug, Clone)]
pub struct TransferClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl TransferClient {
    pub fn new(config: ClientConfig) -> Result<Self, BatchError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(t) = config.request_timeout {
            builder = builder.timeout(t);
        }
        if let Some(t) = config.connect_timeout {
            builder = builder.connect_timeout(t);
        }
        let http = builder
            .build()
            .map_err(|e| BatchError::Unexpected(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `files` and save the returned archive through `sink`.
    pub async fn submit(
        &self,
        files: &[Candidate],
        sink: &dyn ArchiveSink,
    ) -> Result<SavedArchive, BatchError> {
        let start = Instant::now();
        let download = self.send(files).await?;
        let bytes = download.payload.len() as u64;
        let path = sink.save(&download.filename, &download.payload)?;

        Ok(SavedArchive {
            filename: download.filename,
            path,
            bytes,
            files: files.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Send `files` as one multipart request and read back the archive.
    pub async fn send(&self, files: &[Candidate]) -> Result<Download, BatchError> {
        if files.is_empty() {
            return Err(BatchError::EmptySubmission);
        }

        let endpoint = &self.config.endpoint;
        let total: u64 = files.iter().map(Candidate::size).sum();
        info!(
            "Submitting {} files ({} bytes) to {}",
            files.len(),
            total,
            endpoint
        );

        let form = build_form(files, &self.config.field_name)?;

        let response = self
            .http
            .post(endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_send_error(endpoint, e))?;

        let status = response.status();
        debug!("Response status {}", status);

        if !status.is_success() {
            let diagnostic = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("<unreadable response body: {e}>"),
            };
            warn!("Conversion failed with HTTP {}: {}", status.as_u16(), diagnostic);
            return Err(BatchError::ServerError {
                status: status.as_u16(),
                diagnostic,
            });
        }

        let header_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_content_disposition);
        let filename = match header_name {
            Some(name) => name,
            None => {
                debug!(
                    "No usable filename in response, using '{}'",
                    self.config.default_archive_name
                );
                self.config.default_archive_name.clone()
            }
        };

        let payload = response
            .bytes()
            .await
            .map_err(|e| BatchError::Unexpected(format!("Failed to read response body: {e}")))?;

        info!("Received '{}' ({} bytes)", filename, payload.len());
        Ok(Download { filename, payload })
    }
}

/// One part per candidate under `field`, in batch order.
fn build_form(files: &[Candidate], field: &str) -> Result<Form, BatchError> {
    let mut form = Form::new();
    for file in files {
        let mime = part_mime(file);
        let part = Part::stream_with_length(Body::from(file.content().clone()), file.size())
            .file_name(file.name().to_string())
            .mime_str(mime)
            .map_err(|e| BatchError::Unexpected(format!("Invalid part for '{}': {e}", file.name())))?;
        form = form.part(field.to_string(), part);
    }
    Ok(form)
}

/// The declared media type when it parses, otherwise the DOCX type.
fn part_mime(file: &Candidate) -> &str {
    match file.media_type() {
        Some(declared) if declared.parse::<Mime>().is_ok() => declared,
        Some(declared) => {
            debug!("Ignoring unparsable media type '{}' for '{}'", declared, file.name());
            DOCX_MIME
        }
        None => DOCX_MIME,
    }
}

fn classify_send_error(endpoint: &str, e: reqwest::Error) -> BatchError {
    if e.is_builder() {
        return BatchError::Unexpected(format!("Failed to build request: {e}"));
    }
    let reason = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    };
    warn!("Conversion service unreachable at {}: {}", endpoint, reason);
    BatchError::NetworkUnreachable {
        endpoint: endpoint.to_string(),
        reason,
    }
}

/// Pull `filename="<value>"` out of a `Content-Disposition` header value.
///
/// Returns `None` when the pattern is absent or the value does not reduce
/// to a usable bare file name.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let raw = RE_FILENAME.captures(value)?.get(1)?.as_str();
    sanitize_archive_name(raw)
}

/// Reduce a server-supplied name to its last path component.
pub fn sanitize_archive_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(raw).trim();
    if base.is_empty() || base == "." || base == ".." || base.chars().any(char::is_control) {
        return None;
    }
    Some(base.to_string())
}
