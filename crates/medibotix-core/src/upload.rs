//! Upload session: pick a report, validate it, send it to the backend.
//!
//! Transitions for one attempt only move forward
//! (`Idle -> Uploading -> Succeeded | Failed`). Selecting or clearing a file
//! replaces the whole [`UploadState`]; any upload still in flight for the old
//! state is ignored when it completes.

use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;

use crate::error::{ClientError, TransportError};
use crate::transport::{Transport, UploadReply};

pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

/// Advertised limit. The backend enforces it; we only warn.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const INVALID_FORMAT_MESSAGE: &str = "Invalid format: only PDF or TXT files are supported";
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload file";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check if the backend is running.";

pub fn mime_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// A report picked by the user, contents already in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    pub size: u64,
    /// Lowercased, without the dot; empty when the name has none
    pub extension: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        Self {
            size: bytes.len() as u64,
            mime_type: mime_type_for(&extension).to_string(),
            extension,
            name,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Not a file path: {:?}", path))?;
        let bytes = fs::read(path).map_err(|e| anyhow!("Failed to read {:?}: {}", path, e))?;
        Ok(Self::new(name, bytes))
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_EXTENSIONS.contains(&self.extension.as_str())
    }

    pub fn exceeds_size_limit(&self) -> bool {
        self.size > MAX_UPLOAD_BYTES
    }

    /// Size in kilobytes with two decimals, e.g. `"12.50 KB"`
    pub fn size_label(&self) -> String {
        format!("{:.2} KB", self.size as f64 / 1024.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Uploading,
    Failed(String),
    Succeeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadState {
    pub selected_file: Option<FileHandle>,
    pub status: UploadStatus,
    pub error_message: Option<String>,
}

impl UploadState {
    pub fn empty() -> Self {
        Self {
            selected_file: None,
            status: UploadStatus::Idle,
            error_message: None,
        }
    }

    fn selected(file: FileHandle) -> Self {
        Self {
            selected_file: Some(file),
            status: UploadStatus::Idle,
            error_message: None,
        }
    }

    fn rejected(reason: &str) -> Self {
        Self {
            selected_file: None,
            status: UploadStatus::Failed(reason.to_string()),
            error_message: Some(reason.to_string()),
        }
    }
}

impl Default for UploadState {
    fn default() -> Self {
        Self::empty()
    }
}

/// What the caller should do once an upload settles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Document accepted, move on to the conversation view
    ProceedToChat,
    Failed(String),
}

/// Ticket for an upload issued by [`UploadController::begin_submit`]
#[derive(Debug)]
pub struct PendingUpload {
    attempt: u64,
    pub filename: String,
    bytes: Vec<u8>,
}

impl PendingUpload {
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub async fn send(self, transport: &dyn Transport) -> UploadCompletion {
        let result = transport.upload_document(self.bytes, &self.filename).await;
        UploadCompletion {
            attempt: self.attempt,
            result,
        }
    }
}

#[derive(Debug)]
pub struct UploadCompletion {
    attempt: u64,
    result: Result<UploadReply, TransportError>,
}

impl UploadCompletion {
    /// Settle an attempt whose request never produced a reply
    pub fn failed(attempt: u64, error: TransportError) -> Self {
        Self {
            attempt,
            result: Err(error),
        }
    }
}

#[derive(Debug, Default)]
pub struct UploadController {
    state: UploadState,
    attempt: u64,
}

impl UploadController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn status(&self) -> &UploadStatus {
        &self.state.status
    }

    pub fn selected_file(&self) -> Option<&FileHandle> {
        self.state.selected_file.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.state.error_message.as_deref()
    }

    pub fn is_uploading(&self) -> bool {
        self.state.status == UploadStatus::Uploading
    }

    /// Replace the current selection. Unsupported types are rejected here and
    /// never reach the transport.
    pub fn select_file(&mut self, file: FileHandle) -> Result<(), ClientError> {
        self.attempt = self.attempt.wrapping_add(1);

        if !file.is_supported() {
            tracing::info!(name = %file.name, "Rejected file with unsupported type");
            self.state = UploadState::rejected(INVALID_FORMAT_MESSAGE);
            return Err(ClientError::Validation(INVALID_FORMAT_MESSAGE.to_string()));
        }

        if file.exceeds_size_limit() {
            tracing::warn!(
                name = %file.name,
                size = file.size,
                limit = MAX_UPLOAD_BYTES,
                "File is larger than the advertised upload limit"
            );
        }

        self.state = UploadState::selected(file);
        Ok(())
    }

    pub fn clear_file(&mut self) {
        self.attempt = self.attempt.wrapping_add(1);
        self.state = UploadState::empty();
    }

    /// Start an upload. Returns `None` without touching state when nothing is
    /// selected or an upload is already running.
    pub fn begin_submit(&mut self) -> Option<PendingUpload> {
        if self.is_uploading() {
            return None;
        }
        let file = self.state.selected_file.as_ref()?;

        self.attempt = self.attempt.wrapping_add(1);
        let pending = PendingUpload {
            attempt: self.attempt,
            filename: file.name.clone(),
            bytes: file.bytes.clone(),
        };

        tracing::info!(name = %file.name, size = file.size, "Uploading report");
        self.state.status = UploadStatus::Uploading;
        self.state.error_message = None;
        Some(pending)
    }

    /// Apply a finished upload. Returns `None` when the result belongs to an
    /// attempt that was superseded by a new selection or a clear.
    pub fn finish_submit(&mut self, completion: UploadCompletion) -> Option<UploadOutcome> {
        if completion.attempt != self.attempt || !self.is_uploading() {
            tracing::debug!(attempt = completion.attempt, "Discarding stale upload result");
            return None;
        }

        let result = completion
            .result
            .map_err(ClientError::from)
            .and_then(UploadReply::into_result);

        match result {
            Ok(reply) => {
                tracing::info!(filename = ?reply.filename, "Upload accepted");
                self.state.status = UploadStatus::Succeeded;
                self.state.error_message = None;
                Some(UploadOutcome::ProceedToChat)
            }
            Err(err) => {
                let fallback = match err {
                    ClientError::Transport(_) => NETWORK_ERROR_MESSAGE,
                    _ => UPLOAD_FAILED_MESSAGE,
                };
                let message = err.user_message().unwrap_or(fallback).to_string();
                tracing::warn!(error = %err, "Upload failed");
                self.state.status = UploadStatus::Failed(message.clone());
                self.state.error_message = Some(message.clone());
                Some(UploadOutcome::Failed(message))
            }
        }
    }

    /// Run a whole upload against `transport`. No automatic retries: after a
    /// failure the caller decides whether to submit again.
    pub async fn submit(&mut self, transport: &dyn Transport) -> Option<UploadOutcome> {
        let pending = self.begin_submit()?;
        let completion = pending.send(transport).await;
        self.finish_submit(completion)
    }
}
