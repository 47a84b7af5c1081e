// Upload Orchestrator
// File validation, extraction session tracking, and completion handling

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{FileMeta, UploadResponse};

use super::api_client::ClientError;
use super::input::{InputController, InputMode};

/// Largest file accepted for extraction (16 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: &[&str] = &[".txt", ".pdf", ".docx", ".doc"];

pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload file. Please try again.";
pub const UPLOAD_TRANSPORT_MESSAGE: &str =
    "Error uploading file. Please check your connection and try again.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a valid file type (.txt, .pdf, .docx, .doc)")]
    UnsupportedExtension { name: String },
    #[error("File size must be less than 16MB")]
    FileTooLarge { name: String, size_bytes: u64 },
    #[error("File upload is not available in this mode")]
    UploadUnavailable,
}

/// Extension first, then size. Never touches the network.
pub fn validate_file(meta: &FileMeta) -> Result<(), ValidationError> {
    if !ALLOWED_EXTENSIONS.contains(&meta.extension.as_str()) {
        return Err(ValidationError::UnsupportedExtension {
            name: meta.name.clone(),
        });
    }
    if meta.size_bytes > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            name: meta.name.clone(),
            size_bytes: meta.size_bytes,
        });
    }
    Ok(())
}

/// Where the file's bytes come from. Path-backed files are read only when sent.
#[derive(Debug, Clone)]
pub enum FileSource {
    Memory(Vec<u8>),
    Path(PathBuf),
}

/// A file picked through the browse button or dropped onto the page.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub meta: FileMeta,
    pub source: FileSource,
}

impl PendingFile {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let meta = FileMeta::new(name, bytes.len() as u64);
        Self {
            meta,
            source: FileSource::Memory(bytes),
        }
    }

    /// Reads only the metadata; contents are loaded at send time.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let size_bytes = std::fs::metadata(path)?.len();
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            meta: FileMeta::new(name, size_bytes),
            source: FileSource::Path(path.to_path_buf()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Selected,
    Uploading,
    Extracted,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub id: Uuid,
    pub file: FileMeta,
    pub status: UploadStatus,
}

/// Request the controller must send for an accepted file, tagged with its session.
#[derive(Debug, Clone)]
pub struct UploadTicket {
    pub session_id: Uuid,
    pub file: PendingFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadCompletion {
    Extracted { file_name: String, char_count: u64 },
    Failed { message: String },
    /// The session was removed or superseded before the response arrived.
    Stale,
}

pub struct UploadOrchestrator {
    status: UploadStatus,
    session: Option<UploadSession>,
}

impl Default for UploadOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadOrchestrator {
    pub fn new() -> Self {
        Self {
            status: UploadStatus::Idle,
            session: None,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// File metadata to display; absent after removal, rejection or failure.
    pub fn session(&self) -> Option<&UploadSession> {
        self.session.as_ref()
    }

    pub fn is_uploading(&self) -> bool {
        self.status == UploadStatus::Uploading
    }

    /// Validate `file` and open a new session for it. Any previous session is discarded,
    /// which makes its in-flight response stale.
    pub fn select_file(
        &mut self,
        file: PendingFile,
        mode: InputMode,
    ) -> Result<UploadTicket, ValidationError> {
        if let Some(prev) = self.session.take() {
            debug!(session = %prev.id, file = %prev.file.name, "upload.superseded");
        }

        let checked = if mode.allows_upload() {
            validate_file(&file.meta)
        } else {
            Err(ValidationError::UploadUnavailable)
        };
        if let Err(e) = checked {
            warn!(
                file = %file.meta.name,
                size_bytes = file.meta.size_bytes,
                reason = %e,
                "upload.rejected"
            );
            self.status = UploadStatus::Rejected;
            return Err(e);
        }

        let session_id = Uuid::new_v4();
        self.status = UploadStatus::Selected;
        self.session = Some(UploadSession {
            id: session_id,
            file: file.meta.clone(),
            status: UploadStatus::Selected,
        });
        self.set_status(UploadStatus::Uploading);
        info!(
            session = %session_id,
            file = %file.meta.name,
            size_bytes = file.meta.size_bytes,
            "upload.started"
        );

        Ok(UploadTicket { session_id, file })
    }

    /// Apply the extraction outcome for `session_id`, unless that session is no longer current.
    pub fn complete(
        &mut self,
        session_id: Uuid,
        outcome: Result<UploadResponse, ClientError>,
        input: &mut InputController,
    ) -> UploadCompletion {
        let current = self
            .session
            .as_ref()
            .filter(|s| s.id == session_id && s.status == UploadStatus::Uploading);
        let Some(session) = current else {
            info!(session = %session_id, "upload.stale_response_ignored");
            return UploadCompletion::Stale;
        };
        let file_name = session.file.name.clone();

        match outcome {
            Ok(UploadResponse {
                success: true,
                text: Some(text),
                text_length,
                ..
            }) => {
                let char_count = text_length.unwrap_or_else(|| text.chars().count() as u64);
                input.set_text(text);
                self.set_status(UploadStatus::Extracted);
                info!(session = %session_id, file = %file_name, char_count, "upload.extracted");
                UploadCompletion::Extracted {
                    file_name,
                    char_count,
                }
            }
            // `success:false`, or `success:true` without any extracted text.
            Ok(resp) => {
                let message = resp
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| UPLOAD_FAILED_MESSAGE.to_string());
                warn!(session = %session_id, file = %file_name, error = %message, "upload.failed");
                self.fail();
                UploadCompletion::Failed { message }
            }
            Err(e) => {
                warn!(session = %session_id, file = %file_name, error = %e, "upload.failed");
                self.fail();
                UploadCompletion::Failed {
                    message: UPLOAD_TRANSPORT_MESSAGE.to_string(),
                }
            }
        }
    }

    /// Clear the current file. Text already written to the buffer stays.
    pub fn remove_file(&mut self) {
        if let Some(prev) = self.session.take() {
            info!(session = %prev.id, file = %prev.file.name, "upload.removed");
        }
        self.status = UploadStatus::Idle;
    }

    fn set_status(&mut self, status: UploadStatus) {
        self.status = status;
        if let Some(session) = self.session.as_mut() {
            session.status = status;
        }
    }

    fn fail(&mut self) {
        self.session = None;
        self.status = UploadStatus::Failed;
    }
}
