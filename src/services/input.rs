// Input Controller
// Owns the text buffer and submission eligibility

use serde::{Deserialize, Serialize};

/// Display ceiling of the plain text-entry page.
pub const STANDARD_MAX_LENGTH: usize = 5000;
/// Display ceiling of the page that also accepts document uploads.
pub const UPLOAD_MAX_LENGTH: usize = 20000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum InputMode {
    Standard,
    #[default]
    UploadEnabled,
}

impl InputMode {
    pub fn max_length(self) -> usize {
        match self {
            InputMode::Standard => STANDARD_MAX_LENGTH,
            InputMode::UploadEnabled => UPLOAD_MAX_LENGTH,
        }
    }

    pub fn allows_upload(self) -> bool {
        matches!(self, InputMode::UploadEnabled)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" | "base" | "text" => Some(InputMode::Standard),
            "upload" | "uploadenabled" | "upload-enabled" => Some(InputMode::UploadEnabled),
            _ => None,
        }
    }
}

/// The single source of truth for analysis input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffer {
    content: String,
    length: usize,
    max_length: usize,
}

impl TextBuffer {
    pub fn new(max_length: usize) -> Self {
        Self {
            content: String::new(),
            length: 0,
            max_length,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Trimmed length in characters.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn is_over_limit(&self) -> bool {
        self.length > self.max_length
    }

    fn replace(&mut self, raw: String) {
        self.length = trimmed_length(&raw);
        self.content = raw;
    }
}

/// Character count after removing leading and trailing whitespace.
pub fn trimmed_length(text: &str) -> usize {
    text.trim().chars().count()
}

pub struct InputController {
    buffer: TextBuffer,
    revision: u64,
}

impl InputController {
    pub fn new(mode: InputMode) -> Self {
        Self {
            buffer: TextBuffer::new(mode.max_length()),
            revision: 0,
        }
    }

    /// Store `raw` verbatim. The limit is a soft ceiling: over-long text is kept, not truncated.
    pub fn set_text(&mut self, raw: impl Into<String>) {
        self.buffer.replace(raw.into());
        self.revision += 1;
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Increments on every mutation; used to detect results computed for older text.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn submittable_text(&self) -> &str {
        self.buffer.content.trim()
    }

    pub fn has_submittable_text(&self) -> bool {
        self.buffer.length > 0
    }

    /// Counter shown under the text area, e.g. `11 / 5000`.
    pub fn counter_label(&self) -> String {
        format!("{} / {}", self.buffer.length, self.buffer.max_length)
    }
}
