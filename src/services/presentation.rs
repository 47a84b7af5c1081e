// Presentation
// Shared transient UI state and the pure view projection of the controller state

use std::time::{Duration, Instant};

use super::analysis::{
    AnalysisOrchestrator, ErrorKind, IconAnimation, PresentationState, ResultDisplay,
};
use super::input::{InputController, InputMode};
use super::upload::{UploadOrchestrator, UploadStatus};

/// How long the copy button shows its confirmation.
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_millis(5000);

pub const ANALYZING_MESSAGE: &str = "Analyzing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Inline message next to the upload area that dismisses itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub expires_at: Instant,
}

/// Holds at most one notice; a newer one replaces the older.
pub struct Notices {
    current: Option<Notice>,
    ttl: Duration,
}

impl Notices {
    pub fn new(ttl: Duration) -> Self {
        Self { current: None, ttl }
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) {
        self.current = Some(Notice {
            level,
            message: message.into(),
            expires_at: now + self.ttl,
        });
    }

    pub fn visible(&self, now: Instant) -> Option<&Notice> {
        self.current.as_ref().filter(|n| now < n.expires_at)
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

#[derive(Default)]
pub struct CopyFeedback {
    until: Option<Instant>,
}

impl CopyFeedback {
    pub fn trigger(&mut self, now: Instant) {
        self.until = Some(now + COPY_FEEDBACK);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|t| now < t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStyle {
    Info,
    Success,
    Warning,
    Danger,
}

impl MessageStyle {
    pub fn css_class(self) -> &'static str {
        match self {
            MessageStyle::Info => "alert alert-info",
            MessageStyle::Success => "alert alert-success",
            MessageStyle::Warning => "alert alert-warning",
            MessageStyle::Danger => "alert alert-danger",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultIcon {
    Robot,
    User,
}

impl ResultIcon {
    pub fn css_class(self) -> &'static str {
        match self {
            ResultIcon::Robot => "fas fa-robot text-danger",
            ResultIcon::User => "fas fa-user text-success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub title: Option<String>,
    pub icon: Option<ResultIcon>,
    pub animation: Option<IconAnimation>,
    pub message: String,
    pub style: MessageStyle,
    pub confidence_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadView {
    pub file_name: String,
    pub file_size: String,
    pub status: UploadStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub counter: String,
    pub over_limit: bool,
    pub submit_enabled: bool,
    pub in_progress: bool,
    pub upload_available: bool,
    pub upload_controls_enabled: bool,
    pub upload: Option<UploadView>,
    pub notice: Option<(NoticeLevel, String)>,
    pub copy_confirmed: bool,
    /// Whether the result region is shown at all.
    pub result_visible: bool,
    pub result: Option<ResultView>,
    /// Increments each time a terminal state asks to be scrolled into view.
    pub scroll_requests: u64,
}

pub struct RenderContext<'a> {
    pub mode: InputMode,
    pub input: &'a InputController,
    pub upload: &'a UploadOrchestrator,
    pub analysis: &'a AnalysisOrchestrator,
    pub notices: &'a Notices,
    pub copy_feedback: &'a CopyFeedback,
}

pub fn render(ctx: &RenderContext<'_>, now: Instant) -> View {
    let upload = ctx.upload.session().map(|s| UploadView {
        file_name: s.file.name.clone(),
        file_size: format_file_size(s.file.size_bytes),
        status: s.status,
    });
    let result = render_result(ctx.analysis);
    let result_visible = matches!(
        ctx.analysis.state(),
        PresentationState::ResultReady(_) | PresentationState::Errored { .. }
    );

    View {
        counter: ctx.input.counter_label(),
        over_limit: ctx.input.buffer().is_over_limit(),
        submit_enabled: ctx.analysis.submit_enabled(ctx.input),
        in_progress: ctx.analysis.is_analyzing(),
        upload_available: ctx.mode.allows_upload(),
        upload_controls_enabled: ctx.mode.allows_upload() && !ctx.upload.is_uploading(),
        upload,
        notice: ctx
            .notices
            .visible(now)
            .map(|n| (n.level, n.message.clone())),
        copy_confirmed: ctx.copy_feedback.is_active(now),
        result_visible,
        result,
        scroll_requests: ctx.analysis.scroll_requests(),
    }
}

fn render_result(analysis: &AnalysisOrchestrator) -> Option<ResultView> {
    match analysis.state() {
        PresentationState::Idle => None,
        PresentationState::Analyzing => Some(ResultView {
            title: None,
            icon: None,
            animation: None,
            message: ANALYZING_MESSAGE.to_string(),
            style: MessageStyle::Info,
            confidence_lines: Vec::new(),
        }),
        PresentationState::ResultReady(result) => {
            let display = ResultDisplay::from_result(result);
            let (title, icon, message, style) = if display.is_ai {
                (
                    "AI-Generated Text Detected",
                    ResultIcon::Robot,
                    "The text is likely AI-generated.",
                    MessageStyle::Danger,
                )
            } else {
                (
                    "Likely Human-Written Text",
                    ResultIcon::User,
                    "The text appears to be human-written.",
                    MessageStyle::Success,
                )
            };
            Some(ResultView {
                title: Some(title.to_string()),
                icon: Some(icon),
                animation: analysis.animation(),
                message: message.to_string(),
                style,
                confidence_lines: vec![
                    format!("Confidence: {}%", display.confidence_percent),
                    format!("Detection Metric (crit): {}", display.metric_display),
                    format!("Number of Tokens: {}", display.token_display),
                ],
            })
        }
        PresentationState::Errored { message, kind } => Some(ResultView {
            title: None,
            icon: None,
            animation: None,
            message: message.clone(),
            style: match kind {
                ErrorKind::Application => MessageStyle::Warning,
                ErrorKind::Transport => MessageStyle::Danger,
            },
            confidence_lines: Vec::new(),
        }),
    }
}

/// Human-readable size shown next to the selected file name.
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / MB)
    }
}

/// Plain-text rendering for the terminal front-end.
pub fn render_plain(view: &View) -> String {
    let mut out = Vec::new();

    if let Some(upload) = &view.upload {
        out.push(format!(
            "File: {} ({}) [{:?}]",
            upload.file_name, upload.file_size, upload.status
        ));
    }
    if let Some((level, message)) = &view.notice {
        let tag = match level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        out.push(format!("[{}] {}", tag, message));
    }

    let mut counter = format!("Characters: {}", view.counter);
    if view.over_limit {
        counter.push_str(" (over the recommended limit)");
    }
    out.push(counter);

    if view.copy_confirmed {
        out.push("Copied to clipboard.".to_string());
    }

    if let Some(result) = &view.result {
        out.push(String::new());
        if let Some(title) = &result.title {
            out.push(title.clone());
        }
        out.push(result.message.clone());
        out.extend(result.confidence_lines.iter().cloned());
    }

    out.join("\n")
}
