// Application Controller
// Owns all UI state and sequences user actions with their network round-trips

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use super::analysis::{AnalysisCompletion, AnalysisOrchestrator, SubmitError};
use super::api_client::DetectorApi;
use super::config_store::AppConfig;
use super::input::{InputController, InputMode};
use super::presentation::{render, CopyFeedback, NoticeLevel, Notices, RenderContext, View};
use super::upload::{PendingFile, UploadCompletion, UploadOrchestrator, ValidationError};

pub struct AppState {
    mode: InputMode,
    input: InputController,
    upload: UploadOrchestrator,
    analysis: AnalysisOrchestrator,
    notices: Notices,
    copy_feedback: CopyFeedback,
}

impl AppState {
    pub fn new(mode: InputMode, notice_ttl: Duration) -> Self {
        Self {
            mode,
            input: InputController::new(mode),
            upload: UploadOrchestrator::new(),
            analysis: AnalysisOrchestrator::new(),
            notices: Notices::new(notice_ttl),
            copy_feedback: CopyFeedback::default(),
        }
    }

    pub fn render(&self, now: Instant) -> View {
        render(
            &RenderContext {
                mode: self.mode,
                input: &self.input,
                upload: &self.upload,
                analysis: &self.analysis,
                notices: &self.notices,
                copy_feedback: &self.copy_feedback,
            },
            now,
        )
    }
}

/// The persistent controller. The state lock is never held across a network call,
/// so user actions stay responsive while a request is pending.
pub struct AppController<A> {
    state: Arc<Mutex<AppState>>,
    api: Arc<A>,
}

impl<A> Clone for AppController<A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: DetectorApi> AppController<A> {
    pub fn new(api: A, mode: InputMode, notice_ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(AppState::new(mode, notice_ttl))),
            api: Arc::new(api),
        }
    }

    pub fn from_config(api: A, config: &AppConfig) -> Self {
        Self::new(api, config.input_mode, config.notice_ttl())
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn render(&self, now: Instant) -> View {
        self.lock().render(now)
    }

    pub fn text(&self) -> String {
        self.lock().input.buffer().content().to_string()
    }

    /// User typed or pasted into the text area.
    pub fn set_text(&self, raw: impl Into<String>) {
        let mut guard = self.lock();
        let st = &mut *guard;
        st.input.set_text(raw);
        st.analysis.invalidate();
    }

    /// Full raw buffer for the clipboard; raises the copy confirmation.
    pub fn copy_text(&self) -> String {
        let mut guard = self.lock();
        guard.copy_feedback.trigger(Instant::now());
        guard.input.buffer().content().to_string()
    }

    /// Browse-button entry point.
    pub async fn select_file(&self, file: PendingFile) -> Result<UploadCompletion, ValidationError> {
        let ticket = {
            let mut guard = self.lock();
            let st = &mut *guard;
            match st.upload.select_file(file, st.mode) {
                Ok(ticket) => {
                    st.notices.dismiss();
                    ticket
                }
                Err(e) => {
                    st.notices.push(NoticeLevel::Error, e.to_string(), Instant::now());
                    return Err(e);
                }
            }
        };

        let outcome = self.api.extract_text(&ticket.file).await;

        let mut guard = self.lock();
        let st = &mut *guard;
        let completion = st.upload.complete(ticket.session_id, outcome, &mut st.input);
        match &completion {
            UploadCompletion::Extracted {
                file_name,
                char_count,
            } => {
                st.analysis.invalidate();
                st.notices.push(
                    NoticeLevel::Success,
                    format!("Successfully extracted {} characters from {}", char_count, file_name),
                    Instant::now(),
                );
            }
            UploadCompletion::Failed { message } => {
                st.notices.push(NoticeLevel::Error, message.clone(), Instant::now());
            }
            UploadCompletion::Stale => {}
        }
        Ok(completion)
    }

    /// Drag-and-drop entry point; same validation as the browse button.
    pub async fn drop_file(&self, file: PendingFile) -> Result<UploadCompletion, ValidationError> {
        debug!(file = %file.meta.name, "upload.dropped");
        self.select_file(file).await
    }

    /// Clear the selected file. A pending extraction for it will be ignored.
    pub fn remove_file(&self) {
        let mut guard = self.lock();
        guard.upload.remove_file();
        guard.notices.dismiss();
    }

    pub async fn submit(&self) -> Result<AnalysisCompletion, SubmitError> {
        let ticket = {
            let mut guard = self.lock();
            let st = &mut *guard;
            st.analysis.begin(&st.input)?
        };

        let outcome = self.api.predict(&ticket.text).await;

        let mut guard = self.lock();
        let st = &mut *guard;
        let revision = st.input.revision();
        Ok(st.analysis.complete(ticket.request_id, outcome, revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileMeta, PredictPayload, PredictResponse, UploadResponse};
    use crate::services::analysis::CONNECTION_ERROR_MESSAGE;
    use crate::services::api_client::ClientError;
    use crate::services::presentation::{MessageStyle, ResultIcon};
    use crate::services::upload::{FileSource, UploadStatus, MAX_UPLOAD_BYTES};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    enum Scripted<T> {
        Ready(Result<T, ClientError>),
        Gated(oneshot::Receiver<Result<T, ClientError>>),
    }

    impl<T> Scripted<T> {
        async fn resolve(self) -> Result<T, ClientError> {
            match self {
                Scripted::Ready(r) => r,
                Scripted::Gated(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(ClientError::Decode("gate dropped".to_string()))),
            }
        }
    }

    #[derive(Default)]
    struct FakeApi {
        upload_calls: AtomicUsize,
        predict_calls: AtomicUsize,
        uploads: Mutex<VecDeque<Scripted<UploadResponse>>>,
        predictions: Mutex<VecDeque<Scripted<PredictResponse>>>,
        predicted_texts: Mutex<Vec<String>>,
    }

    impl DetectorApi for FakeApi {
        async fn extract_text(&self, _file: &PendingFile) -> Result<UploadResponse, ClientError> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.uploads.lock().unwrap().pop_front();
            next.expect("unscripted upload").resolve().await
        }

        async fn predict(&self, text: &str) -> Result<PredictResponse, ClientError> {
            self.predict_calls.fetch_add(1, Ordering::SeqCst);
            self.predicted_texts.lock().unwrap().push(text.to_string());
            let next = self.predictions.lock().unwrap().pop_front();
            next.expect("unscripted prediction").resolve().await
        }
    }

    struct Harness {
        ctrl: AppController<FakeApi>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                ctrl: AppController::new(
                    FakeApi::default(),
                    InputMode::UploadEnabled,
                    Duration::from_secs(5),
                ),
            }
        }

        fn api(&self) -> &FakeApi {
            &self.ctrl.api
        }

        fn script_upload(&self, r: Result<UploadResponse, ClientError>) {
            self.api().uploads.lock().unwrap().push_back(Scripted::Ready(r));
        }

        fn gate_upload(&self) -> oneshot::Sender<Result<UploadResponse, ClientError>> {
            let (tx, rx) = oneshot::channel();
            self.api().uploads.lock().unwrap().push_back(Scripted::Gated(rx));
            tx
        }

        fn script_prediction(&self, r: Result<PredictResponse, ClientError>) {
            self.api().predictions.lock().unwrap().push_back(Scripted::Ready(r));
        }

        fn gate_prediction(&self) -> oneshot::Sender<Result<PredictResponse, ClientError>> {
            let (tx, rx) = oneshot::channel();
            self.api().predictions.lock().unwrap().push_back(Scripted::Gated(rx));
            tx
        }

        fn upload_calls(&self) -> usize {
            self.api().upload_calls.load(Ordering::SeqCst)
        }

        fn predict_calls(&self) -> usize {
            self.api().predict_calls.load(Ordering::SeqCst)
        }

        async fn wait_for_upload_call(&self) {
            while self.upload_calls() == 0 {
                tokio::task::yield_now().await;
            }
        }

        async fn wait_for_predict_calls(&self, n: usize) {
            while self.predict_calls() < n {
                tokio::task::yield_now().await;
            }
        }

        fn view(&self) -> View {
            self.ctrl.render(Instant::now())
        }
    }

    fn prediction(label: &str, probability: f64, crit: Option<f64>, ntoken: Option<u64>) -> Result<PredictResponse, ClientError> {
        Ok(PredictResponse {
            success: true,
            result: Some(PredictPayload {
                prediction: label.to_string(),
                probability,
                crit,
                ntoken,
            }),
            error: None,
        })
    }

    fn extracted(text: &str) -> Result<UploadResponse, ClientError> {
        Ok(UploadResponse {
            success: true,
            text: Some(text.to_string()),
            text_length: Some(text.chars().count() as u64),
            error: None,
        })
    }

    fn txt_file(name: &str) -> PendingFile {
        PendingFile::from_bytes(name, b"file body".to_vec())
    }

    #[tokio::test]
    async fn test_human_written_scenario() {
        let h = Harness::new();
        h.ctrl.set_text("Hello world");
        assert!(h.view().submit_enabled);

        h.script_prediction(prediction("Human-written", 0.87, Some(0.042), Some(3)));
        let done = h.ctrl.submit().await.unwrap();
        assert!(matches!(done, AnalysisCompletion::Ready(_)));

        let view = h.view();
        assert!(view.submit_enabled);
        assert!(view.result_visible);
        assert_eq!(view.scroll_requests, 1);
        let result = view.result.unwrap();
        assert_eq!(result.style, MessageStyle::Success);
        assert_eq!(result.icon, Some(ResultIcon::User));
        assert_eq!(result.confidence_lines[0], "Confidence: 87%");
        assert_eq!(result.confidence_lines[1], "Detection Metric (crit): 0.042");
        assert_eq!(result.confidence_lines[2], "Number of Tokens: 3");
    }

    #[tokio::test]
    async fn test_submit_sends_trimmed_text() {
        let h = Harness::new();
        h.ctrl.set_text("\n  padded text  \n");
        h.script_prediction(prediction("AI-generated", 0.995, None, None));
        h.ctrl.submit().await.unwrap();
        assert_eq!(h.api().predicted_texts.lock().unwrap().as_slice(), ["padded text"]);
        assert_eq!(h.ctrl.text(), "\n  padded text  \n");
    }

    #[tokio::test]
    async fn test_empty_text_issues_no_request() {
        let h = Harness::new();
        h.ctrl.set_text("   ");
        assert!(!h.view().submit_enabled);
        assert_eq!(h.ctrl.submit().await.unwrap_err(), SubmitError::EmptyText);
        assert_eq!(h.predict_calls(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_reenables_submit() {
        let h = Harness::new();
        h.ctrl.set_text("Hello world");
        h.script_prediction(Err(ClientError::Decode("connection closed".to_string())));
        h.ctrl.submit().await.unwrap();

        let view = h.view();
        assert!(view.submit_enabled);
        assert!(!view.in_progress);
        let result = view.result.unwrap();
        assert_eq!(result.message, CONNECTION_ERROR_MESSAGE);
        assert_eq!(result.style, MessageStyle::Danger);
    }

    #[tokio::test]
    async fn test_invalid_extension_is_rejected_without_request() {
        let h = Harness::new();
        let err = h.ctrl.select_file(txt_file("report.exe")).await.unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedExtension { .. }));
        assert_eq!(h.upload_calls(), 0);

        let view = h.view();
        let (level, message) = view.notice.unwrap();
        assert_eq!(level, NoticeLevel::Error);
        assert!(message.starts_with("Please select a valid file type"));
        assert!(view.upload.is_none());
    }

    #[tokio::test]
    async fn test_oversized_drop_is_rejected_without_request() {
        let h = Harness::new();
        let file = PendingFile {
            meta: FileMeta::new("thesis.pdf", MAX_UPLOAD_BYTES + 1),
            source: FileSource::Memory(Vec::new()),
        };
        let err = h.ctrl.drop_file(file).await.unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
        assert_eq!(h.upload_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejection_notice_auto_dismisses() {
        let h = Harness::new();
        let _ = h.ctrl.select_file(txt_file("image.png")).await;
        let later = Instant::now() + Duration::from_secs(6);
        assert!(h.ctrl.render(later).notice.is_none());
    }

    #[tokio::test]
    async fn test_successful_upload_fills_buffer_and_hides_result() {
        let h = Harness::new();
        h.ctrl.set_text("old text");
        h.script_prediction(prediction("AI-generated", 0.9, None, None));
        h.ctrl.submit().await.unwrap();
        assert!(h.view().result_visible);

        h.script_upload(extracted("  Extracted body.  "));
        let done = h.ctrl.select_file(txt_file("notes.txt")).await.unwrap();
        assert!(matches!(done, UploadCompletion::Extracted { char_count: 19, .. }));

        assert_eq!(h.ctrl.text(), "  Extracted body.  ");
        let view = h.view();
        assert_eq!(view.counter, "15 / 20000");
        assert!(view.submit_enabled);
        assert!(!view.result_visible);
        assert!(view.result.is_none());
        assert_eq!(view.upload.as_ref().map(|u| u.status), Some(UploadStatus::Extracted));
        let (level, message) = view.notice.unwrap();
        assert_eq!(level, NoticeLevel::Success);
        assert!(message.contains("19 characters"));
    }

    #[tokio::test]
    async fn test_failed_upload_clears_file() {
        let h = Harness::new();
        h.script_upload(Ok(UploadResponse {
            success: false,
            error: Some("Corrupted file".to_string()),
            ..Default::default()
        }));
        let done = h.ctrl.select_file(txt_file("notes.txt")).await.unwrap();
        assert_eq!(
            done,
            UploadCompletion::Failed {
                message: "Corrupted file".to_string()
            }
        );
        assert_eq!(h.upload_calls(), 1);

        let view = h.view();
        assert!(view.upload.is_none());
        assert!(view.upload_controls_enabled);
        assert_eq!(view.notice, Some((NoticeLevel::Error, "Corrupted file".to_string())));
    }

    #[tokio::test]
    async fn test_upload_success_without_text_keeps_typed_text() {
        let h = Harness::new();
        h.ctrl.set_text("typed by user");
        h.script_upload(Ok(UploadResponse {
            success: true,
            ..Default::default()
        }));
        let done = h.ctrl.select_file(txt_file("a.txt")).await.unwrap();
        assert!(matches!(done, UploadCompletion::Failed { .. }));
        assert_eq!(h.ctrl.text(), "typed by user");
        let view = h.view();
        assert!(view.upload.is_none());
        assert_eq!(view.notice.map(|(level, _)| level), Some(NoticeLevel::Error));
    }

    #[tokio::test]
    async fn test_response_after_remove_is_ignored() {
        let h = Harness::new();
        let gate = h.gate_upload();

        let (done, _) = tokio::join!(h.ctrl.select_file(txt_file("notes.txt")), async {
            h.wait_for_upload_call().await;
            assert!(!h.view().upload_controls_enabled);
            h.ctrl.remove_file();
            let _ = gate.send(extracted("late text"));
        });

        assert_eq!(done.unwrap(), UploadCompletion::Stale);
        assert_eq!(h.ctrl.text(), "");
        let view = h.view();
        assert!(view.upload.is_none());
        assert!(view.notice.is_none());
        assert_eq!(view.counter, "0 / 20000");
    }

    #[tokio::test]
    async fn test_response_after_reselect_is_ignored() {
        let h = Harness::new();
        let first_gate = h.gate_upload();
        h.script_upload(extracted("second"));

        let (first, second) = tokio::join!(h.ctrl.select_file(txt_file("first.txt")), async {
            h.wait_for_upload_call().await;
            let second = h.ctrl.select_file(txt_file("second.txt")).await;
            let _ = first_gate.send(extracted("first"));
            second
        });

        assert!(matches!(second.unwrap(), UploadCompletion::Extracted { .. }));
        assert_eq!(first.unwrap(), UploadCompletion::Stale);
        assert_eq!(h.ctrl.text(), "second");
        assert_eq!(
            h.view().upload.map(|u| u.file_name),
            Some("second.txt".to_string())
        );
    }

    #[tokio::test]
    async fn test_remove_after_extraction_keeps_text() {
        let h = Harness::new();
        h.script_upload(extracted("kept text"));
        h.ctrl.select_file(txt_file("notes.txt")).await.unwrap();
        h.ctrl.remove_file();
        assert_eq!(h.ctrl.text(), "kept text");
        assert!(h.view().upload.is_none());
        assert!(h.view().submit_enabled);
    }

    #[tokio::test]
    async fn test_overlapping_submit_is_refused() {
        let h = Harness::new();
        h.ctrl.set_text("Hello world");
        let gate = h.gate_prediction();

        let (first, second) = tokio::join!(h.ctrl.submit(), async {
            h.wait_for_predict_calls(1).await;
            let view = h.view();
            assert!(view.in_progress);
            assert!(!view.submit_enabled);
            let second = h.ctrl.submit().await;
            let _ = gate.send(prediction("Human-written", 0.2, None, None));
            second
        });

        assert!(matches!(first.unwrap(), AnalysisCompletion::Ready(_)));
        assert_eq!(second.unwrap_err(), SubmitError::AlreadyAnalyzing);
        assert_eq!(h.predict_calls(), 1);
    }

    #[tokio::test]
    async fn test_edit_during_analysis_discards_result() {
        let h = Harness::new();
        h.ctrl.set_text("first draft");
        let gate = h.gate_prediction();

        let (done, _) = tokio::join!(h.ctrl.submit(), async {
            h.wait_for_predict_calls(1).await;
            h.ctrl.set_text("second draft");
            assert!(h.view().result.is_none());
            let _ = gate.send(prediction("AI-generated", 0.9, None, None));
        });

        assert_eq!(done.unwrap(), AnalysisCompletion::Stale);
        let view = h.view();
        assert!(view.result.is_none());
        assert!(view.submit_enabled);
    }

    #[tokio::test]
    async fn test_analysis_runs_while_unrelated_upload_pending() {
        let h = Harness::new();
        h.ctrl.set_text("leftover text");
        let gate = h.gate_upload();
        h.script_prediction(prediction("Human-written", 0.3, Some(0.5), Some(12)));

        let (upload, analysis) = tokio::join!(h.ctrl.select_file(txt_file("next.docx")), async {
            h.wait_for_upload_call().await;
            let analysis = h.ctrl.submit().await;
            let _ = gate.send(extracted("new document"));
            analysis
        });

        assert!(matches!(analysis.unwrap(), AnalysisCompletion::Ready(_)));
        assert!(matches!(upload.unwrap(), UploadCompletion::Extracted { .. }));
        assert_eq!(h.ctrl.text(), "new document");
        assert!(h.view().result.is_none());
    }

    #[tokio::test]
    async fn test_repeat_submission_is_independent() {
        let h = Harness::new();
        h.ctrl.set_text("same text");
        h.script_prediction(prediction("AI-generated", 0.8, Some(1.5), Some(40)));
        h.script_prediction(prediction("AI-generated", 0.8, Some(1.5), Some(40)));

        h.ctrl.submit().await.unwrap();
        let first = h.view().result.unwrap();
        h.ctrl.submit().await.unwrap();
        let second = h.view().result.unwrap();

        assert_eq!(h.predict_calls(), 2);
        assert_eq!(first.confidence_lines, second.confidence_lines);
        assert_eq!(first.message, second.message);
        let (a, b) = (first.animation.unwrap(), second.animation.unwrap());
        assert_eq!(a.class, b.class);
        assert_ne!(a.epoch, b.epoch);
        assert_eq!(h.view().scroll_requests, 2);
    }

    #[tokio::test]
    async fn test_copy_text_returns_raw_buffer() {
        let h = Harness::new();
        h.ctrl.set_text("  copy me ");
        assert_eq!(h.ctrl.copy_text(), "  copy me ");
        assert!(h.view().copy_confirmed);
    }

    #[tokio::test]
    async fn test_standard_mode_refuses_upload() {
        let ctrl = AppController::new(FakeApi::default(), InputMode::Standard, Duration::from_secs(5));
        let err = ctrl.select_file(txt_file("notes.txt")).await.unwrap_err();
        assert_eq!(err, ValidationError::UploadUnavailable);
        assert_eq!(ctrl.api.upload_calls.load(Ordering::SeqCst), 0);
        let view = ctrl.render(Instant::now());
        assert!(!view.upload_available);
        assert_eq!(view.counter, "0 / 5000");
    }
}
