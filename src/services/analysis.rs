// Analysis Orchestrator
// Classification submission and the result presentation state machine

use thiserror::Error;
use tracing::{info, warn};

use crate::models::{AnalysisResult, PredictResponse};

use super::api_client::ClientError;
use super::input::InputController;

pub const ANALYZE_FAILED_MESSAGE: &str = "Failed to analyze text.";
pub const CONNECTION_ERROR_MESSAGE: &str = "Error connecting to the server. Please try again later.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("There is no text to analyze")]
    EmptyText,
    #[error("An analysis is already in progress")]
    AlreadyAnalyzing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server answered with `success: false`.
    Application,
    /// The request failed or the response could not be decoded.
    Transport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresentationState {
    Idle,
    Analyzing,
    ResultReady(AnalysisResult),
    Errored { message: String, kind: ErrorKind },
}

/// Display values derived from a result. Never stored back into the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDisplay {
    pub is_ai: bool,
    pub confidence_percent: u32,
    pub metric_display: String,
    pub token_display: String,
}

impl ResultDisplay {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let confidence_percent = (result.probability * 100.0).round().clamp(0.0, 100.0) as u32;
        let metric_display = result
            .metric
            .filter(|m| m.is_finite())
            .map(|m| format!("{:.3}", m))
            .unwrap_or_else(|| "N/A".to_string());
        let token_display = match result.token_count {
            Some(n) if n > 0 => n.to_string(),
            _ => "N/A".to_string(),
        };
        Self {
            is_ai: result.prediction.is_ai(),
            confidence_percent,
            metric_display,
            token_display,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationClass {
    RotatePositive,
    RotateNegative,
}

impl AnimationClass {
    pub fn css_class(self) -> &'static str {
        match self {
            AnimationClass::RotatePositive => "rotate-positive",
            AnimationClass::RotateNegative => "rotate-negative",
        }
    }
}

/// One-shot icon animation. A new epoch means the shell must restart it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconAnimation {
    pub class: AnimationClass,
    pub epoch: u64,
}

#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub request_id: u64,
    pub revision: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisCompletion {
    Ready(AnalysisResult),
    Errored { message: String, kind: ErrorKind },
    /// The text changed while the request was in flight.
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    request_id: u64,
    revision: u64,
}

pub struct AnalysisOrchestrator {
    state: PresentationState,
    in_flight: Option<InFlight>,
    next_request_id: u64,
    animation: Option<IconAnimation>,
    animation_epoch: u64,
    scroll_requests: u64,
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisOrchestrator {
    pub fn new() -> Self {
        Self {
            state: PresentationState::Idle,
            in_flight: None,
            next_request_id: 0,
            animation: None,
            animation_epoch: 0,
            scroll_requests: 0,
        }
    }

    pub fn state(&self) -> &PresentationState {
        &self.state
    }

    pub fn is_analyzing(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn submit_enabled(&self, input: &InputController) -> bool {
        input.has_submittable_text() && self.in_flight.is_none()
    }

    pub fn animation(&self) -> Option<IconAnimation> {
        self.animation
    }

    /// Number of times the result region asked to be scrolled into view.
    pub fn scroll_requests(&self) -> u64 {
        self.scroll_requests
    }

    /// Lock submission, clear the previous result and hand out the request to send.
    pub fn begin(&mut self, input: &InputController) -> Result<AnalysisTicket, SubmitError> {
        if self.in_flight.is_some() {
            return Err(SubmitError::AlreadyAnalyzing);
        }
        if !input.has_submittable_text() {
            return Err(SubmitError::EmptyText);
        }

        self.next_request_id += 1;
        let ticket = AnalysisTicket {
            request_id: self.next_request_id,
            revision: input.revision(),
            text: input.submittable_text().to_string(),
        };
        self.in_flight = Some(InFlight {
            request_id: ticket.request_id,
            revision: ticket.revision,
        });
        self.animation = None;
        self.state = PresentationState::Analyzing;
        info!(
            request_id = ticket.request_id,
            chars = input.buffer().length(),
            "analysis.started"
        );
        Ok(ticket)
    }

    /// Settle the request identified by `request_id`. Always unlocks submission for it.
    pub fn complete(
        &mut self,
        request_id: u64,
        outcome: Result<PredictResponse, ClientError>,
        current_revision: u64,
    ) -> AnalysisCompletion {
        let Some(in_flight) = self.in_flight.filter(|f| f.request_id == request_id) else {
            info!(request_id, "analysis.stale_response_ignored");
            return AnalysisCompletion::Stale;
        };
        self.in_flight = None;

        if in_flight.revision != current_revision {
            info!(request_id, "analysis.stale_response_ignored");
            return AnalysisCompletion::Stale;
        }

        let completion = match outcome {
            Ok(resp) if resp.success => match resp.result {
                Some(payload) => AnalysisCompletion::Ready(AnalysisResult::from(payload)),
                None => AnalysisCompletion::Errored {
                    message: ANALYZE_FAILED_MESSAGE.to_string(),
                    kind: ErrorKind::Application,
                },
            },
            Ok(resp) => AnalysisCompletion::Errored {
                message: resp
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| ANALYZE_FAILED_MESSAGE.to_string()),
                kind: ErrorKind::Application,
            },
            Err(e) => {
                warn!(request_id, error = %e, "analysis.transport_error");
                AnalysisCompletion::Errored {
                    message: CONNECTION_ERROR_MESSAGE.to_string(),
                    kind: ErrorKind::Transport,
                }
            }
        };

        match &completion {
            AnalysisCompletion::Ready(result) => {
                self.animation_epoch += 1;
                self.animation = Some(IconAnimation {
                    class: if result.prediction.is_ai() {
                        AnimationClass::RotateNegative
                    } else {
                        AnimationClass::RotatePositive
                    },
                    epoch: self.animation_epoch,
                });
                info!(
                    request_id,
                    prediction = result.prediction.label(),
                    probability = result.probability,
                    "analysis.completed"
                );
                self.state = PresentationState::ResultReady(result.clone());
            }
            AnalysisCompletion::Errored { message, kind } => {
                warn!(request_id, error = %message, kind = ?kind, "analysis.errored");
                self.state = PresentationState::Errored {
                    message: message.clone(),
                    kind: *kind,
                };
            }
            AnalysisCompletion::Stale => {}
        }
        self.scroll_requests += 1;
        completion
    }

    /// The input changed: a shown result no longer matches the visible text.
    pub fn invalidate(&mut self) {
        if self.state != PresentationState::Idle {
            self.state = PresentationState::Idle;
            self.animation = None;
        }
    }
}
