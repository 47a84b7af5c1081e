// AIDetect Core Services
// Input, upload and analysis orchestration around the detector endpoints

pub mod input;
pub mod upload;
pub mod analysis;
pub mod presentation;
pub mod api_client;
pub mod config_store;
pub mod controller;

pub use input::{InputController, InputMode, TextBuffer};
pub use upload::{
    validate_file,
    FileSource,
    PendingFile,
    UploadCompletion,
    UploadOrchestrator,
    UploadSession,
    UploadStatus,
    ValidationError,
};
pub use analysis::{
    AnalysisCompletion,
    AnalysisOrchestrator,
    PresentationState,
    ResultDisplay,
    SubmitError,
};
pub use presentation::{render_plain, View};
pub use api_client::{ApiClient, ClientError, DetectorApi};
pub use config_store::{AppConfig, ConfigStore};
pub use controller::AppController;
