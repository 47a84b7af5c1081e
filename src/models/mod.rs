// AIDetect Data Models
// Wire schemas of the extraction and classification endpoints plus canonical values

use serde::{Deserialize, Deserializer, Serialize};

/// Prediction label the classifier uses for machine-written text.
pub const AI_GENERATED_LABEL: &str = "AI-generated";
pub const HUMAN_WRITTEN_LABEL: &str = "Human-written";

// ============ Extraction Endpoint ============

/// Body of `POST /api/upload`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub text: Option<String>,
    /// Server-side character count of the extracted text; display data only.
    #[serde(default)]
    pub text_length: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

// ============ Classification Endpoint ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

/// Body of `POST /api/predict`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PredictResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<PredictPayload>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictPayload {
    pub prediction: String,
    pub probability: f64,
    #[serde(default)]
    pub crit: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_token_count")]
    pub ntoken: Option<u64>,
}

/// Accepts `null`, integers and whole floats (`12.0`); anything else counts as absent.
fn deserialize_token_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        _ => None,
    }))
}

// ============ Canonical Values ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prediction {
    AiGenerated,
    HumanWritten,
}

impl Prediction {
    /// Only an exact `"AI-generated"` routes to the AI branch; every other label
    /// (including unknown ones) is treated as human-written.
    pub fn from_label(label: &str) -> Self {
        if label == AI_GENERATED_LABEL {
            Prediction::AiGenerated
        } else {
            Prediction::HumanWritten
        }
    }

    pub fn is_ai(self) -> bool {
        matches!(self, Prediction::AiGenerated)
    }

    pub fn label(self) -> &'static str {
        match self {
            Prediction::AiGenerated => AI_GENERATED_LABEL,
            Prediction::HumanWritten => HUMAN_WRITTEN_LABEL,
        }
    }
}

/// Outcome of one successful classification request. Replaced wholesale by the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub prediction: Prediction,
    pub probability: f64,
    pub metric: Option<f64>,
    pub token_count: Option<u64>,
}

impl From<PredictPayload> for AnalysisResult {
    fn from(payload: PredictPayload) -> Self {
        Self {
            prediction: Prediction::from_label(&payload.prediction),
            probability: payload.probability,
            metric: payload.crit,
            token_count: payload.ntoken,
        }
    }
}

/// Metadata of a file chosen for extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub name: String,
    pub size_bytes: u64,
    /// Lower-cased final extension including the dot (`".pdf"`), empty when the name has none.
    pub extension: String,
}

impl FileMeta {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        let name = name.into();
        let extension = file_extension(&name);
        Self {
            name,
            size_bytes,
            extension,
        }
    }
}

/// Extension of the name's final segment, lower-cased, with its leading dot.
pub fn file_extension(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(idx) if idx + 1 < base.len() => base[idx..].to_lowercase(),
        _ => String::new(),
    }
}
