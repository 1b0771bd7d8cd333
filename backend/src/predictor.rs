//! Client for the external leaf classification service.
//!
//! The service receives one base64-encoded image plus the botanical
//! attributes picked by the user, and answers with the full class
//! distribution, a ranked top-5, an attribute-filtered prediction, and
//! whatever EXIF capture data it could read from the image.
//!
//! Calls are not retried: a failed prediction fails the item it belongs to.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use common::model::classification::ClassProbability;
use common::requests::ClassificationAttributes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "yamleaf-backend/0.1.0";

#[derive(Debug, Error)]
pub enum PredictorError {
    /// Transport failure or timeout.
    #[error("prediction service unreachable: {0}")]
    Network(String),

    /// Non-2xx answer. `payload` holds the decoded error body when there was one.
    #[error("prediction service returned status {status}")]
    Upstream { status: u16, payload: Option<Value> },

    #[error("invalid prediction response: {0}")]
    Decode(String),
}

/// Body of `POST /predict`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRequest {
    /// Base64 (standard alphabet) image bytes.
    pub image: String,
    #[serde(flatten)]
    pub attributes: ClassificationAttributes,
}

impl PredictionRequest {
    pub fn new(image: &[u8], attributes: ClassificationAttributes) -> Self {
        Self {
            image: BASE64.encode(image),
            attributes,
        }
    }
}

/// Wire form of the service's answer. Every collection is optional so a
/// partial answer still decodes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub all_class_probabilities: HashMap<String, f64>,
    #[serde(default)]
    pub top5_predictions: Vec<(String, f64)>,
    #[serde(default)]
    pub filtered_prediction: Option<FilteredPrediction>,
    #[serde(default)]
    pub filtered_species_list: Vec<String>,
    #[serde(default)]
    pub datetime_taken: Option<String>,
    #[serde(default)]
    pub gps: Option<GpsReading>,
    #[serde(default)]
    pub process_time: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilteredPrediction {
    pub label: Option<String>,
    pub confidence: Option<f64>,
}

/// Coordinates arrive as numbers, or as empty strings when the image has no
/// GPS tags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GpsReading {
    #[serde(default)]
    pub latitude: Value,
    #[serde(default)]
    pub longitude: Value,
}

/// Structured prediction handed to the submission paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Full distribution, highest probability first.
    pub probabilities: Vec<ClassProbability>,
    /// Upstream ranking as received (ranking is re-checked when stored).
    pub top5: Vec<ClassProbability>,
    pub filtered_label: Option<String>,
    pub filtered_candidates: Vec<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub datetime_taken: Option<String>,
    pub process_time_ms: f64,
}

impl From<PredictionResponse> for Prediction {
    fn from(response: PredictionResponse) -> Self {
        let mut probabilities: Vec<ClassProbability> = response
            .all_class_probabilities
            .into_iter()
            .map(|(label, probability)| ClassProbability::new(label, probability))
            .collect();
        probabilities.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then_with(|| a.label.cmp(&b.label))
        });

        let (latitude, longitude) = match response.gps {
            Some(gps) => (coordinate(&gps.latitude), coordinate(&gps.longitude)),
            None => (None, None),
        };

        Self {
            probabilities,
            top5: response
                .top5_predictions
                .into_iter()
                .map(|(label, probability)| ClassProbability::new(label, probability))
                .collect(),
            filtered_label: response
                .filtered_prediction
                .and_then(|p| p.label)
                .filter(|label| !label.trim().is_empty()),
            filtered_candidates: response.filtered_species_list,
            latitude,
            longitude,
            datetime_taken: response.datetime_taken.filter(|raw| !raw.trim().is_empty()),
            process_time_ms: response.process_time,
        }
    }
}

fn coordinate(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, request: PredictionRequest) -> Result<Prediction, PredictorError>;
}

/// `Predictor` backed by the HTTP prediction service.
pub struct HttpPredictor {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpPredictor {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PredictorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PredictorError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, request: PredictionRequest) -> Result<Prediction, PredictorError> {
        log::debug!("Requesting prediction from {}", self.endpoint);

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| PredictorError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PredictorError::Upstream {
                status: status.as_u16(),
                payload: error_payload(&body),
            });
        }

        let decoded: PredictionResponse = response
            .json()
            .await
            .map_err(|e| PredictorError::Decode(e.to_string()))?;
        Ok(decoded.into())
    }
}

fn error_payload(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.trim().to_string())))
}
