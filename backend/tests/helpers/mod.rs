//! Shared fixtures for the HTTP integration tests:
//! - `FakePredictor`: deterministic stand-in for the prediction service
//! - `test_state`: application state rooted in a temp directory
//! - `multipart_body`: hand-built `multipart/form-data` payloads
//! - `seed_record`: stores a record (and its image) without going through HTTP

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use common::model::classification::{ClassProbability, ClassificationRecord};
use common::requests::SubmissionMetadata;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use yamleaf_backend::database::Database;
use yamleaf_backend::handoff::HandoffStore;
use yamleaf_backend::predictor::{Prediction, PredictionRequest, Predictor, PredictorError};
use yamleaf_backend::services::history::store::insert_with_snapshot;
use yamleaf_backend::services::upload::record::build_record;
use yamleaf_backend::state::AppState;
use yamleaf_backend::uploads::UploadDir;

/// `Thorns` value that makes [`FakePredictor`] answer with an upstream error.
pub const FAIL_MARKER: &str = "fail";

pub const BOUNDARY: &str = "yamleaf-test-boundary";

/// Builds the app with `configure` over the given state.
macro_rules! init_app {
    ($state:expr) => {{
        let state: yamleaf_backend::state::AppState = $state;
        let root = state.uploads.root().to_path_buf();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(state))
                .configure(move |cfg| yamleaf_backend::configure(cfg, &root)),
        )
        .await
    }};
}

#[derive(Default)]
pub struct FakePredictor {
    pub calls: AtomicUsize,
    /// Holds every answer back this long, to keep requests overlapping.
    pub delay: Option<Duration>,
}

impl FakePredictor {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Predictor for FakePredictor {
    async fn predict(&self, request: PredictionRequest) -> Result<Prediction, PredictorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if request.attributes.thorns == FAIL_MARKER {
            return Err(PredictorError::Upstream {
                status: 400,
                payload: Some(json!({ "error": "Image is not a yam leaf" })),
            });
        }
        Ok(sample_prediction())
    }
}

/// Upstream ranking deliberately out of order.
pub fn sample_prediction() -> Prediction {
    Prediction {
        probabilities: vec![
            ClassProbability::new("D. Alata", 88.46),
            ClassProbability::new("D. Bulbifera", 6.1),
        ],
        top5: vec![
            ClassProbability::new("D. Bulbifera", 6.1),
            ClassProbability::new("D. Alata", 88.46),
        ],
        filtered_label: Some("D. Alata".to_string()),
        filtered_candidates: vec!["D. Alata".to_string(), "D. Villosa".to_string()],
        latitude: None,
        longitude: None,
        datetime_taken: None,
        process_time_ms: 1250.0,
    }
}

pub fn test_state(dir: &Path, predictor: Arc<FakePredictor>) -> AppState {
    AppState {
        db: Database::init(dir.join("yamleaf.sqlite")).unwrap(),
        uploads: UploadDir::new(dir.join("uploads"), 1024 * 1024).unwrap(),
        predictor,
        queue: HandoffStore::new(Duration::from_secs(600)),
        selections: HandoffStore::new(Duration::from_secs(600)),
        font_dir: dir.join("fonts"),
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// Returns the `Content-Type` header value and the encoded body.
pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                let mime = mime_guess::from_path(file_name).first_or_octet_stream();
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {mime}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
}

/// Stores a record for `user_id` whose best label is `label`, created
/// `offset_hours` after [`base_time`]. The image file is written too.
pub async fn seed_record(
    state: &AppState,
    user_id: &str,
    user_name: &str,
    label: &str,
    offset_hours: i64,
) -> ClassificationRecord {
    seed_record_taken(state, user_id, user_name, label, offset_hours, "").await
}

/// Like [`seed_record`], with `datetime_taken` set to the raw `taken` text.
pub async fn seed_record_taken(
    state: &AppState,
    user_id: &str,
    user_name: &str,
    label: &str,
    offset_hours: i64,
    taken: &str,
) -> ClassificationRecord {
    let stored = state
        .uploads
        .save_bytes("image", "leaf.jpg", b"fake-jpeg")
        .unwrap();
    let metadata = SubmissionMetadata {
        user_id: user_id.to_string(),
        user_name: user_name.to_string(),
        ..Default::default()
    };
    let mut record = build_record(
        &metadata,
        &stored.file_name,
        sample_prediction(),
        base_time() + ChronoDuration::hours(offset_hours),
    );
    record.best_predicted = label.to_string();
    record.datetime_taken = taken.to_string();

    let row = record.clone();
    state
        .db
        .run(move |conn| insert_with_snapshot(conn, &row))
        .await
        .unwrap();
    record
}
