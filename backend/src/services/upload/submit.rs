use super::record::build_record;
use crate::database::now_millis;
use crate::error::AppError;
use crate::predictor::PredictionRequest;
use crate::services::history::store::insert_with_snapshot;
use crate::state::AppState;
use crate::uploads::StoredImage;
use common::model::classification::ClassificationRecord;
use common::requests::SubmissionMetadata;
use log::{info, warn};

/// Both submitter fields must be present before anything is sent upstream.
pub fn validate_submitter(metadata: &SubmissionMetadata) -> Result<(), AppError> {
    if metadata.user_id.trim().is_empty() || metadata.user_name.trim().is_empty() {
        return Err(AppError::Validation(
            "userId and userName are required".to_string(),
        ));
    }
    Ok(())
}

/// Classifies one stored image and persists the record together with a stat
/// snapshot. The image file is deleted when any step fails.
pub async fn classify_and_store(
    state: &AppState,
    metadata: &SubmissionMetadata,
    image: &StoredImage,
) -> Result<ClassificationRecord, AppError> {
    let result = classify(state, metadata, image).await;
    if let Err(e) = &result {
        warn!("Classification of {} failed: {}", image.original_name, e);
        state.uploads.remove_logged(&image.file_name);
    }
    result
}

async fn classify(
    state: &AppState,
    metadata: &SubmissionMetadata,
    image: &StoredImage,
) -> Result<ClassificationRecord, AppError> {
    validate_submitter(metadata)?;

    let bytes = state.uploads.read(&image.file_name).await?;
    let request = PredictionRequest::new(&bytes, metadata.attributes.clone());
    let prediction = state.predictor.predict(request).await?;

    let record = build_record(metadata, &image.file_name, prediction, now_millis());
    let row = record.clone();
    let total = state
        .db
        .run(move |conn| insert_with_snapshot(conn, &row))
        .await?;

    info!(
        "Stored classification {} ({}, {:.2}%) for {}; {} records total",
        record.id, record.best_predicted, record.confidence_score, record.user_name, total
    );
    Ok(record)
}
