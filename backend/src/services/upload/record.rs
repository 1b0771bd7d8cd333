use crate::predictor::Prediction;
use chrono::{DateTime, Utc};
use common::model::classification::{
    rank_top5, ClassLabel, ClassificationRecord, DEFAULT_LATITUDE, DEFAULT_LONGITUDE,
    UNKNOWN_LABEL,
};
use common::requests::SubmissionMetadata;
use uuid::Uuid;

/// Derives the stored record for one image from its prediction.
///
/// The best label is always the head of the re-sorted top-5, and missing GPS
/// falls back to the default coordinates.
pub fn build_record(
    metadata: &SubmissionMetadata,
    image_file: &str,
    prediction: Prediction,
    now: DateTime<Utc>,
) -> ClassificationRecord {
    let mut top5 = prediction.top5;
    let (best_predicted, confidence_score) = rank_top5(&mut top5);

    ClassificationRecord {
        id: Uuid::new_v4().to_string(),
        user_id: metadata.user_id.trim().to_string(),
        user_name: metadata.user_name.trim().to_string(),
        image_url: image_file.to_string(),
        all_predicted: prediction.probabilities,
        all_filter_predicted: prediction
            .filtered_candidates
            .into_iter()
            .map(|label| ClassLabel { label })
            .collect(),
        top5,
        best_predicted,
        best_filter_predicted: prediction
            .filtered_label
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
        confidence_score,
        latitude: prediction
            .latitude
            .unwrap_or_else(|| DEFAULT_LATITUDE.to_string()),
        longitude: prediction
            .longitude
            .unwrap_or_else(|| DEFAULT_LONGITUDE.to_string()),
        datetime_taken: prediction.datetime_taken.unwrap_or_default(),
        process_time: prediction.process_time_ms,
        created_at: now,
        updated_at: now,
    }
}
