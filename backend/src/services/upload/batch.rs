//! `POST /upload-all`: several `image` files plus one `metadata` field holding
//! a JSON array parallel to the files.
//!
//! All items run concurrently. Items that succeed stay stored even when a
//! sibling fails; the caller then gets a 502 listing which items were kept
//! and which failed.

use super::submit::{classify_and_store, validate_submitter};
use crate::error::AppError;
use crate::multipart::{read_upload_form, UploadProgress};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::classification::ClassificationRecord;
use common::model::history::{BatchItemOutcome, BatchReport};
use common::requests::SubmissionMetadata;
use futures_util::future::join_all;
use serde_json::{json, Value};

pub async fn process(
    req: HttpRequest,
    payload: Multipart,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut progress = UploadProgress::from_request(&req);
    let form = read_upload_form(payload, &state.uploads, "image", &mut progress).await?;

    let metadata = match parse_metadata(form.fields.get("metadata").map(String::as_str), form.images.len()) {
        Ok(metadata) => metadata,
        Err(e) => {
            form.discard(&state.uploads);
            return Err(e);
        }
    };

    log::info!("Batch of {} images received", form.images.len());
    let records = submit_all(&state, &metadata, &form.images).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "All images uploaded successfully",
        "result": records,
    })))
}

/// Runs every item concurrently and returns the records in input order, or
/// `BatchIncomplete` when any item failed.
pub async fn submit_all(
    state: &AppState,
    metadata: &[SubmissionMetadata],
    images: &[crate::uploads::StoredImage],
) -> Result<Vec<ClassificationRecord>, AppError> {
    let tasks = images
        .iter()
        .zip(metadata)
        .map(|(image, meta)| classify_and_store(state, meta, image));
    let results = join_all(tasks).await;

    let mut report = BatchReport::default();
    let mut records = Vec::with_capacity(results.len());
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(record) => {
                report.persisted.push(BatchItemOutcome {
                    index,
                    record_id: Some(record.id.clone()),
                    error: None,
                });
                records.push(record);
            }
            Err(e) => report.failed.push(BatchItemOutcome {
                index,
                record_id: None,
                error: Some(e.to_string()),
            }),
        }
    }

    if !report.failed.is_empty() {
        log::warn!(
            "Batch incomplete: {} stored, {} failed",
            report.persisted.len(),
            report.failed.len()
        );
        return Err(AppError::BatchIncomplete(report));
    }
    Ok(records)
}

/// Validates the `metadata` field against the number of uploaded files.
pub fn parse_metadata(
    raw: Option<&str>,
    file_count: usize,
) -> Result<Vec<SubmissionMetadata>, AppError> {
    if file_count == 0 {
        return Err(AppError::Validation("No files uploaded".to_string()));
    }
    let raw = raw
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::Validation("metadata is required".to_string()))?;

    let entries = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(entries)) => entries,
        _ => {
            return Err(AppError::Validation(
                "metadata must be a JSON array".to_string(),
            ))
        }
    };
    if entries.len() != file_count {
        return Err(AppError::Validation(
            "Number of files and metadata entries don't match".to_string(),
        ));
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let meta: SubmissionMetadata = serde_json::from_value(entry).map_err(|e| {
                AppError::Validation(format!("metadata[{index}] is invalid: {e}"))
            })?;
            validate_submitter(&meta)
                .map_err(|e| AppError::Validation(format!("metadata[{index}]: {e}")))?;
            Ok(meta)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: &str = r#"[{"userId":"u1","userName":"Somchai","Thorns":"Thorns"}]"#;

    #[test]
    fn rejects_empty_batches() {
        let err = parse_metadata(Some(ONE), 0).unwrap_err();
        assert_eq!(err.to_string(), "No files uploaded");
    }

    #[test]
    fn rejects_missing_or_non_array_metadata() {
        assert!(parse_metadata(None, 1).is_err());
        let err = parse_metadata(Some(r#"{"userId":"u1"}"#), 1).unwrap_err();
        assert_eq!(err.to_string(), "metadata must be a JSON array");
        assert!(parse_metadata(Some("not json"), 1).is_err());
    }

    #[test]
    fn rejects_count_mismatch() {
        let err = parse_metadata(Some(ONE), 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Number of files and metadata entries don't match"
        );
    }

    #[test]
    fn rejects_entries_without_submitter() {
        let err = parse_metadata(Some(r#"[{"userId":"u1"}]"#), 1).unwrap_err();
        assert!(err.to_string().starts_with("metadata[0]"));
    }

    #[test]
    fn parses_matching_metadata() {
        let metadata = parse_metadata(Some(ONE), 1).unwrap();
        assert_eq!(metadata[0].user_name, "Somchai");
        assert_eq!(metadata[0].attributes.thorns, "Thorns");
    }
}
