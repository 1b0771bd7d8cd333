use super::submit::{classify_and_store, validate_submitter};
use crate::error::AppError;
use crate::multipart::{read_upload_form, UploadProgress};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

/// `POST /upload`: one `image` file plus submitter and attribute fields.
pub async fn process(
    req: HttpRequest,
    payload: Multipart,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut progress = UploadProgress::from_request(&req);
    let mut form = read_upload_form(payload, &state.uploads, "image", &mut progress).await?;

    if form.images.len() > 1 {
        form.discard(&state.uploads);
        return Err(AppError::Validation("Only one image is accepted".to_string()));
    }
    let Some(image) = form.images.pop() else {
        return Err(AppError::Validation("No file uploaded".to_string()));
    };

    let metadata = match form.metadata().and_then(|m| validate_submitter(&m).map(|_| m)) {
        Ok(metadata) => metadata,
        Err(e) => {
            state.uploads.remove_logged(&image.file_name);
            return Err(e);
        }
    };

    let record = classify_and_store(&state, &metadata, &image).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Image uploaded successfully",
        "result": record,
    })))
}
