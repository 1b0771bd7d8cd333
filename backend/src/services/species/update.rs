use super::store::update;
use crate::error::AppError;
use crate::multipart::{fields_as, read_upload_form, UploadProgress};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::species::SpeciesFields;
use serde_json::json;

/// `PUT /species/{id}`: non-empty fields overwrite; a new `image` replaces the
/// old file, which is then deleted.
pub async fn process(
    req: HttpRequest,
    id: web::Path<String>,
    payload: Multipart,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut progress = UploadProgress::from_request(&req);
    let mut form = read_upload_form(payload, &state.uploads, "image", &mut progress).await?;
    if form.images.len() > 1 {
        form.discard(&state.uploads);
        return Err(AppError::Validation("Only one image is accepted".to_string()));
    }

    let fields: SpeciesFields = match fields_as(&form.fields) {
        Ok(fields) => fields,
        Err(e) => {
            form.discard(&state.uploads);
            return Err(e);
        }
    };
    let new_image = form.images.pop();

    let id = id.into_inner();
    let image_name = new_image.as_ref().map(|i| i.file_name.clone());
    let result = state
        .db
        .run(move |conn| update(conn, &id, &fields, image_name.as_deref()))
        .await;

    let (species, replaced) = match result {
        Ok(Some(outcome)) => outcome,
        other => {
            if let Some(image) = &new_image {
                state.uploads.remove_logged(&image.file_name);
            }
            return Err(match other {
                Err(e) => e,
                _ => AppError::NotFound("This species was not found".to_string()),
            });
        }
    };

    if let Some(old) = replaced.filter(|old| !old.is_empty()) {
        state.uploads.remove_logged(&old);
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Species updated successfully",
        "specie": species,
    })))
}
