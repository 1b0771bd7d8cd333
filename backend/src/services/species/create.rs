use super::store::insert;
use crate::error::AppError;
use crate::multipart::{fields_as, read_upload_form, UploadProgress};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::species::SpeciesFields;
use serde_json::json;

/// `POST /species/create`: multipart with one `image` and the species fields.
pub async fn process(
    req: HttpRequest,
    payload: Multipart,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut progress = UploadProgress::from_request(&req);
    let mut form = read_upload_form(payload, &state.uploads, "image", &mut progress).await?;

    let fields: SpeciesFields = match fields_as(&form.fields) {
        Ok(fields) => fields,
        Err(e) => {
            form.discard(&state.uploads);
            return Err(e);
        }
    };

    let mut missing = fields.missing_required();
    if form.images.is_empty() {
        missing.insert(0, "image");
    }
    if !missing.is_empty() || form.images.len() > 1 {
        form.discard(&state.uploads);
        let message = if missing.is_empty() {
            "Only one image is accepted".to_string()
        } else {
            format!("Required fields missing: {}", missing.join(", "))
        };
        return Err(AppError::Validation(message));
    }

    let Some(image) = form.images.pop() else {
        return Err(AppError::Validation("Required fields missing: image".to_string()));
    };
    let image_url = image.file_name.clone();
    let created = state
        .db
        .run(move |conn| insert(conn, &fields, &image_url))
        .await;

    match created {
        Ok(species) => {
            log::info!("Species {} added", species.scientific_name);
            Ok(HttpResponse::Ok().json(json!({
                "message": "Species added successfully",
                "specie": species,
            })))
        }
        Err(e) => {
            state.uploads.remove_logged(&image.file_name);
            Err(e)
        }
    }
}
