use super::store::delete;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn process(
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    let species = state
        .db
        .run(move |conn| delete(conn, &id))
        .await?
        .ok_or_else(|| AppError::NotFound("This species was not found".to_string()))?;

    if !species.image_url.is_empty() {
        state.uploads.remove_logged(&species.image_url);
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Species deleted successfully" })))
}
