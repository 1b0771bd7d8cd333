use super::store::{delete_by_id, delete_by_user};
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// `DELETE /history/delete-history/{id}`
pub async fn process_one(
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    let deleted = state
        .db
        .run(move |conn| delete_by_id(conn, &id))
        .await?
        .ok_or_else(|| AppError::NotFound("Your history not found".to_string()))?;

    state.uploads.remove_logged(&deleted.image_url);
    Ok(HttpResponse::Ok().json(json!({ "message": "History deleted successfully" })))
}

/// `DELETE /history/delete-all-history/{userId}`
pub async fn process_all(
    user_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user_id = user_id.into_inner();
    let images = state
        .db
        .run(move |conn| delete_by_user(conn, &user_id))
        .await?;

    if images.is_empty() {
        return Err(AppError::NotFound(
            "No history found for this user".to_string(),
        ));
    }
    for image in &images {
        state.uploads.remove_logged(image);
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "All history records deleted successfully",
        "deletedCount": images.len(),
    })))
}
