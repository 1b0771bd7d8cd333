use super::store::find_by_user;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

/// `GET /history/get-history/{userId}`
pub async fn process(
    user_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user_id = user_id.into_inner();
    let records = state
        .db
        .run(move |conn| find_by_user(conn, &user_id))
        .await?;

    if records.is_empty() {
        return Err(AppError::NotFound("Your history not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(records))
}
