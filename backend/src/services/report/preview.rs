use super::layout::compose;
use crate::error::AppError;
use crate::services::history::selected::records_by_ids;
use crate::services::users::store as users;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use common::model::report::ReportDocument;
use common::requests::ReportQuery;

pub async fn process(
    token: web::Path<String>,
    query: web::Query<ReportQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let document = build_document(&state, &token, &query.user_id).await?;
    Ok(HttpResponse::Ok().json(document))
}

/// Resolves a selection token and the requesting user into a laid-out report.
pub async fn build_document(
    state: &AppState,
    token: &str,
    user_id: &str,
) -> Result<ReportDocument, AppError> {
    let (ids, _) = state
        .selections
        .get(token)
        .await
        .ok_or_else(|| AppError::NotFound("Report selection not found or expired".to_string()))?;

    let user_id = user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::Validation("userId is required".to_string()));
    }
    let user = state
        .db
        .run(move |conn| users::find_by_id(conn, &user_id))
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let records = records_by_ids(&state.db, ids).await?;
    Ok(compose(&records, &user, Utc::now()))
}
