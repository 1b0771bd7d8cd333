use super::store::find_by_ids;
use crate::database::Database;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::classification::ClassificationRecord;

/// `GET /history/history-selected?dataId=a&dataId=b`
pub async fn process(
    query: web::Query<Vec<(String, String)>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let ids: Vec<String> = query
        .into_inner()
        .into_iter()
        .filter(|(key, _)| key == "dataId" || key == "dataId[]")
        .map(|(_, value)| value)
        .collect();

    let records = records_by_ids(&state.db, ids).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Records for `ids`, newest capture first. Also used by the report service.
pub async fn records_by_ids(
    db: &Database,
    ids: Vec<String>,
) -> Result<Vec<ClassificationRecord>, AppError> {
    let ids: Vec<String> = ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(AppError::NotFound("No history found".to_string()));
    }

    let records = db.run(move |conn| find_by_ids(conn, &ids)).await?;
    if records.is_empty() {
        return Err(AppError::NotFound("No history found".to_string()));
    }
    Ok(records)
}
