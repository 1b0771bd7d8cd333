use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::queue::HandoffTicket;
use common::requests::ReportSelectionRequest;

pub async fn process(
    body: web::Json<ReportSelectionRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let ids: Vec<String> = body
        .into_inner()
        .ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(AppError::Validation("No records selected".to_string()));
    }

    let count = ids.len();
    let (token, expires_at) = state.selections.insert(ids).await;
    log::info!("Report selection {} holds {} record(s)", token, count);
    Ok(HttpResponse::Ok().json(HandoffTicket { token, expires_at }))
}
