use super::store::find_all;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

/// `GET /history/data-history`: every record, for the admin export view.
pub async fn process(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let records = state.db.run(|conn| find_all(conn)).await?;
    Ok(HttpResponse::Ok().json(records))
}
