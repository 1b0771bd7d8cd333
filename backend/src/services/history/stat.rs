use crate::error::AppError;
use crate::state::AppState;
use crate::stats::stat_series;
use actix_web::{web, HttpResponse};
use common::model::stats::StatRange;
use common::requests::StatQuery;

/// `GET /history/stat?range=day|week|month|year`
pub async fn process(
    query: web::Query<StatQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let range = StatRange::parse(query.range.as_deref());
    let series = state.db.run(move |conn| stat_series(conn, range)).await?;
    Ok(HttpResponse::Ok().json(series))
}
