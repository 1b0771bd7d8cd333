use super::store::{list_page, HistoryFilter};
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::requests::{parse_page, HistoryQuery};

/// `GET /history/get-history?name&species&page`
pub async fn process(
    query: web::Query<HistoryQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let filter = HistoryFilter::from_query(&query);
    let page = parse_page(query.page.as_deref());

    let result = state
        .db
        .run(move |conn| list_page(conn, &filter, page))
        .await?;
    Ok(HttpResponse::Ok().json(result))
}
