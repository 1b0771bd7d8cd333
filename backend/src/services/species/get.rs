use super::store::find_by_id;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

pub async fn process(
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    let species = state
        .db
        .run(move |conn| find_by_id(conn, &id))
        .await?
        .ok_or_else(|| AppError::NotFound("This species was not found".to_string()))?;
    Ok(HttpResponse::Ok().json(species))
}
