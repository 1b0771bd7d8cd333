use super::store::update_geolocation;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::requests::GeolocationUpdate;
use serde_json::json;

/// `PUT /history/update-history/{id}`: only the coordinates are editable.
pub async fn process(
    id: web::Path<String>,
    body: web::Json<GeolocationUpdate>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    let GeolocationUpdate {
        latitude,
        longitude,
    } = body.into_inner();

    let updated = state
        .db
        .run(move |conn| {
            update_geolocation(conn, &id, latitude.as_deref(), longitude.as_deref())
        })
        .await?
        .ok_or_else(|| AppError::NotFound("Your history not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Updated GPS successfully",
        "result": updated,
    })))
}
