use super::store::{delete, find_by_id, insert, list_page, update, DEFAULT_USER_PAGE_SIZE};
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::user::{NewUser, UserUpdate};
use common::requests::{parse_page, UserListQuery};
use serde_json::json;

fn not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

pub async fn create(
    body: web::Json<NewUser>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = body.into_inner();
    let profile = state.db.run(move |conn| insert(conn, &user)).await?;
    log::info!("User {} created", profile.name);
    Ok(HttpResponse::Created().json(profile))
}

pub async fn list(
    query: web::Query<UserListQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let UserListQuery { name, page, limit } = query.into_inner();
    let page = parse_page(page.as_deref());
    let limit = limit
        .as_deref()
        .and_then(|l| l.trim().parse::<i64>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_USER_PAGE_SIZE);

    let result = state
        .db
        .run(move |conn| list_page(conn, name.as_deref(), page, limit))
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn get(
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    let profile = state
        .db
        .run(move |conn| find_by_id(conn, &id))
        .await?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn modify(
    id: web::Path<String>,
    body: web::Json<UserUpdate>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    let change = body.into_inner();
    let profile = state
        .db
        .run(move |conn| update(conn, &id, &change))
        .await?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn remove(
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    if !state.db.run(move |conn| delete(conn, &id)).await? {
        return Err(not_found());
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}
