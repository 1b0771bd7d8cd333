use super::store::{list_page, scientific_names, search};
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::user::Role;
use common::requests::{parse_page, SpeciesListQuery, SpeciesSearchQuery};

/// `GET /species/all?local_Name&page&role`
///
/// Admins page through five species at a time; any other role given in the
/// query receives the whole list at once.
pub async fn process(
    query: web::Query<SpeciesListQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let SpeciesListQuery {
        local_name,
        page,
        role,
    } = query.into_inner();
    let page = parse_page(page.as_deref());
    let paginate = match role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(role) => Role::parse(role) == Some(Role::Admin),
        None => true,
    };

    let result = state
        .db
        .run(move |conn| list_page(conn, local_name.as_deref(), page, paginate))
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// `GET /species/search?scientific_Name`
pub async fn process_search(
    query: web::Query<SpeciesSearchQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let term = query.into_inner().scientific_name;
    let result = state
        .db
        .run(move |conn| search(conn, term.as_deref()))
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// `GET /species/names`: the species filter vocabulary.
pub async fn process_names(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let names = state.db.run(|conn| scientific_names(conn)).await?;
    Ok(HttpResponse::Ok().json(names))
}
