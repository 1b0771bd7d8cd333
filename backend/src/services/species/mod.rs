//! # Species Service Module
//!
//! Reference data for the yam species the classifier knows about. The
//! distinct scientific names double as the history species filter.

mod create;
mod get;
mod list;
mod remove;
pub mod store;
mod update;

use actix_web::web::{delete, get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/species";

/// * `POST /create`: multipart `image` plus fields.
/// * `GET /all?local_Name&page&role`
/// * `GET /search?scientific_Name`
/// * `GET /names`
/// * `GET|PUT|DELETE /{id}`
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/create", post().to(create::process))
        .route("/all", get().to(list::process))
        .route("/search", get().to(list::process_search))
        .route("/names", get().to(list::process_names))
        .route("/{id}", get().to(get::process))
        .route("/{id}", put().to(update::process))
        .route("/{id}", delete().to(remove::process))
}
