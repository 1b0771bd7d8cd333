//! User profiles. Only the contact details printed on reports are kept here.

mod handlers;
pub mod store;

use actix_web::web::{delete, get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/users";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(handlers::create))
        .route("/", post().to(handlers::create))
        .route("/all", get().to(handlers::list))
        .route("/{id}", get().to(handlers::get))
        .route("/{id}", put().to(handlers::modify))
        .route("/{id}", delete().to(handlers::remove))
}
