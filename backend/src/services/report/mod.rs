//! # Report Service Module
//!
//! Printable reports of selected history records. A client first posts the
//! record ids it picked and receives a short-lived token; the token then
//! serves both a JSON preview and the PDF itself.
//!
//! ## Sub-modules:
//! - `layout`: pagination and field formatting, no I/O.
//! - `pdf`: genpdf rendering of a laid-out report.
//! - `select`, `preview`, `export`: the endpoints.

mod export;
pub mod layout;
pub mod pdf;
mod preview;
mod select;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/report";

/// * `POST /selection`: store `{ids}`, returns `{token, expiresAt}`.
/// * `GET /{token}/preview?userId=`: the laid-out report as JSON.
/// * `GET /{token}/pdf?userId=`: the rendered PDF, inline.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/selection", post().to(select::process))
        .route("/{token}/preview", get().to(preview::process))
        .route("/{token}/pdf", get().to(export::process))
}
