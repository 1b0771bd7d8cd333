//! Image submission endpoints.
//!
//! - `POST /upload`: one image, classified and stored.
//! - `POST /upload-all`: a batch of images with a parallel metadata array.
//!
//! Both paths share [`submit::classify_and_store`], which is also used by the
//! pending-image queue.

mod batch;
pub mod record;
mod single;
pub mod submit;

pub use batch::{parse_metadata, submit_all};

use actix_web::web::{post, ServiceConfig};

/// These two routes sit directly under the API root rather than in a scope.
pub fn configure_routes(cfg: &mut ServiceConfig) {
    cfg.route("/upload", post().to(single::process))
        .route("/upload-all", post().to(batch::process));
}
