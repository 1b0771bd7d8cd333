//! # Pending-Image Queue
//!
//! Clients stage images here, then submit them one by one with their own
//! metadata. Sessions live in a [`HandoffStore`](crate::handoff::HandoffStore)
//! keyed by an opaque token and expire after sitting idle.
//!
//! Staged images stay in memory; they only reach the uploads directory when
//! submitted.

mod handlers;

use crate::error::AppError;
use actix_web::web::{self, delete, get, post, scope};
use actix_web::Scope;
use common::model::queue::PendingItemSummary;

const API_PATH: &str = "/queue";

#[derive(Debug, Clone)]
pub struct PendingImage {
    pub id: String,
    pub original_name: String,
    pub bytes: web::Bytes,
    /// Set while a submit is classifying this item.
    pub in_flight: bool,
}

/// Images of one staging session, in upload order.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    pub items: Vec<PendingImage>,
}

impl PendingQueue {
    pub fn summaries(&self) -> Vec<PendingItemSummary> {
        self.items
            .iter()
            .map(|item| PendingItemSummary {
                id: item.id.clone(),
                file_name: item.original_name.clone(),
                size: item.bytes.len(),
            })
            .collect()
    }

    /// Marks an item as being submitted and returns a copy of it. Fails with
    /// a conflict while another submit holds it.
    pub fn reserve(&mut self, item_id: &str) -> Result<PendingImage, AppError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(item_not_found)?;
        if item.in_flight {
            return Err(item_busy());
        }
        item.in_flight = true;
        Ok(item.clone())
    }

    /// Clears the reservation after a failed submit.
    pub fn release(&mut self, item_id: &str) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == item_id) {
            item.in_flight = false;
        }
    }

    /// Removes an item that is not being submitted; `false` when it was not
    /// queued.
    pub fn drop_idle(&mut self, item_id: &str) -> Result<bool, AppError> {
        if self.items.iter().any(|item| item.id == item_id && item.in_flight) {
            return Err(item_busy());
        }
        Ok(self.take(item_id))
    }

    /// Removes an item; `false` when it was not queued.
    pub fn take(&mut self, item_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        self.items.len() != before
    }
}

pub(crate) fn item_not_found() -> AppError {
    AppError::NotFound("Queued image not found".to_string())
}

fn item_busy() -> AppError {
    AppError::Conflict("Queued image is already being submitted".to_string())
}

/// * `POST /`: stage `image` files, returns the session.
/// * `GET /{token}`: list staged items.
/// * `DELETE /{token}`: discard the session.
/// * `DELETE /{token}/items/{item_id}`: drop one item.
/// * `POST /{token}/items/{item_id}/submit`: classify one item.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(handlers::stage))
        .route("/", post().to(handlers::stage))
        .route("/{token}", get().to(handlers::list))
        .route("/{token}", delete().to(handlers::discard))
        .route("/{token}/items/{item_id}", delete().to(handlers::drop_item))
        .route("/{token}/items/{item_id}/submit", post().to(handlers::submit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> PendingImage {
        PendingImage {
            id: id.to_string(),
            original_name: format!("{id}.jpg"),
            bytes: web::Bytes::from_static(b"jpeg"),
            in_flight: false,
        }
    }

    #[test]
    fn take_removes_only_matching_item() {
        let mut queue = PendingQueue {
            items: vec![item("a"), item("b")],
        };
        assert!(queue.take("a"));
        assert!(!queue.take("a"));
        assert_eq!(queue.summaries().len(), 1);
        assert_eq!(queue.summaries()[0].file_name, "b.jpg");
        assert_eq!(queue.summaries()[0].size, 4);
    }

    #[test]
    fn reserved_item_cannot_be_reserved_or_dropped_twice() {
        let mut queue = PendingQueue {
            items: vec![item("a"), item("b")],
        };
        assert_eq!(queue.reserve("a").unwrap().id, "a");
        assert!(matches!(queue.reserve("a"), Err(AppError::Conflict(_))));
        assert!(matches!(queue.drop_idle("a"), Err(AppError::Conflict(_))));
        assert!(matches!(queue.reserve("zzz"), Err(AppError::NotFound(_))));

        queue.release("a");
        assert!(queue.reserve("a").is_ok());
        assert!(queue.drop_idle("b").unwrap());
        assert!(!queue.drop_idle("b").unwrap());
    }
}
