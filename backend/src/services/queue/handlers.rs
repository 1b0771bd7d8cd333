use super::{item_not_found, PendingImage, PendingQueue};
use crate::error::AppError;
use crate::multipart::read_images_in_memory;
use crate::services::upload::submit::{classify_and_store, validate_submitter};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use common::model::classification::ClassificationRecord;
use common::model::queue::QueueSession;
use common::requests::SubmissionMetadata;
use serde_json::json;
use uuid::Uuid;

fn session_not_found() -> AppError {
    AppError::NotFound("Queue session not found or expired".to_string())
}

pub async fn stage(
    payload: Multipart,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let images = read_images_in_memory(payload, "image", state.uploads.max_bytes()).await?;
    if images.is_empty() {
        return Err(AppError::Validation("No files uploaded".to_string()));
    }

    let queue = PendingQueue {
        items: images
            .into_iter()
            .map(|image| PendingImage {
                id: Uuid::new_v4().to_string(),
                original_name: image.original_name,
                bytes: image.bytes,
                in_flight: false,
            })
            .collect(),
    };
    let items = queue.summaries();
    let (token, expires_at) = state.queue.insert(queue).await;
    log::info!("Staged {} image(s) in queue {}", items.len(), token);

    Ok(HttpResponse::Ok().json(QueueSession {
        token,
        expires_at,
        items,
    }))
}

pub async fn list(
    token: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = token.into_inner();
    let (queue, expires_at) = state.queue.get(&token).await.ok_or_else(session_not_found)?;
    Ok(HttpResponse::Ok().json(QueueSession {
        token,
        expires_at,
        items: queue.summaries(),
    }))
}

pub async fn discard(
    token: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state
        .queue
        .remove(&token)
        .await
        .ok_or_else(session_not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Queue discarded" })))
}

pub async fn drop_item(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (token, item_id) = path.into_inner();
    let (session, removed) =
        update_session(&state, &token, |queue| queue.drop_idle(&item_id)).await?;
    if !removed? {
        return Err(item_not_found());
    }
    Ok(HttpResponse::Ok().json(session))
}

/// Classifies one staged image. The item is reserved for the duration, so a
/// concurrent submit of the same item gets a conflict. It leaves the queue
/// only when the record was stored; on failure it stays and can be retried.
pub async fn submit(
    path: web::Path<(String, String)>,
    body: web::Json<SubmissionMetadata>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (token, item_id) = path.into_inner();
    let metadata = body.into_inner();
    validate_submitter(&metadata)?;

    let (reserved, _) = state
        .queue
        .update(&token, |queue| queue.reserve(&item_id))
        .await
        .ok_or_else(session_not_found)?;
    let item = reserved?;

    let record = match store_item(&state, &metadata, &item).await {
        Ok(record) => record,
        Err(e) => {
            state.queue.update(&token, |queue| queue.release(&item_id)).await;
            return Err(e);
        }
    };

    let (session, _) = update_session(&state, &token, |queue| queue.take(&item_id)).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Image uploaded successfully",
        "result": record,
        "queue": session,
    })))
}

async fn store_item(
    state: &AppState,
    metadata: &SubmissionMetadata,
    item: &PendingImage,
) -> Result<ClassificationRecord, AppError> {
    let stored = state
        .uploads
        .save_bytes("image", &item.original_name, &item.bytes)?;
    classify_and_store(state, metadata, &stored).await
}

async fn update_session<R>(
    state: &AppState,
    token: &str,
    f: impl FnOnce(&mut PendingQueue) -> R,
) -> Result<(QueueSession, R), AppError> {
    let ((items, result), expires_at) = state
        .queue
        .update(token, |queue| {
            let result = f(queue);
            (queue.summaries(), result)
        })
        .await
        .ok_or_else(session_not_found)?;
    Ok((
        QueueSession {
            token: token.to_string(),
            expires_at,
            items,
        },
        result,
    ))
}
