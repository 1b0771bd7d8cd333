//! Pending-image queue sessions and report selection handoff.

#[macro_use]
mod helpers;

use actix_web::http::header::CONTENT_TYPE;
use actix_web::http::StatusCode;
use actix_web::test;
use helpers::{multipart_body, seed_record, test_state, FakePredictor, Part, FAIL_MARKER};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::test]
async fn queue_items_are_submitted_one_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path(), Arc::new(FakePredictor::default()));
    let root = state.uploads.root().to_path_buf();
    let app = init_app!(state);

    let (content_type, body) = multipart_body(&[
        Part::File("image", "first.jpg", b"first"),
        Part::File("image", "second.png", b"second"),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/v1/queue")
        .insert_header((CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;
    let token = session["token"].as_str().unwrap().to_string();
    let items = session["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["fileName"], "first.jpg");
    assert_eq!(items[1]["size"], 6);
    // Nothing reaches disk before submission
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);

    let first = items[0]["id"].as_str().unwrap();
    let second = items[1]["id"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/queue/{token}/items/{first}/submit"))
        .set_json(json!({ "userId": "u1", "userName": "Somchai", "Thorns": FAIL_MARKER }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/queue/{token}"))
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(session["items"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/queue/{token}/items/{first}/submit"))
        .set_json(json!({ "userId": "u1", "userName": "Somchai" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Image uploaded successfully");
    assert_eq!(body["result"]["bestpredicted"], "D. Alata");
    assert_eq!(body["queue"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/queue/{token}/items/{second}"))
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;
    assert!(session["items"].as_array().unwrap().is_empty());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/queue/{token}/items/{second}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/queue/{token}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/queue/{token}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn concurrent_submits_of_one_item_store_it_once() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Arc::new(FakePredictor::slow(Duration::from_millis(200)));
    let state = test_state(dir.path(), predictor.clone());
    let app = init_app!(state);

    let (content_type, body) = multipart_body(&[Part::File("image", "leaf.jpg", b"leaf")]);
    let req = test::TestRequest::post()
        .uri("/api/v1/queue")
        .insert_header((CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;
    let token = session["token"].as_str().unwrap().to_string();
    let item = session["items"][0]["id"].as_str().unwrap().to_string();

    let submit = || {
        test::TestRequest::post()
            .uri(&format!("/api/v1/queue/{token}/items/{item}/submit"))
            .set_json(json!({ "userId": "u1", "userName": "Somchai" }))
            .to_request()
    };
    let (a, b) = futures_util::future::join(
        test::call_service(&app, submit()),
        test::call_service(&app, submit()),
    )
    .await;
    let mut statuses = vec![a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
    assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/history/get-history/u1")
        .to_request();
    let records: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(records.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/queue/{token}"))
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;
    assert!(session["items"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn queue_rejects_empty_and_foreign_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path(), Arc::new(FakePredictor::default()));
    let app = init_app!(state);

    let (content_type, body) = multipart_body(&[Part::Text("note", "no files")]);
    let req = test::TestRequest::post()
        .uri("/api/v1/queue")
        .insert_header((CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (content_type, body) = multipart_body(&[Part::File("image", "virus.exe", b"MZ")]);
    let req = test::TestRequest::post()
        .uri("/api/v1/queue")
        .insert_header((CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn report_preview_paginates_selection() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path(), Arc::new(FakePredictor::default()));
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(seed_record(&state, "u1", "Somchai", "D. Alata", i).await.id);
    }
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .set_json(json!({
            "name": "Somchai",
            "email": "somchai@example.org",
            "department": "Botany",
            "phone_number": "081-234-5678",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: Value = test::read_body_json(resp).await;
    let user_id = user["_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/report/selection")
        .set_json(json!({ "ids": ids }))
        .to_request();
    let ticket: Value = test::call_and_read_body_json(&app, req).await;
    let token = ticket["token"].as_str().unwrap().to_string();
    assert!(ticket["expiresAt"].is_string());

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/report/{token}/preview?userId={user_id}"))
        .to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        report["title"],
        "Yam Variety Classification Report from Leaf Images"
    );
    let pages = report["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0]["entries"].as_array().unwrap().len(), 4);
    assert_eq!(pages[1]["entries"][0]["index"], 5);
    assert_eq!(pages[1]["totalPages"], 2);
    assert_eq!(pages[0]["contact"]["department"], "Botany");
    assert_eq!(pages[0]["contact"]["position"], "-");
    // Newest capture first
    assert_eq!(pages[0]["entries"][0]["recordId"], ids[4].as_str());

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/report/{token}/preview?userId=nobody"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // No fonts are installed in the test directory
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/report/{token}/pdf?userId={user_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn report_selection_errors() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path(), Arc::new(FakePredictor::default()));
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/report/selection")
        .set_json(json!({ "ids": ["  "] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/v1/report/unknown-token/preview?userId=u1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/api/v1/report/unknown-token/preview")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
