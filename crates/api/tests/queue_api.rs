//! Integration tests for the reader queue endpoints.
//!
//! Drives the real router over the in-memory store, content store and
//! notifier, so no database is needed.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use common::{
    body_bytes, body_json, delete_auth, get, get_auth, post_auth, post_json_auth, reader_token,
    send_auth, token, TestBackend, AUDIO_CAMPAIGN, BOTH_CAMPAIGN, OTHER_PROFILE, READER_PROFILE,
    SOURCE_PROFILE,
};
use shelfmark_core::access_window::AccessWindowPolicy;
use shelfmark_core::assignment::{AssignmentStatus, BookFormat, NewAssignment};
use shelfmark_core::queue::ports::AssignmentStore;
use shelfmark_core::types::DbId;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Apply through the API and return the new assignment id.
async fn apply(backend: &TestBackend, campaign_id: DbId, format: Option<&str>) -> DbId {
    let response = post_json_auth(
        backend.app(),
        "/api/v1/queue/apply",
        &reader_token(),
        json!({ "campaign_id": campaign_id, "format_preference": format }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Apply for the audiobook and release materials at `released_at`.
async fn released_audiobook(backend: &TestBackend, released_at: chrono::DateTime<Utc>) -> DbId {
    let id = apply(backend, BOTH_CAMPAIGN, Some("AUDIOBOOK")).await;
    backend
        .queue
        .release_materials(id, released_at, &AccessWindowPolicy::default())
        .unwrap();
    id
}

// ---------------------------------------------------------------------------
// Authentication and roles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = common::build_test_app();
    let response = get(app, "/api/v1/queue/available-campaigns").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let app = common::build_test_app();
    let response = get_auth(app, "/api/v1/queue/my-assignments", "not-a-jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn author_role_is_forbidden() {
    let app = common::build_test_app();
    let response = get_auth(
        app,
        "/api/v1/queue/available-campaigns",
        &token(common::READER_USER, "author"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn user_without_reader_profile_is_not_found() {
    let app = common::build_test_app();
    let response = get_auth(app, "/api/v1/queue/my-assignments", &token(999, "reader")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Available campaigns
// ---------------------------------------------------------------------------

#[tokio::test]
async fn available_campaigns_show_estimates_without_author_identity() {
    let backend = TestBackend::seeded();
    apply(&backend, BOTH_CAMPAIGN, None).await;

    let response = get_auth(
        backend.app(),
        "/api/v1/queue/available-campaigns",
        &reader_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let campaigns = json["data"].as_array().unwrap();
    assert_eq!(campaigns.len(), 2);

    let both = campaigns
        .iter()
        .find(|c| c["id"] == BOTH_CAMPAIGN)
        .unwrap();
    assert_eq!(both["has_applied"], true);
    assert_eq!(both["estimated_queue_position"], 1);
    assert_eq!(both["estimated_review_week"], 1);
    assert_eq!(both["author_display_name"], "M. Shore");
    assert!(both.get("ebook_key").is_none());

    let audio = campaigns
        .iter()
        .find(|c| c["id"] == AUDIO_CAMPAIGN)
        .unwrap();
    assert_eq!(audio["has_applied"], false);
}

#[tokio::test]
async fn available_campaigns_filter_by_format() {
    let app = common::build_test_app();
    let response = get_auth(
        app,
        "/api/v1/queue/available-campaigns?format=EBOOK",
        &reader_token(),
    )
    .await;

    let json = body_json(response).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![BOTH_CAMPAIGN]);
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

#[tokio::test]
async fn apply_to_both_campaign_defaults_to_ebook() {
    let backend = TestBackend::seeded();
    let response = post_json_auth(
        backend.app(),
        "/api/v1/queue/apply",
        &reader_token(),
        json!({ "campaign_id": BOTH_CAMPAIGN }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let raw = body_bytes(response).await;
    let text = String::from_utf8(raw.clone()).unwrap();
    assert!(!text.contains("buffer"), "buffer flag leaked: {text}");

    let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    let data = &json["data"];
    assert_eq!(data["format"], "EBOOK");
    assert_eq!(data["credits_value"], 1);
    assert_eq!(data["status"], "WAITING");
    assert_eq!(data["queue_position"], 1);
    assert_eq!(data["source_profile_id"], SOURCE_PROFILE);
    assert!(data["ebook_stream_url"].is_null());

    let sent = backend.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].queue_position, 1);
}

#[tokio::test]
async fn duplicate_apply_is_conflict() {
    let backend = TestBackend::seeded();
    apply(&backend, BOTH_CAMPAIGN, None).await;

    let response = post_json_auth(
        backend.app(),
        "/api/v1/queue/apply",
        &reader_token(),
        json!({ "campaign_id": BOTH_CAMPAIGN }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn ebook_preference_on_audiobook_campaign_is_validation_error() {
    let app = common::build_test_app();
    let response = post_json_auth(
        app,
        "/api/v1/queue/apply",
        &reader_token(),
        json!({ "campaign_id": AUDIO_CAMPAIGN, "format_preference": "EBOOK" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("EBOOK"));
}

#[tokio::test]
async fn audiobook_assignment_costs_two_credits() {
    let backend = TestBackend::seeded();
    let response = post_json_auth(
        backend.app(),
        "/api/v1/queue/apply",
        &reader_token(),
        json!({ "campaign_id": AUDIO_CAMPAIGN }),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["data"]["format"], "AUDIOBOOK");
    assert_eq!(json["data"]["credits_value"], 2);
}

// ---------------------------------------------------------------------------
// My assignments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn my_assignments_filters_by_status() {
    let backend = TestBackend::seeded();
    let waiting = apply(&backend, BOTH_CAMPAIGN, None).await;
    let cancelled = apply(&backend, AUDIO_CAMPAIGN, None).await;
    backend
        .queue
        .update(cancelled, |a| a.status = AssignmentStatus::Cancelled)
        .unwrap();

    let response = get_auth(
        backend.app(),
        "/api/v1/queue/my-assignments?status=WAITING,SCHEDULED",
        &reader_token(),
    )
    .await;
    let json = body_json(response).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![waiting]);
}

#[tokio::test]
async fn my_assignments_rejects_unknown_status() {
    let app = common::build_test_app();
    let response = get_auth(
        app,
        "/api/v1/queue/my-assignments?status=LOST",
        &reader_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn foreign_assignment_is_not_found() {
    let backend = TestBackend::seeded();
    let foreign = backend
        .queue
        .create_waiting(&NewAssignment {
            campaign_id: BOTH_CAMPAIGN,
            reader_profile_id: OTHER_PROFILE,
            format: BookFormat::Ebook,
            source_profile_id: 900,
            is_buffer_assignment: false,
        })
        .await
        .unwrap();

    let uri = format!("/api/v1/queue/assignments/{}", foreign.id);
    let response = get_auth(backend.app(), &uri, &reader_token()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let uri = format!("/api/v1/queue/assignments/{}/withdraw", foreign.id);
    let response = delete_auth(backend.app(), &uri, &reader_token()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        backend.queue.get(foreign.id).unwrap().unwrap().status,
        AssignmentStatus::Waiting
    );
}

// ---------------------------------------------------------------------------
// Withdraw and tracking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn withdraw_waiting_assignment_returns_204() {
    let backend = TestBackend::seeded();
    let id = apply(&backend, BOTH_CAMPAIGN, None).await;

    let uri = format!("/api/v1/queue/assignments/{id}/withdraw");
    let response = delete_auth(backend.app(), &uri, &reader_token()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let stored = backend.queue.get(id).unwrap().unwrap();
    assert_eq!(stored.status, AssignmentStatus::Cancelled);
    assert_eq!(stored.reader_profile_id, READER_PROFILE);
}

#[tokio::test]
async fn withdraw_after_release_is_forbidden() {
    let backend = TestBackend::seeded();
    let id = released_audiobook(&backend, Utc::now()).await;

    let uri = format!("/api/v1/queue/assignments/{id}/withdraw");
    let response = delete_auth(backend.app(), &uri, &reader_token()).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        backend.queue.get(id).unwrap().unwrap().status,
        AssignmentStatus::Approved
    );
}

#[tokio::test]
async fn audio_tracking_starts_the_assignment() {
    let backend = TestBackend::seeded();
    let id = released_audiobook(&backend, Utc::now()).await;

    let uri = format!("/api/v1/queue/assignments/{id}/track-audiobook-access");
    let response = post_auth(backend.app(), &uri, &reader_token()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let stored = backend.queue.get(id).unwrap().unwrap();
    assert_eq!(stored.status, AssignmentStatus::InProgress);
    assert!(stored.last_audio_access_at.is_some());

    let uri = format!("/api/v1/queue/assignments/{id}/track-ebook-download");
    let response = post_auth(backend.app(), &uri, &reader_token()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ranged_audio_request_returns_partial_content() {
    let backend = TestBackend::seeded();
    let id = released_audiobook(&backend, Utc::now()).await;

    let uri = format!("/api/v1/queue/assignments/{id}/stream-audio");
    let response = send_auth(
        backend.app(),
        Method::GET,
        &uri,
        &reader_token(),
        None,
        &[("range", "bytes=0-99")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    let headers = response.headers();
    assert_eq!(headers["content-length"], "100");
    assert_eq!(headers["content-range"], "bytes 0-99/1000");
    assert_eq!(headers["accept-ranges"], "bytes");
    assert_eq!(headers["content-type"], "audio/mp4");
    assert!(headers["content-disposition"]
        .to_str()
        .unwrap()
        .starts_with("inline"));
    assert!(headers["cache-control"].to_str().unwrap().contains("no-store"));

    let bytes = body_bytes(response).await;
    assert_eq!(bytes.len(), 100);
    assert_eq!(bytes[99], 99);

    assert_eq!(
        backend.queue.get(id).unwrap().unwrap().status,
        AssignmentStatus::InProgress
    );
}

#[tokio::test]
async fn unsatisfiable_range_returns_full_content() {
    let backend = TestBackend::seeded();
    let id = released_audiobook(&backend, Utc::now()).await;

    let uri = format!("/api/v1/queue/assignments/{id}/stream-audio");
    let response = send_auth(
        backend.app(),
        Method::GET,
        &uri,
        &reader_token(),
        None,
        &[("range", "bytes=5000-6000")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-length"], "1000");
    assert!(response.headers().get("content-range").is_none());
}

#[tokio::test]
async fn audio_after_seven_days_is_forbidden() {
    let backend = TestBackend::seeded();
    let id = released_audiobook(&backend, Utc::now() - Duration::days(8)).await;

    let uri = format!("/api/v1/queue/assignments/{id}/stream-audio");
    let response = get_auth(backend.app(), &uri, &reader_token()).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("7-day access window has passed"));
}

#[tokio::test]
async fn ebook_stream_on_audiobook_assignment_is_forbidden() {
    let backend = TestBackend::seeded();
    let id = released_audiobook(&backend, Utc::now()).await;

    let uri = format!("/api/v1/queue/assignments/{id}/stream-ebook");
    let response = get_auth(backend.app(), &uri, &reader_token()).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn stream_before_release_is_forbidden() {
    let backend = TestBackend::seeded();
    let id = apply(&backend, BOTH_CAMPAIGN, Some("AUDIOBOOK")).await;

    let uri = format!("/api/v1/queue/assignments/{id}/stream-audio");
    let response = get_auth(backend.app(), &uri, &reader_token()).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn released_assignment_lists_same_origin_stream_paths() {
    let backend = TestBackend::seeded();
    let id = released_audiobook(&backend, Utc::now()).await;

    let uri = format!("/api/v1/queue/assignments/{id}");
    let response = get_auth(backend.app(), &uri, &reader_token()).await;
    let raw = body_bytes(response).await;
    let text = String::from_utf8(raw.clone()).unwrap();
    assert!(!text.contains("book.m4b"), "storage key leaked: {text}");

    let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    let data = &json["data"];
    assert_eq!(
        data["audiobook_stream_url"],
        format!("/api/v1/queue/assignments/{id}/stream-audio")
    );
    assert!(data["ebook_stream_url"].is_null());
    assert_eq!(
        data["synopsis_stream_url"],
        format!("/api/v1/queue/assignments/{id}/stream-synopsis")
    );
}

#[tokio::test]
async fn synopsis_stream_is_inline_and_not_tracked() {
    let backend = TestBackend::seeded();
    let id = released_audiobook(&backend, Utc::now()).await;

    let uri = format!("/api/v1/queue/assignments/{id}/stream-synopsis");
    let response = get_auth(backend.app(), &uri, &reader_token()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/pdf");
    assert_eq!(body_bytes(response).await, b"synopsis".to_vec());
    assert_eq!(
        backend.queue.get(id).unwrap().unwrap().status,
        AssignmentStatus::Approved
    );
}
