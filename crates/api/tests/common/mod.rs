#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;

use shelfmark_api::auth::jwt::{generate_access_token, JwtConfig};
use shelfmark_api::config::{ServerConfig, StorageConfig};
use shelfmark_api::router::build_app_router;
use shelfmark_api::state::AppState;
use shelfmark_core::access_window::AccessWindowPolicy;
use shelfmark_core::catalog::{
    Campaign, CampaignFormat, CampaignStatus, ReaderProfile, SourceProfile,
};
use shelfmark_core::queue::memory::{InMemoryContentStore, InMemoryQueue, RecordingNotifier};
use shelfmark_core::types::DbId;

/// User id of the seeded reader.
pub const READER_USER: DbId = 100;
/// Reader profile id of the seeded reader.
pub const READER_PROFILE: DbId = 10;
/// The seeded reader's only source profile.
pub const SOURCE_PROFILE: DbId = 501;
/// A second reader with a profile, used for ownership checks.
pub const OTHER_PROFILE: DbId = 20;

/// Campaign offering both formats, with all three artifacts stored.
pub const BOTH_CAMPAIGN: DbId = 1;
/// Audiobook-only campaign.
pub const AUDIO_CAMPAIGN: DbId = 2;

pub const AUDIO_KEY: &str = "campaigns/1/book.m4b";
pub const EBOOK_KEY: &str = "campaigns/1/book.epub";
pub const SYNOPSIS_KEY: &str = "campaigns/1/synopsis.pdf";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 15,
        },
        access_policy: AccessWindowPolicy::default(),
        storage: StorageConfig::Local {
            root: PathBuf::from("./storage"),
        },
    }
}

/// In-memory collaborators behind a test app, for seeding and inspection.
pub struct TestBackend {
    pub queue: Arc<InMemoryQueue>,
    pub content: Arc<InMemoryContentStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestBackend {
    /// A reader with one source profile, two campaigns and their artifacts.
    pub fn seeded() -> Self {
        let queue = Arc::new(InMemoryQueue::new());
        let created = Utc::now();

        queue
            .add_reader(ReaderProfile {
                id: READER_PROFILE,
                user_id: READER_USER,
                display_name: "Robin".into(),
                email: "robin@example.com".into(),
                preferred_format: None,
                source_profiles: vec![SourceProfile {
                    id: SOURCE_PROFILE,
                    label: "Main".into(),
                    created_at: created,
                }],
            })
            .unwrap();
        queue
            .add_campaign(Campaign {
                id: BOTH_CAMPAIGN,
                title: "The Long Tide".into(),
                author_display_name: "M. Shore".into(),
                format: CampaignFormat::Both,
                status: CampaignStatus::Active,
                weekly_review_rate: 5,
                ebook_key: Some(EBOOK_KEY.into()),
                audiobook_key: Some(AUDIO_KEY.into()),
                synopsis_key: Some(SYNOPSIS_KEY.into()),
                created_at: created,
            })
            .unwrap();
        queue
            .add_campaign(Campaign {
                id: AUDIO_CAMPAIGN,
                title: "Night Radio".into(),
                author_display_name: "J. Vale".into(),
                format: CampaignFormat::Audiobook,
                status: CampaignStatus::Active,
                weekly_review_rate: 2,
                ebook_key: None,
                audiobook_key: None,
                synopsis_key: None,
                created_at: created,
            })
            .unwrap();

        let content = Arc::new(InMemoryContentStore::new());
        content
            .insert(AUDIO_KEY, (0..1000u32).map(|i| (i % 251) as u8).collect(), None)
            .unwrap();
        content
            .insert(EBOOK_KEY, b"epub bytes".to_vec(), None)
            .unwrap();
        content
            .insert(SYNOPSIS_KEY, b"synopsis".to_vec(), Some("application/pdf"))
            .unwrap();

        Self {
            queue,
            content,
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }

    /// Build the full application router over these collaborators.
    pub fn app(&self) -> Router {
        let config = test_config();
        let state = AppState {
            store: self.queue.clone(),
            registry: self.queue.clone(),
            content: self.content.clone(),
            notifier: self.notifier.clone(),
            config: Arc::new(config.clone()),
        };
        build_app_router(state, &config)
    }
}

/// Build the application over a freshly seeded in-memory backend.
pub fn build_test_app() -> Router {
    TestBackend::seeded().app()
}

/// Bearer token for `user_id` with `role`, signed with the test secret.
pub fn token(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).unwrap()
}

/// Bearer token for the seeded reader.
pub fn reader_token() -> String {
    token(READER_USER, "reader")
}

/// Send an unauthenticated GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send an authenticated request with an optional JSON body and extra
/// headers.
pub async fn send_auth(
    app: Router,
    method: Method,
    uri: &str,
    token: &str,
    json: Option<serde_json::Value>,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = match json {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send_auth(app, Method::GET, uri, token, None, &[]).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    json: serde_json::Value,
) -> Response<Body> {
    send_auth(app, Method::POST, uri, token, Some(json), &[]).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send_auth(app, Method::POST, uri, token, None, &[]).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send_auth(app, Method::DELETE, uri, token, None, &[]).await
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}
