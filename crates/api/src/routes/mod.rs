pub mod health;
pub mod queue;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /queue/available-campaigns                         admissible campaigns (GET)
/// /queue/apply                                       join a campaign queue (POST)
/// /queue/my-assignments                              reader's assignments (GET)
/// /queue/assignments/{id}                            one assignment (GET)
/// /queue/assignments/{id}/withdraw                   leave the queue (DELETE)
/// /queue/assignments/{id}/track-ebook-download       record ebook access (POST)
/// /queue/assignments/{id}/track-audiobook-access     record audio access (POST)
/// /queue/assignments/{id}/stream-audio               audiobook bytes (GET)
/// /queue/assignments/{id}/stream-ebook               ebook bytes (GET)
/// /queue/assignments/{id}/stream-synopsis            synopsis bytes (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/queue", queue::router())
}
