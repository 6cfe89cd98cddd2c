//! Route definitions for the reader review queue.
//!
//! Mounted at `/queue`. Every route requires a reader (or admin) token.
//!
//! ```text
//! GET    /available-campaigns                        available_campaigns
//! POST   /apply                                      apply
//! GET    /my-assignments                             my_assignments
//! GET    /assignments/{id}                           get_assignment
//! DELETE /assignments/{id}/withdraw                  withdraw
//! POST   /assignments/{id}/track-ebook-download      track_ebook_download
//! POST   /assignments/{id}/track-audiobook-access    track_audiobook_access
//! GET    /assignments/{id}/stream-audio              stream_audio
//! GET    /assignments/{id}/stream-ebook              stream_ebook
//! GET    /assignments/{id}/stream-synopsis           stream_synopsis
//! ```

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::queue;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/available-campaigns", get(queue::available_campaigns))
        .route("/apply", post(queue::apply))
        .route("/my-assignments", get(queue::my_assignments))
        .route("/assignments/{id}", get(queue::get_assignment))
        .route("/assignments/{id}/withdraw", delete(queue::withdraw))
        .route(
            "/assignments/{id}/track-ebook-download",
            post(queue::track_ebook_download),
        )
        .route(
            "/assignments/{id}/track-audiobook-access",
            post(queue::track_audiobook_access),
        )
        .route("/assignments/{id}/stream-audio", get(queue::stream_audio))
        .route("/assignments/{id}/stream-ebook", get(queue::stream_ebook))
        .route(
            "/assignments/{id}/stream-synopsis",
            get(queue::stream_synopsis),
        )
}
