//! Handlers for the reader review queue.
//!
//! Readers browse admissible campaigns, apply, follow and withdraw their
//! assignments, and stream released materials. All content is served
//! through this module; storage keys never leave the server.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use shelfmark_core::assignment::{AssignmentStatus, BookFormat, ContentKind};
use shelfmark_core::queue::admission::{self, ApplyRequest};
use shelfmark_core::queue::gateway::{self, ContentStream};
use shelfmark_core::queue::ports::{AssignmentFilter, CampaignFilter};
use shelfmark_core::queue::{lifecycle, listing, resolve_reader};
use shelfmark_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireReader;
use crate::response::DataResponse;
use crate::state::AppState;

/// Streamed content must never be cached by browsers or proxies.
const NO_STORE: &str = "no-store, no-cache, must-revalidate, private";

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Query parameters for `GET /queue/available-campaigns`.
#[derive(Debug, Default, Deserialize)]
pub struct AvailableCampaignsParams {
    /// `EBOOK` or `AUDIOBOOK`: only campaigns offering this format.
    pub format: Option<String>,
}

/// Query parameters for `GET /queue/my-assignments`.
#[derive(Debug, Default, Deserialize)]
pub struct MyAssignmentsParams {
    pub campaign_id: Option<DbId>,
    /// Comma-separated status names, e.g. `WAITING,SCHEDULED`.
    pub status: Option<String>,
}

impl MyAssignmentsParams {
    fn into_filter(self) -> AppResult<AssignmentFilter> {
        let statuses = self
            .status
            .as_deref()
            .map(parse_statuses)
            .transpose()?
            .filter(|statuses| !statuses.is_empty());
        Ok(AssignmentFilter {
            campaign_id: self.campaign_id,
            statuses,
        })
    }
}

fn parse_statuses(raw: &str) -> AppResult<Vec<AssignmentStatus>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| {
            AssignmentStatus::ALL
                .into_iter()
                .find(|s| s.as_str().eq_ignore_ascii_case(name))
                .ok_or_else(|| AppError::BadRequest(format!("Unknown assignment status '{name}'")))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reader profile id of the authenticated user.
async fn reader_profile_id(state: &AppState, user_id: DbId) -> AppResult<DbId> {
    Ok(resolve_reader(state.registry.as_ref(), user_id).await?.id)
}

/// Turn a validated [`ContentStream`] into a 200 or 206 response.
fn stream_response(stream: ContentStream) -> AppResult<Response> {
    let status = if stream.range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, stream.content_type.as_str())
        .header(header::CONTENT_LENGTH, stream.content_length().to_string())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_DISPOSITION, stream.content_disposition())
        .header(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE))
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");
    if let Some(content_range) = stream.content_range() {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    builder
        .body(Body::from_stream(ReaderStream::new(stream.body)))
        .map_err(|e| AppError::InternalError(format!("Failed to build stream response: {e}")))
}

async fn stream_content(
    state: &AppState,
    user_id: DbId,
    assignment_id: DbId,
    kind: ContentKind,
    headers: &HeaderMap,
) -> AppResult<Response> {
    let reader_id = reader_profile_id(state, user_id).await?;
    // A Range header that is not valid ASCII is treated like any other
    // unsatisfiable range: the whole artifact is served.
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    let ctx = state.queue_context();
    let stream = gateway::stream(&ctx, reader_id, assignment_id, kind, range, Utc::now()).await?;
    stream_response(stream)
}

// ---------------------------------------------------------------------------
// Campaigns and admission
// ---------------------------------------------------------------------------

/// GET /api/v1/queue/available-campaigns
pub async fn available_campaigns(
    RequireReader(user): RequireReader,
    State(state): State<AppState>,
    Query(params): Query<AvailableCampaignsParams>,
) -> AppResult<impl IntoResponse> {
    let format = params
        .format
        .as_deref()
        .map(BookFormat::from_name)
        .transpose()?;
    let filter = CampaignFilter {
        admitting_only: true,
        format,
    };

    let listings =
        listing::available_campaigns(&state.queue_context(), user.user_id, filter).await?;
    Ok(Json(DataResponse { data: listings }))
}

/// POST /api/v1/queue/apply
///
/// Returns 201 with the new assignment.
pub async fn apply(
    RequireReader(user): RequireReader,
    State(state): State<AppState>,
    Json(input): Json<ApplyRequest>,
) -> AppResult<impl IntoResponse> {
    let ctx = state.queue_context();
    let assignment = admission::apply(&ctx, user.user_id, &input).await?;
    let view = listing::get_assignment(&ctx, user.user_id, assignment.id, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

// ---------------------------------------------------------------------------
// Assignments
// ---------------------------------------------------------------------------

/// GET /api/v1/queue/my-assignments
pub async fn my_assignments(
    RequireReader(user): RequireReader,
    State(state): State<AppState>,
    Query(params): Query<MyAssignmentsParams>,
) -> AppResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let views =
        listing::my_assignments(&state.queue_context(), user.user_id, &filter, Utc::now()).await?;
    Ok(Json(DataResponse { data: views }))
}

/// GET /api/v1/queue/assignments/{id}
pub async fn get_assignment(
    RequireReader(user): RequireReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let view = listing::get_assignment(&state.queue_context(), user.user_id, id, Utc::now()).await?;
    Ok(Json(DataResponse { data: view }))
}

/// DELETE /api/v1/queue/assignments/{id}/withdraw
pub async fn withdraw(
    RequireReader(user): RequireReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let reader_id = reader_profile_id(&state, user.user_id).await?;
    lifecycle::withdraw(&state.queue_context(), reader_id, id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/queue/assignments/{id}/track-ebook-download
pub async fn track_ebook_download(
    RequireReader(user): RequireReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let reader_id = reader_profile_id(&state, user.user_id).await?;
    lifecycle::track_download(&state.queue_context(), reader_id, id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/queue/assignments/{id}/track-audiobook-access
pub async fn track_audiobook_access(
    RequireReader(user): RequireReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let reader_id = reader_profile_id(&state, user.user_id).await?;
    lifecycle::track_audio_access(&state.queue_context(), reader_id, id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Content streaming
// ---------------------------------------------------------------------------

/// GET /api/v1/queue/assignments/{id}/stream-audio
///
/// Supports HTTP Range requests for seeking.
pub async fn stream_audio(
    RequireReader(user): RequireReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
) -> AppResult<Response> {
    stream_content(&state, user.user_id, id, ContentKind::Audiobook, &headers).await
}

/// GET /api/v1/queue/assignments/{id}/stream-ebook
pub async fn stream_ebook(
    RequireReader(user): RequireReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
) -> AppResult<Response> {
    stream_content(&state, user.user_id, id, ContentKind::Ebook, &headers).await
}

/// GET /api/v1/queue/assignments/{id}/stream-synopsis
pub async fn stream_synopsis(
    RequireReader(user): RequireReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
) -> AppResult<Response> {
    stream_content(&state, user.user_id, id, ContentKind::Synopsis, &headers).await
}
