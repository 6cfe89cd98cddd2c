//! Reader-driven assignment transitions: access tracking and withdrawal.
//!
//! `WAITING -> SCHEDULED -> APPROVED` belongs to the distribution scheduler.
//! This module only moves `APPROVED -> IN_PROGRESS` on first access and
//! `WAITING | SCHEDULED -> CANCELLED` on withdrawal.

use crate::assignment::state_machine::validate_transition;
use crate::assignment::{AccessKind, AssignmentStatus, BookFormat, ContentKind};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

use super::gateway::authorize;
use super::{fetch_owned, QueueContext};

/// `POST .../track-ebook-download`.
pub async fn track_download(
    ctx: &QueueContext<'_>,
    reader_profile_id: DbId,
    assignment_id: DbId,
    now: Timestamp,
) -> Result<(), CoreError> {
    track_access(ctx, reader_profile_id, assignment_id, BookFormat::Ebook, now).await
}

/// `POST .../track-audiobook-access`.
pub async fn track_audio_access(
    ctx: &QueueContext<'_>,
    reader_profile_id: DbId,
    assignment_id: DbId,
    now: Timestamp,
) -> Result<(), CoreError> {
    track_access(ctx, reader_profile_id, assignment_id, BookFormat::Audiobook, now).await
}

/// Record a client-side access of the given format.
///
/// The same gates as streaming apply, so tracking cannot start or extend
/// an assignment whose content the reader may no longer open.
async fn track_access(
    ctx: &QueueContext<'_>,
    reader_profile_id: DbId,
    assignment_id: DbId,
    format: BookFormat,
    now: Timestamp,
) -> Result<(), CoreError> {
    let assignment = fetch_owned(ctx.store, assignment_id, reader_profile_id).await?;
    let kind = match format {
        BookFormat::Ebook => ContentKind::Ebook,
        BookFormat::Audiobook => ContentKind::Audiobook,
    };
    authorize(&ctx.policy, kind, &assignment, now)?;

    let updated = ctx
        .store
        .record_access(
            assignment_id,
            reader_profile_id,
            AccessKind::for_format(format),
            now,
        )
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Assignment",
            id: assignment_id,
        })?;

    if assignment.status != updated.status {
        tracing::info!(
            assignment_id,
            reader_id = reader_profile_id,
            from = %assignment.status,
            to = %updated.status,
            "Assignment started",
        );
    }
    Ok(())
}

/// Withdraw from the queue. Allowed only before materials are released.
pub async fn withdraw(
    ctx: &QueueContext<'_>,
    reader_profile_id: DbId,
    assignment_id: DbId,
    now: Timestamp,
) -> Result<(), CoreError> {
    let assignment = fetch_owned(ctx.store, assignment_id, reader_profile_id).await?;

    if let Err(msg) = validate_transition(assignment.status, AssignmentStatus::Cancelled) {
        return Err(match assignment.status {
            AssignmentStatus::Approved
            | AssignmentStatus::InProgress
            | AssignmentStatus::Submitted => CoreError::Forbidden(
                "Cannot withdraw after materials have been released".into(),
            ),
            _ => CoreError::Validation(msg),
        });
    }

    ctx.store
        .withdraw(assignment_id, reader_profile_id, now)
        .await?
        .ok_or_else(|| {
            CoreError::Validation("This assignment can no longer be withdrawn".into())
        })?;

    tracing::info!(
        assignment_id,
        reader_id = reader_profile_id,
        campaign_id = assignment.campaign_id,
        "Reader withdrew from queue",
    );
    Ok(())
}
