//! Queue admission: decides eligibility, resolves the format and credit
//! cost, and creates the `Waiting` assignment.
//!
//! Preconditions are checked in a fixed order and fail fast, each with its
//! own error kind:
//!
//! 1. reader profile exists and has a linked content-source profile
//! 2. campaign exists and is admitting readers
//! 3. no slot-holding assignment on the campaign already
//! 4. fewer than [`MAX_REVIEWS_PER_CAMPAIGN`] completed reviews
//! 5. format resolution, then 6. format compatibility
//! 7. credits from the format, 8. source profile selection

use serde::Deserialize;

use crate::assignment::{Assignment, BookFormat, NewAssignment};
use crate::catalog::{Campaign, CampaignFormat, FormatPreference, ReaderProfile};
use crate::error::CoreError;
use crate::types::DbId;

use super::ports::AdmissionNotice;
use super::{estimated_review_week, resolve_reader, QueueContext, MAX_REVIEWS_PER_CAMPAIGN};

/// Body of `POST /queue/apply`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyRequest {
    pub campaign_id: DbId,
    pub format_preference: Option<BookFormat>,
    pub source_profile_id: Option<DbId>,
}

/// Pick the format to assign.
///
/// An explicit request wins, then the reader's stored preference, then the
/// campaign's only format. A flexible reader on a `Both` campaign gets an
/// ebook.
pub fn resolve_format(
    requested: Option<BookFormat>,
    reader_preference: Option<FormatPreference>,
    campaign_format: CampaignFormat,
) -> BookFormat {
    requested
        .or_else(|| reader_preference.and_then(FormatPreference::specific))
        .or_else(|| campaign_format.sole_format())
        .unwrap_or(BookFormat::Ebook)
}

/// Reject a format the campaign does not offer.
pub fn check_format_compatibility(
    campaign_format: CampaignFormat,
    format: BookFormat,
) -> Result<(), CoreError> {
    if campaign_format.supports(format) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "This campaign only offers {campaign_format} format, but {format} was requested"
        )))
    }
}

/// The caller's chosen source profile, which must be linked to the reader,
/// or the reader's first registered one.
pub fn select_source_profile(
    reader: &ReaderProfile,
    requested: Option<DbId>,
) -> Result<DbId, CoreError> {
    match requested {
        Some(id) if reader.owns_source_profile(id) => Ok(id),
        Some(id) => Err(CoreError::Validation(format!(
            "Source profile {id} is not linked to your reader profile"
        ))),
        None => reader
            .source_profiles
            .first()
            .map(|p| p.id)
            .ok_or_else(no_source_profile_error),
    }
}

fn no_source_profile_error() -> CoreError {
    CoreError::Validation(
        "Link at least one content-source profile before joining a review queue".into(),
    )
}

/// Admit the reader behind `user_id` into a campaign's queue.
pub async fn apply(
    ctx: &QueueContext<'_>,
    user_id: DbId,
    request: &ApplyRequest,
) -> Result<Assignment, CoreError> {
    // 1. Reader
    let reader = resolve_reader(ctx.registry, user_id).await?;
    if reader.source_profiles.is_empty() {
        return Err(no_source_profile_error());
    }

    // 2. Campaign
    let campaign = ctx
        .registry
        .find_campaign(request.campaign_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Campaign",
            id: request.campaign_id,
        })?;
    if !campaign.status.is_admitting() {
        return Err(CoreError::Validation(format!(
            "Campaign {} is not accepting readers",
            campaign.id
        )));
    }

    // 3. One slot per campaign
    if let Some(existing) = ctx.store.find_slot_holder(reader.id, campaign.id).await? {
        return Err(CoreError::Conflict(format!(
            "You already have an active assignment ({}) for this campaign",
            existing.id
        )));
    }

    // 4. Review cap
    let completed = ctx
        .registry
        .completed_review_count(reader.id, campaign.id)
        .await?;
    if completed >= MAX_REVIEWS_PER_CAMPAIGN {
        return Err(CoreError::Conflict(format!(
            "You have already completed {MAX_REVIEWS_PER_CAMPAIGN} reviews for this book"
        )));
    }

    // 5-7. Format and credits
    let format = resolve_format(
        request.format_preference,
        reader.preferred_format,
        campaign.format,
    );
    check_format_compatibility(campaign.format, format)?;

    // 8. Source profile
    let source_profile_id = select_source_profile(&reader, request.source_profile_id)?;

    let input = NewAssignment {
        campaign_id: campaign.id,
        reader_profile_id: reader.id,
        format,
        source_profile_id,
        is_buffer_assignment: false,
    };
    let assignment = ctx.store.create_waiting(&input).await?;

    tracing::info!(
        assignment_id = assignment.id,
        campaign_id = campaign.id,
        reader_id = reader.id,
        format = %format,
        credits = assignment.credits_value(),
        queue_position = assignment.queue_position,
        "Reader admitted to campaign queue",
    );

    send_admission_notice(ctx, &reader, &campaign, &assignment).await;

    Ok(assignment)
}

/// Best-effort confirmation. Failures are logged and never fail admission.
async fn send_admission_notice(
    ctx: &QueueContext<'_>,
    reader: &ReaderProfile,
    campaign: &Campaign,
    assignment: &Assignment,
) {
    let notice = AdmissionNotice {
        assignment_id: assignment.id,
        reader_name: reader.display_name.clone(),
        reader_email: reader.email.clone(),
        campaign_title: campaign.title.clone(),
        format: assignment.format,
        credits_value: assignment.credits_value(),
        queue_position: assignment.queue_position,
        estimated_review_week: estimated_review_week(
            i64::from(assignment.queue_position),
            campaign.weekly_review_rate,
        ),
    };

    if let Err(e) = ctx.notifier.admission_confirmed(&notice).await {
        tracing::warn!(
            assignment_id = assignment.id,
            reader_id = reader.id,
            error = %e,
            "Failed to send queue admission notice",
        );
    }
}
