//! Reader-facing reads: admissible campaigns and the reader's own
//! assignments.

use std::collections::HashMap;

use crate::assignment::Assignment;
use crate::catalog::Campaign;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

use super::ports::{AssignmentFilter, CampaignFilter};
use super::view::{sort_for_reader, AssignmentView, CampaignListing};
use super::{estimated_review_week, fetch_owned, resolve_reader, QueueContext};

/// Campaigns currently admitting readers, with `has_applied` and wait
/// estimates for the calling reader.
///
/// A reader already queued on a campaign sees their own position; everyone
/// else sees the position they would receive by applying now.
pub async fn available_campaigns(
    ctx: &QueueContext<'_>,
    user_id: DbId,
    filter: CampaignFilter,
) -> Result<Vec<CampaignListing>, CoreError> {
    let reader = resolve_reader(ctx.registry, user_id).await?;
    let filter = CampaignFilter {
        admitting_only: true,
        ..filter
    };
    let campaigns = ctx.registry.list_campaigns(&filter).await?;

    let held: HashMap<DbId, Assignment> = ctx
        .store
        .list_for_reader(reader.id, &AssignmentFilter::slot_holding())
        .await?
        .into_iter()
        .map(|a| (a.campaign_id, a))
        .collect();

    let mut listings = Vec::with_capacity(campaigns.len());
    for campaign in campaigns {
        let own = held.get(&campaign.id);
        let position = match own {
            Some(a) if a.status.is_queued() => i64::from(a.queue_position),
            _ => ctx.store.count_queued(campaign.id).await? + 1,
        };
        listings.push(CampaignListing {
            id: campaign.id,
            title: campaign.title,
            author_display_name: campaign.author_display_name,
            format: campaign.format,
            has_applied: own.is_some(),
            estimated_queue_position: position,
            estimated_review_week: estimated_review_week(position, campaign.weekly_review_rate),
        });
    }
    Ok(listings)
}

/// The reader's assignments, active first.
pub async fn my_assignments(
    ctx: &QueueContext<'_>,
    user_id: DbId,
    filter: &AssignmentFilter,
    now: Timestamp,
) -> Result<Vec<AssignmentView>, CoreError> {
    let reader = resolve_reader(ctx.registry, user_id).await?;
    let mut assignments = ctx.store.list_for_reader(reader.id, filter).await?;
    sort_for_reader(&mut assignments);

    let mut campaigns: HashMap<DbId, Campaign> = HashMap::new();
    let mut views = Vec::with_capacity(assignments.len());
    for assignment in &assignments {
        if !campaigns.contains_key(&assignment.campaign_id) {
            let campaign = load_campaign(ctx, assignment.campaign_id).await?;
            campaigns.insert(campaign.id, campaign);
        }
        if let Some(campaign) = campaigns.get(&assignment.campaign_id) {
            views.push(AssignmentView::build(assignment, campaign, &ctx.policy, now));
        }
    }
    Ok(views)
}

/// One of the reader's assignments. Foreign ids are `NotFound`.
pub async fn get_assignment(
    ctx: &QueueContext<'_>,
    user_id: DbId,
    assignment_id: DbId,
    now: Timestamp,
) -> Result<AssignmentView, CoreError> {
    let reader = resolve_reader(ctx.registry, user_id).await?;
    let assignment = fetch_owned(ctx.store, assignment_id, reader.id).await?;
    let campaign = load_campaign(ctx, assignment.campaign_id).await?;
    Ok(AssignmentView::build(&assignment, &campaign, &ctx.policy, now))
}

async fn load_campaign(ctx: &QueueContext<'_>, campaign_id: DbId) -> Result<Campaign, CoreError> {
    ctx.registry
        .find_campaign(campaign_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Campaign",
            id: campaign_id,
        })
}
