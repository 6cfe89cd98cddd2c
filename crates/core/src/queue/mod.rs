//! Reader assignment queue operations.
//!
//! - [`admission`] -- joining a campaign's queue.
//! - [`lifecycle`] -- access tracking and withdrawal.
//! - [`gateway`] -- validated, range-aware content streaming.
//! - [`listing`] -- reader-facing reads (available campaigns, my assignments).
//!
//! Operations are free functions over a [`QueueContext`] holding the
//! collaborators for one request, so tests can swap in [`memory`] doubles.

pub mod admission;
pub mod gateway;
pub mod lifecycle;
pub mod listing;
pub mod memory;
pub mod ports;
pub mod view;

use crate::access_window::AccessWindowPolicy;
use crate::assignment::Assignment;
use crate::catalog::ReaderProfile;
use crate::error::CoreError;
use crate::types::DbId;

use ports::{AssignmentStore, CatalogRegistry, ContentStore, Notifier};

/// Maximum completed reviews a reader may accumulate on one campaign.
pub const MAX_REVIEWS_PER_CAMPAIGN: i64 = 3;

/// Collaborators an operation runs against.
#[derive(Clone, Copy)]
pub struct QueueContext<'a> {
    pub store: &'a dyn AssignmentStore,
    pub registry: &'a dyn CatalogRegistry,
    pub content: &'a dyn ContentStore,
    pub notifier: &'a dyn Notifier,
    pub policy: AccessWindowPolicy,
}

/// Week (1-based) in which a queue position is expected to be reviewed:
/// `ceil(position / weekly_rate)`. A non-positive rate counts as one per week.
pub fn estimated_review_week(queue_position: i64, weekly_review_rate: i32) -> i64 {
    let rate = i64::from(weekly_review_rate.max(1));
    let position = queue_position.max(1);
    (position + rate - 1) / rate
}

/// Resolve the reader profile behind an authenticated user.
pub async fn resolve_reader(
    registry: &dyn CatalogRegistry,
    user_id: DbId,
) -> Result<ReaderProfile, CoreError> {
    registry
        .find_reader_by_user(user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ReaderProfile",
            id: user_id,
        })
}

/// Fetch an assignment scoped to its owner. A foreign assignment is
/// indistinguishable from a missing one.
pub async fn fetch_owned(
    store: &dyn AssignmentStore,
    assignment_id: DbId,
    reader_profile_id: DbId,
) -> Result<Assignment, CoreError> {
    store
        .find_for_reader(assignment_id, reader_profile_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Assignment",
            id: assignment_id,
        })
}
