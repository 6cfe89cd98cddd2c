//! Collaborator interfaces the queue operations run against.
//!
//! Production implementations live in `shelfmark-db` (PostgreSQL),
//! `shelfmark-storage` (filesystem / S3) and `shelfmark-events` (email).
//! [`super::memory`] provides in-process implementations for tests and
//! local development.

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::assignment::{AccessKind, Assignment, AssignmentStatus, BookFormat, NewAssignment};
use crate::catalog::{Campaign, ReaderProfile};
use crate::error::CoreError;
use crate::range::ByteRange;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Filter for listing one reader's assignments. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentFilter {
    pub campaign_id: Option<DbId>,
    pub statuses: Option<Vec<AssignmentStatus>>,
}

impl AssignmentFilter {
    /// Assignments that still hold the reader's slot on their campaign.
    pub fn slot_holding() -> Self {
        Self {
            campaign_id: None,
            statuses: Some(
                AssignmentStatus::ALL
                    .into_iter()
                    .filter(|s| s.holds_slot())
                    .collect(),
            ),
        }
    }

    pub fn matches(&self, assignment: &Assignment) -> bool {
        self.campaign_id.map_or(true, |id| id == assignment.campaign_id)
            && self
                .statuses
                .as_ref()
                .map_or(true, |statuses| statuses.contains(&assignment.status))
    }
}

/// Filter for listing campaigns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CampaignFilter {
    /// Only campaigns currently admitting readers.
    pub admitting_only: bool,
    /// Only campaigns that offer this format.
    pub format: Option<BookFormat>,
}

impl CampaignFilter {
    pub fn matches(&self, campaign: &Campaign) -> bool {
        (!self.admitting_only || campaign.status.is_admitting())
            && self.format.map_or(true, |f| campaign.format.supports(f))
    }
}

// ---------------------------------------------------------------------------
// Assignment State Store
// ---------------------------------------------------------------------------

/// Persistent assignment records.
///
/// Every mutation is a single-record conditional update scoped by both the
/// assignment id and the owning reader profile id. Methods return `Ok(None)`
/// when no row matched that scope.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Fetch an assignment only if it belongs to `reader_profile_id`.
    async fn find_for_reader(
        &self,
        assignment_id: DbId,
        reader_profile_id: DbId,
    ) -> Result<Option<Assignment>, CoreError>;

    /// The reader's assignment on `campaign_id` that still holds a slot
    /// (status outside EXPIRED / CANCELLED / REASSIGNED), if any.
    async fn find_slot_holder(
        &self,
        reader_profile_id: DbId,
        campaign_id: DbId,
    ) -> Result<Option<Assignment>, CoreError>;

    /// Insert a `Waiting` assignment.
    ///
    /// The queue position is issued atomically per campaign as
    /// `max(queued_count + 1, last_issued + 1)`: it equals the number of
    /// WAITING/SCHEDULED assignments plus one, and is never reused even
    /// after withdrawals. A concurrent duplicate slot yields
    /// [`CoreError::Conflict`].
    async fn create_waiting(&self, input: &NewAssignment) -> Result<Assignment, CoreError>;

    async fn list_for_reader(
        &self,
        reader_profile_id: DbId,
        filter: &AssignmentFilter,
    ) -> Result<Vec<Assignment>, CoreError>;

    /// Number of WAITING/SCHEDULED assignments on a campaign.
    async fn count_queued(&self, campaign_id: DbId) -> Result<i64, CoreError>;

    /// Record a content access: `Approved` becomes `InProgress`, and the
    /// timestamp selected by `access` is set to `at` in every case.
    async fn record_access(
        &self,
        assignment_id: DbId,
        reader_profile_id: DbId,
        access: AccessKind,
        at: Timestamp,
    ) -> Result<Option<Assignment>, CoreError>;

    /// Move a WAITING/SCHEDULED assignment to `Cancelled`. Returns `None`
    /// when the assignment is not owned or no longer withdrawable.
    async fn withdraw(
        &self,
        assignment_id: DbId,
        reader_profile_id: DbId,
        at: Timestamp,
    ) -> Result<Option<Assignment>, CoreError>;

    /// Cheap liveness check for the health endpoint.
    async fn ping(&self) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Campaign / Reader Registry
// ---------------------------------------------------------------------------

/// Read access to campaign and reader records.
#[async_trait]
pub trait CatalogRegistry: Send + Sync {
    async fn find_reader_by_user(&self, user_id: DbId) -> Result<Option<ReaderProfile>, CoreError>;

    async fn find_campaign(&self, campaign_id: DbId) -> Result<Option<Campaign>, CoreError>;

    async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>, CoreError>;

    /// Reviews the reader has completed for this campaign, counted from the
    /// review records rather than from assignments.
    async fn completed_review_count(
        &self,
        reader_profile_id: DbId,
        campaign_id: DbId,
    ) -> Result<i64, CoreError>;
}

// ---------------------------------------------------------------------------
// Content Store
// ---------------------------------------------------------------------------

/// Size and type of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMeta {
    pub size: u64,
    pub content_type: Option<String>,
}

/// A byte stream read straight from the backend, never fully buffered.
pub type ArtifactReader = Pin<Box<dyn AsyncRead + Send>>;

/// Byte-range access to stored artifacts by opaque key.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// `Ok(None)` when no artifact exists under `key`.
    async fn metadata(&self, key: &str) -> Result<Option<ArtifactMeta>, CoreError>;

    /// Open the artifact, limited to `range` when given.
    async fn open(&self, key: &str, range: Option<ByteRange>) -> Result<ArtifactReader, CoreError>;
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Details sent to a reader after joining a queue.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionNotice {
    pub assignment_id: DbId,
    pub reader_name: String,
    pub reader_email: String,
    pub campaign_title: String,
    pub format: BookFormat,
    pub credits_value: i32,
    pub queue_position: i32,
    pub estimated_review_week: i64,
}

/// Outbound reader notifications. Delivery is best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn admission_confirmed(&self, notice: &AdmissionNotice) -> Result<(), CoreError>;
}
