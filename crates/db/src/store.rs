//! [`AssignmentStore`] and [`CatalogRegistry`] backed by PostgreSQL.

use async_trait::async_trait;
use shelfmark_core::assignment::{AccessKind, Assignment, NewAssignment};
use shelfmark_core::catalog::{Campaign, ReaderProfile};
use shelfmark_core::error::CoreError;
use shelfmark_core::queue::ports::{
    AssignmentFilter, AssignmentStore, CampaignFilter, CatalogRegistry,
};
use shelfmark_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::assignment::AssignmentRow;
use crate::repositories::{AssignmentRepo, CampaignRepo, ReaderProfileRepo, ReviewRepo};

/// Name of the partial unique index guarding one slot per reader/campaign.
const SLOT_INDEX: &str = "uq_assignments_reader_campaign_active";

/// Map a sqlx error into the domain taxonomy.
///
/// Unique violations on the slot index become [`CoreError::Conflict`];
/// everything else is logged and surfaced as a sanitized internal error.
pub fn map_db_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint == SLOT_INDEX {
                return CoreError::Conflict(
                    "Reader already holds an active assignment for this campaign".into(),
                );
            }
            if constraint.starts_with("uq_") {
                return CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ));
            }
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Internal("A database error occurred".into())
}

fn decode_opt(row: Option<AssignmentRow>) -> Result<Option<Assignment>, CoreError> {
    row.map(Assignment::try_from).transpose()
}

/// Queue persistence over a shared connection pool.
#[derive(Clone)]
pub struct PgQueueStore {
    pool: PgPool,
}

impl PgQueueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssignmentStore for PgQueueStore {
    async fn find_for_reader(
        &self,
        assignment_id: DbId,
        reader_profile_id: DbId,
    ) -> Result<Option<Assignment>, CoreError> {
        let row = AssignmentRepo::find_for_reader(&self.pool, assignment_id, reader_profile_id)
            .await
            .map_err(map_db_error)?;
        decode_opt(row)
    }

    async fn find_slot_holder(
        &self,
        reader_profile_id: DbId,
        campaign_id: DbId,
    ) -> Result<Option<Assignment>, CoreError> {
        let row = AssignmentRepo::find_slot_holder(&self.pool, reader_profile_id, campaign_id)
            .await
            .map_err(map_db_error)?;
        decode_opt(row)
    }

    async fn create_waiting(&self, input: &NewAssignment) -> Result<Assignment, CoreError> {
        let row = AssignmentRepo::create_waiting(&self.pool, input)
            .await
            .map_err(map_db_error)?;
        Assignment::try_from(row)
    }

    async fn list_for_reader(
        &self,
        reader_profile_id: DbId,
        filter: &AssignmentFilter,
    ) -> Result<Vec<Assignment>, CoreError> {
        AssignmentRepo::list_for_reader(
            &self.pool,
            reader_profile_id,
            filter.campaign_id,
            filter.statuses.as_deref(),
        )
        .await
        .map_err(map_db_error)?
        .into_iter()
        .map(Assignment::try_from)
        .collect()
    }

    async fn count_queued(&self, campaign_id: DbId) -> Result<i64, CoreError> {
        AssignmentRepo::count_queued(&self.pool, campaign_id)
            .await
            .map_err(map_db_error)
    }

    async fn record_access(
        &self,
        assignment_id: DbId,
        reader_profile_id: DbId,
        access: AccessKind,
        at: Timestamp,
    ) -> Result<Option<Assignment>, CoreError> {
        let row =
            AssignmentRepo::record_access(&self.pool, assignment_id, reader_profile_id, access, at)
                .await
                .map_err(map_db_error)?;
        decode_opt(row)
    }

    async fn withdraw(
        &self,
        assignment_id: DbId,
        reader_profile_id: DbId,
        at: Timestamp,
    ) -> Result<Option<Assignment>, CoreError> {
        let row = AssignmentRepo::withdraw(&self.pool, assignment_id, reader_profile_id, at)
            .await
            .map_err(map_db_error)?;
        decode_opt(row)
    }

    async fn ping(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool).await.map_err(map_db_error)
    }
}

#[async_trait]
impl CatalogRegistry for PgQueueStore {
    async fn find_reader_by_user(&self, user_id: DbId) -> Result<Option<ReaderProfile>, CoreError> {
        let Some(profile) = ReaderProfileRepo::find_by_user_id(&self.pool, user_id)
            .await
            .map_err(map_db_error)?
        else {
            return Ok(None);
        };
        let sources = ReaderProfileRepo::list_source_profiles(&self.pool, profile.id)
            .await
            .map_err(map_db_error)?;
        profile.into_profile(sources).map(Some)
    }

    async fn find_campaign(&self, campaign_id: DbId) -> Result<Option<Campaign>, CoreError> {
        CampaignRepo::find_by_id(&self.pool, campaign_id)
            .await
            .map_err(map_db_error)?
            .map(Campaign::try_from)
            .transpose()
    }

    async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>, CoreError> {
        CampaignRepo::list(
            &self.pool,
            filter.admitting_only,
            filter.format.map(|f| f.as_str()),
        )
        .await
        .map_err(map_db_error)?
        .into_iter()
        .map(Campaign::try_from)
        .collect()
    }

    async fn completed_review_count(
        &self,
        reader_profile_id: DbId,
        campaign_id: DbId,
    ) -> Result<i64, CoreError> {
        ReviewRepo::count_completed(&self.pool, reader_profile_id, campaign_id)
            .await
            .map_err(map_db_error)
    }
}
