//! Repository for the `assignments` table and its per-campaign position
//! counter.

use shelfmark_core::access_window::AccessWindowPolicy;
use shelfmark_core::assignment::{
    AccessKind, AssignmentStatus, BookFormat, NewAssignment, QUEUED_STATUSES,
};
use shelfmark_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::assignment::AssignmentRow;

/// Column list for assignments queries.
const COLUMNS: &str = "id, campaign_id, reader_profile_id, status_id, format_assigned, \
    credits_value, source_profile_id, queue_position, scheduled_week, scheduled_date, \
    materials_released_at, materials_expires_at, deadline_at, ebook_downloaded_at, \
    last_audio_access_at, is_buffer_assignment, created_at, updated_at";

fn status_ids(statuses: &[AssignmentStatus]) -> Vec<i16> {
    statuses.iter().map(|s| s.id()).collect()
}

/// Provides queue operations on assignment rows.
///
/// Every mutation is a single conditional `UPDATE` scoped by assignment id
/// and reader profile id; a miss returns `None`.
pub struct AssignmentRepo;

impl AssignmentRepo {
    /// Find an assignment owned by the given reader.
    pub async fn find_for_reader(
        pool: &PgPool,
        id: DbId,
        reader_profile_id: DbId,
    ) -> Result<Option<AssignmentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assignments WHERE id = $1 AND reader_profile_id = $2"
        );
        sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(id)
            .bind(reader_profile_id)
            .fetch_optional(pool)
            .await
    }

    /// Find the reader's slot-holding assignment on a campaign.
    pub async fn find_slot_holder(
        pool: &PgPool,
        reader_profile_id: DbId,
        campaign_id: DbId,
    ) -> Result<Option<AssignmentRow>, sqlx::Error> {
        let releasing: Vec<i16> = AssignmentStatus::ALL
            .into_iter()
            .filter(|s| !s.holds_slot())
            .map(AssignmentStatus::id)
            .collect();
        let query = format!(
            "SELECT {COLUMNS} FROM assignments
             WHERE reader_profile_id = $1 AND campaign_id = $2
               AND NOT (status_id = ANY($3))
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(reader_profile_id)
            .bind(campaign_id)
            .bind(releasing)
            .fetch_optional(pool)
            .await
    }

    /// Insert a `WAITING` assignment with the next queue position.
    ///
    /// Locks the campaign's counter row for the duration of the transaction,
    /// so concurrent admissions to one campaign are serialized and receive
    /// unique, strictly increasing positions. A duplicate slot violates
    /// `uq_assignments_reader_campaign_active` and rolls back.
    pub async fn create_waiting(
        pool: &PgPool,
        input: &NewAssignment,
    ) -> Result<AssignmentRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO campaign_queue_counters (campaign_id) VALUES ($1)
             ON CONFLICT (campaign_id) DO NOTHING",
        )
        .bind(input.campaign_id)
        .execute(&mut *tx)
        .await?;

        let last_issued: i32 = sqlx::query_scalar(
            "SELECT last_issued_position FROM campaign_queue_counters
             WHERE campaign_id = $1
             FOR UPDATE",
        )
        .bind(input.campaign_id)
        .fetch_one(&mut *tx)
        .await?;

        let queued: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM assignments
             WHERE campaign_id = $1 AND status_id = ANY($2)",
        )
        .bind(input.campaign_id)
        .bind(status_ids(&QUEUED_STATUSES))
        .fetch_one(&mut *tx)
        .await?;

        let counted = i32::try_from(queued + 1).unwrap_or(i32::MAX);
        let position = counted.max(last_issued.saturating_add(1));

        let insert_query = format!(
            "INSERT INTO assignments
                (campaign_id, reader_profile_id, status_id, format_assigned, credits_value,
                 source_profile_id, queue_position, is_buffer_assignment)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, AssignmentRow>(&insert_query)
            .bind(input.campaign_id)
            .bind(input.reader_profile_id)
            .bind(AssignmentStatus::Waiting.id())
            .bind(input.format.as_str())
            .bind(input.credits_value())
            .bind(input.source_profile_id)
            .bind(position)
            .bind(input.is_buffer_assignment)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE campaign_queue_counters SET last_issued_position = $2
             WHERE campaign_id = $1",
        )
        .bind(input.campaign_id)
        .bind(position)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// List a reader's assignments, newest first. `None` filters are ignored.
    pub async fn list_for_reader(
        pool: &PgPool,
        reader_profile_id: DbId,
        campaign_id: Option<DbId>,
        statuses: Option<&[AssignmentStatus]>,
    ) -> Result<Vec<AssignmentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assignments
             WHERE reader_profile_id = $1
               AND ($2::BIGINT IS NULL OR campaign_id = $2)
               AND ($3::SMALLINT[] IS NULL OR status_id = ANY($3))
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(reader_profile_id)
            .bind(campaign_id)
            .bind(statuses.map(status_ids))
            .fetch_all(pool)
            .await
    }

    /// Count WAITING/SCHEDULED assignments on a campaign.
    pub async fn count_queued(pool: &PgPool, campaign_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM assignments
             WHERE campaign_id = $1 AND status_id = ANY($2)",
        )
        .bind(campaign_id)
        .bind(status_ids(&QUEUED_STATUSES))
        .fetch_one(pool)
        .await
    }

    /// Stamp a content access. `APPROVED` moves to `IN_PROGRESS`; any other
    /// status is left as is.
    pub async fn record_access(
        pool: &PgPool,
        id: DbId,
        reader_profile_id: DbId,
        access: AccessKind,
        at: Timestamp,
    ) -> Result<Option<AssignmentRow>, sqlx::Error> {
        let column = match access {
            AccessKind::EbookDownload => "ebook_downloaded_at",
            AccessKind::AudioAccess => "last_audio_access_at",
        };
        let query = format!(
            "UPDATE assignments SET
                status_id = CASE WHEN status_id = $3 THEN $4 ELSE status_id END,
                {column} = $5,
                updated_at = $5
             WHERE id = $1 AND reader_profile_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(id)
            .bind(reader_profile_id)
            .bind(AssignmentStatus::Approved.id())
            .bind(AssignmentStatus::InProgress.id())
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Cancel a WAITING/SCHEDULED assignment. `None` when the row is not
    /// owned by the reader or has already moved on.
    pub async fn withdraw(
        pool: &PgPool,
        id: DbId,
        reader_profile_id: DbId,
        at: Timestamp,
    ) -> Result<Option<AssignmentRow>, sqlx::Error> {
        let query = format!(
            "UPDATE assignments SET status_id = $3, updated_at = $4
             WHERE id = $1 AND reader_profile_id = $2 AND status_id = ANY($5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(id)
            .bind(reader_profile_id)
            .bind(AssignmentStatus::Cancelled.id())
            .bind(at)
            .bind(status_ids(&QUEUED_STATUSES))
            .fetch_optional(pool)
            .await
    }

    /// Release materials for a SCHEDULED assignment: mark it APPROVED and
    /// stamp the release time and format-specific windows.
    ///
    /// Called by the distribution scheduler, not by reader requests.
    pub async fn release_materials(
        pool: &PgPool,
        id: DbId,
        released_at: Timestamp,
        policy: &AccessWindowPolicy,
    ) -> Result<Option<AssignmentRow>, sqlx::Error> {
        let Some(current) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let format = BookFormat::from_name(&current.format_assigned)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let windows = policy.release_windows(format, released_at);

        let query = format!(
            "UPDATE assignments SET
                status_id = $2,
                materials_released_at = $3,
                deadline_at = $4,
                materials_expires_at = $5,
                updated_at = $3
             WHERE id = $1 AND status_id = $6
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(id)
            .bind(AssignmentStatus::Approved.id())
            .bind(released_at)
            .bind(windows.deadline_at)
            .bind(windows.materials_expires_at)
            .bind(AssignmentStatus::Scheduled.id())
            .fetch_optional(pool)
            .await
    }

    /// Find an assignment by id regardless of owner.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AssignmentRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assignments WHERE id = $1");
        sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
