//! Repository for the `reviews` table.

use shelfmark_core::types::DbId;
use sqlx::PgPool;

/// Status of a review that counts toward the per-campaign cap.
pub const COMPLETED_STATUS: &str = "COMPLETED";

pub struct ReviewRepo;

impl ReviewRepo {
    /// Count a reader's completed reviews for one campaign.
    ///
    /// Counted from review records, independently of assignment rows.
    pub async fn count_completed(
        pool: &PgPool,
        reader_profile_id: DbId,
        campaign_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM reviews
             WHERE reader_profile_id = $1 AND campaign_id = $2 AND status = $3",
        )
        .bind(reader_profile_id)
        .bind(campaign_id)
        .bind(COMPLETED_STATUS)
        .fetch_one(pool)
        .await
    }
}
