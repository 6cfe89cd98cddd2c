//! Repository for the `campaigns` table.

use shelfmark_core::types::DbId;
use sqlx::PgPool;

use crate::models::campaign::CampaignRow;

/// Column list for campaigns queries.
const COLUMNS: &str = "id, title, author_display_name, format, status, weekly_review_rate, \
    ebook_key, audiobook_key, synopsis_key, created_at";

/// Read access to campaign rows.
pub struct CampaignRepo;

impl CampaignRepo {
    /// Find a campaign by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CampaignRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM campaigns WHERE id = $1");
        sqlx::query_as::<_, CampaignRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List campaigns, newest first.
    ///
    /// `format` keeps campaigns offering that format, including `BOTH`.
    pub async fn list(
        pool: &PgPool,
        active_only: bool,
        format: Option<&str>,
    ) -> Result<Vec<CampaignRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaigns
             WHERE ($1 = false OR status = 'ACTIVE')
               AND ($2::TEXT IS NULL OR format = $2 OR format = 'BOTH')
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, CampaignRow>(&query)
            .bind(active_only)
            .bind(format)
            .fetch_all(pool)
            .await
    }
}
