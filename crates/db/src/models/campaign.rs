//! Campaign rows.

use shelfmark_core::catalog::{Campaign, CampaignFormat, CampaignStatus};
use shelfmark_core::error::CoreError;
use shelfmark_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::corrupt_row;

/// A row from the `campaigns` table.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignRow {
    pub id: DbId,
    pub title: String,
    pub author_display_name: String,
    pub format: String,
    pub status: String,
    pub weekly_review_rate: i32,
    pub ebook_key: Option<String>,
    pub audiobook_key: Option<String>,
    pub synopsis_key: Option<String>,
    pub created_at: Timestamp,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = CoreError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        let format =
            CampaignFormat::from_name(&row.format).map_err(|e| corrupt_row("campaigns", row.id, e))?;
        let status =
            CampaignStatus::from_name(&row.status).map_err(|e| corrupt_row("campaigns", row.id, e))?;

        Ok(Campaign {
            id: row.id,
            title: row.title,
            author_display_name: row.author_display_name,
            format,
            status,
            weekly_review_rate: row.weekly_review_rate,
            ebook_key: row.ebook_key,
            audiobook_key: row.audiobook_key,
            synopsis_key: row.synopsis_key,
            created_at: row.created_at,
        })
    }
}
