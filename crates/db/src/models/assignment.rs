//! Assignment rows.

use chrono::NaiveDate;
use shelfmark_core::assignment::{Assignment, AssignmentStatus, BookFormat};
use shelfmark_core::error::CoreError;
use shelfmark_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::corrupt_row;

/// A row from the `assignments` table.
#[derive(Debug, Clone, FromRow)]
pub struct AssignmentRow {
    pub id: DbId,
    pub campaign_id: DbId,
    pub reader_profile_id: DbId,
    pub status_id: i16,
    pub format_assigned: String,
    pub credits_value: i32,
    pub source_profile_id: DbId,
    pub queue_position: i32,
    pub scheduled_week: Option<i32>,
    pub scheduled_date: Option<NaiveDate>,
    pub materials_released_at: Option<Timestamp>,
    pub materials_expires_at: Option<Timestamp>,
    pub deadline_at: Option<Timestamp>,
    pub ebook_downloaded_at: Option<Timestamp>,
    pub last_audio_access_at: Option<Timestamp>,
    pub is_buffer_assignment: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = CoreError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let status = AssignmentStatus::from_id(row.status_id)
            .map_err(|e| corrupt_row("assignments", row.id, e))?;
        let format = BookFormat::from_name(&row.format_assigned)
            .map_err(|e| corrupt_row("assignments", row.id, e))?;
        if row.credits_value != format.credits() {
            return Err(corrupt_row(
                "assignments",
                row.id,
                format!(
                    "credits_value {} does not match format {format}",
                    row.credits_value
                ),
            ));
        }

        Ok(Assignment {
            id: row.id,
            campaign_id: row.campaign_id,
            reader_profile_id: row.reader_profile_id,
            status,
            format,
            source_profile_id: row.source_profile_id,
            queue_position: row.queue_position,
            scheduled_week: row.scheduled_week,
            scheduled_date: row.scheduled_date,
            materials_released_at: row.materials_released_at,
            materials_expires_at: row.materials_expires_at,
            deadline_at: row.deadline_at,
            ebook_downloaded_at: row.ebook_downloaded_at,
            last_audio_access_at: row.last_audio_access_at,
            is_buffer_assignment: row.is_buffer_assignment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
