//! Reader profile and content-source profile rows.

use shelfmark_core::catalog::{FormatPreference, ReaderProfile, SourceProfile};
use shelfmark_core::error::CoreError;
use shelfmark_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::corrupt_row;

/// A row from the `reader_profiles` table.
#[derive(Debug, Clone, FromRow)]
pub struct ReaderProfileRow {
    pub id: DbId,
    pub user_id: DbId,
    pub display_name: String,
    pub email: String,
    pub preferred_format: Option<String>,
}

/// A row from the `reader_source_profiles` table.
#[derive(Debug, Clone, FromRow)]
pub struct SourceProfileRow {
    pub id: DbId,
    pub reader_profile_id: DbId,
    pub label: String,
    pub created_at: Timestamp,
}

impl From<SourceProfileRow> for SourceProfile {
    fn from(row: SourceProfileRow) -> Self {
        SourceProfile {
            id: row.id,
            label: row.label,
            created_at: row.created_at,
        }
    }
}

impl ReaderProfileRow {
    /// Assemble the domain profile. `sources` must already be ordered by
    /// registration time.
    pub fn into_profile(self, sources: Vec<SourceProfileRow>) -> Result<ReaderProfile, CoreError> {
        let preferred_format = self
            .preferred_format
            .as_deref()
            .map(FormatPreference::from_name)
            .transpose()
            .map_err(|e| corrupt_row("reader_profiles", self.id, e))?;

        Ok(ReaderProfile {
            id: self.id,
            user_id: self.user_id,
            display_name: self.display_name,
            email: self.email,
            preferred_format,
            source_profiles: sources.into_iter().map(SourceProfile::from).collect(),
        })
    }
}
