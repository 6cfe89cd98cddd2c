//! Repository for `reader_profiles` and `reader_source_profiles`.

use shelfmark_core::types::DbId;
use sqlx::PgPool;

use crate::models::reader::{ReaderProfileRow, SourceProfileRow};

const PROFILE_COLUMNS: &str = "id, user_id, display_name, email, preferred_format";

const SOURCE_COLUMNS: &str = "id, reader_profile_id, label, created_at";

pub struct ReaderProfileRepo;

impl ReaderProfileRepo {
    /// Find the reader profile belonging to a user account.
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<ReaderProfileRow>, sqlx::Error> {
        let query = format!("SELECT {PROFILE_COLUMNS} FROM reader_profiles WHERE user_id = $1");
        sqlx::query_as::<_, ReaderProfileRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// A reader's linked content-source profiles in registration order.
    pub async fn list_source_profiles(
        pool: &PgPool,
        reader_profile_id: DbId,
    ) -> Result<Vec<SourceProfileRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SOURCE_COLUMNS} FROM reader_source_profiles
             WHERE reader_profile_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, SourceProfileRow>(&query)
            .bind(reader_profile_id)
            .fetch_all(pool)
            .await
    }
}
