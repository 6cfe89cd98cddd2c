//! Role-based access control (RBAC) extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use shelfmark_core::error::CoreError;
use shelfmark_core::roles::{ROLE_ADMIN, ROLE_READER};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `reader` or `admin` role. Rejects with 403 Forbidden
/// otherwise.
///
/// ```ignore
/// async fn queue_only(RequireReader(user): RequireReader) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireReader(pub AuthUser);

impl FromRequestParts<AppState> for RequireReader {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_READER && user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Reader role required".into(),
            )));
        }
        Ok(RequireReader(user))
    }
}
