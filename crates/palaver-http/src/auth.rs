//! Bearer-token extractor.
//!
//! Authentication is a thin lookup: the token resolves to a user id
//! through the sessions table, or the request is rejected with 401.
//! Authorization (channel membership) is the handlers' concern.

use axum::{
  extract::FromRequestParts,
  http::{header, request::Parts},
};
use palaver_core::store::ChatStore;

use crate::{error::ApiError, AppState};

/// The authenticated caller. Present in a handler's arguments means the
/// bearer token was valid.
pub struct CurrentUser(pub i64);

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: ChatStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let header_val = parts
      .headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .ok_or(ApiError::Unauthorized)?;

    let token = header_val
      .strip_prefix("Bearer ")
      .ok_or(ApiError::Unauthorized)?;

    let user_id = state
      .store
      .user_for_token(token)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    Ok(CurrentUser(user_id))
  }
}
