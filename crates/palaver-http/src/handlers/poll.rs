//! Long-poll endpoint.
//!
//! `GET /api/channels/{channel_id}/poll` holds the connection open until
//! new data exists in the requested scope or the timeout passes. The
//! response body carries exactly one of `messages`, `deleted_messages` or
//! `timeout` — never a mix.

use std::time::{Duration, Instant};

use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use palaver_core::store::ChatStore;
use palaver_live::{PollOutcome, PollRequest};
use serde::Deserialize;
use serde_json::json;

use crate::{auth::CurrentUser, error::ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct PollParams {
  pub thread_id:       Option<i64>,
  /// Cursor: highest message id the client has already seen.
  #[serde(default)]
  pub last_message_id: i64,
  /// Seconds to hold the request open. Capped by server configuration.
  pub timeout:         Option<u64>,
}

pub async fn poll<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user_id): CurrentUser,
  Path(channel_id): Path<i64>,
  Query(params): Query<PollParams>,
) -> Result<Response, ApiError>
where
  S: ChatStore + Clone + Send + Sync + 'static,
{
  let timeout = params
    .timeout
    .unwrap_or(state.config.default_poll_timeout_secs)
    .min(state.config.max_poll_timeout_secs);

  let request = PollRequest {
    channel_id,
    thread_id: params.thread_id,
    last_message_id: params.last_message_id,
    user_id,
    deadline: Instant::now() + Duration::from_secs(timeout),
  };

  // axum cancels by dropping this future, so the explicit disconnect
  // probe never fires here.
  let outcome = state.coordinator.poll(&request, || false).await?;

  Ok(match outcome {
    PollOutcome::NewMessages {
      messages,
      timestamp,
    } => Json(json!({ "messages": messages, "timestamp": timestamp }))
      .into_response(),
    PollOutcome::Deleted {
      message_ids,
      timestamp,
    } => Json(json!({
      "deleted_messages": message_ids,
      "timestamp":        timestamp,
    }))
    .into_response(),
    PollOutcome::TimedOut => {
      Json(json!({ "messages": [], "timeout": true })).into_response()
    }
    PollOutcome::Disconnected => StatusCode::NO_CONTENT.into_response(),
  })
}
