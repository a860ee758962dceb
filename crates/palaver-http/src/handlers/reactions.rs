//! Reaction toggle and summary endpoints.

use axum::{
  extract::{Path, Query, State},
  Json,
};
use palaver_core::{
  reaction::{ReactionKind, ReactionSummary},
  store::ChatStore,
  Message,
};
use palaver_live::reaction_cache_key;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{auth::CurrentUser, error::ApiError, AppState};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
  #[default]
  Toggle,
  /// Strict removal: fails when no active reaction exists.
  Remove,
}

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
  pub message_id: i64,
  pub emoji:      String,
  #[serde(default)]
  pub is_thread:  bool,
  #[serde(default)]
  pub action:     ToggleAction,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  #[serde(default)]
  pub is_thread: bool,
}

pub async fn toggle<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user_id): CurrentUser,
  Json(input): Json<ToggleBody>,
) -> Result<Json<Value>, ApiError>
where
  S: ChatStore + Clone + Send + Sync + 'static,
{
  if input.emoji.is_empty() {
    return Err(ApiError::BadRequest("emoji must not be empty".to_owned()));
  }

  let message = authorized_message(&state, input.message_id, user_id).await?;

  let kind = if input.is_thread {
    ReactionKind::Thread
  } else {
    ReactionKind::Channel
  };

  let receipt = match input.action {
    ToggleAction::Toggle => {
      state
        .engine
        .toggle(kind, message.id, user_id, &input.emoji)
        .await?
    }
    ToggleAction::Remove => {
      state
        .engine
        .remove(kind, message.id, user_id, &input.emoji)
        .await?
    }
  };

  Ok(Json(json!({
    "success":  true,
    "reaction": receipt.outcome,
    "summary":  receipt.summary,
  })))
}

/// Aggregated reactions for one message, read through the summary cache.
pub async fn summary<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user_id): CurrentUser,
  Path(message_id): Path<i64>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<ReactionSummary>, ApiError>
where
  S: ChatStore + Clone + Send + Sync + 'static,
{
  authorized_message(&state, message_id, user_id).await?;

  let kind = if params.is_thread {
    ReactionKind::Thread
  } else {
    ReactionKind::Channel
  };

  let key = reaction_cache_key(kind, message_id);
  if let Some(cached) = state.summaries.get(&key) {
    return Ok(Json(cached));
  }

  let summary = match kind {
    ReactionKind::Thread => {
      state.store.thread_message_reactions(message_id).await
    }
    ReactionKind::Channel => state.store.message_reactions(message_id).await,
  }
  .map_err(ApiError::store)?;

  state.summaries.put(key, summary.clone());
  Ok(Json(summary))
}

/// Resolve the message and require channel membership of the caller.
async fn authorized_message<S>(
  state: &AppState<S>,
  message_id: i64,
  user_id: i64,
) -> Result<Message, ApiError>
where
  S: ChatStore + Clone + Send + Sync + 'static,
{
  let message = state
    .store
    .get_message(message_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("message {message_id} not found")))?;

  let member = state
    .store
    .is_member(message.channel_id, user_id)
    .await
    .map_err(ApiError::store)?;
  if !member {
    return Err(ApiError::Forbidden(format!(
      "not a member of channel {}",
      message.channel_id
    )));
  }

  Ok(message)
}
