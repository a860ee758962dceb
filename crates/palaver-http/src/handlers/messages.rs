//! Message creation and deletion.
//!
//! These are the write paths that feed the live layer: a thread reply is
//! pushed into the thread cache so in-flight polls see it without touching
//! storage, and a deletion lands in the deletion log for pollers to drain.

use axum::{
  extract::{Path, State},
  http::StatusCode,
  Json,
};
use palaver_core::{message::NewMessage, store::ChatStore, Message};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{auth::CurrentUser, error::ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateMessage {
  pub channel_id: i64,
  pub thread_id:  Option<i64>,
  pub body:       String,
}

pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user_id): CurrentUser,
  Json(input): Json<CreateMessage>,
) -> Result<(StatusCode, Json<Message>), ApiError>
where
  S: ChatStore + Clone + Send + Sync + 'static,
{
  if input.channel_id <= 0 {
    return Err(ApiError::BadRequest(
      "channel_id must be positive".to_owned(),
    ));
  }
  if input.body.trim().is_empty() {
    return Err(ApiError::BadRequest("body must not be empty".to_owned()));
  }

  let member = state
    .store
    .is_member(input.channel_id, user_id)
    .await
    .map_err(ApiError::store)?;
  if !member {
    return Err(ApiError::Forbidden(format!(
      "not a member of channel {}",
      input.channel_id
    )));
  }

  let message = state
    .store
    .post_message(NewMessage {
      channel_id: input.channel_id,
      thread_id:  input.thread_id,
      author_id:  user_id,
      body:       input.body,
    })
    .await
    .map_err(ApiError::store)?;

  if let Some(thread_id) = message.thread_id {
    state.cache.add_message(thread_id, message.clone());
  }

  Ok((StatusCode::CREATED, Json(message)))
}

pub async fn delete<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user_id): CurrentUser,
  Path(message_id): Path<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: ChatStore + Clone + Send + Sync + 'static,
{
  let message = state
    .store
    .get_message(message_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("message {message_id} not found")))?;

  if message.author_id != user_id {
    return Err(ApiError::Forbidden(
      "only the author may delete a message".to_owned(),
    ));
  }

  let deleted = state
    .store
    .delete_message(message_id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!(
      "message {message_id} already deleted"
    )));
  }

  state.deletions.push(message.scope(), message_id);
  if let Some(thread_id) = message.thread_id {
    state.cache.remove_message(thread_id, message_id);
  }

  Ok(Json(json!({ "success": true })))
}
