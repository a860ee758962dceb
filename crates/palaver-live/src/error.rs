//! Error types for `palaver-live`.
//!
//! Storage failures are boxed rather than parameterised so the error types
//! stay independent of any concrete backend. A storage failure is always a
//! distinct outcome from "no new data yet" — it aborts the operation and is
//! surfaced, never masked as an empty result.

use thiserror::Error;

type BoxedStoreError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum PollError {
  /// Malformed request parameters. Fails fast, no retry.
  #[error("invalid poll request: {0}")]
  InvalidRequest(String),

  /// The caller is not a member of the requested channel. Fails fast.
  #[error("user {user_id} is not a member of channel {channel_id}")]
  NotMember { channel_id: i64, user_id: i64 },

  /// A storage query failed mid-poll. The whole wait aborts; the caller
  /// may retry the request.
  #[error("store error: {0}")]
  Store(#[source] BoxedStoreError),
}

impl PollError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    PollError::Store(Box::new(e))
  }
}

#[derive(Debug, Error)]
pub enum ToggleError {
  #[error("message not found: {0}")]
  MessageNotFound(i64),

  /// Asked to remove a reaction that was never active — client and server
  /// state have diverged. Reported, not retried.
  #[error("no active reaction to remove")]
  RemovalTargetMissing,

  #[error("store error: {0}")]
  Store(#[source] BoxedStoreError),
}

impl ToggleError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    ToggleError::Store(Box::new(e))
  }
}
