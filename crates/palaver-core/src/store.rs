//! The `ChatStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `palaver-store-sqlite`).
//! Higher layers (`palaver-live`, `palaver-http`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use crate::{
  message::{Message, NewMessage, Scope},
  reaction::{ReactionRecord, ReactionSummary, ToggleOutcome},
};

/// Abstraction over a Palaver storage backend.
///
/// Message ids are store-assigned, strictly increasing, and never reused —
/// they double as the cursor for differential reads. The thread-reaction
/// toggle must run its three-way branch inside a single transaction; the
/// channel-reaction toggle is atomic by construction (single statement).
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ChatStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Messages ──────────────────────────────────────────────────────────

  /// Persist a new message. The id and `created_at` are store-assigned.
  fn post_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  /// Retrieve a message by id, including soft-deleted rows.
  fn get_message(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send + '_;

  /// Non-deleted messages in `scope` with `id > after_id`, ascending,
  /// capped at `limit`. Channel scope excludes thread replies.
  fn messages_after(
    &self,
    scope: Scope,
    after_id: i64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// The most recent non-deleted messages of a thread, ascending by id.
  /// Used to refill the thread cache after a miss.
  fn thread_messages(
    &self,
    thread_id: i64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// Soft-delete a message. Returns `false` if the message does not exist
  /// or is already deleted.
  fn delete_message(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Channels, membership, sessions ────────────────────────────────────

  /// Create a channel and return its id.
  fn create_channel<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + 'a;

  /// Add a user to a channel. Idempotent.
  fn add_member(
    &self,
    channel_id: i64,
    user_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Whether `user_id` is a member of `channel_id`.
  fn is_member(
    &self,
    channel_id: i64,
    user_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Issue a fresh session token for a user.
  fn create_session(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Resolve a bearer token to a user id. `None` means unauthenticated.
  fn user_for_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + 'a;

  // ── Reactions ─────────────────────────────────────────────────────────

  /// Toggle a channel reaction (hard-delete flavour): delete the row if it
  /// exists, otherwise insert it. A duplicate insert is treated as
  /// `Added` — the row is already in the desired state.
  fn toggle_channel_reaction<'a>(
    &'a self,
    message_id: i64,
    user_id: i64,
    emoji: &'a str,
  ) -> impl Future<Output = Result<ToggleOutcome, Self::Error>> + Send + 'a;

  /// Toggle a thread reaction (soft-delete flavour) inside a single
  /// transaction: no row → insert active; active row → set `deleted_at`;
  /// soft-deleted row → clear `deleted_at` and refresh `created_at`,
  /// preserving the row identity. Any failure rolls back.
  fn toggle_thread_reaction<'a>(
    &'a self,
    message_id: i64,
    user_id: i64,
    emoji: &'a str,
  ) -> impl Future<Output = Result<ToggleOutcome, Self::Error>> + Send + 'a;

  /// Remove a channel reaction if active. Returns `false` when there was
  /// nothing to remove.
  fn remove_channel_reaction<'a>(
    &'a self,
    message_id: i64,
    user_id: i64,
    emoji: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Soft-delete a thread reaction if active. Returns `false` when there
  /// was nothing to remove.
  fn remove_thread_reaction<'a>(
    &'a self,
    message_id: i64,
    user_id: i64,
    emoji: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// The thread reaction row for a tuple, active or soft-deleted.
  fn get_thread_reaction<'a>(
    &'a self,
    message_id: i64,
    user_id: i64,
    emoji: &'a str,
  ) -> impl Future<Output = Result<Option<ReactionRecord>, Self::Error>> + Send + 'a;

  /// Canonical aggregate of a message's channel reactions.
  fn message_reactions(
    &self,
    message_id: i64,
  ) -> impl Future<Output = Result<ReactionSummary, Self::Error>> + Send + '_;

  /// Canonical aggregate of a message's active thread reactions.
  fn thread_message_reactions(
    &self,
    message_id: i64,
  ) -> impl Future<Output = Result<ReactionSummary, Self::Error>> + Send + '_;
}
