//! Reaction types.
//!
//! Reactions come in two flavours with different deletion semantics:
//! channel reactions are hard-deleted (row presence alone means active),
//! thread reactions are soft-deleted (`deleted_at IS NULL` means active).
//! Both uphold the same invariant: at most one active record per
//! `(message, user, emoji)` tuple.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which reaction table a toggle targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
  Channel,
  Thread,
}

/// A persisted thread reaction row.
///
/// Channel reactions have no surrogate id and no `deleted_at`; they are
/// read only in aggregate, so no row type exists for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRecord {
  pub id:         i64,
  pub message_id: i64,
  pub user_id:    i64,
  pub emoji:      String,
  pub created_at: DateTime<Utc>,
  pub deleted_at: Option<DateTime<Utc>>,
}

/// The two legal results of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
  Added,
  Removed,
}

/// Active reaction counts for one emoji on one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionCount {
  pub emoji:    String,
  pub count:    i64,
  pub user_ids: Vec<i64>,
}

/// The canonical aggregate of a message's active reactions, recomputed
/// from storage after every toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionSummary {
  pub message_id: i64,
  pub reactions:  Vec<ReactionCount>,
}
