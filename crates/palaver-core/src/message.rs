//! Message and scope types.
//!
//! A message's `id` is assigned by storage and is strictly increasing in
//! insertion order. Clients hand their last-seen id back as a cursor to
//! request only newer rows; every differential read in the system keys off
//! that ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The conversation a read or a deletion notice targets: a top-level
/// channel, or a reply thread rooted at a parent message.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum Scope {
  Channel(i64),
  Thread(i64),
}

impl Scope {
  /// The raw channel or thread id inside the scope.
  pub fn id(&self) -> i64 {
    match *self {
      Scope::Channel(id) | Scope::Thread(id) => id,
    }
  }
}

/// A persisted chat message.
///
/// `deleted_at` implements soft deletion: the row stays in storage but is
/// excluded from reads once the timestamp is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
  pub id:         i64,
  pub channel_id: i64,
  /// Parent message id when this message is a thread reply; `None` for
  /// top-level channel messages.
  pub thread_id:  Option<i64>,
  pub author_id:  i64,
  pub body:       String,
  pub created_at: DateTime<Utc>,
  pub deleted_at: Option<DateTime<Utc>>,
}

impl Message {
  /// The scope this message belongs to for polling and deletion notices.
  pub fn scope(&self) -> Scope {
    match self.thread_id {
      Some(thread_id) => Scope::Thread(thread_id),
      None => Scope::Channel(self.channel_id),
    }
  }
}

/// Input for posting a message; `id` and `created_at` are store-assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
  pub channel_id: i64,
  pub thread_id:  Option<i64>,
  pub author_id:  i64,
  pub body:       String,
}
