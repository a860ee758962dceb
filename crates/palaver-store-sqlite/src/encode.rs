//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings; ids are plain integers.

use chrono::{DateTime, Utc};
use palaver_core::{Message, ReactionRecord};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `messages` row.
pub struct RawMessage {
  pub message_id: i64,
  pub channel_id: i64,
  pub thread_id:  Option<i64>,
  pub author_id:  i64,
  pub body:       String,
  pub created_at: String,
  pub deleted_at: Option<String>,
}

impl RawMessage {
  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      id:         self.message_id,
      channel_id: self.channel_id,
      thread_id:  self.thread_id,
      author_id:  self.author_id,
      body:       self.body,
      created_at: decode_dt(&self.created_at)?,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read directly from a `thread_reactions` row.
pub struct RawReaction {
  pub reaction_id: i64,
  pub message_id:  i64,
  pub user_id:     i64,
  pub emoji:       String,
  pub created_at:  String,
  pub deleted_at:  Option<String>,
}

impl RawReaction {
  pub fn into_record(self) -> Result<ReactionRecord> {
    Ok(ReactionRecord {
      id:         self.reaction_id,
      message_id: self.message_id,
      user_id:    self.user_id,
      emoji:      self.emoji,
      created_at: decode_dt(&self.created_at)?,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
