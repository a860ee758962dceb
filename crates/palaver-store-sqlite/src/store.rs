//! [`SqliteStore`] — the SQLite implementation of [`ChatStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use palaver_core::{
  message::{Message, NewMessage, Scope},
  reaction::{ReactionCount, ReactionRecord, ReactionSummary, ToggleOutcome},
  store::ChatStore,
};

use crate::{
  encode::{encode_dt, RawMessage, RawReaction},
  schema::SCHEMA,
  Error, Result,
};

const MESSAGE_COLUMNS: &str =
  "message_id, channel_id, thread_id, author_id, body, created_at, deleted_at";

fn raw_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMessage> {
  Ok(RawMessage {
    message_id: row.get(0)?,
    channel_id: row.get(1)?,
    thread_id:  row.get(2)?,
    author_id:  row.get(3)?,
    body:       row.get(4)?,
    created_at: row.get(5)?,
    deleted_at: row.get(6)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Palaver chat store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// funnel through one connection thread, so statements from concurrent
/// tasks never interleave mid-operation.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Aggregate `(emoji, user_id)` pairs into per-emoji counts, preserving
  /// the emoji ordering of the query.
  fn summarize(message_id: i64, pairs: Vec<(String, i64)>) -> ReactionSummary {
    let mut reactions: Vec<ReactionCount> = Vec::new();
    for (emoji, user_id) in pairs {
      match reactions.last_mut() {
        Some(last) if last.emoji == emoji => {
          last.count += 1;
          last.user_ids.push(user_id);
        }
        _ => reactions.push(ReactionCount {
          emoji,
          count: 1,
          user_ids: vec![user_id],
        }),
      }
    }
    ReactionSummary { message_id, reactions }
  }
}

// ─── ChatStore impl ──────────────────────────────────────────────────────────

impl ChatStore for SqliteStore {
  type Error = Error;

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn post_message(&self, input: NewMessage) -> Result<Message> {
    let created_at = Utc::now();
    let at_str     = encode_dt(created_at);
    let channel_id = input.channel_id;
    let thread_id  = input.thread_id;
    let author_id  = input.author_id;
    let body       = input.body.clone();

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM channels WHERE channel_id = ?1",
            rusqlite::params![channel_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok(None);
        }

        conn.execute(
          "INSERT INTO messages (channel_id, thread_id, author_id, body, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![channel_id, thread_id, author_id, body, at_str],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let id = id.ok_or(Error::ChannelNotFound(input.channel_id))?;

    Ok(Message {
      id,
      channel_id: input.channel_id,
      thread_id:  input.thread_id,
      author_id:  input.author_id,
      body:       input.body,
      created_at,
      deleted_at: None,
    })
  }

  async fn get_message(&self, id: i64) -> Result<Option<Message>> {
    let raw: Option<RawMessage> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = ?1"),
              rusqlite::params![id],
              raw_message,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMessage::into_message).transpose()
  }

  async fn messages_after(
    &self,
    scope: Scope,
    after_id: i64,
    limit: usize,
  ) -> Result<Vec<Message>> {
    let limit = limit as i64;
    let (sql, scope_id) = match scope {
      Scope::Channel(id) => (
        format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE channel_id = ?1 AND thread_id IS NULL
             AND message_id > ?2 AND deleted_at IS NULL
           ORDER BY message_id ASC LIMIT ?3"
        ),
        id,
      ),
      Scope::Thread(id) => (
        format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE thread_id = ?1
             AND message_id > ?2 AND deleted_at IS NULL
           ORDER BY message_id ASC LIMIT ?3"
        ),
        id,
      ),
    };

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![scope_id, after_id, limit], raw_message)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn thread_messages(&self, thread_id: i64, limit: usize) -> Result<Vec<Message>> {
    let limit = limit as i64;

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        // Newest N rows, re-ordered ascending for the caller.
        let mut stmt = conn.prepare(&format!(
          "SELECT {MESSAGE_COLUMNS} FROM (
             SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE thread_id = ?1 AND deleted_at IS NULL
             ORDER BY message_id DESC LIMIT ?2
           ) ORDER BY message_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![thread_id, limit], raw_message)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn delete_message(&self, id: i64) -> Result<bool> {
    let at_str = encode_dt(Utc::now());

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE messages SET deleted_at = ?1
           WHERE message_id = ?2 AND deleted_at IS NULL",
          rusqlite::params![at_str, id],
        )?)
      })
      .await?;

    Ok(affected > 0)
  }

  // ── Channels, membership, sessions ────────────────────────────────────────

  async fn create_channel(&self, name: &str) -> Result<i64> {
    let name   = name.to_owned();
    let at_str = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO channels (name, created_at) VALUES (?1, ?2)",
          rusqlite::params![name, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(id)
  }

  async fn add_member(&self, channel_id: i64, user_id: i64) -> Result<()> {
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO channel_members (channel_id, user_id, joined_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![channel_id, user_id, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn is_member(&self, channel_id: i64, user_id: i64) -> Result<bool> {
    let member: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM channel_members WHERE channel_id = ?1 AND user_id = ?2",
              rusqlite::params![channel_id, user_id],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(member)
  }

  async fn create_session(&self, user_id: i64) -> Result<String> {
    let token  = Uuid::new_v4().to_string();
    let stored = token.clone();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![stored, user_id, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(token)
  }

  async fn user_for_token(&self, token: &str) -> Result<Option<i64>> {
    let token = token.to_owned();

    let user_id: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id FROM sessions WHERE token = ?1",
              rusqlite::params![token],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(user_id)
  }

  // ── Reactions ─────────────────────────────────────────────────────────────

  async fn toggle_channel_reaction(
    &self,
    message_id: i64,
    user_id: i64,
    emoji: &str,
  ) -> Result<ToggleOutcome> {
    let emoji  = emoji.to_owned();
    let at_str = encode_dt(Utc::now());

    // Atomic by construction: both statements run back to back on the
    // single connection thread, so no other toggle can interleave.
    let outcome = self
      .conn
      .call(move |conn| {
        let deleted = conn.execute(
          "DELETE FROM channel_reactions
           WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
          rusqlite::params![message_id, user_id, emoji],
        )?;

        if deleted > 0 {
          return Ok(ToggleOutcome::Removed);
        }

        // OR IGNORE keeps the lenient idempotency of the original
        // behaviour: a duplicate insert still reports Added.
        conn.execute(
          "INSERT OR IGNORE INTO channel_reactions (message_id, user_id, emoji, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![message_id, user_id, emoji, at_str],
        )?;
        Ok(ToggleOutcome::Added)
      })
      .await?;

    Ok(outcome)
  }

  async fn toggle_thread_reaction(
    &self,
    message_id: i64,
    user_id: i64,
    emoji: &str,
  ) -> Result<ToggleOutcome> {
    let emoji  = emoji.to_owned();
    let at_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        // All three branches run inside one transaction; dropping the
        // transaction without commit rolls back on any error.
        let tx = conn.transaction()?;

        let existing: Option<(i64, Option<String>)> = tx
          .query_row(
            "SELECT reaction_id, deleted_at FROM thread_reactions
             WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
            rusqlite::params![message_id, user_id, emoji],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;

        let outcome = match existing {
          None => {
            tx.execute(
              "INSERT INTO thread_reactions (message_id, user_id, emoji, created_at)
               VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![message_id, user_id, emoji, at_str],
            )?;
            ToggleOutcome::Added
          }
          Some((reaction_id, None)) => {
            tx.execute(
              "UPDATE thread_reactions SET deleted_at = ?1 WHERE reaction_id = ?2",
              rusqlite::params![at_str, reaction_id],
            )?;
            ToggleOutcome::Removed
          }
          Some((reaction_id, Some(_))) => {
            tx.execute(
              "UPDATE thread_reactions SET deleted_at = NULL, created_at = ?1
               WHERE reaction_id = ?2",
              rusqlite::params![at_str, reaction_id],
            )?;
            ToggleOutcome::Added
          }
        };

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  async fn remove_channel_reaction(
    &self,
    message_id: i64,
    user_id: i64,
    emoji: &str,
  ) -> Result<bool> {
    let emoji = emoji.to_owned();

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM channel_reactions
           WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
          rusqlite::params![message_id, user_id, emoji],
        )?)
      })
      .await?;

    Ok(affected > 0)
  }

  async fn remove_thread_reaction(
    &self,
    message_id: i64,
    user_id: i64,
    emoji: &str,
  ) -> Result<bool> {
    let emoji  = emoji.to_owned();
    let at_str = encode_dt(Utc::now());

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE thread_reactions SET deleted_at = ?1
           WHERE message_id = ?2 AND user_id = ?3 AND emoji = ?4
             AND deleted_at IS NULL",
          rusqlite::params![at_str, message_id, user_id, emoji],
        )?)
      })
      .await?;

    Ok(affected > 0)
  }

  async fn get_thread_reaction(
    &self,
    message_id: i64,
    user_id: i64,
    emoji: &str,
  ) -> Result<Option<ReactionRecord>> {
    let emoji = emoji.to_owned();

    let raw: Option<RawReaction> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT reaction_id, message_id, user_id, emoji, created_at, deleted_at
               FROM thread_reactions
               WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
              rusqlite::params![message_id, user_id, emoji],
              |row| {
                Ok(RawReaction {
                  reaction_id: row.get(0)?,
                  message_id:  row.get(1)?,
                  user_id:     row.get(2)?,
                  emoji:       row.get(3)?,
                  created_at:  row.get(4)?,
                  deleted_at:  row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReaction::into_record).transpose()
  }

  async fn message_reactions(&self, message_id: i64) -> Result<ReactionSummary> {
    let pairs: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT emoji, user_id FROM channel_reactions
           WHERE message_id = ?1
           ORDER BY emoji, created_at, user_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![message_id], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(Self::summarize(message_id, pairs))
  }

  async fn thread_message_reactions(&self, message_id: i64) -> Result<ReactionSummary> {
    let pairs: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT emoji, user_id FROM thread_reactions
           WHERE message_id = ?1 AND deleted_at IS NULL
           ORDER BY emoji, created_at, user_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![message_id], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(Self::summarize(message_id, pairs))
  }
}

#[cfg(test)]
impl SqliteStore {
  /// Raw row count for a reaction tuple, ignoring deletion state.
  pub(crate) async fn count_reaction_rows(
    &self,
    table: &'static str,
    message_id: i64,
    user_id: i64,
    emoji: &str,
  ) -> Result<i64> {
    let emoji = emoji.to_owned();
    let count = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "SELECT COUNT(*) FROM {table}
             WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3"
          ),
          rusqlite::params![message_id, user_id, emoji],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count)
  }
}
