//! [`PollCoordinator`] — holds one logical request open until new data is
//! observably available or the deadline passes.
//!
//! Each client poll is one task blocking only on sleep and storage-call
//! boundaries. The retry cadence is fixed, not backed off: total iterations
//! are bounded by `deadline / interval`, which caps storage load per held
//! connection while keeping worst-case delivery latency at one interval.

use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use palaver_core::{message::Scope, store::ChatStore, Message};

use crate::{
  cache::{CacheRead, ThreadCache},
  error::PollError,
  notify::DeletionLog,
};

/// Fixed retry cadence of the wait loop.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Maximum rows returned per poll.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Window of recent thread messages loaded on a cache refill.
const CACHE_FILL_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct PollConfig {
  pub interval:   Duration,
  pub batch_size: usize,
}

impl Default for PollConfig {
  fn default() -> Self {
    Self {
      interval:   DEFAULT_INTERVAL,
      batch_size: DEFAULT_BATCH_SIZE,
    }
  }
}

/// One logical client request. The deadline is wall-clock, computed once
/// at request entry; there are no retry-after-deadline semantics.
#[derive(Debug, Clone)]
pub struct PollRequest {
  pub channel_id:      i64,
  pub thread_id:       Option<i64>,
  /// Cursor: only rows with a larger id are returned.
  pub last_message_id: i64,
  pub user_id:         i64,
  pub deadline:        Instant,
}

impl PollRequest {
  pub fn scope(&self) -> Scope {
    match self.thread_id {
      Some(thread_id) => Scope::Thread(thread_id),
      None => Scope::Channel(self.channel_id),
    }
  }
}

/// Terminal states of a poll. New messages outrank deletion notices when
/// both exist in one iteration — they carry more actionable information.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
  NewMessages {
    messages:  Vec<Message>,
    timestamp: DateTime<Utc>,
  },
  Deleted {
    message_ids: Vec<i64>,
    timestamp:   DateTime<Utc>,
  },
  /// Deadline reached with nothing to report.
  TimedOut,
  /// The caller went away mid-wait; no response body is needed.
  Disconnected,
}

pub struct PollCoordinator<S> {
  store:     Arc<S>,
  cache:     Arc<ThreadCache>,
  deletions: Arc<DeletionLog>,
  config:    PollConfig,
}

impl<S: ChatStore> PollCoordinator<S> {
  pub fn new(
    store: Arc<S>,
    cache: Arc<ThreadCache>,
    deletions: Arc<DeletionLog>,
    config: PollConfig,
  ) -> Self {
    Self {
      store,
      cache,
      deletions,
      config,
    }
  }

  /// Block until new messages appear in the requested scope, a deletion
  /// notice is pending, the client disconnects, or the deadline passes.
  ///
  /// `disconnected` is probed once per idle iteration; it is the only
  /// cancellation mechanism — a storage call already in flight completes
  /// before the next probe. Callers whose transport cancels by dropping
  /// the future can pass `|| false`.
  pub async fn poll(
    &self,
    request: &PollRequest,
    disconnected: impl Fn() -> bool + Send,
  ) -> Result<PollOutcome, PollError> {
    if request.channel_id <= 0 {
      return Err(PollError::InvalidRequest(
        "channel_id must be positive".to_owned(),
      ));
    }
    if request.last_message_id < 0 {
      return Err(PollError::InvalidRequest(
        "last_message_id must not be negative".to_owned(),
      ));
    }
    if request.thread_id.is_some_and(|id| id <= 0) {
      return Err(PollError::InvalidRequest(
        "thread_id must be positive".to_owned(),
      ));
    }

    // Membership is checked once, not per iteration.
    let member = self
      .store
      .is_member(request.channel_id, request.user_id)
      .await
      .map_err(PollError::store)?;
    if !member {
      return Err(PollError::NotMember {
        channel_id: request.channel_id,
        user_id:    request.user_id,
      });
    }

    let scope = request.scope();

    while Instant::now() < request.deadline {
      let fresh = self.fetch_new(scope, request.last_message_id).await?;
      if !fresh.is_empty() {
        tracing::debug!(
          scope = ?scope,
          count = fresh.len(),
          "poll returning new messages"
        );
        return Ok(PollOutcome::NewMessages {
          messages:  fresh,
          timestamp: Utc::now(),
        });
      }

      if let Some(message_ids) = self.deletions.drain(scope) {
        tracing::debug!(scope = ?scope, count = message_ids.len(), "poll returning deletions");
        return Ok(PollOutcome::Deleted {
          message_ids,
          timestamp: Utc::now(),
        });
      }

      if disconnected() {
        return Ok(PollOutcome::Disconnected);
      }

      let remaining = request.deadline.saturating_duration_since(Instant::now());
      tokio::time::sleep(self.config.interval.min(remaining)).await;
    }

    Ok(PollOutcome::TimedOut)
  }

  /// One differential read. Thread scope consults the cache first; a hit
  /// — even an empty one — is authoritative for the iteration, since the
  /// write path keeps the cache fresh and the cache only reports a hit
  /// when its window reaches back to the cursor. A miss refills the cache
  /// with the recent window; when even that window starts above the
  /// cursor, the backlog is paged straight from storage so old unseen
  /// rows are never skipped.
  async fn fetch_new(
    &self,
    scope: Scope,
    after_id: i64,
  ) -> Result<Vec<Message>, PollError> {
    if let Scope::Thread(thread_id) = scope {
      match self.cache.get(thread_id, after_id) {
        CacheRead::Hit(mut messages) => {
          messages.truncate(self.config.batch_size);
          return Ok(messages);
        }
        CacheRead::Miss => {
          let recent = self
            .store
            .thread_messages(thread_id, CACHE_FILL_SIZE)
            .await
            .map_err(PollError::store)?;
          // A short window holds the whole thread; a full one answers
          // the cursor only when it reaches back to it.
          let covered = recent.len() < CACHE_FILL_SIZE
            || recent.first().map_or(true, |m| m.id <= after_id + 1);
          self.cache.set(thread_id, recent.clone());
          if covered {
            return Ok(
              recent
                .into_iter()
                .filter(|m| m.id > after_id)
                .take(self.config.batch_size)
                .collect(),
            );
          }
        }
      }
    }

    self
      .store
      .messages_after(scope, after_id, self.config.batch_size)
      .await
      .map_err(PollError::store)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
