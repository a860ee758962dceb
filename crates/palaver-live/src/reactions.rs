//! [`ReactionEngine`] — the toggle state machine plus its post-commit
//! side-effects.
//!
//! The durable state transition happens entirely inside the store (the
//! thread flavour inside a transaction). What lives here is the
//! orchestration around it: cache invalidation, summary recompute, and the
//! notification event — all best-effort, because the caches are never a
//! source of truth.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use palaver_core::{
  reaction::{ReactionKind, ReactionSummary, ToggleOutcome},
  store::ChatStore,
  Message,
};

use crate::{cache::ThreadCache, error::ToggleError, kv::InvalidationCache};

/// Key under which a message's aggregated reactions live in the generic
/// cache. The two flavours aggregate different tables, so each gets its
/// own key — sharing one would let a cached channel summary answer a
/// thread read.
pub fn reaction_cache_key(kind: ReactionKind, message_id: i64) -> String {
  match kind {
    ReactionKind::Channel => format!("message_reactions:{message_id}"),
    ReactionKind::Thread => format!("thread_message_reactions:{message_id}"),
  }
}

/// Event emitted after every successful toggle, consumed by downstream
/// transport (push/broadcast — outside this crate).
#[derive(Debug, Clone)]
pub struct ReactionUpdate {
  pub message_id: i64,
  pub summary:    ReactionSummary,
  pub is_thread:  bool,
  pub timestamp:  DateTime<Utc>,
}

/// Output port for reaction updates.
pub trait ReactionNotifier: Send + Sync {
  fn notify_reaction_update(&self, update: ReactionUpdate);
}

/// Discards every update. For tools and tests that have no transport.
pub struct NoopNotifier;

impl ReactionNotifier for NoopNotifier {
  fn notify_reaction_update(&self, _update: ReactionUpdate) {}
}

/// What a successful toggle hands back to the caller.
#[derive(Debug, Clone)]
pub struct ToggleReceipt {
  pub outcome: ToggleOutcome,
  /// `None` when the post-commit recompute failed — the toggle itself
  /// still succeeded and the caches stay eventually consistent.
  pub summary: Option<ReactionSummary>,
}

pub struct ReactionEngine<S> {
  store:    Arc<S>,
  cache:    Arc<ThreadCache>,
  kv:       Arc<dyn InvalidationCache>,
  notifier: Arc<dyn ReactionNotifier>,
}

impl<S: ChatStore> ReactionEngine<S> {
  pub fn new(
    store: Arc<S>,
    cache: Arc<ThreadCache>,
    kv: Arc<dyn InvalidationCache>,
    notifier: Arc<dyn ReactionNotifier>,
  ) -> Self {
    Self {
      store,
      cache,
      kv,
      notifier,
    }
  }

  /// Flip the reaction state for `(message_id, user_id, emoji)`.
  pub async fn toggle(
    &self,
    kind: ReactionKind,
    message_id: i64,
    user_id: i64,
    emoji: &str,
  ) -> Result<ToggleReceipt, ToggleError> {
    let message = self.message(message_id).await?;

    let outcome = match kind {
      ReactionKind::Channel => self
        .store
        .toggle_channel_reaction(message_id, user_id, emoji)
        .await
        .map_err(ToggleError::store)?,
      ReactionKind::Thread => self
        .store
        .toggle_thread_reaction(message_id, user_id, emoji)
        .await
        .map_err(ToggleError::store)?,
    };

    let summary = self.after_write(kind, &message).await;
    Ok(ToggleReceipt { outcome, summary })
  }

  /// Explicitly remove an active reaction. Unlike [`toggle`](Self::toggle),
  /// a tuple that was never active is an error: the client believes a
  /// reaction exists that the server never saw.
  pub async fn remove(
    &self,
    kind: ReactionKind,
    message_id: i64,
    user_id: i64,
    emoji: &str,
  ) -> Result<ToggleReceipt, ToggleError> {
    let message = self.message(message_id).await?;

    let removed = match kind {
      ReactionKind::Channel => self
        .store
        .remove_channel_reaction(message_id, user_id, emoji)
        .await
        .map_err(ToggleError::store)?,
      ReactionKind::Thread => self
        .store
        .remove_thread_reaction(message_id, user_id, emoji)
        .await
        .map_err(ToggleError::store)?,
    };
    if !removed {
      return Err(ToggleError::RemovalTargetMissing);
    }

    let summary = self.after_write(kind, &message).await;
    Ok(ToggleReceipt {
      outcome: ToggleOutcome::Removed,
      summary,
    })
  }

  async fn message(&self, message_id: i64) -> Result<Message, ToggleError> {
    self
      .store
      .get_message(message_id)
      .await
      .map_err(ToggleError::store)?
      .ok_or(ToggleError::MessageNotFound(message_id))
  }

  /// Post-commit bookkeeping. The toggle is already durable, so nothing
  /// here may fail it; a summary recompute failure is logged and reported
  /// as `None`.
  async fn after_write(
    &self,
    kind: ReactionKind,
    message: &Message,
  ) -> Option<ReactionSummary> {
    match message.thread_id {
      Some(thread_id) => self.cache.invalidate(thread_id),
      // A thread reaction on a top-level message: the message is itself
      // the thread root.
      None if kind == ReactionKind::Thread => self.cache.invalidate(message.id),
      None => {}
    }
    self.kv.remove(&reaction_cache_key(kind, message.id));

    let summary = match kind {
      ReactionKind::Channel => self.store.message_reactions(message.id).await,
      ReactionKind::Thread => self.store.thread_message_reactions(message.id).await,
    };

    match summary {
      Ok(summary) => {
        self.notifier.notify_reaction_update(ReactionUpdate {
          message_id: message.id,
          summary:    summary.clone(),
          is_thread:  kind == ReactionKind::Thread,
          timestamp:  Utc::now(),
        });
        Some(summary)
      }
      Err(e) => {
        tracing::warn!(
          message_id = message.id,
          error = %e,
          "reaction summary recompute failed after toggle"
        );
        None
      }
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
