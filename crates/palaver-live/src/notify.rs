//! [`DeletionLog`] — the transient per-scope list of recently deleted
//! message ids.
//!
//! Lets pollers learn about deletions without re-querying storage. Entries
//! are read-once: the first poller that observes a scope's list drains it.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard, PoisonError},
};

use palaver_core::Scope;

/// Oldest ids are trimmed first once a scope's list exceeds this.
pub const MAX_PENDING_DELETIONS: usize = 10;

#[derive(Default)]
pub struct DeletionLog {
  entries: Mutex<HashMap<Scope, Vec<i64>>>,
}

impl DeletionLog {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<Scope, Vec<i64>>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Record a deletion for `scope`, trimming FIFO beyond the cap.
  pub fn push(&self, scope: Scope, message_id: i64) {
    let mut entries = self.lock();
    let list = entries.entry(scope).or_default();
    list.push(message_id);
    while list.len() > MAX_PENDING_DELETIONS {
      list.remove(0);
    }
  }

  /// Remove and return the pending deletions for `scope`, if any.
  pub fn drain(&self, scope: Scope) -> Option<Vec<i64>> {
    self.lock().remove(&scope)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
