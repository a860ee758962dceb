//! [`ThreadCache`] — a bounded, short-TTL cache of each thread's recent
//! messages.
//!
//! Serves sub-millisecond differential reads so hot polling loops can skip
//! storage. Expiry is asymmetric by design: TTL is checked lazily at read
//! time only, while capacity is reclaimed eagerly at write time by evicting
//! the least-recently-written entry. A stale entry therefore still occupies
//! capacity until it is overwritten or evicted.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard, PoisonError},
  time::{Duration, Instant},
};

use palaver_core::Message;

/// Maximum age before an entry reads as a miss.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

/// Maximum number of resident thread entries.
pub const DEFAULT_CAPACITY: usize = 100;

/// Result of a cache read. A hit whose filtered message list is empty is
/// still a [`CacheRead::Hit`] — "the cache says there is no new data" and
/// "the cache has nothing at all" are different answers, and callers rely
/// on the distinction to decide whether to query storage.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheRead {
  Hit(Vec<Message>),
  Miss,
}

struct Entry {
  /// Always sorted ascending by id, no duplicates.
  messages:   Vec<Message>,
  last_write: Instant,
}

pub struct ThreadCache {
  entries:  Mutex<HashMap<i64, Entry>>,
  ttl:      Duration,
  capacity: usize,
}

impl Default for ThreadCache {
  fn default() -> Self {
    Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
  }
}

impl ThreadCache {
  pub fn new(ttl: Duration, capacity: usize) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      ttl,
      capacity,
    }
  }

  /// A poisoned lock here only means another thread panicked mid-mutation
  /// of disposable cache state; recover the guard rather than propagate.
  fn lock(&self) -> MutexGuard<'_, HashMap<i64, Entry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn normalize(messages: &mut Vec<Message>) {
    messages.sort_by_key(|m| m.id);
    messages.dedup_by_key(|m| m.id);
  }

  /// Messages of `thread_id` with `id > since_id`, ascending.
  ///
  /// Reads as [`CacheRead::Miss`] when no entry exists, the entry's age
  /// exceeds the TTL, or `since_id` lies below the cached window. An entry
  /// holds a thread's most recent messages, so it can only vouch for rows
  /// newer than its first member; answering an older cursor from it would
  /// skip the unseen rows below the window. Expired entries are left in
  /// place for the write path.
  pub fn get(&self, thread_id: i64, since_id: i64) -> CacheRead {
    let entries = self.lock();
    match entries.get(&thread_id) {
      Some(entry)
        if entry.last_write.elapsed() <= self.ttl
          && entry
            .messages
            .first()
            .map_or(true, |m| m.id <= since_id + 1) =>
      {
        CacheRead::Hit(
          entry
            .messages
            .iter()
            .filter(|m| m.id > since_id)
            .cloned()
            .collect(),
        )
      }
      _ => CacheRead::Miss,
    }
  }

  /// Replace the entry for `thread_id` wholesale and reset its age.
  ///
  /// When the cache is at capacity and `thread_id` is not already
  /// resident, the single entry with the oldest last-write timestamp is
  /// evicted first (ties broken arbitrarily).
  pub fn set(&self, thread_id: i64, mut messages: Vec<Message>) {
    Self::normalize(&mut messages);
    let mut entries = self.lock();

    if !entries.contains_key(&thread_id) && entries.len() >= self.capacity {
      let oldest = entries
        .iter()
        .min_by_key(|(_, entry)| entry.last_write)
        .map(|(id, _)| *id);
      if let Some(id) = oldest {
        entries.remove(&id);
      }
    }

    entries.insert(thread_id, Entry {
      messages,
      last_write: Instant::now(),
    });
  }

  /// Insert one message into the entry for `thread_id`, creating the entry
  /// when absent. Idempotent: returns `false` (and leaves the age
  /// untouched) when a message with the same id is already cached.
  pub fn add_message(&self, thread_id: i64, message: Message) -> bool {
    {
      let mut entries = self.lock();
      if let Some(entry) = entries.get_mut(&thread_id) {
        if entry.messages.iter().any(|m| m.id == message.id) {
          return false;
        }
        entry.messages.push(message);
        entry.messages.sort_by_key(|m| m.id);
        entry.last_write = Instant::now();
        return true;
      }
    }
    self.set(thread_id, vec![message]);
    true
  }

  /// Remove one message from the entry for `thread_id`. The age is
  /// refreshed only if the message count actually decreased.
  pub fn remove_message(&self, thread_id: i64, message_id: i64) -> bool {
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(&thread_id) else {
      return false;
    };
    let before = entry.messages.len();
    entry.messages.retain(|m| m.id != message_id);
    if entry.messages.len() < before {
      entry.last_write = Instant::now();
      true
    } else {
      false
    }
  }

  /// Drop the entry for `thread_id` unconditionally. Messages and age
  /// metadata live in the same entry, so they are removed together —
  /// removing one without the other would break the validity check.
  pub fn invalidate(&self, thread_id: i64) {
    self.lock().remove(&thread_id);
  }

  /// Drop everything; used for a global cache flush.
  pub fn clear_all(&self) {
    self.lock().clear();
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
