//! Generic key-value cache port.
//!
//! The live path only ever *invalidates* through this trait — it never
//! reads. Outer layers may read and populate it (e.g. to serve cached
//! reaction summaries), which is why [`MemoryCache`] also offers `get` and
//! `put`.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard, PoisonError},
  time::{Duration, Instant},
};

/// Delete-by-key side-effect port consumed by the reaction engine.
pub trait InvalidationCache: Send + Sync {
  fn remove(&self, key: &str);
}

/// In-process TTL'd key-value cache.
pub struct MemoryCache<V> {
  entries: Mutex<HashMap<String, (V, Instant)>>,
  ttl:     Duration,
}

impl<V: Clone + Send> MemoryCache<V> {
  pub fn new(ttl: Duration) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      ttl,
    }
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, (V, Instant)>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn get(&self, key: &str) -> Option<V> {
    let mut entries = self.lock();
    match entries.get(key) {
      Some((value, written)) if written.elapsed() <= self.ttl => {
        Some(value.clone())
      }
      Some(_) => {
        entries.remove(key);
        None
      }
      None => None,
    }
  }

  pub fn put(&self, key: impl Into<String>, value: V) {
    self.lock().insert(key.into(), (value, Instant::now()));
  }
}

impl<V: Clone + Send> InvalidationCache for MemoryCache<V> {
  fn remove(&self, key: &str) {
    self.lock().remove(key);
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
