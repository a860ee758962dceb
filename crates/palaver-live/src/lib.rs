//! Live-update core for Palaver.
//!
//! Everything a client perceives as "real time" lives here: the bounded
//! short-TTL [`ThreadCache`], the read-once [`DeletionLog`], the blocking
//! [`PollCoordinator`], and the [`ReactionEngine`]. All of it is
//! process-local, derived state — losing it only forces a fallback to a
//! direct storage read, never data loss.

pub mod cache;
pub mod error;
pub mod kv;
pub mod notify;
pub mod poll;
pub mod reactions;

pub use cache::{CacheRead, ThreadCache};
pub use error::{PollError, ToggleError};
pub use kv::{InvalidationCache, MemoryCache};
pub use notify::DeletionLog;
pub use poll::{PollConfig, PollCoordinator, PollOutcome, PollRequest};
pub use reactions::{
  reaction_cache_key, NoopNotifier, ReactionEngine, ReactionNotifier,
  ReactionUpdate, ToggleReceipt,
};
