//! Domain types and the storage trait for the Palaver chat service.
//!
//! No HTTP, no database: just messages, scopes, reactions, and the
//! [`store::ChatStore`] contract every backend implements. Everything else
//! in the workspace depends on this crate.

pub mod message;
pub mod reaction;
pub mod store;

pub use message::{Message, NewMessage, Scope};
pub use reaction::{
  ReactionCount, ReactionKind, ReactionRecord, ReactionSummary, ToggleOutcome,
};
