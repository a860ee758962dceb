//! Error type for `palaver-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to post into a channel that does not exist.
  #[error("channel not found: {0}")]
  ChannelNotFound(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
