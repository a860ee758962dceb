//! SQL schema for the Palaver SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS channels (
    channel_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS channel_members (
    channel_id  INTEGER NOT NULL REFERENCES channels(channel_id),
    user_id     INTEGER NOT NULL,
    joined_at   TEXT NOT NULL,
    PRIMARY KEY (channel_id, user_id)
);

CREATE TABLE IF NOT EXISTS sessions (
    token       TEXT PRIMARY KEY,
    user_id     INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);

-- message_id is the polling cursor. AUTOINCREMENT keeps ids strictly
-- increasing in insertion order and never reused, even across deletes.
CREATE TABLE IF NOT EXISTS messages (
    message_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id  INTEGER NOT NULL REFERENCES channels(channel_id),
    thread_id   INTEGER,            -- parent message id for thread replies
    author_id   INTEGER NOT NULL,
    body        TEXT NOT NULL,
    created_at  TEXT NOT NULL,      -- ISO 8601 UTC; server-assigned
    deleted_at  TEXT                -- soft delete
);

-- Channel reactions are hard-deleted: row presence alone means active.
CREATE TABLE IF NOT EXISTS channel_reactions (
    message_id  INTEGER NOT NULL REFERENCES messages(message_id),
    user_id     INTEGER NOT NULL,
    emoji       TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (message_id, user_id, emoji)
);

-- Thread reactions are soft-deleted: at most one row per tuple, active
-- iff deleted_at IS NULL. Row identity survives removed -> added cycles.
CREATE TABLE IF NOT EXISTS thread_reactions (
    reaction_id INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id  INTEGER NOT NULL REFERENCES messages(message_id),
    user_id     INTEGER NOT NULL,
    emoji       TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    deleted_at  TEXT,
    UNIQUE (message_id, user_id, emoji)
);

CREATE INDEX IF NOT EXISTS messages_channel_idx ON messages(channel_id, message_id);
CREATE INDEX IF NOT EXISTS messages_thread_idx  ON messages(thread_id, message_id);

PRAGMA user_version = 1;
";
