//! Integration tests for `SqliteStore` against an in-memory database.

use palaver_core::{
  message::{NewMessage, Scope},
  reaction::ToggleOutcome,
  store::ChatStore,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn channel_with_member(s: &SqliteStore, user_id: i64) -> i64 {
  let channel_id = s.create_channel("general").await.unwrap();
  s.add_member(channel_id, user_id).await.unwrap();
  channel_id
}

fn message(channel_id: i64, thread_id: Option<i64>, body: &str) -> NewMessage {
  NewMessage {
    channel_id,
    thread_id,
    author_id: 1,
    body: body.to_owned(),
  }
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn message_ids_strictly_increase() {
  let s = store().await;
  let ch = channel_with_member(&s, 1).await;

  let a = s.post_message(message(ch, None, "first")).await.unwrap();
  let b = s.post_message(message(ch, None, "second")).await.unwrap();
  let c = s.post_message(message(ch, None, "third")).await.unwrap();

  assert!(a.id < b.id && b.id < c.id);
  assert!(a.deleted_at.is_none());
}

#[tokio::test]
async fn post_into_missing_channel_errors() {
  let s = store().await;
  let err = s.post_message(message(999, None, "nope")).await.unwrap_err();
  assert!(matches!(err, crate::Error::ChannelNotFound(999)));
}

#[tokio::test]
async fn get_message_roundtrip() {
  let s = store().await;
  let ch = channel_with_member(&s, 1).await;

  let posted = s.post_message(message(ch, None, "hello")).await.unwrap();
  let fetched = s.get_message(posted.id).await.unwrap().unwrap();
  assert_eq!(fetched, posted);

  assert!(s.get_message(posted.id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn messages_after_respects_cursor_and_limit() {
  let s = store().await;
  let ch = channel_with_member(&s, 1).await;

  let mut ids = Vec::new();
  for i in 0..5 {
    let m = s.post_message(message(ch, None, &format!("m{i}"))).await.unwrap();
    ids.push(m.id);
  }

  let after_second = s
    .messages_after(Scope::Channel(ch), ids[1], 10)
    .await
    .unwrap();
  assert_eq!(
    after_second.iter().map(|m| m.id).collect::<Vec<_>>(),
    &ids[2..]
  );

  let capped = s.messages_after(Scope::Channel(ch), 0, 2).await.unwrap();
  assert_eq!(capped.iter().map(|m| m.id).collect::<Vec<_>>(), &ids[..2]);
}

#[tokio::test]
async fn channel_scope_excludes_thread_replies() {
  let s = store().await;
  let ch = channel_with_member(&s, 1).await;

  let root = s.post_message(message(ch, None, "root")).await.unwrap();
  let reply = s
    .post_message(message(ch, Some(root.id), "reply"))
    .await
    .unwrap();

  let channel = s.messages_after(Scope::Channel(ch), 0, 10).await.unwrap();
  assert_eq!(channel.iter().map(|m| m.id).collect::<Vec<_>>(), vec![root.id]);

  let thread = s
    .messages_after(Scope::Thread(root.id), 0, 10)
    .await
    .unwrap();
  assert_eq!(thread.iter().map(|m| m.id).collect::<Vec<_>>(), vec![reply.id]);
}

#[tokio::test]
async fn thread_messages_returns_recent_window_ascending() {
  let s = store().await;
  let ch = channel_with_member(&s, 1).await;
  let root = s.post_message(message(ch, None, "root")).await.unwrap();

  let mut ids = Vec::new();
  for i in 0..5 {
    let m = s
      .post_message(message(ch, Some(root.id), &format!("r{i}")))
      .await
      .unwrap();
    ids.push(m.id);
  }

  let window = s.thread_messages(root.id, 3).await.unwrap();
  assert_eq!(window.iter().map(|m| m.id).collect::<Vec<_>>(), &ids[2..]);
}

#[tokio::test]
async fn soft_delete_hides_message_from_reads() {
  let s = store().await;
  let ch = channel_with_member(&s, 1).await;
  let m = s.post_message(message(ch, None, "doomed")).await.unwrap();

  assert!(s.delete_message(m.id).await.unwrap());
  // Second delete is a no-op.
  assert!(!s.delete_message(m.id).await.unwrap());

  let visible = s.messages_after(Scope::Channel(ch), 0, 10).await.unwrap();
  assert!(visible.is_empty());

  // The row survives with deleted_at set.
  let row = s.get_message(m.id).await.unwrap().unwrap();
  assert!(row.deleted_at.is_some());
}

// ─── Membership and sessions ─────────────────────────────────────────────────

#[tokio::test]
async fn membership_checks() {
  let s = store().await;
  let ch = channel_with_member(&s, 7).await;

  assert!(s.is_member(ch, 7).await.unwrap());
  assert!(!s.is_member(ch, 8).await.unwrap());

  // add_member is idempotent.
  s.add_member(ch, 7).await.unwrap();
  assert!(s.is_member(ch, 7).await.unwrap());
}

#[tokio::test]
async fn session_token_roundtrip() {
  let s = store().await;

  let token = s.create_session(42).await.unwrap();
  assert_eq!(s.user_for_token(&token).await.unwrap(), Some(42));
  assert_eq!(s.user_for_token("bogus").await.unwrap(), None);
}

// ─── Channel reactions (hard delete) ─────────────────────────────────────────

#[tokio::test]
async fn channel_toggle_cycles_added_removed_added() {
  let s = store().await;
  let ch = channel_with_member(&s, 3).await;
  let m = s.post_message(message(ch, None, "react to me")).await.unwrap();

  let first = s.toggle_channel_reaction(m.id, 3, "👍").await.unwrap();
  assert_eq!(first, ToggleOutcome::Added);
  assert_eq!(
    s.count_reaction_rows("channel_reactions", m.id, 3, "👍").await.unwrap(),
    1
  );

  let second = s.toggle_channel_reaction(m.id, 3, "👍").await.unwrap();
  assert_eq!(second, ToggleOutcome::Removed);
  assert_eq!(
    s.count_reaction_rows("channel_reactions", m.id, 3, "👍").await.unwrap(),
    0
  );

  let third = s.toggle_channel_reaction(m.id, 3, "👍").await.unwrap();
  assert_eq!(third, ToggleOutcome::Added);
  assert_eq!(
    s.count_reaction_rows("channel_reactions", m.id, 3, "👍").await.unwrap(),
    1
  );
}

#[tokio::test]
async fn remove_channel_reaction_reports_missing_target() {
  let s = store().await;
  let ch = channel_with_member(&s, 3).await;
  let m = s.post_message(message(ch, None, "m")).await.unwrap();

  assert!(!s.remove_channel_reaction(m.id, 3, "🎉").await.unwrap());

  s.toggle_channel_reaction(m.id, 3, "🎉").await.unwrap();
  assert!(s.remove_channel_reaction(m.id, 3, "🎉").await.unwrap());
  assert!(!s.remove_channel_reaction(m.id, 3, "🎉").await.unwrap());
}

// ─── Thread reactions (soft delete) ──────────────────────────────────────────

#[tokio::test]
async fn thread_toggle_preserves_row_identity() {
  let s = store().await;
  let ch = channel_with_member(&s, 3).await;
  let root = s.post_message(message(ch, None, "root")).await.unwrap();
  let m = s
    .post_message(message(ch, Some(root.id), "reply"))
    .await
    .unwrap();

  assert_eq!(
    s.toggle_thread_reaction(m.id, 3, "👍").await.unwrap(),
    ToggleOutcome::Added
  );
  let original = s.get_thread_reaction(m.id, 3, "👍").await.unwrap().unwrap();
  assert!(original.deleted_at.is_none());

  assert_eq!(
    s.toggle_thread_reaction(m.id, 3, "👍").await.unwrap(),
    ToggleOutcome::Removed
  );
  let removed = s.get_thread_reaction(m.id, 3, "👍").await.unwrap().unwrap();
  assert_eq!(removed.id, original.id);
  assert!(removed.deleted_at.is_some());

  assert_eq!(
    s.toggle_thread_reaction(m.id, 3, "👍").await.unwrap(),
    ToggleOutcome::Added
  );
  let restored = s.get_thread_reaction(m.id, 3, "👍").await.unwrap().unwrap();
  assert_eq!(restored.id, original.id);
  assert!(restored.deleted_at.is_none());
  assert!(restored.created_at >= original.created_at);

  // Exactly one row for the tuple, throughout.
  assert_eq!(
    s.count_reaction_rows("thread_reactions", m.id, 3, "👍").await.unwrap(),
    1
  );
}

#[tokio::test]
async fn remove_thread_reaction_soft_deletes() {
  let s = store().await;
  let ch = channel_with_member(&s, 3).await;
  let m = s.post_message(message(ch, None, "m")).await.unwrap();

  assert!(!s.remove_thread_reaction(m.id, 3, "👍").await.unwrap());

  s.toggle_thread_reaction(m.id, 3, "👍").await.unwrap();
  assert!(s.remove_thread_reaction(m.id, 3, "👍").await.unwrap());

  let row = s.get_thread_reaction(m.id, 3, "👍").await.unwrap().unwrap();
  assert!(row.deleted_at.is_some());
}

#[tokio::test]
async fn concurrent_toggles_never_double_insert() {
  let s = store().await;
  let ch = channel_with_member(&s, 3).await;
  let m = s.post_message(message(ch, None, "contended")).await.unwrap();

  let mut handles = Vec::new();
  for _ in 0..10 {
    let s = s.clone();
    let id = m.id;
    handles.push(tokio::spawn(async move {
      s.toggle_thread_reaction(id, 3, "🔥").await.unwrap()
    }));
  }
  let mut outcomes = Vec::with_capacity(handles.len());
  for h in handles {
    outcomes.push(h.await.unwrap());
  }

  // Serialized toggles strictly alternate: ten of them net out to removed.
  let added = outcomes.iter().filter(|o| **o == ToggleOutcome::Added).count();
  assert_eq!(added, 5);
  assert_eq!(
    s.count_reaction_rows("thread_reactions", m.id, 3, "🔥").await.unwrap(),
    1
  );
  let row = s.get_thread_reaction(m.id, 3, "🔥").await.unwrap().unwrap();
  assert!(row.deleted_at.is_some());
}

// ─── Summaries ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn channel_summary_groups_by_emoji() {
  let s = store().await;
  let ch = channel_with_member(&s, 1).await;
  let m = s.post_message(message(ch, None, "popular")).await.unwrap();

  s.toggle_channel_reaction(m.id, 1, "👍").await.unwrap();
  s.toggle_channel_reaction(m.id, 2, "👍").await.unwrap();
  s.toggle_channel_reaction(m.id, 3, "🎉").await.unwrap();

  let summary = s.message_reactions(m.id).await.unwrap();
  assert_eq!(summary.message_id, m.id);
  assert_eq!(summary.reactions.len(), 2);

  let thumbs = summary.reactions.iter().find(|r| r.emoji == "👍").unwrap();
  assert_eq!(thumbs.count, 2);
  assert_eq!(thumbs.user_ids.len(), 2);
}

#[tokio::test]
async fn thread_summary_excludes_soft_deleted() {
  let s = store().await;
  let ch = channel_with_member(&s, 1).await;
  let m = s.post_message(message(ch, None, "m")).await.unwrap();

  s.toggle_thread_reaction(m.id, 1, "👍").await.unwrap();
  s.toggle_thread_reaction(m.id, 2, "👍").await.unwrap();
  // User 2 un-reacts; the soft-deleted row must not count.
  s.toggle_thread_reaction(m.id, 2, "👍").await.unwrap();

  let summary = s.thread_message_reactions(m.id).await.unwrap();
  assert_eq!(summary.reactions.len(), 1);
  assert_eq!(summary.reactions[0].count, 1);
  assert_eq!(summary.reactions[0].user_ids, vec![1]);
}
