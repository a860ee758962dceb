//! HTTP layer for Palaver.
//!
//! Exposes an axum [`Router`] over any [`ChatStore`], wiring the live
//! components (poll coordinator, thread cache, deletion log, reaction
//! engine) into a small JSON API:
//!
//! - `GET    /api/channels/{channel_id}/poll` — long-poll for updates
//! - `POST   /api/messages` — post a message or thread reply
//! - `DELETE /api/messages/{id}` — soft-delete own message
//! - `POST   /api/reactions/toggle` — toggle or remove a reaction
//! - `GET    /api/messages/{id}/reactions` — cached reaction summary

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  routing::{delete, get, post},
  Router,
};
use palaver_core::{reaction::ReactionSummary, store::ChatStore};
use palaver_live::{
  DeletionLog, MemoryCache, PollCoordinator, ReactionEngine, ThreadCache,
};
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:    String,
  pub port:    u16,
  pub db_path: PathBuf,

  /// Seconds a poll is held open when the client names no timeout.
  #[serde(default = "default_poll_timeout_secs")]
  pub default_poll_timeout_secs: u64,

  /// Upper bound on client-requested poll timeouts.
  #[serde(default = "max_poll_timeout_secs")]
  pub max_poll_timeout_secs: u64,

  /// Retry cadence of the poll wait loop, in milliseconds.
  #[serde(default = "poll_interval_ms")]
  pub poll_interval_ms: u64,
}

fn default_poll_timeout_secs() -> u64 {
  25
}

fn max_poll_timeout_secs() -> u64 {
  60
}

fn poll_interval_ms() -> u64 {
  500
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: ChatStore> {
  pub store:       Arc<S>,
  pub cache:       Arc<ThreadCache>,
  pub deletions:   Arc<DeletionLog>,
  pub coordinator: Arc<PollCoordinator<S>>,
  pub engine:      Arc<ReactionEngine<S>>,
  pub summaries:   Arc<MemoryCache<ReactionSummary>>,
  pub config:      Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the chat API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ChatStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route(
      "/api/channels/{channel_id}/poll",
      get(handlers::poll::poll::<S>),
    )
    .route("/api/messages", post(handlers::messages::create::<S>))
    .route(
      "/api/messages/{message_id}",
      delete(handlers::messages::delete::<S>),
    )
    .route(
      "/api/messages/{message_id}/reactions",
      get(handlers::reactions::summary::<S>),
    )
    .route(
      "/api/reactions/toggle",
      post(handlers::reactions::toggle::<S>),
    )
    .with_state(state)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  use axum::{
    body::Body,
    http::{header, Request, StatusCode},
  };
  use palaver_core::{message::NewMessage, store::ChatStore as _, Message};
  use palaver_live::{NoopNotifier, PollConfig};
  use palaver_store_sqlite::SqliteStore;
  use serde_json::Value;
  use tower::ServiceExt as _;

  const ALICE: i64 = 1;
  const MALLORY: i64 = 99;

  struct Fixture {
    state:          AppState<SqliteStore>,
    channel_id:     i64,
    alice_token:    String,
    outsider_token: String,
  }

  async fn fixture() -> Fixture {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let channel_id = store.create_channel("general").await.unwrap();
    store.add_member(channel_id, ALICE).await.unwrap();
    let alice_token = store.create_session(ALICE).await.unwrap();
    let outsider_token = store.create_session(MALLORY).await.unwrap();

    let cache = Arc::new(ThreadCache::default());
    let deletions = Arc::new(DeletionLog::new());
    let summaries: Arc<MemoryCache<ReactionSummary>> =
      Arc::new(MemoryCache::new(Duration::from_secs(60)));
    let coordinator = Arc::new(PollCoordinator::new(
      store.clone(),
      cache.clone(),
      deletions.clone(),
      PollConfig {
        interval:   Duration::from_millis(20),
        batch_size: 10,
      },
    ));
    let engine = Arc::new(ReactionEngine::new(
      store.clone(),
      cache.clone(),
      summaries.clone(),
      Arc::new(NoopNotifier),
    ));

    let state = AppState {
      store,
      cache,
      deletions,
      coordinator,
      engine,
      summaries,
      config: Arc::new(ServerConfig {
        host:    "127.0.0.1".to_owned(),
        port:    0,
        db_path: PathBuf::from(":memory:"),
        default_poll_timeout_secs: 1,
        max_poll_timeout_secs: 2,
        poll_interval_ms: 20,
      }),
    };

    Fixture {
      state,
      channel_id,
      alice_token,
      outsider_token,
    }
  }

  async fn post_message(f: &Fixture, thread_id: Option<i64>, body: &str) -> Message {
    f.state
      .store
      .post_message(NewMessage {
        channel_id: f.channel_id,
        thread_id,
        author_id: ALICE,
        body: body.to_owned(),
      })
      .await
      .unwrap()
  }

  async fn request(
    f: &Fixture,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: &str,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if !body.is_empty() {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let req = builder.body(Body::from(body.to_owned())).unwrap();

    let response = router(f.state.clone()).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    let json = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
  }

  // ── Polling ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn poll_requires_authentication() {
    let f = fixture().await;
    let (status, body) = request(
      &f,
      "GET",
      &format!("/api/channels/{}/poll", f.channel_id),
      None,
      "",
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
  }

  #[tokio::test]
  async fn poll_rejects_non_member() {
    let f = fixture().await;
    let (status, _) = request(
      &f,
      "GET",
      &format!("/api/channels/{}/poll", f.channel_id),
      Some(&f.outsider_token),
      "",
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn poll_rejects_bad_channel_id() {
    let f = fixture().await;
    let (status, body) =
      request(&f, "GET", "/api/channels/0/poll", Some(&f.alice_token), "")
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
  }

  #[tokio::test]
  async fn poll_returns_existing_messages() {
    let f = fixture().await;
    let m = post_message(&f, None, "hello").await;

    let (status, body) = request(
      &f,
      "GET",
      &format!("/api/channels/{}/poll?timeout=2", f.channel_id),
      Some(&f.alice_token),
      "",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"][0]["id"], m.id);
    assert!(body["timestamp"].is_string());
    assert!(body.get("timeout").is_none());
  }

  #[tokio::test]
  async fn poll_times_out_with_timeout_shape() {
    let f = fixture().await;

    let (status, body) = request(
      &f,
      "GET",
      &format!("/api/channels/{}/poll?timeout=1", f.channel_id),
      Some(&f.alice_token),
      "",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timeout"], true);
    assert_eq!(body["messages"], serde_json::json!([]));
  }

  #[tokio::test]
  async fn poll_scoped_to_thread_sees_only_replies() {
    let f = fixture().await;
    let root = post_message(&f, None, "root").await;
    let reply = post_message(&f, Some(root.id), "reply").await;
    post_message(&f, None, "unrelated channel talk").await;

    let (status, body) = request(
      &f,
      "GET",
      &format!(
        "/api/channels/{}/poll?thread_id={}&timeout=2",
        f.channel_id, root.id
      ),
      Some(&f.alice_token),
      "",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"], reply.id);
  }

  // ── Messages ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_message_returns_created() {
    let f = fixture().await;

    let (status, body) = request(
      &f,
      "POST",
      "/api/messages",
      Some(&f.alice_token),
      &format!(r#"{{"channel_id": {}, "body": "hi there"}}"#, f.channel_id),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["channel_id"], f.channel_id);
    assert_eq!(body["body"], "hi there");
    assert!(body["deleted_at"].is_null());
  }

  #[tokio::test]
  async fn create_rejects_blank_body() {
    let f = fixture().await;

    let (status, body) = request(
      &f,
      "POST",
      "/api/messages",
      Some(&f.alice_token),
      &format!(r#"{{"channel_id": {}, "body": "   "}}"#, f.channel_id),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
  }

  #[tokio::test]
  async fn thread_reply_is_fed_into_the_cache() {
    let f = fixture().await;
    let root = post_message(&f, None, "root").await;

    let (status, body) = request(
      &f,
      "POST",
      "/api/messages",
      Some(&f.alice_token),
      &format!(
        r#"{{"channel_id": {}, "thread_id": {}, "body": "reply"}}"#,
        f.channel_id, root.id
      ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let reply_id = body["id"].as_i64().unwrap();
    assert!(matches!(
      f.state.cache.get(root.id, reply_id - 1),
      palaver_live::CacheRead::Hit(ref messages)
        if messages.iter().any(|m| m.id == reply_id)
    ));
  }

  #[tokio::test]
  async fn delete_then_poll_reports_deletion() {
    let f = fixture().await;
    let m = post_message(&f, None, "doomed").await;

    let (status, body) = request(
      &f,
      "DELETE",
      &format!("/api/messages/{}", m.id),
      Some(&f.alice_token),
      "",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = request(
      &f,
      "GET",
      &format!(
        "/api/channels/{}/poll?last_message_id={}&timeout=2",
        f.channel_id, m.id
      ),
      Some(&f.alice_token),
      "",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_messages"], serde_json::json!([m.id]));
  }

  #[tokio::test]
  async fn delete_by_non_author_is_forbidden() {
    let f = fixture().await;
    let m = post_message(&f, None, "mine").await;

    let (status, _) = request(
      &f,
      "DELETE",
      &format!("/api/messages/{}", m.id),
      Some(&f.outsider_token),
      "",
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  // ── Reactions ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn toggle_reaction_roundtrip() {
    let f = fixture().await;
    let m = post_message(&f, None, "react to me").await;
    let body = format!(r#"{{"message_id": {}, "emoji": "👍"}}"#, m.id);

    let (status, first) = request(
      &f,
      "POST",
      "/api/reactions/toggle",
      Some(&f.alice_token),
      &body,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["reaction"], "added");
    assert_eq!(first["summary"]["reactions"][0]["count"], 1);

    let (status, second) = request(
      &f,
      "POST",
      "/api/reactions/toggle",
      Some(&f.alice_token),
      &body,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["reaction"], "removed");
    assert_eq!(
      second["summary"]["reactions"],
      serde_json::json!([])
    );
  }

  #[tokio::test]
  async fn remove_without_active_reaction_conflicts() {
    let f = fixture().await;
    let m = post_message(&f, None, "nothing here").await;

    let (status, body) = request(
      &f,
      "POST",
      "/api/reactions/toggle",
      Some(&f.alice_token),
      &format!(
        r#"{{"message_id": {}, "emoji": "👍", "action": "remove"}}"#,
        m.id
      ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
  }

  #[tokio::test]
  async fn toggle_on_unknown_message_is_not_found() {
    let f = fixture().await;

    let (status, _) = request(
      &f,
      "POST",
      "/api/reactions/toggle",
      Some(&f.alice_token),
      r#"{"message_id": 9999, "emoji": "👍"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn channel_and_thread_summaries_cached_independently() {
    // The same message can carry reactions of both flavours; a cached
    // read of one must never answer for the other.
    let f = fixture().await;
    let m = post_message(&f, None, "both flavours").await;

    request(
      &f,
      "POST",
      "/api/reactions/toggle",
      Some(&f.alice_token),
      &format!(r#"{{"message_id": {}, "emoji": "👍"}}"#, m.id),
    )
    .await;
    request(
      &f,
      "POST",
      "/api/reactions/toggle",
      Some(&f.alice_token),
      &format!(
        r#"{{"message_id": {}, "emoji": "🎉", "is_thread": true}}"#,
        m.id
      ),
    )
    .await;

    // Populate the channel-flavour cache entry first.
    let (_, channel) = request(
      &f,
      "GET",
      &format!("/api/messages/{}/reactions", m.id),
      Some(&f.alice_token),
      "",
    )
    .await;
    assert_eq!(channel["reactions"][0]["emoji"], "👍");

    let (_, thread) = request(
      &f,
      "GET",
      &format!("/api/messages/{}/reactions?is_thread=true", m.id),
      Some(&f.alice_token),
      "",
    )
    .await;
    assert_eq!(thread["reactions"][0]["emoji"], "🎉");
    assert_eq!(thread["reactions"].as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn summary_endpoint_serves_aggregate() {
    let f = fixture().await;
    let m = post_message(&f, None, "popular").await;

    request(
      &f,
      "POST",
      "/api/reactions/toggle",
      Some(&f.alice_token),
      &format!(r#"{{"message_id": {}, "emoji": "🎉"}}"#, m.id),
    )
    .await;

    let (status, body) = request(
      &f,
      "GET",
      &format!("/api/messages/{}/reactions", m.id),
      Some(&f.alice_token),
      "",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message_id"], m.id);
    assert_eq!(body["reactions"][0]["emoji"], "🎉");
    assert_eq!(body["reactions"][0]["user_ids"], serde_json::json!([ALICE]));
  }
}
