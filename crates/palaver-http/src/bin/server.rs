//! palaver-http server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the chat API over HTTP.
//!
//! # Admin helpers
//!
//! Channels, memberships and session tokens are provisioned out of band:
//!
//! ```
//! cargo run -p palaver-http --bin server -- --create-channel general
//! cargo run -p palaver-http --bin server -- --add-member 1 42
//! cargo run -p palaver-http --bin server -- --issue-token 42
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use palaver_core::store::ChatStore;
use palaver_http::{AppState, ServerConfig};
use palaver_live::{
  DeletionLog, MemoryCache, PollConfig, PollCoordinator, ReactionEngine,
  ReactionNotifier, ReactionUpdate, ThreadCache,
};
use palaver_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Palaver chat server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create a channel with the given name, print its id, and exit.
  #[arg(long, value_name = "NAME")]
  create_channel: Option<String>,

  /// Add a user to a channel (`CHANNEL_ID USER_ID`) and exit.
  #[arg(long, num_args = 2, value_names = ["CHANNEL_ID", "USER_ID"])]
  add_member: Option<Vec<i64>>,

  /// Issue a session token for the given user id, print it, and exit.
  #[arg(long, value_name = "USER_ID")]
  issue_token: Option<i64>,
}

/// Logs reaction updates; stands in until a push transport consumes them.
struct LogNotifier;

impl ReactionNotifier for LogNotifier {
  fn notify_reaction_update(&self, update: ReactionUpdate) {
    tracing::debug!(
      message_id = update.message_id,
      is_thread = update.is_thread,
      emoji_count = update.summary.reactions.len(),
      "reaction update"
    );
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PALAVER"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let db_path = expand_tilde(&server_cfg.db_path);
  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("failed to open store at {db_path:?}"))?;

  // Admin helper modes: mutate the store and exit.
  if let Some(name) = cli.create_channel {
    let channel_id = store.create_channel(&name).await?;
    println!("{channel_id}");
    return Ok(());
  }
  if let Some(args) = cli.add_member {
    store.add_member(args[0], args[1]).await?;
    return Ok(());
  }
  if let Some(user_id) = cli.issue_token {
    let token = store.create_session(user_id).await?;
    println!("{token}");
    return Ok(());
  }

  let store = Arc::new(store);
  let cache = Arc::new(ThreadCache::default());
  let deletions = Arc::new(DeletionLog::new());
  let summaries = Arc::new(MemoryCache::new(Duration::from_secs(60)));
  let coordinator = Arc::new(PollCoordinator::new(
    store.clone(),
    cache.clone(),
    deletions.clone(),
    PollConfig {
      interval: Duration::from_millis(server_cfg.poll_interval_ms),
      ..PollConfig::default()
    },
  ));
  let engine = Arc::new(ReactionEngine::new(
    store.clone(),
    cache.clone(),
    summaries.clone(),
    Arc::new(LogNotifier),
  ));

  let state = AppState {
    store,
    cache,
    deletions,
    coordinator,
    engine,
    summaries,
    config: Arc::new(server_cfg.clone()),
  };

  let app = palaver_http::router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  if let Ok(stripped) = path.strip_prefix("~") {
    if let Some(home) = std::env::var_os("HOME") {
      return PathBuf::from(home).join(stripped);
    }
  }
  path.to_path_buf()
}
