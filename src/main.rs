mod api;
mod app;
mod cache;
mod commands;
mod config;
mod error;
mod event;
mod logging;
mod persist;
mod posts;
mod ui;

use clap::Parser;
use color_eyre::Result;
use persist::{KeyValueStore, MemoryStore, Persisted, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "postboard")]
#[command(about = "A terminal UI for browsing and editing posts on a JSON REST API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/postboard/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the posts API
  #[arg(long)]
  api_url: Option<String>,

  /// Keep draft and page in memory only; nothing is saved
  #[arg(long)]
  ephemeral: bool,

  /// Forget the saved draft and page before starting
  #[arg(long)]
  reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.api_url {
    config.api.url = url;
    config.validate()?;
  }

  let _log_guard = logging::init(&config::data_dir()?.join("logs"), &config.log.level)?;
  tracing::info!(api = %config.api.url, "Starting postboard");

  let store: Arc<dyn KeyValueStore> = if args.ephemeral {
    Arc::new(MemoryStore::new())
  } else {
    Arc::new(SqliteStore::open(&config.state_db_path()?)?)
  };

  if args.reset {
    Persisted::<posts::Draft>::load(store.clone()).clear()?;
    Persisted::<posts::PageState>::load(store.clone()).clear()?;
    tracing::info!("Cleared saved state");
  }

  let client = api::PostsClient::new(&config.api)?;
  let controller = posts::PostsController::new(client, store, &config);

  // Initialize and run the app
  let mut app = app::App::new(controller);
  app.run().await?;

  Ok(())
}
