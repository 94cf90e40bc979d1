//! stated node binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `STATED_*` environment variables, opens the SQLite store, joins the peer
//! network and serves the peer API over HTTP until interrupted.
//!
//! ```text
//! STATED_DOMAIN=example.com STATED_SEED_NODES=stated.a.org,stated.b.org \
//!   cargo run -p stated-node --bin server
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use stated_node::{
  api::{self, AppState},
  config::NodeConfig,
  http::{HttpTransport, PeerClient},
  pipeline::Pipeline,
  scheduler::{Schedules, spawn_node_tasks},
  sync::PeerDirectory,
  verify::{DomainVerifier, dns::DnsResolver},
};
use stated_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "stated statement verification node")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("STATED")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("seed_nodes"),
    )
    .build()
    .context("failed to read config file")?;

  let node_cfg: NodeConfig = settings
    .try_deserialize()
    .context("failed to deserialise NodeConfig")?;
  let schedules = Schedules {
    verification:   node_cfg
      .verification_schedule()
      .context("invalid verification_retry_hours")?,
    derived_entity: node_cfg
      .derived_entity_schedule()
      .context("invalid derived_entity_retry_hours")?,
  };

  // Open SQLite store.
  let store_path = expand_tilde(&node_cfg.store_path);
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  // Wire the node.
  let transport = HttpTransport::new(&node_cfg.peer_scheme, node_cfg.request_timeout())
    .context("failed to build http client")?;
  let client = Arc::new(PeerClient::new(transport, &node_cfg.domain));
  let verifier = DomainVerifier::new(
    DnsResolver::new(node_cfg.strict_dnssec, node_cfg.verification_timeout()),
    client.clone(),
    node_cfg.verification_timeout(),
  );
  let pipeline = Arc::new(Pipeline::new(
    store.clone(),
    Arc::new(verifier),
    &node_cfg.domain,
    node_cfg.api_key.clone(),
  ));
  let config = Arc::new(node_cfg);
  let directory = Arc::new(PeerDirectory::new(store, client, pipeline, config.clone()));

  directory.bootstrap().await;
  let tasks = spawn_node_tasks(directory.clone(), schedules);

  let app = api::router(AppState::new(directory));
  let address = format!("{}:{}", config.host, config.port);

  tracing::info!(domain = %config.domain, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tasks.shutdown().await;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
