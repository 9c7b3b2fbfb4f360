//! casework server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), overlays
//! `CASEWORK_*` environment variables, seeds the demo case and serves the
//! API over HTTP.

use std::path::PathBuf;

use anyhow::Context as _;
use casework_server::ServerConfig;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Casework review server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Override the listening port.
  #[arg(short, long, env = "CASEWORK_PORT")]
  port: Option<u16>,

  /// Start with editing disabled.
  #[arg(long)]
  locked: bool,
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
    .add_source(config::Environment::with_prefix("CASEWORK"))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  if let Some(port) = cli.port {
    server_cfg.port = port;
  }
  if cli.locked {
    server_cfg.editing_enabled = false;
  }

  let workspace = casework_api::shared(server_cfg.workspace());
  let app = casework_server::router(workspace);
  let address = server_cfg.address();

  tracing::info!(case = %server_cfg.case_reference, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
