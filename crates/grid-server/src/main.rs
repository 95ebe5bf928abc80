use std::net::SocketAddr;

use anyhow::Context;
use grid_core::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grid_server=info,tower_http=info")))
    .init();

  let config = Config::from_env().context("loading configuration")?;

  let state = grid_server::AppState::new(&config.database_url).context("connecting to the store")?;
  let app = grid_server::build_router(state, &config.allowed_origins);

  let addr: SocketAddr = format!("{}:{}", config.api_host, config.api_port).parse().context("parsing API_HOST/API_PORT")?;
  tracing::info!(%addr, "grid-server listening");

  let listener = tokio::net::TcpListener::bind(addr).await.context("binding listener")?;
  axum::serve(listener, app).await.context("serving")?;

  Ok(())
}
