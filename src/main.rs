use anyhow::{Context, Result};
use clap::Parser;
use intervo::{create_router, AppState, Config};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "intervo", about = "Voice interview practice service")]
struct Args {
    /// Config file path (without extension)
    #[arg(short, long, default_value = "config/intervo")]
    config: String,

    /// Override the HTTP port from the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut cfg = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Could not load config {}: {}; using defaults", args.config, e);
            Config::default()
        }
    };

    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("NATS server: {}", cfg.nats.url);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(cfg);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .context("HTTP server error")?;

    Ok(())
}
