use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use campaign_tracker::build_router;
use campaign_tracker::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if config.production {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    if !config.production {
        println!("Tracking server starting on http://{}", config.bind_addr);
        println!("Stats dashboard: http://{}/stats", config.bind_addr);
        println!("Press Ctrl+C to stop");
    }

    let bind_addr = config.bind_addr;
    let app = build_router(config).context("failed to open tracking store")?;

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(target: "tracker", addr = %bind_addr, "listening");

    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
