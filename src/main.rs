use std::sync::Arc;

use bus_tracker::{api, config::Config, seed, TransitService};
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

type GenericError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), GenericError> {
    dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::from_env()?;
    info!(
        freshness_minutes = config.freshness.window().num_minutes(),
        history_max_hours = config.history.max_hours,
        "loaded configuration"
    );

    let log = Arc::new(config.position_log());
    if let Some(path) = &config.seed_csv {
        seed::seed_log(&log, path).await?;
    }

    let service = Arc::new(TransitService::new(log, config.freshness, config.history));
    let router = api::router(service, config.cors_allowed_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str()).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;

    Ok(())
}
