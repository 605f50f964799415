use anyhow::Context;
use api::{build_app, init_app_state};
use config::{ApiConfig, LoggingConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local development convenience; real deployments set the environment directly
    dotenvy::dotenv().ok();

    let config = ApiConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let app = build_app(init_app_state(&config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    tracing::info!(address = %bind_address, "Server started successfully");
    tracing::info!("API Endpoints:");
    tracing::info!("  - POST /v1/chat/stream (Streaming chat)");
    tracing::info!("  - GET /v1/models (Model catalog)");
    tracing::info!("  - GET/POST /v1/providers (Provider keys)");
    tracing::info!("  - PATCH/DELETE /v1/providers/{{provider}}");
    tracing::info!("  - GET /docs (API documentation)");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

fn init_tracing(logging_config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging_config.filter_directives()));

    match logging_config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .init();
        }
    }
}
