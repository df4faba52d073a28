use clap::Parser;
use relayroom::{config::Config, error::AppError, server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("relayroom=info,tower_http=info")),
        )
        .try_init()
        .map_err(|err| AppError::Error(err.to_string()))?;

    server::run(config).await
}
