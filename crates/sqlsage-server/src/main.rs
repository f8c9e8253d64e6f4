use sqlsage_core::SqlSageError;
use sqlsage_server::{initialize, serve, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), SqlSageError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let assistant = initialize(&config).await?;
    serve(&config, assistant).await
}
