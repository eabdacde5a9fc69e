use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use bizdesk::config::PortalConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let config = PortalConfig::from_env();
    info!(
        target: "bizdesk",
        "bizdesk starting: RUST_LOG='{}', http_port={}, api_base={}, users_file={}, storage_dir={}",
        rust_log,
        config.http_port,
        config.api_base.as_deref().unwrap_or("<none>"),
        config.users_file.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<none>".into()),
        config.storage_dir.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<memory>".into()),
    );

    bizdesk::server::run_with_config(config).await
}
