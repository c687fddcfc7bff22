use anyhow::{Context, Result};
use ghlink::config::{load_config, LinkConfig};
use ghlink::server::serve;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ghlink=info,tower_http=info".into()),
        )
        .init();

    info!("ghlink starting...");
    if dotenv.is_err() {
        info!("No .env file found, using environment variables");
    }

    let mut config = match std::env::var("GHLINK_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => LinkConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid environment configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        bind = %config.bind_address(),
        redirect_url = %config.github.redirect_url,
        database = %config.database_path,
        state_ttl_seconds = config.link.state_ttl_seconds,
        "Configuration loaded"
    );

    let server = serve(&config).await?;

    // Identities passed on the command line get a link URL right away
    for identity in std::env::args().skip(1) {
        let invitation = server
            .linker()
            .start_link(&identity)
            .with_context(|| format!("Cannot start link for {}", identity))?;
        println!("{}: {}", identity, invitation.url);
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
    }
    info!("Shutdown signal received");

    server.shutdown().await?;
    info!("ghlink stopped");

    Ok(())
}
