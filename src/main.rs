use anyhow::{Context, Result};
use listing_checker::{Bot, BotConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG も .env から読めるよう先に読み込む
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,listing_checker=debug")),
        )
        .init();

    let config = BotConfig::from_env().context("failed to load configuration")?;
    info!(
        "Listing file: {:?}, command: {}",
        config.listing_file, config.command_prefix
    );

    Bot::new(config).run().await.context("bot stopped with an error")?;
    Ok(())
}
