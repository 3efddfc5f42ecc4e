use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use linebridge_core::config::{self, Config};
use linebridge_core::service::AppState;
use linebridge_core::types::InboundRequest;
use linebridge_core::util::mask_secret;

#[derive(Parser)]
#[command(
    name = "linebridge",
    about = "Dialogflow CX fulfillment webhook with LINE rich replies",
    version = linebridge_core::VERSION,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Serve {
        /// Listen port (overrides PORT and the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Route one utterance and print the response envelope
    Route {
        /// Tag as sent by the orchestration platform
        #[arg(short, long)]
        tag: Option<String>,
        /// Utterance text
        text: Vec<String>,
    },
    /// Show the effective configuration with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("linebridge=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => cmd_serve(port).await?,
        Commands::Route { tag, text } => cmd_route(tag, text).await?,
        Commands::Config => cmd_config()?,
    }

    Ok(())
}

fn load() -> Result<Config> {
    let cfg = config::load_config_from_env();
    cfg.validate()?;
    Ok(cfg)
}

#[allow(unused_mut)]
async fn cmd_serve(port: Option<u16>) -> Result<()> {
    let mut cfg = load()?;

    #[cfg(not(feature = "http-api"))]
    {
        let _ = (port, cfg);
        anyhow::bail!("HTTP server not available. Rebuild with: cargo build --features http-api");
    }

    #[cfg(feature = "http-api")]
    {
        if let Some(port) = port {
            cfg.server.port = port;
        }
        let addr = cfg.listen_addr();

        info!(
            "Starting linebridge {} ({}) on {}",
            linebridge_core::VERSION,
            linebridge_core::GIT_HASH,
            addr
        );
        info!(
            "Channel key: {}, assertion key: {}, model key: {}",
            mask_secret(&cfg.channel.api_key),
            mask_secret(&cfg.channel.assertion_key),
            mask_secret(&cfg.ai.api_key)
        );

        let state = Arc::new(AppState::new(cfg));
        linebridge_core::service::http::serve(&addr, state).await?;
    }

    Ok(())
}

async fn cmd_route(tag: Option<String>, text: Vec<String>) -> Result<()> {
    let cfg = load()?;
    let state = AppState::new(cfg);
    let request = InboundRequest::new(tag.as_deref(), text.join(" "));
    let response = state.fulfill(&request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn cmd_config() -> Result<()> {
    let cfg = load()?;
    println!("Config file: {}", config::get_config_path().display());
    println!("{}", serde_json::to_string_pretty(&cfg.redacted())?);
    Ok(())
}
