mod commands;
mod models;
mod services;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

use commands::Command;
use services::event_loop::RadarClient;
use services::radar_api::HttpRadarApi;
use services::view::ConsoleView;

/// Live weather radar client with adaptive refresh.
#[derive(Debug, Parser)]
#[command(name = "radarwatch", version, about)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Radar server base URL, overrides settings and RADARWATCH_SERVER_URL
    #[arg(long)]
    server: Option<String>,

    /// Load the radar once without starting auto-refresh
    #[arg(long)]
    no_auto_refresh: bool,

    /// Disable hover value lookups
    #[arg(long)]
    no_hover: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut settings = utils::config::load_settings(cli.config.as_deref())?;
    utils::config::apply_overrides(
        &mut settings,
        utils::config::server_url_from_env(),
        cli.server,
    );
    if cli.no_auto_refresh {
        settings.refresh.auto_refresh = false;
    }
    if cli.no_hover {
        settings.hover.enabled = false;
    }
    log::info!("[Main] Using radar server {}", settings.server.base_url);

    let api = Arc::new(HttpRadarApi::new(&settings.server)?);
    let client = RadarClient::bootstrap(api, ConsoleView::new(), &settings).await?;

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    commands::spawn_stdin_reader(commands_tx.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = commands_tx.send(Command::Quit);
        }
    });

    println!("Type 'help' for commands.");
    client.run(commands_rx).await
}
