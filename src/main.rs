mod app;
mod backend;
mod cache;
mod chat;
mod commands;
mod config;
mod connectivity;
mod itinerary;
mod logging;
mod templates;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "travel-copilot")]
#[command(about = "Travel agent assistant that keeps working offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/travel-copilot/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Skip the network and serve cached data only
  #[arg(long, global = true)]
  offline: bool,

  /// Keep the cache in memory for this run
  #[arg(long, global = true)]
  ephemeral: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(config.log.file.as_deref())?;

  let options = app::RunOptions {
    offline: args.offline,
    ephemeral: args.ephemeral,
  };
  let app = app::App::new(config, options).await?;
  commands::run(&app, args.command).await
}
