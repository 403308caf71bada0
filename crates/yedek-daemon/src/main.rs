use clap::Parser;
use tracing::warn;

mod cli;
mod commands;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yedekd=info,yedek_engine=info,yedek_store=info".into()),
        )
        .init();

    let args = Cli::parse();

    // config: explicit path > YEDEK_CONFIG env > ~/.yedek/config.toml
    let config_path = args.config.clone().or_else(|| std::env::var("YEDEK_CONFIG").ok());
    let config = yedek_core::YedekConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("config load failed ({e}), using defaults");
        yedek_core::YedekConfig::default()
    });

    let app = commands::App::build(config)?;

    match args.command {
        Command::Run => app.run_daemon().await,
        Command::Engines => {
            app.engines();
            Ok(())
        }
        Command::Job(cmd) => app.job(cmd).await,
        Command::History(cmd) => app.history(cmd),
        Command::Migrate(migrate_args) => app.migrate(migrate_args).await,
    }
}
