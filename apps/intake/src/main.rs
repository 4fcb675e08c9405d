mod cli;
mod command;
mod config;
mod error;

use error::WrapErr;

use clap::Parser;
use tracing::Level;

#[tokio::main]
async fn main() -> error::Result<()> {
    color_eyre::install()?;
    let command_line = cli::Cli::parse();

    let level = match command_line.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let cfg = config::Config::load()
        .context("Load configuration error")?
        .into_ledger_config();
    tracing::info!("监控根目录: {}", cfg.watch_root.display());

    let cmd: Box<dyn command::Command> = match command_line.command {
        None | Some(cli::Commands::Watch) => Box::new(command::WatchCommand::new(cfg)),
        Some(cli::Commands::Reconcile { files }) => {
            Box::new(command::ReconcileCommand::new(cfg, files))
        }
        Some(cli::Commands::Scan) => Box::new(command::ScanCommand::new(cfg)),
    };
    cmd.execute().await?;

    Ok(())
}
