mod cli;
mod duplicate;
mod settings;

use std::io::IsTerminal;

use clap::Parser;
use eyre::Result;
use fanout_core::config;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::duplicate::run_duplicate;
use crate::settings::{FileConfig, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(dir) = &cli.config_dir {
        config::set_config_dir(dir);
    }

    let file = FileConfig::discover(cli.config.as_deref()).await?;
    let settings = Settings::resolve(&cli, file)?;
    run_duplicate(&settings).await?;

    Ok(())
}

/// Routes `log` records from fanout-core through a stderr subscriber.
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init()
    {
        eprintln!("[warn] failed to initialise logging: {err}");
    }
}
