//! Homer - A minimalist static site generator for personal wikis.

mod build;
mod cli;
mod config;
mod logger;
mod serve;
mod utils;

use anyhow::Result;
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use logger::{Logger, Verbosity};
use serve::serve_site;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let logger = Logger::new(Verbosity::from_flags(cli.verbose, cli.quiet));
    let config = SiteConfig::load(&cli)?;
    config.validate()?;
    debug!(
        logger, "config";
        "root {}, config {}", config.root.display(), config.config_path.display()
    );

    match &cli.command {
        Commands::Build { .. } => build_site(&config, &logger).map(|_| ())?,
        Commands::Run { .. } => serve_site(&config, config.serve.reload, &logger)?,
        Commands::Dev { .. } => {
            build_site(&config, &logger)?;
            serve_site(&config, true, &logger)?;
        }
    }

    Ok(())
}
