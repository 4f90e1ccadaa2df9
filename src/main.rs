//! `wadder`: inspect and extract Doom WAD archives.
//!
//! ```bash
//! cargo run --release -- doom1.wad --find E1 --save-patch 1200 --format png
//! ```

use clap::Parser;
use env_logger::Env;
use log::{LevelFilter, warn};

use wadder::app;
use wadder::config::{Cli, Config};

fn main() -> anyhow::Result<()> {
    let config = Config::from_cli(Cli::parse());

    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if config.quiet {
        logger.filter_level(LevelFilter::Warn);
    }
    logger.init();

    let outcome = app::run(&config)?;
    if !outcome.is_success() {
        warn!(
            "{} of {} actions failed",
            outcome.failures,
            outcome.failures + outcome.succeeded
        );
        std::process::exit(1);
    }
    Ok(())
}
