// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! WattLedger CLI - recompute and compare energy bills

mod args;
mod commands;
mod config;
mod formatters;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Commands};
use crate::config::Config;

fn main() -> Result<()> {
    // Respects RUST_LOG, defaulting to info for our crates
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wattledger=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    debug!(config = %cli.config.display(), methods = config.methods.len(), "Loaded config");

    let output = match cli.command {
        Commands::Import(command) => commands::run_import(&config, command)?,
        Commands::Report(args) => commands::run_report(&config, &args)?,
        Commands::Compare(args) => commands::run_compare(&config, &args)?,
        Commands::Checks(args) => commands::run_checks(&config, &args)?,
    };

    print!("{output}");
    Ok(())
}
