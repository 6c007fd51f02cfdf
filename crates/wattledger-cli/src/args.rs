// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! CLI argument definitions using clap.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use wattledger_types::{CostType, EnergyType};

#[derive(Debug, Parser)]
#[command(name = "wattledger")]
#[command(author, version, about = "Energy bill calculator and tariff comparison")]
#[command(
    long_about = "Recompute energy bills from half-hourly consumption and tariff rates.\n\
    \nEvery configured method is priced over the same window, so bills can be checked against\n\
    the supplier's and alternative tariffs compared side by side.\n\
    \nExamples:\n  \
    wattledger import consumption --meter-ref A-1234_190000_S1 readings.csv\n  \
    wattledger report --energy electricity --from 2024-01-01 --to 2024-02-01\n  \
    wattledger compare --energy gas"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "wattledger.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load CSV exports into the database
    #[command(subcommand)]
    Import(ImportCommand),

    /// Calculate every method and print one method's bill
    Report(ReportArgs),

    /// Calculate every method and compare their totals
    Compare(WindowArgs),

    /// Report repeated consumption readings and the row counts of every method
    Checks(WindowArgs),
}

#[derive(Debug, Subcommand)]
pub enum ImportCommand {
    /// Half-hourly readings (`consumption,interval_start,interval_end`)
    Consumption {
        /// Meter reference, `{account}_{mpan|mprn}_{serial}`
        #[arg(long)]
        meter_ref: String,

        file: PathBuf,
    },

    /// One tariff component (`value_exc_vat,value_inc_vat,valid_from,valid_to,payment_method`)
    Rates {
        #[arg(long)]
        tariff_code: String,

        /// unit_rate or standing_charge
        #[arg(long, value_parser = parse_cost_type)]
        cost_type: CostType,

        file: PathBuf,
    },

    /// National Gas calorific value export
    Calorific { file: PathBuf },

    /// Product catalogue (`code,display_name,full_name,brand,available_from,available_to`)
    Products { file: PathBuf },
}

#[derive(Debug, Args)]
pub struct WindowArgs {
    /// electricity or gas
    #[arg(long, default_value = "electricity", value_parser = parse_energy_type)]
    pub energy: EnergyType,

    /// First day of the window (YYYY-MM-DD), defaults to the move-in date
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Day after the last day of the window (YYYY-MM-DD), defaults to today minus the safety margin
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Method to report on
    #[arg(long, default_value = wattledger_core::BILL_METHOD)]
    pub method: String,

    /// Print the bill for a narrower window than the calculation
    #[arg(long)]
    pub report_from: Option<NaiveDate>,

    #[arg(long)]
    pub report_to: Option<NaiveDate>,
}

fn parse_energy_type(value: &str) -> Result<EnergyType, String> {
    value.parse().map_err(|e: wattledger_types::ParseError| e.to_string())
}

fn parse_cost_type(value: &str) -> Result<CostType, String> {
    value.parse().map_err(|e: wattledger_types::ParseError| e.to_string())
}
