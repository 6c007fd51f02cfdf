// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};
use wattledger_core::{BillingCalendar, BillingSession, resolve_account};
use wattledger_store::{FileAccountSource, JsonSnapshotCache, SqliteStore, import};
use wattledger_types::EnergyType;

use crate::args::{ImportCommand, ReportArgs, WindowArgs};
use crate::config::{Config, MethodSettings, MethodSource};
use crate::formatters::TableFormatter;

pub fn run_import(config: &Config, command: ImportCommand) -> Result<String> {
    let store = SqliteStore::open(&config.database.path)?;

    let imported = match command {
        ImportCommand::Consumption { meter_ref, file } => {
            store.insert_consumption(&meter_ref, &import::consumption_from_path(&file)?)?
        }
        ImportCommand::Rates {
            tariff_code,
            cost_type,
            file,
        } => store.insert_rates(&tariff_code, cost_type, &import::rates_from_path(&file)?)?,
        ImportCommand::Calorific { file } => {
            store.insert_calorific_values(&import::calorific_from_path(&file)?)?
        }
        ImportCommand::Products { file } => {
            store.insert_products(&import::products_from_path(&file)?)?
        }
    };

    Ok(format!(
        "Imported {imported} rows into {}\n{}",
        config.database.path.display(),
        TableFormatter::format_counts(&store.table_counts()?)
    ))
}

pub fn run_report(config: &Config, args: &ReportArgs) -> Result<String> {
    let session = calculated_session(config, &args.window)?;
    let calendar = session.calendar();

    let summary = session.report(
        args.window.energy,
        &args.method,
        args.report_from.map(|d| calendar.local_midnight(d)),
        args.report_to.map(|d| calendar.local_midnight(d)),
    )?;

    Ok(TableFormatter::format_bill(&summary, calendar.tz))
}

pub fn run_compare(config: &Config, args: &WindowArgs) -> Result<String> {
    let session = calculated_session(config, args)?;
    let comparison = session.compare(args.energy, None, None)?;
    Ok(TableFormatter::format_comparison(&comparison))
}

/// Raw consumption checks, plus method row counts when the calculation succeeds
pub fn run_checks(config: &Config, args: &WindowArgs) -> Result<String> {
    let now = Utc::now();
    let mut session = build_session(config, args.energy, now)?;
    let (from, to) = window(session.calendar(), args.from, args.to);

    if let Err(err) = session.calculate_at(args.energy, from, to, now) {
        warn!(energy_type = %args.energy, error = %err, "Calculation failed, checking consumption only");
    }
    let checks = session.checks_at(args.energy, from, to, now)?;
    Ok(TableFormatter::format_checks(&checks, session.calendar().tz))
}

/// Session for the configured account with the configured methods of one energy type registered
pub fn build_session(
    config: &Config,
    energy_type: EnergyType,
    now: DateTime<Utc>,
) -> Result<BillingSession<SqliteStore>> {
    let store = SqliteStore::open(&config.database.path)?;
    let cache = JsonSnapshotCache::new(&config.account.cache_dir, config.cache_ttl()?);
    let source = FileAccountSource::new(&config.account.document);
    let account = resolve_account(&cache, &source, &config.account.id, now)?;

    let mut session = BillingSession::new(store, account)
        .with_calendar(config.billing.calendar()?)
        .with_payment_method(config.account.payment_method);
    if let Some(zone) = &config.account.distribution_zone {
        session = session.with_distribution_zone(zone.clone());
    }
    if let Some(moved_in) = config.moved_in(energy_type) {
        session = session.with_moved_in(energy_type, moved_in);
    }

    for method in config.methods_for(energy_type) {
        register_method(&mut session, method)
            .with_context(|| format!("Failed to register {energy_type} method"))?;
    }

    Ok(session)
}

fn register_method(session: &mut BillingSession<SqliteStore>, method: &MethodSettings) -> Result<()> {
    let energy_type = method.energy_type;
    let required = method.required.clone();

    match method.source() {
        MethodSource::Bill => session.add_bill(energy_type)?,
        MethodSource::ProductFamily(family) => {
            session.add_method_by_product_family(energy_type, family, required, false)?;
        }
        MethodSource::ProductCode(code) => {
            session.add_method_by_product_code(energy_type, code, required, false)?;
        }
        MethodSource::Agreements(_) => {
            let name = method.name.as_deref().unwrap_or_default();
            session.add_method(energy_type, name, method.agreements(), required, false)?;
        }
    }
    Ok(())
}

fn calculated_session(config: &Config, args: &WindowArgs) -> Result<BillingSession<SqliteStore>> {
    let now = Utc::now();
    let mut session = build_session(config, args.energy, now)?;
    let (from, to) = window(session.calendar(), args.from, args.to);

    session.calculate_at(args.energy, from, to, now)?;
    info!(energy_type = %args.energy, "Calculation complete");
    Ok(session)
}

fn window(
    calendar: &BillingCalendar,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (
        from.map(|d| calendar.local_midnight(d)),
        to.map(|d| calendar.local_midnight(d)),
    )
}
