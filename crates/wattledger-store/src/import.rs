// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! CSV parsers for supplier and National Gas exports.
//!
//! Each parser reads from any `Read` so tests can feed string literals; the `*_from_path`
//! wrappers add the file name to errors.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;
use wattledger_types::{
    CalorificRecord, ConsumptionInterval, PaymentMethod, ProductRecord, RateInterval,
};

#[derive(Debug, Deserialize)]
struct ConsumptionRow {
    #[serde(
        alias = "Consumption (kWh)",
        alias = "Consumption (kwh)",
        alias = "Consumption (m³)",
        alias = "Consumption (m3)",
        with = "rust_decimal::serde::str"
    )]
    consumption: Decimal,
    #[serde(alias = "Start")]
    interval_start: DateTime<Utc>,
    #[serde(alias = "End")]
    interval_end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RateRow {
    #[serde(with = "rust_decimal::serde::str")]
    value_exc_vat: Decimal,
    valid_from: DateTime<Utc>,
    #[serde(default)]
    valid_to: Option<DateTime<Utc>>,
    #[serde(default)]
    payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    code: String,
    display_name: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    brand: String,
    available_from: DateTime<Utc>,
    #[serde(default)]
    available_to: Option<DateTime<Utc>>,
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new().trim(Trim::All).from_reader(input)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

/// Parse half-hourly readings (`consumption,interval_start,interval_end`)
pub fn parse_consumption<R: Read>(input: R) -> Result<Vec<ConsumptionInterval>> {
    let mut rows = Vec::new();
    for (index, result) in reader(input).deserialize::<ConsumptionRow>().enumerate() {
        let row = result.with_context(|| format!("Failed to parse consumption row {}", index + 1))?;
        if row.interval_end <= row.interval_start {
            bail!(
                "Consumption row {} ends at {} before it starts at {}",
                index + 1,
                row.interval_end,
                row.interval_start
            );
        }
        rows.push(ConsumptionInterval::new(
            row.interval_start,
            row.interval_end,
            row.consumption,
        ));
    }

    debug!(rows = rows.len(), "Parsed consumption CSV");
    Ok(rows)
}

pub fn consumption_from_path(path: &Path) -> Result<Vec<ConsumptionInterval>> {
    parse_consumption(open(path)?)
        .with_context(|| format!("Failed to import consumption from {}", path.display()))
}

/// Parse a tariff component export (`value_exc_vat,value_inc_vat,valid_from,valid_to,payment_method`).
///
/// Values are kept exclusive of VAT, which is added when a bill is reported. An empty
/// `valid_to` marks a rate that is still in force.
pub fn parse_rates<R: Read>(input: R) -> Result<Vec<RateInterval>> {
    let mut rates = Vec::new();
    for (index, result) in reader(input).deserialize::<RateRow>().enumerate() {
        let row = result.with_context(|| format!("Failed to parse rate row {}", index + 1))?;
        if row.valid_to.is_some_and(|to| to <= row.valid_from) {
            bail!("Rate row {} has valid_to before valid_from", index + 1);
        }
        rates.push(RateInterval {
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            value: row.value_exc_vat,
            payment_method: row.payment_method,
        });
    }

    debug!(rows = rates.len(), "Parsed rates CSV");
    Ok(rates)
}

pub fn rates_from_path(path: &Path) -> Result<Vec<RateInterval>> {
    parse_rates(open(path)?).with_context(|| format!("Failed to import rates from {}", path.display()))
}

/// Parse a National Gas data item export.
///
/// Columns are positional: applicable at, applicable for (the gas day), data item
/// (`Calorific Value, LDZ(NW)`), value. Rows for other data items are skipped.
pub fn parse_calorific<R: Read>(input: R) -> Result<Vec<CalorificRecord>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input);

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read calorific row {}", index + 1))?;
        if let Some(record) = calorific_record(&row)
            .with_context(|| format!("Failed to parse calorific row {}", index + 1))?
        {
            records.push(record);
        }
    }

    debug!(rows = records.len(), "Parsed calorific value CSV");
    Ok(records)
}

pub fn calorific_from_path(path: &Path) -> Result<Vec<CalorificRecord>> {
    parse_calorific(open(path)?)
        .with_context(|| format!("Failed to import calorific values from {}", path.display()))
}

fn calorific_record(row: &StringRecord) -> Result<Option<CalorificRecord>> {
    let (Some(date), Some(item), Some(value)) = (row.get(1), row.get(2), row.get(3)) else {
        return Ok(None);
    };
    let Some(exit_zone) = exit_zone(item) else {
        return Ok(None);
    };

    Ok(Some(CalorificRecord {
        date: parse_gas_day(date)?,
        exit_zone: exit_zone.to_owned(),
        value: Decimal::from_str(value).with_context(|| format!("Invalid calorific value {value:?}"))?,
    }))
}

/// `"Calorific Value, LDZ(NW)"` -> `"NW"`
fn exit_zone(item: &str) -> Option<&str> {
    let rest = item.strip_prefix("Calorific Value, LDZ(")?;
    let zone = rest.strip_suffix(')')?;
    (!zone.is_empty() && zone.chars().all(|c| c.is_ascii_alphanumeric())).then_some(zone)
}

fn parse_gas_day(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .with_context(|| format!("Invalid gas day {text:?}"))
}

/// Parse a product catalogue export
pub fn parse_products<R: Read>(input: R) -> Result<Vec<ProductRecord>> {
    let products = reader(input)
        .deserialize::<ProductRow>()
        .enumerate()
        .map(|(index, result)| -> Result<ProductRecord> {
            let row = result.with_context(|| format!("Failed to parse product row {}", index + 1))?;
            Ok(ProductRecord {
                code: row.code,
                display_name: row.display_name,
                full_name: row.full_name,
                brand: row.brand,
                available_from: row.available_from,
                available_to: row.available_to,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(rows = products.len(), "Parsed products CSV");
    Ok(products)
}

pub fn products_from_path(path: &Path) -> Result<Vec<ProductRecord>> {
    parse_products(open(path)?)
        .with_context(|| format!("Failed to import products from {}", path.display()))
}
