// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use rust_decimal::Decimal;
use tracing::{debug, info};
use wattledger_core::{CalorificProvider, ConsumptionProvider, ProductProvider, RateProvider};
use wattledger_types::{
    CalorificRecord, ConsumptionInterval, CostType, PaymentMethod, ProductRecord, RateInterval,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS consumption (
        meter_ref TEXT NOT NULL,
        interval_start INTEGER NOT NULL,
        interval_end INTEGER NOT NULL,
        quantity TEXT NOT NULL,
        PRIMARY KEY (meter_ref, interval_start)
    );

    CREATE TABLE IF NOT EXISTS rates (
        tariff_code TEXT NOT NULL,
        cost_type TEXT NOT NULL,
        valid_from INTEGER NOT NULL,
        valid_to INTEGER,
        value TEXT NOT NULL,
        payment_method TEXT NOT NULL DEFAULT '',
        UNIQUE (tariff_code, cost_type, valid_from, payment_method)
    );

    CREATE INDEX IF NOT EXISTS idx_rates_lookup ON rates(tariff_code, cost_type, valid_from);

    CREATE TABLE IF NOT EXISTS calorific_values (
        applicable_date TEXT NOT NULL,
        exit_zone TEXT NOT NULL,
        value TEXT NOT NULL,
        PRIMARY KEY (applicable_date, exit_zone)
    );

    CREATE TABLE IF NOT EXISTS products (
        code TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        full_name TEXT NOT NULL,
        brand TEXT NOT NULL,
        available_from INTEGER NOT NULL,
        available_to INTEGER
    );
";

/// SQLite-backed store for consumption, rates, calorific values and the product catalogue.
///
/// Every query opens its own short-lived connection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Open the store, creating any missing tables
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let store = Self::new(db_path);
        store.init()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open database at {}", self.db_path.display()))
    }

    pub fn init(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create database schema")?;
        Ok(())
    }

    /// Upsert readings for one meter
    pub fn insert_consumption(
        &self,
        meter_ref: &str,
        rows: &[ConsumptionInterval],
    ) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO consumption (meter_ref, interval_start, interval_end, quantity)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (meter_ref, interval_start) DO UPDATE
                 SET interval_end = excluded.interval_end, quantity = excluded.quantity",
            )?;
            for row in rows {
                stmt.execute(params![
                    meter_ref,
                    row.start.timestamp(),
                    row.end.timestamp(),
                    row.quantity.to_string(),
                ])?;
            }
        }
        tx.commit()?;

        info!(meter_ref, rows = rows.len(), "Stored consumption");
        Ok(rows.len())
    }

    /// Upsert one tariff component series
    pub fn insert_rates(
        &self,
        tariff_code: &str,
        cost_type: CostType,
        rates: &[RateInterval],
    ) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO rates (tariff_code, cost_type, valid_from, valid_to, value, payment_method)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (tariff_code, cost_type, valid_from, payment_method) DO UPDATE
                 SET valid_to = excluded.valid_to, value = excluded.value",
            )?;
            for rate in rates {
                stmt.execute(params![
                    tariff_code,
                    cost_type.as_str(),
                    rate.valid_from.timestamp(),
                    rate.valid_to.map(|to| to.timestamp()),
                    rate.value.to_string(),
                    rate.payment_method.map_or("", PaymentMethod::as_str),
                ])?;
            }
        }
        tx.commit()?;

        info!(tariff_code, %cost_type, rows = rates.len(), "Stored rates");
        Ok(rates.len())
    }

    pub fn insert_calorific_values(&self, records: &[CalorificRecord]) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO calorific_values (applicable_date, exit_zone, value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (applicable_date, exit_zone) DO UPDATE SET value = excluded.value",
            )?;
            for record in records {
                stmt.execute(params![
                    record.date.format("%Y-%m-%d").to_string(),
                    record.exit_zone,
                    record.value.to_string(),
                ])?;
            }
        }
        tx.commit()?;

        info!(rows = records.len(), "Stored calorific values");
        Ok(records.len())
    }

    pub fn insert_products(&self, products: &[ProductRecord]) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO products (code, display_name, full_name, brand, available_from, available_to)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (code) DO UPDATE
                 SET display_name = excluded.display_name, full_name = excluded.full_name,
                     brand = excluded.brand, available_from = excluded.available_from,
                     available_to = excluded.available_to",
            )?;
            for product in products {
                stmt.execute(params![
                    product.code,
                    product.display_name,
                    product.full_name,
                    product.brand,
                    product.available_from.timestamp(),
                    product.available_to.map(|to| to.timestamp()),
                ])?;
            }
        }
        tx.commit()?;

        info!(rows = products.len(), "Stored products");
        Ok(products.len())
    }

    /// Row count of every table
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        let conn = self.connect()?;
        ["consumption", "rates", "calorific_values", "products"]
            .into_iter()
            .map(|table| -> Result<(&'static str, i64)> {
                let count: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
                Ok((table, count))
            })
            .collect()
    }

    fn products_where(&self, column: &str, value: &str) -> Result<Vec<ProductRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT code, display_name, full_name, brand, available_from, available_to
             FROM products
             WHERE {column} = ?1
             ORDER BY available_from ASC"
        ))?;

        let products = stmt
            .query_map([value], |row| {
                Ok(ProductRecord {
                    code: row.get(0)?,
                    display_name: row.get(1)?,
                    full_name: row.get(2)?,
                    brand: row.get(3)?,
                    available_from: instant_column(row, 4)?,
                    available_to: optional_instant_column(row, 5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(products)
    }
}

impl ConsumptionProvider for SqliteStore {
    fn fetch_consumption(
        &self,
        meter_ref: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ConsumptionInterval>> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare(
            "SELECT interval_start, interval_end, quantity FROM consumption
             WHERE meter_ref = ?1 AND interval_start >= ?2 AND interval_start < ?3
             ORDER BY interval_start ASC",
        )?;

        let rows = stmt
            .query_map(params![meter_ref, from.timestamp(), to.timestamp()], |row| {
                Ok(ConsumptionInterval {
                    start: instant_column(row, 0)?,
                    end: instant_column(row, 1)?,
                    quantity: decimal_column(row, 2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read consumption for {meter_ref}"))?;

        debug!(meter_ref, rows = rows.len(), "Loaded consumption");
        Ok(rows)
    }
}

impl RateProvider for SqliteStore {
    fn fetch_rates(
        &self,
        tariff_code: &str,
        cost_type: CostType,
        payment_method: PaymentMethod,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RateInterval>> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare(
            "SELECT valid_from, valid_to, value, payment_method FROM rates
             WHERE tariff_code = ?1 AND cost_type = ?2
               AND (payment_method = '' OR payment_method = ?3)
               AND valid_from < ?5 AND (valid_to IS NULL OR valid_to > ?4)
             ORDER BY valid_from ASC",
        )?;

        let rates = stmt
            .query_map(
                params![
                    tariff_code,
                    cost_type.as_str(),
                    payment_method.as_str(),
                    from.timestamp(),
                    to.timestamp(),
                ],
                |row| {
                    let method: String = row.get(3)?;
                    Ok(RateInterval {
                        valid_from: instant_column(row, 0)?,
                        valid_to: optional_instant_column(row, 1)?,
                        value: decimal_column(row, 2)?,
                        payment_method: method.parse().ok(),
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read {cost_type} for {tariff_code}"))?;

        debug!(tariff_code, %cost_type, rows = rates.len(), "Loaded rates");
        Ok(rates)
    }
}

impl CalorificProvider for SqliteStore {
    fn fetch_calorific_values(
        &self,
        exit_zone: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalorificRecord>> {
        let conn = self.connect()?;

        // Every gas day overlapping [from, to)
        let first = from.date_naive();
        let last = (to - TimeDelta::seconds(1)).date_naive();

        let mut stmt = conn.prepare(
            "SELECT applicable_date, exit_zone, value FROM calorific_values
             WHERE exit_zone = ?1 AND applicable_date >= ?2 AND applicable_date <= ?3
             ORDER BY applicable_date ASC",
        )?;

        let records = stmt
            .query_map(
                params![
                    exit_zone,
                    first.format("%Y-%m-%d").to_string(),
                    last.format("%Y-%m-%d").to_string(),
                ],
                |row| {
                    let date: String = row.get(0)?;
                    Ok(CalorificRecord {
                        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
                        })?,
                        exit_zone: row.get(1)?,
                        value: decimal_column(row, 2)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read calorific values for {exit_zone}"))?;

        Ok(records)
    }
}

impl ProductProvider for SqliteStore {
    fn products_by_family(&self, display_name: &str) -> Result<Vec<ProductRecord>> {
        self.products_where("display_name", display_name)
    }

    fn products_by_code(&self, code: &str) -> Result<Vec<ProductRecord>> {
        self.products_where("code", code)
    }
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn instant_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let seconds: i64 = row.get(idx)?;
    DateTime::from_timestamp(seconds, 0)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, seconds))
}

fn optional_instant_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let seconds: Option<i64> = row.get(idx)?;
    seconds
        .map(|s| DateTime::from_timestamp(s, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, s)))
        .transpose()
}
