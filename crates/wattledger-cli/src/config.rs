// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Deserialize;
use wattledger_core::BillingCalendar;
use wattledger_types::{Agreement, CostType, EnergyType, PaymentMethod};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSettings,
    pub account: AccountSettings,
    #[serde(default)]
    pub billing: BillingSettings,
    #[serde(default)]
    pub methods: Vec<MethodSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountSettings {
    pub id: String,
    /// Saved supplier account document (JSON)
    pub document: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: i64,
    /// Overrides the zone found in the account document
    #[serde(default)]
    pub distribution_zone: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub electricity_moved_in: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gas_moved_in: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingSettings {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_safety_margin_days")]
    pub safety_margin_days: i64,
}

/// One `[[methods]]` entry. Exactly one of `bill`, `product_family`, `product_code` or
/// `agreements` says where its agreements come from.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodSettings {
    #[serde(default)]
    pub name: Option<String>,
    pub energy_type: EnergyType,
    #[serde(default)]
    pub bill: bool,
    #[serde(default)]
    pub product_family: Option<String>,
    #[serde(default)]
    pub product_code: Option<String>,
    #[serde(default)]
    pub agreements: Vec<AgreementSettings>,
    #[serde(default)]
    pub required: BTreeSet<CostType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgreementSettings {
    /// Tariff code, or a label when literal rates are given
    pub tariff_code: String,
    pub valid_from: DateTime<Utc>,
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
    /// Pence per kWh
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub unit_rate: Option<Decimal>,
    /// Pence per day
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub standing_charge: Option<Decimal>,
}

/// Where a configured method gets its agreements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSource<'a> {
    Bill,
    ProductFamily(&'a str),
    ProductCode(&'a str),
    Agreements(&'a [AgreementSettings]),
}

const MAX_CACHE_TTL_HOURS: i64 = 24 * 365 * 10;
const MAX_SAFETY_MARGIN_DAYS: i64 = 365 * 10;

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/wattledger.db")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./data/accounts")
}

fn default_cache_ttl_hours() -> i64 {
    24
}

fn default_timezone() -> String {
    "Europe/London".to_owned()
}

fn default_safety_margin_days() -> i64 {
    wattledger_core::calendar::DEFAULT_SAFETY_MARGIN_DAYS
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            safety_margin_days: default_safety_margin_days(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.account.id.trim().is_empty() {
            bail!("account.id must be set");
        }
        if !(0..=MAX_CACHE_TTL_HOURS).contains(&self.account.cache_ttl_hours) {
            bail!("account.cache_ttl_hours must be between 0 and {MAX_CACHE_TTL_HOURS}");
        }
        if !(0..=MAX_SAFETY_MARGIN_DAYS).contains(&self.billing.safety_margin_days) {
            bail!("billing.safety_margin_days must be between 0 and {MAX_SAFETY_MARGIN_DAYS}");
        }
        self.billing.tz()?;

        for (index, method) in self.methods.iter().enumerate() {
            let sources = usize::from(method.bill)
                + usize::from(method.product_family.is_some())
                + usize::from(method.product_code.is_some())
                + usize::from(!method.agreements.is_empty());
            if sources != 1 {
                bail!(
                    "methods[{index}] must set exactly one of bill, product_family, product_code or agreements"
                );
            }
            if !method.agreements.is_empty() && method.name.is_none() {
                bail!("methods[{index}] with literal agreements needs a name");
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Result<TimeDelta> {
        TimeDelta::try_hours(self.account.cache_ttl_hours).with_context(|| {
            format!(
                "account.cache_ttl_hours {} is out of range",
                self.account.cache_ttl_hours
            )
        })
    }

    pub fn moved_in(&self, energy_type: EnergyType) -> Option<DateTime<Utc>> {
        match energy_type {
            EnergyType::Electricity => self.account.electricity_moved_in,
            EnergyType::Gas => self.account.gas_moved_in,
        }
    }

    pub fn methods_for(&self, energy_type: EnergyType) -> impl Iterator<Item = &MethodSettings> {
        self.methods
            .iter()
            .filter(move |m| m.energy_type == energy_type)
    }
}

impl BillingSettings {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("billing.timezone {:?} is invalid: {e}", self.timezone))
    }

    pub fn calendar(&self) -> Result<BillingCalendar> {
        Ok(BillingCalendar::new(self.tz()?, self.safety_margin_days))
    }
}

impl MethodSettings {
    pub fn source(&self) -> MethodSource<'_> {
        if self.bill {
            MethodSource::Bill
        } else if let Some(family) = &self.product_family {
            MethodSource::ProductFamily(family)
        } else if let Some(code) = &self.product_code {
            MethodSource::ProductCode(code)
        } else {
            MethodSource::Agreements(&self.agreements)
        }
    }

    pub fn agreements(&self) -> Vec<Agreement> {
        self.agreements
            .iter()
            .map(|a| {
                Agreement::custom(
                    a.tariff_code.clone(),
                    self.energy_type,
                    a.valid_from,
                    a.valid_to,
                    a.unit_rate,
                    a.standing_charge,
                )
            })
            .collect()
    }
}
