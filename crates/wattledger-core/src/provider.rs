// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Data provider interfaces.
//!
//! The engine never talks to storage or supplier APIs directly. Series are fetched through
//! these traits, all I/O happening before any join starts.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use wattledger_types::{
    AccountSnapshot, CalorificRecord, ConsumptionInterval, CostType, EnergyType, PaymentMethod,
    ProductRecord, RateInterval,
};

pub trait ConsumptionProvider {
    /// Readings of one meter starting within `[from, to)`, ordered by start
    fn fetch_consumption(
        &self,
        meter_ref: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ConsumptionInterval>>;
}

pub trait RateProvider {
    /// Rates of one tariff component in force at any point of `[from, to)`.
    ///
    /// Rates without a payment method apply to every payment method.
    fn fetch_rates(
        &self,
        tariff_code: &str,
        cost_type: CostType,
        payment_method: PaymentMethod,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RateInterval>>;
}

pub trait CalorificProvider {
    /// Daily calorific values for a distribution zone with dates within `[from, to)`
    fn fetch_calorific_values(
        &self,
        exit_zone: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalorificRecord>>;
}

pub trait ProductProvider {
    /// Every product sharing a display name, e.g. "Agile Octopus"
    fn products_by_family(&self, display_name: &str) -> Result<Vec<ProductRecord>>;

    fn products_by_code(&self, code: &str) -> Result<Vec<ProductRecord>>;
}

/// Supplier account lookup
pub trait AccountSource {
    fn fetch_account(&self, account_id: &str) -> Result<AccountSnapshot>;
}

/// Local store of account snapshots
pub trait SnapshotCache {
    fn load(&self, account_id: &str) -> Result<Option<AccountSnapshot>>;

    fn store(&self, snapshot: &AccountSnapshot) -> Result<()>;

    fn is_stale(&self, snapshot: &AccountSnapshot, now: DateTime<Utc>) -> bool;
}

/// Everything `calculate` reads from
pub trait DataProviders: ConsumptionProvider + RateProvider + CalorificProvider {}

impl<T: ConsumptionProvider + RateProvider + CalorificProvider> DataProviders for T {}

/// Load the account snapshot from the cache, refreshing it from the source when missing or stale
pub fn resolve_account(
    cache: &dyn SnapshotCache,
    source: &dyn AccountSource,
    account_id: &str,
    now: DateTime<Utc>,
) -> Result<AccountSnapshot> {
    if let Some(snapshot) = cache.load(account_id)? {
        if !cache.is_stale(&snapshot, now) {
            debug!(account_id, updated = %snapshot.updated, "Using cached account snapshot");
            return Ok(snapshot);
        }
        info!(account_id, updated = %snapshot.updated, "Cached account snapshot is stale");
    }

    let snapshot = source.fetch_account(account_id)?;
    cache.store(&snapshot)?;
    info!(
        account_id,
        meters = snapshot.meters.len(),
        electricity = snapshot.meters_for(EnergyType::Electricity).count(),
        gas = snapshot.meters_for(EnergyType::Gas).count(),
        "Account snapshot refreshed"
    );

    Ok(snapshot)
}
