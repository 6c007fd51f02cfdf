// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Per-interval cost rows

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use wattledger_types::{ConsumptionInterval, CostType, EnergyType, TimeSpan};

use crate::conversion::convert;
use crate::error::{BillingError, DateSpan, Result};
use crate::join::Matched;

const SECONDS_PER_DAY: Decimal = dec!(86400);

/// Costs of one consumption interval, in pence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostRow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Metered quantity
    pub consumption: Decimal,
    /// Billable kWh
    pub consumption_converted: Decimal,
    pub calorific_value: Option<Decimal>,
    pub unit_rate: Option<Decimal>,
    pub standing_charge: Option<Decimal>,
    pub unit_rate_cost: Option<Decimal>,
    pub standing_charge_cost: Option<Decimal>,
}

impl CostRow {
    /// Sum of the components present, rounded to whole hundredths of a penny
    #[must_use]
    pub fn total(&self) -> Decimal {
        let unit = self.unit_rate_cost.unwrap_or_default();
        let standing = self.standing_charge_cost.unwrap_or_default();
        (unit + standing).round_dp(2)
    }
}

impl TimeSpan for CostRow {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }

    fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Rate values keyed by consumption interval start
pub type RateLookup = BTreeMap<DateTime<Utc>, Decimal>;

#[must_use]
pub fn lookup(matched: &[Matched]) -> RateLookup {
    matched
        .iter()
        .map(|m| (m.consumption.start, m.rate.value))
        .collect()
}

/// Joined rate series for one method. `None` marks a cost type without any rate data.
#[derive(Debug, Clone, Default)]
pub struct JoinedRates {
    pub unit_rates: Option<RateLookup>,
    pub standing_charges: Option<RateLookup>,
    pub calorific_values: Option<RateLookup>,
}

impl JoinedRates {
    #[must_use]
    pub fn get(&self, cost_type: CostType) -> Option<&RateLookup> {
        match cost_type {
            CostType::UnitRate => self.unit_rates.as_ref(),
            CostType::StandingCharge => self.standing_charges.as_ref(),
        }
    }
}

/// Cost every consumption interval.
///
/// Unit rate cost is `rate * converted quantity`. Standing charges are quoted per day and are
/// pro-rated by the interval length in seconds.
pub fn compute(
    name: &str,
    energy_type: EnergyType,
    consumption: &[ConsumptionInterval],
    rates: &JoinedRates,
    tz: Tz,
) -> Result<Vec<CostRow>> {
    consumption
        .iter()
        .enumerate()
        .map(|(index, interval)| {
            let missing = |what: &str| BillingError::MissingData {
                name: format!("{name} {what}"),
                available: None,
                required: DateSpan::closed(interval.start, interval.end, tz),
                missing_days: interval.duration().num_days(),
                rows: index,
                expected_rows: consumption.len(),
            };

            let calorific_value = rates
                .calorific_values
                .as_ref()
                .and_then(|cv| cv.get(&interval.start).copied());
            let consumption_converted = convert(interval.quantity, energy_type, calorific_value)
                .ok_or_else(|| missing("calorific values"))?;

            let rate_for = |cost_type: CostType| -> Result<Option<Decimal>> {
                rates
                    .get(cost_type)
                    .map(|series| {
                        series
                            .get(&interval.start)
                            .copied()
                            .ok_or_else(|| missing(cost_type.label()))
                    })
                    .transpose()
            };
            let unit_rate = rate_for(CostType::UnitRate)?;
            let standing_charge = rate_for(CostType::StandingCharge)?;

            let days = Decimal::from(interval.duration().num_seconds()) / SECONDS_PER_DAY;

            Ok(CostRow {
                start: interval.start,
                end: interval.end,
                consumption: interval.quantity,
                consumption_converted,
                calorific_value: calorific_value.filter(|_| energy_type == EnergyType::Gas),
                unit_rate,
                standing_charge,
                unit_rate_cost: unit_rate.map(|rate| rate * consumption_converted),
                standing_charge_cost: standing_charge.map(|rate| rate * days),
            })
        })
        .collect()
}
