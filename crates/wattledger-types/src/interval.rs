// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Half-open interval records.
//!
//! Every record covers `[start, end)`. Rate intervals may be open-ended, in which case
//! `valid_to` is `None` and compares as positive infinity.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::energy::PaymentMethod;

/// Anything occupying a closed-open span of time
pub trait TimeSpan {
    fn start(&self) -> DateTime<Utc>;
    fn end(&self) -> DateTime<Utc>;

    fn duration(&self) -> TimeDelta {
        self.end() - self.start()
    }
}

/// Metered quantity over one reading interval (kWh for electricity, m3 for gas)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub quantity: Decimal,
}

impl ConsumptionInterval {
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, quantity: Decimal) -> Self {
        Self {
            start,
            end,
            quantity,
        }
    }
}

impl TimeSpan for ConsumptionInterval {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }

    fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// One tariff component value (unit rate, standing charge or calorific value) over a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateInterval {
    pub valid_from: DateTime<Utc>,
    /// `None` means the rate is still in force
    pub valid_to: Option<DateTime<Utc>>,
    /// Pence per kWh for unit rates, pence per day for standing charges, MJ/m3 for calorific values
    pub value: Decimal,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

impl RateInterval {
    #[must_use]
    pub fn new(
        valid_from: DateTime<Utc>,
        valid_to: Option<DateTime<Utc>>,
        value: Decimal,
    ) -> Self {
        Self {
            valid_from,
            valid_to,
            value,
            payment_method: None,
        }
    }

    /// Upper bound with open-ended rates mapped to the largest representable instant
    #[must_use]
    pub fn valid_until(&self) -> DateTime<Utc> {
        self.valid_to.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// True when this rate is in force at some point of `[start, end)`
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.valid_from < end && self.valid_until() > start
    }
}

/// Daily gas energy-content factor for one distribution zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalorificRecord {
    pub date: NaiveDate,
    pub exit_zone: String,
    /// MJ/m3
    pub value: Decimal,
}

impl CalorificRecord {
    /// The record as a rate interval covering its UTC calendar day
    #[must_use]
    pub fn to_rate_interval(&self) -> RateInterval {
        let valid_from = self.date.and_time(NaiveTime::MIN).and_utc();
        RateInterval::new(valid_from, Some(valid_from + TimeDelta::days(1)), self.value)
    }
}
