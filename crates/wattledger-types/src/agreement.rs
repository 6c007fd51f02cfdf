// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::energy::{CostType, EnergyType};

/// A tariff agreement in force over `[valid_from, valid_to)`
///
/// An agreement either carries literal rates (a custom or manually entered tariff) or
/// references a tariff code whose rate series is looked up through a rate provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub tariff_code: String,
    pub valid_from: DateTime<Utc>,
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
    /// Pence per kWh
    #[serde(default)]
    pub unit_rate: Option<Decimal>,
    /// Pence per day
    #[serde(default)]
    pub standing_charge: Option<Decimal>,
    pub energy_type: EnergyType,
}

impl Agreement {
    /// Agreement resolved through the rate provider
    #[must_use]
    pub fn tariff(
        tariff_code: impl Into<String>,
        energy_type: EnergyType,
        valid_from: DateTime<Utc>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            tariff_code: tariff_code.into(),
            valid_from,
            valid_to,
            unit_rate: None,
            standing_charge: None,
            energy_type,
        }
    }

    /// Agreement with literal rates
    #[must_use]
    pub fn custom(
        name: impl Into<String>,
        energy_type: EnergyType,
        valid_from: DateTime<Utc>,
        valid_to: Option<DateTime<Utc>>,
        unit_rate: Option<Decimal>,
        standing_charge: Option<Decimal>,
    ) -> Self {
        Self {
            tariff_code: name.into(),
            valid_from,
            valid_to,
            unit_rate,
            standing_charge,
            energy_type,
        }
    }

    /// Carries at least one literal rate and is never looked up by tariff code
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.unit_rate.is_some() || self.standing_charge.is_some()
    }

    /// Zero-length agreements are recorded by suppliers on same-day switches and carry no billing
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.valid_to == Some(self.valid_from)
    }

    #[must_use]
    pub fn literal_rate(&self, cost_type: CostType) -> Option<Decimal> {
        match cost_type {
            CostType::UnitRate => self.unit_rate,
            CostType::StandingCharge => self.standing_charge,
        }
    }

    #[must_use]
    pub fn valid_until(&self) -> DateTime<Utc> {
        self.valid_to.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.valid_from < other.valid_until() && other.valid_from < self.valid_until()
    }
}
