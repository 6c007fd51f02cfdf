// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Billing methods: a named chain of agreements and its last calculation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use wattledger_types::{Agreement, CostType, EnergyType};

use crate::cost::CostRow;
use crate::error::DateRangeError;

/// Result of the last `calculate` for a method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCalculation {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub rows: Vec<CostRow>,
    /// Cost types that had rate data over the window
    pub cost_types: BTreeSet<CostType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    name: String,
    energy_type: EnergyType,
    agreements: Vec<Agreement>,
    from_date: DateTime<Utc>,
    to_date: Option<DateTime<Utc>>,
    required: BTreeSet<CostType>,
    calculation: Option<MethodCalculation>,
}

impl Method {
    /// Build a method from its agreements.
    ///
    /// Agreements are sorted by `valid_from`. Zero-length agreements are kept but ignored for
    /// bounds and overlap checks.
    pub fn new(
        energy_type: EnergyType,
        name: impl Into<String>,
        mut agreements: Vec<Agreement>,
        required: BTreeSet<CostType>,
    ) -> Result<Self, DateRangeError> {
        let name = name.into();
        agreements.sort_by_key(|a| a.valid_from);

        let mut usable = agreements.iter().filter(|a| !a.is_degenerate());
        let Some(first) = usable.next() else {
            return Err(DateRangeError::EmptyAgreements { method: name });
        };

        let mut furthest = first;
        let mut open_ended = first.valid_to.is_none();
        for agreement in usable {
            if agreement.valid_from < furthest.valid_until() {
                return Err(DateRangeError::OverlappingAgreements {
                    method: name,
                    first: furthest.tariff_code.clone(),
                    second: agreement.tariff_code.clone(),
                });
            }
            open_ended |= agreement.valid_to.is_none();
            if agreement.valid_until() > furthest.valid_until() {
                furthest = agreement;
            }
        }

        let from_date = first.valid_from;
        let to_date = if open_ended { None } else { furthest.valid_to };

        Ok(Self {
            name,
            energy_type,
            agreements,
            from_date,
            to_date,
            required,
            calculation: None,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn energy_type(&self) -> EnergyType {
        self.energy_type
    }

    #[must_use]
    pub fn agreements(&self) -> &[Agreement] {
        &self.agreements
    }

    /// Agreements that take part in billing, in order
    pub fn active_agreements(&self) -> impl Iterator<Item = &Agreement> {
        self.agreements.iter().filter(|a| !a.is_degenerate())
    }

    #[must_use]
    pub fn from_date(&self) -> DateTime<Utc> {
        self.from_date
    }

    /// `None` when the last agreement is open-ended
    #[must_use]
    pub fn to_date(&self) -> Option<DateTime<Utc>> {
        self.to_date
    }

    /// True when `[from, to)` lies within the method's own bounds
    #[must_use]
    pub fn contains(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.from_date <= from && self.to_date.is_none_or(|end| to <= end)
    }

    #[must_use]
    pub fn requires(&self, cost_type: CostType) -> bool {
        self.required.contains(&cost_type)
    }

    #[must_use]
    pub fn calculation(&self) -> Option<&MethodCalculation> {
        self.calculation.as_ref()
    }

    pub fn set_calculation(&mut self, calculation: MethodCalculation) {
        self.calculation = Some(calculation);
    }

    pub fn clear_calculation(&mut self) {
        self.calculation = None;
    }
}
