// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Bill summaries over a reporting window.
//!
//! Costs are summed in pence and converted to pounds here, at the reporting boundary.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use wattledger_types::{EnergyType, TimeSpan};

use crate::cost::CostRow;
use crate::error::{BillingError, DateRangeError, DateSpan, Result};
use crate::method::Method;

pub const VAT_RATE: Decimal = dec!(0.05);

const PENCE_PER_POUND: Decimal = dec!(100);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillSummary {
    pub method: String,
    pub energy_type: EnergyType,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Billable quantity, rounded to one decimal place
    pub consumption_total: Decimal,
    pub unit: &'static str,
    /// Pounds
    pub unit_cost: Decimal,
    pub standing_days: i64,
    /// Pounds
    pub standing_cost: Decimal,
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
    pub rows: usize,
}

/// One row of the printed bill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillLine {
    pub label: &'static str,
    pub detail: String,
    pub cost: String,
}

impl BillSummary {
    /// Build a summary from the rows overlapping `[from, to)`.
    ///
    /// Standing days are counted between local dates in `tz`, so a window spanning a clock
    /// change still covers whole days.
    #[must_use]
    pub fn from_rows(
        method: &Method,
        rows: &[CostRow],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        tz: Tz,
    ) -> Self {
        let selected: Vec<&CostRow> = rows
            .iter()
            .filter(|row| row.start < to && row.end > from)
            .collect();

        let consumption: Decimal = selected.iter().map(|r| r.consumption_converted).sum();
        let unit_pence: Decimal = selected.iter().filter_map(|r| r.unit_rate_cost).sum();
        let standing_pence: Decimal = selected.iter().filter_map(|r| r.standing_charge_cost).sum();

        let standing_days = match (
            selected.iter().map(|r| r.start()).min(),
            selected.iter().map(|r| r.end()).max(),
        ) {
            (Some(first), Some(last)) => {
                (last.with_timezone(&tz).date_naive() - first.with_timezone(&tz).date_naive())
                    .num_days()
            }
            _ => 0,
        };

        let unit_cost = unit_pence / PENCE_PER_POUND;
        let standing_cost = standing_pence / PENCE_PER_POUND;
        let subtotal = unit_cost + standing_cost;
        let vat = (subtotal * VAT_RATE).round_dp(2);
        let total = (subtotal + vat).round_dp(2);

        Self {
            method: method.name().to_owned(),
            energy_type: method.energy_type(),
            from,
            to,
            consumption_total: consumption.round_dp(1),
            unit: method.energy_type().billing_unit(),
            unit_cost,
            standing_days,
            standing_cost,
            subtotal,
            vat,
            total,
            rows: selected.len(),
        }
    }

    #[must_use]
    pub fn lines(&self) -> Vec<BillLine> {
        vec![
            BillLine {
                label: "Total consumption",
                detail: format!("{:.1}{}", self.consumption_total, self.unit),
                cost: format_pounds(self.unit_cost),
            },
            BillLine {
                label: "Standing charge",
                detail: format_days(self.standing_days),
                cost: format_pounds(self.standing_cost),
            },
            BillLine {
                label: "Subtotal",
                detail: String::new(),
                cost: format_pounds(self.subtotal),
            },
            BillLine {
                label: "VAT at 5%",
                detail: String::new(),
                cost: format_pounds(self.vat),
            },
            BillLine {
                label: "Total",
                detail: String::new(),
                cost: format_pounds(self.total),
            },
        ]
    }
}

/// Summarise a calculated method over `[from, to)`, defaulting to the calculated window.
///
/// The window must lie within the window the method was last calculated for.
pub fn report(
    method: &Method,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    tz: Tz,
) -> Result<BillSummary> {
    let calculation = method
        .calculation()
        .ok_or_else(|| BillingError::NotCalculated {
            name: method.name().to_owned(),
        })?;

    let from = from.unwrap_or(calculation.from);
    let to = to.unwrap_or(calculation.to);

    DateRangeError::check_order(from, to, tz)?;
    if from < calculation.from || to > calculation.to {
        return Err(DateRangeError::OutsideCalculation {
            method: method.name().to_owned(),
            requested: DateSpan::closed(from, to, tz),
            calculated: DateSpan::closed(calculation.from, calculation.to, tz),
        }
        .into());
    }

    Ok(BillSummary::from_rows(method, &calculation.rows, from, to, tz))
}

#[must_use]
pub fn format_pounds(value: Decimal) -> String {
    format!("£{:.2}", value.round_dp(2))
}

#[must_use]
pub fn format_days(days: i64) -> String {
    if days == 1 {
        "1 day".to_owned()
    } else {
        format!("{days} days")
    }
}
