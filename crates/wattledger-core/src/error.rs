// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Error types for the billing engine

use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use wattledger_types::{EnergyType, ParseError};

use crate::calendar::{format_bound, format_day};

/// A date range carried by an error, rendered in the billing timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: DateTime<Utc>,
    /// `None` for open-ended ranges
    pub end: Option<DateTime<Utc>>,
    pub tz: Tz,
}

impl DateSpan {
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>, tz: Tz) -> Self {
        Self { start, end, tz }
    }

    #[must_use]
    pub fn closed(start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> Self {
        Self::new(start, Some(end), tz)
    }
}

impl fmt::Display for DateSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            format_day(self.start, self.tz),
            format_bound(self.end, self.tz)
        )
    }
}

/// Bounds of one method that does not contain a requested window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBounds {
    pub name: String,
    pub bounds: DateSpan,
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error(
        "There is {missing_days} day(s) of missing data for {name}. The data was available {}. \
         The required range is {required}. Found {rows} of {expected_rows} expected rows.",
        describe_available(.available.as_ref())
    )]
    MissingData {
        name: String,
        available: Option<DateSpan>,
        required: DateSpan,
        missing_days: i64,
        rows: usize,
        expected_rows: usize,
    },

    #[error("{matches} {name} rates apply to the interval starting {start}, expected exactly one")]
    AmbiguousRate {
        name: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        matches: usize,
    },

    #[error("method \"{name}\" already exists for {energy_type}")]
    DuplicateMethod {
        energy_type: EnergyType,
        name: String,
    },

    #[error("no {energy_type} method named \"{name}\"")]
    UnknownMethod {
        energy_type: EnergyType,
        name: String,
    },

    #[error("the costs for \"{name}\" were not found, run calculate first")]
    NotCalculated { name: String },

    #[error(transparent)]
    InvalidEnergyType(#[from] ParseError),

    #[error(transparent)]
    DateRange(#[from] DateRangeError),

    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum DateRangeError {
    #[error("the from date must be before the to date, received {0}")]
    Reversed(DateSpan),

    #[error("the window {0} is empty, the from and to dates are the same instant")]
    Empty(DateSpan),

    #[error(
        "The requested range {window} is outside the range of {}",
        describe_violations(.window, .violations, .earliest)
    )]
    OutsideMethods {
        window: DateSpan,
        violations: Vec<MethodBounds>,
        earliest: DateTime<Utc>,
    },

    #[error("\"{method}\" was calculated for {calculated}, which does not contain {requested}")]
    OutsideCalculation {
        method: String,
        requested: DateSpan,
        calculated: DateSpan,
    },

    #[error("agreements {first} and {second} of \"{method}\" overlap")]
    OverlappingAgreements {
        method: String,
        first: String,
        second: String,
    },

    #[error("\"{method}\" has no usable agreements")]
    EmptyAgreements { method: String },
}

impl DateRangeError {
    /// Reject windows where `from` is not strictly before `to`
    pub fn check_order(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        tz: Tz,
    ) -> std::result::Result<(), Self> {
        match from.cmp(&to) {
            std::cmp::Ordering::Less => Ok(()),
            std::cmp::Ordering::Equal => Err(Self::Empty(DateSpan::closed(from, to, tz))),
            std::cmp::Ordering::Greater => Err(Self::Reversed(DateSpan::closed(from, to, tz))),
        }
    }
}

fn describe_available(available: Option<&DateSpan>) -> String {
    available.map_or_else(|| "for no dates".to_owned(), |span| format!("from {span}"))
}

fn describe_violations(
    window: &DateSpan,
    violations: &[MethodBounds],
    earliest: &DateTime<Utc>,
) -> String {
    let width = violations
        .iter()
        .map(|v| v.name.chars().count())
        .max()
        .unwrap_or(0);

    let table: String = violations
        .iter()
        .map(|v| format!("  {:<width$}  {}\n", v.name, v.bounds))
        .collect();

    format!(
        "{} method(s):\n{table}Try a from date on or after {}.",
        violations.len(),
        format_day(*earliest, window.tz)
    )
}

pub type Result<T> = std::result::Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_data_message() {
        let err = BillingError::MissingData {
            name: "consumption".to_owned(),
            available: Some(DateSpan::closed(day(3), day(8), chrono_tz::UTC)),
            required: DateSpan::closed(day(1), day(10), chrono_tz::UTC),
            missing_days: 4,
            rows: 240,
            expected_rows: 240,
        };

        assert_eq!(
            err.to_string(),
            "There is 4 day(s) of missing data for consumption. The data was available from \
             2024-01-03 to 2024-01-08. The required range is 2024-01-01 to 2024-01-10. \
             Found 240 of 240 expected rows."
        );
    }

    #[test]
    fn test_outside_methods_lists_every_violation() {
        let err = DateRangeError::OutsideMethods {
            window: DateSpan::closed(day(1), day(10), chrono_tz::UTC),
            violations: vec![
                MethodBounds {
                    name: "Agile".to_owned(),
                    bounds: DateSpan::new(day(5), None, chrono_tz::UTC),
                },
                MethodBounds {
                    name: "Go".to_owned(),
                    bounds: DateSpan::closed(day(2), day(20), chrono_tz::UTC),
                },
            ],
            earliest: day(5),
        };

        let message = err.to_string();
        assert!(message.contains("outside the range of 2 method(s)"));
        assert!(message.contains("Agile  2024-01-05 to Infinity"));
        assert!(message.contains("Go     2024-01-02 to 2024-01-20"));
        assert!(message.ends_with("on or after 2024-01-05."));
    }

    #[test]
    fn test_equal_bounds_are_empty_not_reversed() {
        let err = DateRangeError::check_order(day(3), day(3), chrono_tz::UTC).unwrap_err();
        assert!(matches!(err, DateRangeError::Empty(_)));
        assert!(err.to_string().contains("is empty"));
        assert!(!err.to_string().contains("must be before"));

        assert!(matches!(
            DateRangeError::check_order(day(4), day(3), chrono_tz::UTC),
            Err(DateRangeError::Reversed(_))
        ));
        assert!(DateRangeError::check_order(day(3), day(4), chrono_tz::UTC).is_ok());
    }
}
