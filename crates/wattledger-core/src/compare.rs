// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::{BillingError, Result};
use crate::method::Method;
use crate::report::{BillSummary, report};

/// Pairwise percentage differences between method totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub names: Vec<String>,
    /// Pounds, including VAT
    pub totals: Vec<Decimal>,
    /// `matrix[i][j]` is how much method `i` costs relative to method `j`, as a percentage of
    /// the last method's total. The diagonal is `None`.
    pub matrix: Vec<Vec<Option<Decimal>>>,
}

impl Comparison {
    #[must_use]
    pub fn from_totals(names: Vec<String>, totals: Vec<Decimal>) -> Self {
        let reference = totals.last().map(|total| total.abs()).unwrap_or_default();

        let matrix = totals
            .iter()
            .enumerate()
            .map(|(i, a)| {
                totals
                    .iter()
                    .enumerate()
                    .map(|(j, b)| {
                        if i == j || reference.is_zero() {
                            None
                        } else {
                            Some(((a - b) / reference * dec!(100)).round_dp(1))
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            names,
            totals,
            matrix,
        }
    }
}

/// Report every method over the same window and compare their totals
pub fn compare(
    methods: &[&Method],
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    tz: Tz,
) -> Result<Comparison> {
    if let Some(method) = methods.iter().find(|m| m.calculation().is_none()) {
        return Err(BillingError::NotCalculated {
            name: method.name().to_owned(),
        });
    }

    let summaries = methods
        .iter()
        .map(|method| report(method, from, to, tz))
        .collect::<Result<Vec<BillSummary>>>()?;

    let names = summaries.iter().map(|s| s.method.clone()).collect();
    let totals = summaries.iter().map(|s| s.total).collect();

    Ok(Comparison::from_totals(names, totals))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn test_two_method_comparison() {
        let comparison =
            Comparison::from_totals(names(&["Agile", "Flexible"]), vec![dec!(10.00), dec!(12.00)]);

        assert_eq!(comparison.matrix[0][1], Some(dec!(-16.7)));
        assert_eq!(comparison.matrix[1][0], Some(dec!(16.7)));
        assert_eq!(comparison.matrix[0][0], None);
        assert_eq!(comparison.matrix[1][1], None);
    }

    #[test]
    fn test_matrix_is_antisymmetric() {
        let comparison = Comparison::from_totals(
            names(&["A", "B", "C"]),
            vec![dec!(31.17), dec!(28.40), dec!(35.02)],
        );

        for i in 0..3 {
            for j in 0..3 {
                match (comparison.matrix[i][j], comparison.matrix[j][i]) {
                    (Some(a), Some(b)) => assert!((a + b).abs() <= dec!(0.1)),
                    (None, None) => assert_eq!(i, j),
                    _ => panic!("asymmetric entry at {i},{j}"),
                }
            }
        }
    }

    #[test]
    fn test_zero_reference_total() {
        let comparison =
            Comparison::from_totals(names(&["A", "B"]), vec![dec!(5.00), Decimal::ZERO]);

        assert!(comparison.matrix.iter().flatten().all(Option::is_none));
    }
}
