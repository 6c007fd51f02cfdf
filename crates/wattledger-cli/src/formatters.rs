// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Table output for bills, comparisons and checks.

use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, presets::UTF8_FULL};
use rust_decimal::Decimal;
use wattledger_core::calendar::format_day;
use wattledger_core::report::format_pounds;
use wattledger_core::{BillSummary, Comparison, RowCheck};

pub struct TableFormatter;

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(label).add_attribute(Attribute::Bold))
        .collect()
}

impl TableFormatter {
    pub fn format_bill(summary: &BillSummary, tz: Tz) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(header(&["", "", "Cost"]));

        for line in summary.lines() {
            let is_total = line.label == "Total";
            let mut label = Cell::new(line.label);
            let mut cost = Cell::new(&line.cost).set_alignment(CellAlignment::Right);
            if is_total {
                label = label.add_attribute(Attribute::Bold);
                cost = cost.add_attribute(Attribute::Bold);
            }
            table.add_row(vec![label, Cell::new(&line.detail), cost]);
        }

        format!(
            "{} bill for {} from {} to {}\n{table}\n",
            summary.method,
            summary.energy_type,
            format_day(summary.from, tz),
            format_day(summary.to, tz)
        )
    }

    pub fn format_comparison(comparison: &Comparison) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);

        let mut labels = vec!["Method", "Total"];
        labels.extend(comparison.names.iter().map(String::as_str));
        table.set_header(header(&labels));

        let cheapest = comparison.totals.iter().min().copied();
        for (i, name) in comparison.names.iter().enumerate() {
            let total = comparison.totals.get(i).copied().unwrap_or_default();
            let name_cell = if Some(total) == cheapest {
                Cell::new(name).fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                Cell::new(name)
            };

            let mut row = vec![
                name_cell,
                Cell::new(format_pounds(total)).set_alignment(CellAlignment::Right),
            ];
            row.extend(
                comparison.matrix.get(i).into_iter().flatten().map(|entry| {
                    Cell::new(format_percent(*entry)).set_alignment(CellAlignment::Right)
                }),
            );
            table.add_row(row);
        }

        format!("{table}\nRow method cost relative to column method, as % of the last method's total\n")
    }

    pub fn format_checks(checks: &[RowCheck], tz: Tz) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(header(&["Data", "Rows", "Duplicate starts"]));

        for check in checks {
            let duplicates = if check.duplicate_starts.is_empty() {
                "-".to_owned()
            } else {
                check
                    .duplicate_starts
                    .iter()
                    .map(|start| {
                        format!("{} {}", format_day(*start, tz), start.with_timezone(&tz).format("%H:%M"))
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            table.add_row(vec![
                Cell::new(&check.name),
                Cell::new(check.rows).set_alignment(CellAlignment::Right),
                Cell::new(duplicates),
            ]);
        }

        format!("{table}\n")
    }

    pub fn format_counts(counts: &[(&str, i64)]) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(header(&["Table", "Rows"]));
        for (name, count) in counts {
            table.add_row(vec![
                Cell::new(name),
                Cell::new(count).set_alignment(CellAlignment::Right),
            ]);
        }
        format!("{table}\n")
    }
}

fn format_percent(entry: Option<Decimal>) -> String {
    entry.map_or_else(|| "-".to_owned(), |value| format!("{value:+.1}%"))
}
