// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wattledger_types::EnergyType;

/// Correction for standard temperature and pressure applied to metered gas volume
pub const GAS_VOLUME_CORRECTION: Decimal = dec!(1.02264);

/// MJ per kWh
pub const MJ_PER_KWH: Decimal = dec!(3.6);

/// Convert a metered quantity into billable kWh.
///
/// Electricity is already metered in kWh and is rounded to 2 decimal places. Gas is metered in
/// m3 and needs the calorific value (MJ/m3) of the day the reading started; `None` is returned
/// when that value is missing.
#[must_use]
pub fn convert(
    quantity: Decimal,
    energy_type: EnergyType,
    calorific_value: Option<Decimal>,
) -> Option<Decimal> {
    match energy_type {
        EnergyType::Electricity => Some(quantity.round_dp(2)),
        EnergyType::Gas => {
            calorific_value.map(|cv| quantity * GAS_VOLUME_CORRECTION * cv / MJ_PER_KWH)
        }
    }
}
