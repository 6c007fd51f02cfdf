// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use wattledger_types::{Agreement, EnergyType, ProductRecord};

/// Chain catalogue products into consecutive agreements.
///
/// Each product becomes a single-register tariff for the given GSP, in force from its
/// `available_from` until the next product becomes available. The last one ends at its own
/// `available_to`.
#[must_use]
pub fn agreements_from_products(
    products: &[ProductRecord],
    energy_type: EnergyType,
    gsp: &str,
) -> Vec<Agreement> {
    let mut sorted: Vec<&ProductRecord> = products.iter().collect();
    sorted.sort_by_key(|product| product.available_from);

    sorted
        .iter()
        .enumerate()
        .map(|(index, product)| {
            let valid_to = sorted
                .get(index + 1)
                .map_or(product.available_to, |next| Some(next.available_from));
            Agreement::tariff(
                product.tariff_code(energy_type.tariff_prefix(), gsp),
                energy_type,
                product.available_from,
                valid_to,
            )
        })
        .collect()
}
