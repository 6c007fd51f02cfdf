// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Supplier account documents and the snapshot derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agreement::Agreement;
use crate::energy::EnergyType;

/// A physical meter on a meter point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meter {
    /// MPAN for electricity, MPRN for gas
    pub mpan_or_mprn: String,
    pub serial_number: String,
    pub energy_type: EnergyType,
}

impl Meter {
    /// Key under which this meter's consumption series is stored
    #[must_use]
    pub fn meter_ref(&self, account_id: &str) -> String {
        format!("{account_id}_{}_{}", self.mpan_or_mprn, self.serial_number)
    }
}

/// Everything the billing engine needs to know about an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: String,
    /// When the snapshot was taken from the supplier
    pub updated: DateTime<Utc>,
    pub meters: Vec<Meter>,
    pub agreements: Vec<Agreement>,
    /// Grid supply point group letter appended to tariff codes
    #[serde(default)]
    pub gsp: Option<String>,
    /// Gas local distribution zone (LDZ)
    #[serde(default)]
    pub distribution_zone: Option<String>,
}

impl AccountSnapshot {
    /// Flatten a supplier account document
    #[must_use]
    pub fn from_document(account_id: &str, document: &AccountDocument, updated: DateTime<Utc>) -> Self {
        let account_id = account_id.to_uppercase();
        let mut meters = Vec::new();
        let mut agreements = Vec::new();
        let mut distribution_zone = None;

        for property in &document.properties {
            for point in &property.electricity_meter_points {
                collect_meter_point(
                    &point.mpan,
                    &point.point,
                    EnergyType::Electricity,
                    &mut meters,
                    &mut agreements,
                );
            }
            for point in &property.gas_meter_points {
                collect_meter_point(
                    &point.mprn,
                    &point.point,
                    EnergyType::Gas,
                    &mut meters,
                    &mut agreements,
                );
                if property.distribution_zone.is_some() {
                    distribution_zone.clone_from(&property.distribution_zone);
                }
            }
        }

        let gsp = agreements
            .first()
            .and_then(|a| a.tariff_code.chars().last())
            .map(String::from);

        Self {
            account_id,
            updated,
            meters,
            agreements,
            gsp,
            distribution_zone,
        }
    }

    pub fn meters_for(&self, energy_type: EnergyType) -> impl Iterator<Item = &Meter> {
        self.meters
            .iter()
            .filter(move |m| m.energy_type == energy_type)
    }

    #[must_use]
    pub fn agreements_for(&self, energy_type: EnergyType) -> Vec<Agreement> {
        self.agreements
            .iter()
            .filter(|a| a.energy_type == energy_type)
            .cloned()
            .collect()
    }

    /// Start of the earliest agreement for the energy type
    #[must_use]
    pub fn moved_in_at(&self, energy_type: EnergyType) -> Option<DateTime<Utc>> {
        self.agreements
            .iter()
            .filter(|a| a.energy_type == energy_type)
            .map(|a| a.valid_from)
            .min()
    }
}

fn collect_meter_point(
    identifier: &str,
    point: &MeterPointDocument,
    energy_type: EnergyType,
    meters: &mut Vec<Meter>,
    agreements: &mut Vec<Agreement>,
) {
    meters.extend(point.meters.iter().map(|meter| Meter {
        mpan_or_mprn: identifier.to_owned(),
        serial_number: meter.serial_number.clone(),
        energy_type,
    }));
    agreements.extend(point.agreements.iter().map(|a| {
        Agreement::tariff(a.tariff_code.clone(), energy_type, a.valid_from, a.valid_to)
    }));
}

// ============= Supplier account document =============

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountDocument {
    #[serde(default)]
    pub number: Option<String>,
    pub properties: Vec<PropertyDocument>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PropertyDocument {
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub electricity_meter_points: Vec<ElectricityMeterPoint>,
    #[serde(default)]
    pub gas_meter_points: Vec<GasMeterPoint>,
    #[serde(default, alias = "LDZ", alias = "ldz")]
    pub distribution_zone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElectricityMeterPoint {
    pub mpan: String,
    #[serde(flatten)]
    pub point: MeterPointDocument,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GasMeterPoint {
    pub mprn: String,
    #[serde(flatten)]
    pub point: MeterPointDocument,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MeterPointDocument {
    #[serde(default)]
    pub meters: Vec<MeterDocument>,
    #[serde(default)]
    pub agreements: Vec<AgreementDocument>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MeterDocument {
    pub serial_number: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgreementDocument {
    pub tariff_code: String,
    pub valid_from: DateTime<Utc>,
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
}
