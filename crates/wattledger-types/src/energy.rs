// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to parse one of the enums in this module from user input
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("energy_type must either be \"gas\" or \"electricity\", received: {0}")]
    EnergyType(String),

    #[error("cost type must either be \"unit_rate\" or \"standing_charge\", received: {0}")]
    CostType(String),

    #[error("unknown payment method: {0}")]
    PaymentMethod(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyType {
    Electricity,
    Gas,
}

impl EnergyType {
    pub const ALL: [Self; 2] = [Self::Electricity, Self::Gas];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Electricity => "electricity",
            Self::Gas => "gas",
        }
    }

    /// Prefix of single-register tariff codes for this energy type
    #[must_use]
    pub fn tariff_prefix(self) -> &'static str {
        match self {
            Self::Electricity => "E-1R-",
            Self::Gas => "G-1R-",
        }
    }

    /// Unit of the billable (converted) quantity. Gas is billed in kWh after conversion.
    #[must_use]
    pub fn billing_unit(self) -> &'static str {
        "kWh"
    }
}

impl fmt::Display for EnergyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnergyType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "electricity" => Ok(Self::Electricity),
            "gas" => Ok(Self::Gas),
            _ => Err(ParseError::EnergyType(s.to_owned())),
        }
    }
}

/// One of the two billable components of a tariff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostType {
    UnitRate,
    StandingCharge,
}

impl CostType {
    pub const ALL: [Self; 2] = [Self::UnitRate, Self::StandingCharge];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnitRate => "unit_rate",
            Self::StandingCharge => "standing_charge",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::UnitRate => "unit rates",
            Self::StandingCharge => "standing charges",
        }
    }
}

impl fmt::Display for CostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "unit_rate" | "unit_rates" | "standard_unit_rates" => Ok(Self::UnitRate),
            "standing_charge" | "standing_charges" => Ok(Self::StandingCharge),
            _ => Err(ParseError::CostType(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    DirectDebit,
    NonDirectDebit,
}

impl PaymentMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectDebit => "DIRECT_DEBIT",
            Self::NonDirectDebit => "NON_DIRECT_DEBIT",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DIRECT_DEBIT" => Ok(Self::DirectDebit),
            "NON_DIRECT_DEBIT" => Ok(Self::NonDirectDebit),
            _ => Err(ParseError::PaymentMethod(s.to_owned())),
        }
    }
}
