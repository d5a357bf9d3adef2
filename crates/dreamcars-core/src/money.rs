//! # Money
//!
//! Listing prices are decimal major units. Payment providers are charged in
//! minor units at a fixed 100 per major unit, so only currencies with two
//! decimal places are accepted.

use crate::error::MarketError;
use serde::{Deserialize, Serialize};

pub const MINOR_UNITS_PER_MAJOR: f64 = 100.0;

/// Two-decimal currencies a charge can be made in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
}

impl Currency {
    /// Lowercase ISO 4217 code, as providers expect it
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
            Currency::Gbp => "gbp",
            Currency::Cad => "cad",
            Currency::Aud => "aud",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "usd" => Ok(Currency::Usd),
            "eur" => Ok(Currency::Eur),
            "gbp" => Ok(Currency::Gbp),
            "cad" => Ok(Currency::Cad),
            "aud" => Ok(Currency::Aud),
            other => Err(MarketError::Configuration(format!(
                "unsupported charge currency: {} (two-decimal currencies only)",
                other
            ))),
        }
    }
}

/// Amount handed to a payment provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeAmount {
    pub minor_units: i64,
    pub currency: Currency,
}

impl ChargeAmount {
    /// `price × 100`, rounded to the nearest minor unit
    pub fn from_price(price: f64, currency: Currency) -> Self {
        Self {
            minor_units: (price * MINOR_UNITS_PER_MAJOR).round() as i64,
            currency,
        }
    }

    pub fn from_minor_units(minor_units: i64, currency: Currency) -> Self {
        Self {
            minor_units,
            currency,
        }
    }
}

impl std::fmt::Display for ChargeAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.minor_units, self.currency)
    }
}
