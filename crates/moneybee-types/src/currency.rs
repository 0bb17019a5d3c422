//! Currency types for MoneyBee
//!
//! Transfers are requested in one of a fixed set of currencies and
//! normalized to TRY for limit and fraud decisions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MoneyBeeError;

/// Supported request currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Turkish lira is the settlement currency and never carries an exchange rate
    TRY,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Get the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::TRY => "TRY",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    /// Whether amounts in this currency need FX normalization before
    /// limit and fraud decisions
    pub fn needs_conversion(&self) -> bool {
        !matches!(self, Self::TRY)
    }

    /// All supported currencies
    pub fn all() -> &'static [Currency] {
        &[Self::TRY, Self::USD, Self::EUR, Self::GBP]
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyBeeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRY" => Ok(Self::TRY),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            other => Err(MoneyBeeError::InvalidArgument(format!(
                "unknown currency: {}",
                other
            ))),
        }
    }
}
