//! Fee computation
//!
//! Every non-failed transfer owes `round2(base + percent × amount_in_try)`
//! in TRY. Failed creations owe nothing; cancelled transfers are treated
//! by downstream ledgers as owing nothing, so there is no refund record.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round a TRY amount to 2 decimal places, half-up
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Fee schedule applied to the normalized TRY amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Flat component in TRY
    pub base: Decimal,
    /// Fractional component of `amount_in_try` (0.01 = 1%)
    pub percent: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base: Decimal::new(5, 0),
            percent: Decimal::new(1, 2),
        }
    }
}

impl FeeSchedule {
    /// Fee owed for a transfer normalized to `amount_in_try`
    pub fn fee_for(&self, amount_in_try: Decimal) -> Decimal {
        round2(self.base + amount_in_try * self.percent)
    }
}
