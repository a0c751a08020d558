// Fixed-point helpers shared by the ledger, the pool and settlement.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{WagerError, WagerResult};

/// Money and odds are both carried at two decimal places.
pub const MONEY_DP: u32 = 2;

/// Round half-up to two places.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// A caller-supplied stake, deposit or offer: strictly positive, at most two decimals.
pub fn validate_amount(amount: Decimal) -> WagerResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(WagerError::InvalidAmount(format!("{} must be greater than zero", amount)));
    }
    if amount.normalize().scale() > MONEY_DP {
        return Err(WagerError::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount, MONEY_DP
        )));
    }
    Ok(amount)
}

pub fn out_of_range(what: &str) -> WagerError {
    WagerError::InvalidAmount(format!("{} is out of range", what))
}

/// Sum that reports overflow instead of panicking.
pub fn checked_sum<I: IntoIterator<Item = Decimal>>(values: I) -> WagerResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
        .ok_or_else(|| out_of_range("total"))
}
