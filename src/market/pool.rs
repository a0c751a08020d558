//! Pari-mutuel pricing for a bet's options.
//!
//! The option with less money on it pays out more, so the book balances itself:
//!
//! ```text
//! total == 0            odds = initial_odds
//! option unbacked       odds = unbacked ceiling (10.0)
//! otherwise             odds = max(floor, (total / option_total) * (1 - house_edge))
//! ```
//!
//! Odds are global: every stake recomputes every option. Callers must hold the bet's
//! lock while touching a pool.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::BetOption;
use crate::error::{WagerError, WagerResult};
use crate::money::{checked_sum, out_of_range, round2};

pub const HOUSE_EDGE: Decimal = dec!(0.05);
pub const ODDS_FLOOR: Decimal = dec!(1.1);
pub const UNBACKED_ODDS: Decimal = dec!(10.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsPolicy {
    /// Fraction of the pool withheld from payouts
    pub house_edge: Decimal,
    /// Lowest multiplier ever quoted for a backed option
    pub floor: Decimal,
    /// Quoted for an option nobody has backed yet
    pub unbacked: Decimal,
}

impl Default for OddsPolicy {
    fn default() -> Self {
        Self { house_edge: HOUSE_EDGE, floor: ODDS_FLOOR, unbacked: UNBACKED_ODDS }
    }
}

impl OddsPolicy {
    /// Price a single option given the pool it sits in.
    pub fn price(&self, option: &BetOption, pool_total: Decimal) -> WagerResult<Decimal> {
        if pool_total.is_zero() {
            return Ok(option.initial_odds);
        }
        if option.total_wagered.is_zero() {
            return Ok(self.unbacked);
        }
        // total / option_total == 1 / proportion, without the intermediate rounding
        let quoted = pool_total
            .checked_div(option.total_wagered)
            .and_then(|fair| fair.checked_mul(Decimal::ONE - self.house_edge))
            .ok_or_else(|| out_of_range("odds"))?;
        Ok(round2(quoted.max(self.floor)))
    }
}

/// Mutable view over a bet's options while its lock is held.
pub struct WagerPool<'a> {
    options: &'a mut BTreeMap<String, BetOption>,
    policy: &'a OddsPolicy,
}

impl<'a> WagerPool<'a> {
    pub fn new(options: &'a mut BTreeMap<String, BetOption>, policy: &'a OddsPolicy) -> Self {
        Self { options, policy }
    }

    pub fn total(&self) -> WagerResult<Decimal> {
        checked_sum(self.options.values().map(|o| o.total_wagered))
    }

    /// Add `amount` to `option_key` and reprice every option.
    /// Returns the option's odds after the recompute. Leaves the pool untouched on error.
    pub fn record_stake(&mut self, option_key: &str, amount: Decimal) -> WagerResult<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(WagerError::InvalidAmount(format!("stake {} must be positive", amount)));
        }
        let option = self.options.get_mut(option_key).ok_or_else(|| WagerError::OptionNotFound {
            bet_id: String::new(),
            option_key: option_key.to_string(),
        })?;
        let previous = option.total_wagered;
        option.total_wagered = previous.checked_add(amount).ok_or_else(|| out_of_range("stake"))?;

        if let Err(e) = self.recompute() {
            if let Some(option) = self.options.get_mut(option_key) {
                option.total_wagered = previous;
            }
            return Err(e);
        }
        Ok(self.options[option_key].odds)
    }

    /// Reprice every option. Prices are all computed before any is written.
    pub fn recompute(&mut self) -> WagerResult<()> {
        let total = self.total()?;
        let prices = self
            .options
            .values()
            .map(|option| self.policy.price(option, total))
            .collect::<WagerResult<Vec<_>>>()?;
        for (option, odds) in self.options.values_mut().zip(prices) {
            option.odds = odds;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(entries: &[(&str, Decimal, Decimal)]) -> BTreeMap<String, BetOption> {
        entries
            .iter()
            .map(|(key, initial, wagered)| {
                let mut option = BetOption::new(key.to_string(), key.to_uppercase(), *initial);
                option.total_wagered = *wagered;
                (key.to_string(), option)
            })
            .collect()
    }

    #[test]
    fn test_empty_pool_uses_initial_odds() {
        let mut opts = options(&[("a", dec!(2.0), dec!(0)), ("b", dec!(3.5), dec!(0))]);
        let policy = OddsPolicy::default();
        WagerPool::new(&mut opts, &policy).recompute().unwrap();

        assert_eq!(opts["a"].odds, dec!(2.0));
        assert_eq!(opts["b"].odds, dec!(3.5));
    }

    #[test]
    fn test_first_stake_hits_floor_and_unbacked_ceiling() {
        let mut opts = options(&[("a", dec!(2.0), dec!(0)), ("b", dec!(2.0), dec!(0))]);
        let policy = OddsPolicy::default();
        let odds = WagerPool::new(&mut opts, &policy).record_stake("a", dec!(20)).unwrap();

        // proportion 1.0 -> 0.95, floored at 1.1
        assert_eq!(odds, dec!(1.1));
        assert_eq!(opts["a"].total_wagered, dec!(20));
        assert_eq!(opts["b"].odds, dec!(10.0));
    }

    #[test]
    fn test_second_side_reprices_both() {
        let mut opts = options(&[("a", dec!(2.0), dec!(20)), ("b", dec!(2.0), dec!(0))]);
        let policy = OddsPolicy::default();
        let odds = WagerPool::new(&mut opts, &policy).record_stake("b", dec!(10)).unwrap();

        // 30/20 * 0.95 = 1.425 rounds half-up
        assert_eq!(opts["a"].odds, dec!(1.43));
        assert_eq!(odds, dec!(2.85));
    }

    #[test]
    fn test_three_way_pool() {
        let mut opts = options(&[
            ("x", dec!(3.0), dec!(50)),
            ("y", dec!(3.0), dec!(30)),
            ("z", dec!(3.0), dec!(20)),
        ]);
        let policy = OddsPolicy::default();
        WagerPool::new(&mut opts, &policy).recompute().unwrap();

        assert_eq!(opts["x"].odds, dec!(1.9)); // 100/50 * .95
        assert_eq!(opts["y"].odds, dec!(3.17)); // 3.1666.. * .95
        assert_eq!(opts["z"].odds, dec!(4.75));
    }

    #[test]
    fn test_backed_odds_never_below_floor() {
        let mut opts = options(&[("a", dec!(2.0), dec!(1)), ("b", dec!(2.0), dec!(0))]);
        let policy = OddsPolicy::default();
        let mut pool = WagerPool::new(&mut opts, &policy);
        for _ in 0..25 {
            pool.record_stake("a", dec!(37.13)).unwrap();
            pool.record_stake("b", dec!(0.01)).unwrap();
        }
        for option in opts.values() {
            assert!(option.odds >= ODDS_FLOOR, "{} fell to {}", option.key, option.odds);
        }
    }

    #[test]
    fn test_unknown_option_rejected() {
        let mut opts = options(&[("a", dec!(2.0), dec!(0)), ("b", dec!(2.0), dec!(0))]);
        let policy = OddsPolicy::default();
        let result = WagerPool::new(&mut opts, &policy).record_stake("c", dec!(5));
        assert!(matches!(result, Err(WagerError::OptionNotFound { .. })));
        assert_eq!(opts["a"].total_wagered, Decimal::ZERO);
    }

    #[test]
    fn test_custom_house_edge() {
        let mut opts = options(&[("a", dec!(2.0), dec!(10)), ("b", dec!(2.0), dec!(10))]);
        let policy = OddsPolicy { house_edge: dec!(0.10), ..OddsPolicy::default() };
        WagerPool::new(&mut opts, &policy).recompute().unwrap();
        assert_eq!(opts["a"].odds, dec!(1.8));
    }

    #[test]
    fn test_overflowing_stake_leaves_pool_untouched() {
        let mut opts = options(&[("a", dec!(2.0), Decimal::MAX), ("b", dec!(2.0), dec!(0))]);
        let policy = OddsPolicy::default();
        let result = WagerPool::new(&mut opts, &policy).record_stake("a", dec!(1));
        assert!(matches!(result, Err(WagerError::InvalidAmount(_))));
        assert_eq!(opts["a"].total_wagered, Decimal::MAX);

        let mut opts = options(&[("a", dec!(2.0), dec!(0)), ("b", dec!(2.0), Decimal::MAX)]);
        let result = WagerPool::new(&mut opts, &policy).record_stake("a", dec!(1));
        assert!(matches!(result, Err(WagerError::InvalidAmount(_))));
        assert_eq!(opts["a"].total_wagered, Decimal::ZERO);
        assert_eq!(opts["a"].odds, dec!(2.0));
    }
}
