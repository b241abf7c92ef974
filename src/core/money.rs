//! USD amounts stored as scaled integers
//!
//! Every amount is rounded to 1e-12 USD on entry and then summed as an
//! integer, so grouping contributions differently never changes a total.

use serde::{Serialize, Serializer};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

const SCALE: f64 = 1e12;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Money(i128);

impl Money {
    pub(crate) const ZERO: Money = Money(0);

    /// Non-finite input maps to zero.
    pub(crate) fn from_usd(usd: f64) -> Self {
        if !usd.is_finite() {
            return Money::ZERO;
        }
        Money((usd * SCALE).round() as i128)
    }

    pub(crate) fn to_usd(self) -> f64 {
        self.0 as f64 / SCALE
    }
}

/// Round a USD value to the 1e-12 grid used by [`Money`].
pub(crate) fn round_usd(usd: f64) -> f64 {
    Money::from_usd(usd).to_usd()
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_usd())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenths_sum_exactly() {
        let total: Money = (0..10).map(|_| Money::from_usd(0.1)).sum();
        assert_eq!(total.to_usd(), 1.0);
    }

    #[test]
    fn regrouping_does_not_change_total() {
        let parts = [0.1, 0.2, 0.3, 1e-7, 12.345678901234, 0.000_000_000_4];
        let left: Money = parts.iter().map(|v| Money::from_usd(*v)).sum();

        let mut grouped = Money::ZERO;
        for chunk in parts.chunks(2).rev() {
            let sub: Money = chunk.iter().rev().map(|v| Money::from_usd(*v)).sum();
            grouped += sub;
        }
        assert_eq!(left, grouped);
        assert_eq!(left.to_usd(), grouped.to_usd());
    }

    #[test]
    fn non_finite_is_zero() {
        assert_eq!(Money::from_usd(f64::NAN), Money::ZERO);
        assert_eq!(Money::from_usd(f64::INFINITY), Money::ZERO);
    }

    #[test]
    fn round_usd_snaps_float_noise() {
        assert_eq!(round_usd(3e-6 * 1e6), 3.0);
        assert_eq!(round_usd(0.1 + 0.2), 0.3);
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&Money::from_usd(4.5)).unwrap();
        assert_eq!(json, "4.5");
    }
}
