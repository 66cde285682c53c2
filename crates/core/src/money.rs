use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// A signed monetary amount. Statement precision is preserved as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid amount: '{0}'")]
pub struct MoneyParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Amount overflow: {0} + {1} is out of range")]
pub struct MoneyOverflow(pub Money, pub Money);

impl Money {
    pub fn new(decimal: Decimal) -> Self {
        Money(decimal)
    }

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    /// Addition that reports overflow instead of panicking like `+` does.
    pub fn checked_add(self, rhs: Money) -> Result<Money, MoneyOverflow> {
        self.0
            .checked_add(rhs.0)
            .map(Money)
            .ok_or(MoneyOverflow(self, rhs))
    }
}

impl From<Decimal> for Money {
    fn from(decimal: Decimal) -> Self {
        Money(decimal)
    }
}

/// Accepts the shapes banks put in statement exports: `-42.50`, `$1,234.56`,
/// and accounting negatives like `(75.25)`.
impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, inner) = match trimmed.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            Some(inner) => (true, inner),
            None => (false, trimmed),
        };
        let cleaned = inner.replace([',', '$', ' '], "");
        let value = Decimal::from_str(&cleaned).map_err(|_| MoneyParseError(s.to_string()))?;
        Ok(Money(if negative { -value } else { value }))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-${:.2}", self.0.abs())
        } else {
            write!(f, "${:.2}", self.0)
        }
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn parse_plain_and_signed() {
        assert_eq!(money("123.45"), Money::from_cents(12345));
        assert_eq!(money("-50.00"), Money::from_cents(-5000));
    }

    #[test]
    fn parse_dollar_sign_and_commas() {
        assert_eq!(money("$1,234.56"), Money::from_cents(123456));
    }

    #[test]
    fn parse_accounting_parens() {
        assert_eq!(money("(75.25)"), Money::from_cents(-7525));
    }

    #[test]
    fn parse_keeps_sub_cent_precision() {
        assert_eq!(money("0.125").amount(), Decimal::new(125, 3));
    }

    #[test]
    fn parse_invalid() {
        assert!("not_a_number".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
        assert!("12.3.4".parse::<Money>().is_err());
    }

    #[test]
    fn decimal_arithmetic_is_exact() {
        // 0.1 + 0.2 is not 0.3 in binary floating point.
        assert_eq!(money("0.1") + money("0.2"), money("0.3"));
    }

    #[test]
    fn display_formats_sign_before_symbol() {
        assert_eq!(Money::from_cents(-4250).to_string(), "-$42.50");
        assert_eq!(Money::from_cents(100000).to_string(), "$1000.00");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn checked_add_reports_overflow() {
        assert_eq!(money("1.25").checked_add(money("-0.25")), Ok(money("1.00")));
        let max = Money::new(Decimal::MAX);
        assert_eq!(max.checked_add(money("1")), Err(MoneyOverflow(max, money("1"))));
    }

    #[test]
    fn sum_and_abs() {
        let total: Money = [money("-10"), money("2.50"), money("-0.50")].into_iter().sum();
        assert_eq!(total, money("-8.00"));
        assert_eq!(total.abs(), money("8"));
        assert!(total.is_negative());
        assert!(!Money::zero().is_negative());
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&money("-42.50")).unwrap();
        assert_eq!(json, "\"-42.50\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, money("-42.50"));
    }
}
