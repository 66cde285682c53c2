use chrono::{NaiveDate, NaiveDateTime};
use ledgersort_core::{Category, DateRange, PeriodError, Transaction};
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Amount range starts after it ends: {from} > {to}")]
    InvertedAmountRange { from: Decimal, to: Decimal },
    #[error(transparent)]
    InvertedDateRange(#[from] PeriodError),
    #[error("Unknown comparison operator: '{0}'")]
    UnknownComparison(String),
    #[error("Unknown match mode: '{0}'")]
    UnknownMatchMode(String),
    #[error("Unknown amount basis: '{0}'")]
    UnknownBasis(String),
    #[error("Invalid date: '{0}'")]
    InvalidDate(String),
    #[error("Invalid amount: '{0}'")]
    InvalidAmount(String),
    #[error("Amount {0} is negative but compared against |amount|; use basis = \"signed\"")]
    NegativeAbsoluteAmount(Decimal),
}

/// How a text pattern is compared with a description. Always case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Contains,
    Exact,
    Regex,
}

impl FromStr for MatchMode {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contains" => Ok(MatchMode::Contains),
            "exact" => Ok(MatchMode::Exact),
            "regex" => Ok(MatchMode::Regex),
            _ => Err(ConditionError::UnknownMatchMode(s.to_string())),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Contains => write!(f, "contains"),
            MatchMode::Exact => write!(f, "exact"),
            MatchMode::Regex => write!(f, "regex"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::GreaterThanOrEqual => ">=",
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
            Comparison::LessThan => "<",
            Comparison::LessThanOrEqual => "<=",
        }
    }

    pub fn apply(self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            Comparison::GreaterThan => lhs > rhs,
            Comparison::GreaterThanOrEqual => lhs >= rhs,
            Comparison::Equal => lhs == rhs,
            Comparison::NotEqual => lhs != rhs,
            Comparison::LessThan => lhs < rhs,
            Comparison::LessThanOrEqual => lhs <= rhs,
        }
    }
}

impl FromStr for Comparison {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Comparison::GreaterThan),
            ">=" => Ok(Comparison::GreaterThanOrEqual),
            "==" => Ok(Comparison::Equal),
            "!=" => Ok(Comparison::NotEqual),
            "<" => Ok(Comparison::LessThan),
            "<=" => Ok(Comparison::LessThanOrEqual),
            _ => Err(ConditionError::UnknownComparison(s.to_string())),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Which value of the transaction amount an amount condition looks at.
///
/// Statements record spending as negative amounts, so `Absolute` lets a rule
/// say "1000 or more" without caring about the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmountBasis {
    #[default]
    Absolute,
    Signed,
}

impl AmountBasis {
    fn select(self, amount: Decimal) -> Decimal {
        match self {
            AmountBasis::Absolute => amount.abs(),
            AmountBasis::Signed => amount,
        }
    }
}

impl FromStr for AmountBasis {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "absolute" => Ok(AmountBasis::Absolute),
            "signed" => Ok(AmountBasis::Signed),
            _ => Err(ConditionError::UnknownBasis(s.to_string())),
        }
    }
}

impl fmt::Display for AmountBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountBasis::Absolute => write!(f, "absolute"),
            AmountBasis::Signed => write!(f, "signed"),
        }
    }
}

/// A description pattern with its regex compiled up front.
#[derive(Debug, Clone)]
pub struct TextPattern {
    pattern: String,
    mode: MatchMode,
    compiled: Option<Regex>,
}

impl TextPattern {
    pub fn new(pattern: &str, mode: MatchMode) -> Result<Self, ConditionError> {
        let compiled = match mode {
            MatchMode::Regex => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| ConditionError::InvalidRegex {
                        pattern: pattern.to_string(),
                        source,
                    })?,
            ),
            MatchMode::Contains | MatchMode::Exact => None,
        };
        Ok(TextPattern {
            pattern: pattern.to_string(),
            mode,
            compiled,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    fn is_match(&self, description: &str) -> bool {
        match self.mode {
            MatchMode::Contains => description.to_lowercase().contains(&self.pattern.to_lowercase()),
            MatchMode::Exact => description.trim().to_lowercase() == self.pattern.trim().to_lowercase(),
            MatchMode::Regex => self
                .compiled
                .as_ref()
                .is_some_and(|re| re.is_match(description)),
        }
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.mode == other.mode
    }
}

impl Eq for TextPattern {}

/// A predicate over one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Text(TextPattern),
    Amount {
        comparison: Comparison,
        value: Decimal,
        basis: AmountBasis,
    },
    AmountRange {
        from: Decimal,
        to: Decimal,
        basis: AmountBasis,
    },
    DateRange(DateRange),
    Category(Category),
}

/// Why a condition could not be judged against a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Degenerate {
    #[error("pattern is empty")]
    EmptyPattern,
    #[error("transaction has no description")]
    MissingDescription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Match,
    NoMatch,
    Degenerate(Degenerate),
}

impl Evaluation {
    pub fn is_match(self) -> bool {
        matches!(self, Evaluation::Match)
    }
}

impl From<bool> for Evaluation {
    fn from(matched: bool) -> Self {
        if matched {
            Evaluation::Match
        } else {
            Evaluation::NoMatch
        }
    }
}

impl Condition {
    pub fn text(pattern: &str, mode: MatchMode) -> Result<Self, ConditionError> {
        Ok(Condition::Text(TextPattern::new(pattern, mode)?))
    }

    pub fn contains(pattern: &str) -> Self {
        Condition::Text(TextPattern {
            pattern: pattern.to_string(),
            mode: MatchMode::Contains,
            compiled: None,
        })
    }

    /// Compares `|amount|` with `value`, which must not be negative.
    pub fn amount(comparison: Comparison, value: Decimal) -> Result<Self, ConditionError> {
        Self::amount_with_basis(comparison, value, AmountBasis::Absolute)
    }

    pub fn signed_amount(comparison: Comparison, value: Decimal) -> Self {
        Condition::Amount {
            comparison,
            value,
            basis: AmountBasis::Signed,
        }
    }

    pub fn amount_with_basis(
        comparison: Comparison,
        value: Decimal,
        basis: AmountBasis,
    ) -> Result<Self, ConditionError> {
        reject_negative_absolute(value, basis)?;
        Ok(Condition::Amount {
            comparison,
            value,
            basis,
        })
    }

    /// Inclusive range over `|amount|`.
    pub fn amount_range(from: Decimal, to: Decimal) -> Result<Self, ConditionError> {
        Self::amount_range_with_basis(from, to, AmountBasis::Absolute)
    }

    pub fn signed_amount_range(from: Decimal, to: Decimal) -> Result<Self, ConditionError> {
        Self::amount_range_with_basis(from, to, AmountBasis::Signed)
    }

    pub fn amount_range_with_basis(
        from: Decimal,
        to: Decimal,
        basis: AmountBasis,
    ) -> Result<Self, ConditionError> {
        if from > to {
            return Err(ConditionError::InvertedAmountRange { from, to });
        }
        reject_negative_absolute(from, basis)?;
        Ok(Condition::AmountRange { from, to, basis })
    }

    /// Day-granular range. A missing `to` collapses the range to the `from` day.
    pub fn date_range(from: NaiveDateTime, to: Option<NaiveDateTime>) -> Result<Self, ConditionError> {
        Ok(Condition::DateRange(DateRange::from_datetimes(from, to)?))
    }

    pub fn on_day(date: NaiveDate) -> Self {
        Condition::DateRange(DateRange::day(date))
    }

    pub fn category(category: Category) -> Self {
        Condition::Category(category)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Condition::Text(_) => "text",
            Condition::Amount { .. } => "amount",
            Condition::AmountRange { .. } => "amount_range",
            Condition::DateRange(_) => "date_range",
            Condition::Category(_) => "category",
        }
    }

    /// Judges the condition, reporting inputs it cannot work with.
    pub fn check(&self, tx: &Transaction) -> Evaluation {
        match self {
            Condition::Text(text) => {
                if text.pattern.trim().is_empty() {
                    return Evaluation::Degenerate(Degenerate::EmptyPattern);
                }
                if tx.description.trim().is_empty() {
                    return Evaluation::Degenerate(Degenerate::MissingDescription);
                }
                text.is_match(&tx.description).into()
            }
            Condition::Amount {
                comparison,
                value,
                basis,
            } => comparison.apply(basis.select(tx.amount.amount()), *value).into(),
            Condition::AmountRange { from, to, basis } => {
                let amount = basis.select(tx.amount.amount());
                (*from <= amount && amount <= *to).into()
            }
            Condition::DateRange(range) => range.contains(tx.date).into(),
            Condition::Category(category) => (tx.category == *category).into(),
        }
    }

    /// True only on a definite match; degenerate input counts as no match.
    pub fn evaluate(&self, tx: &Transaction) -> bool {
        self.check(tx).is_match()
    }
}

/// An absolute amount is never negative, so a negative bound could never match.
fn reject_negative_absolute(value: Decimal, basis: AmountBasis) -> Result<(), ConditionError> {
    if basis == AmountBasis::Absolute && value.is_sign_negative() && !value.is_zero() {
        return Err(ConditionError::NegativeAbsoluteAmount(value));
    }
    Ok(())
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Text(text) => write!(f, "description {} '{}'", text.mode, text.pattern),
            Condition::Amount {
                comparison,
                value,
                basis: AmountBasis::Absolute,
            } => write!(f, "|amount| {comparison} {value}"),
            Condition::Amount {
                comparison, value, ..
            } => write!(f, "amount {comparison} {value}"),
            Condition::AmountRange {
                from,
                to,
                basis: AmountBasis::Absolute,
            } => write!(f, "{from} <= |amount| <= {to}"),
            Condition::AmountRange { from, to, .. } => write!(f, "{from} <= amount <= {to}"),
            Condition::DateRange(range) => write!(f, "date in {range}"),
            Condition::Category(category) => write!(f, "category == {category}"),
        }
    }
}
