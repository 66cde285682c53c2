use chrono::{NaiveDate, NaiveDateTime};
use ledgersort_core::{Category, Transaction, UnknownCategory};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;

use crate::condition::{AmountBasis, Condition, ConditionError, Evaluation, MatchMode};

/// A rule that could not be built, named so the rule file can be fixed.
#[derive(Debug, Error)]
#[error("Invalid rule definition '{name}': {defect}")]
pub struct InvalidRuleDefinition {
    pub name: String,
    pub defect: RuleDefect,
}

#[derive(Debug, Error)]
pub enum RuleDefect {
    #[error(transparent)]
    Condition(#[from] ConditionError),
    #[error(transparent)]
    Category(#[from] UnknownCategory),
    #[error("no condition given")]
    MissingCondition,
    #[error("both `condition` and `filter_expression` given")]
    ConflictingCondition,
}

/// Maps transactions satisfying `condition` to `category`.
///
/// Rules run in ascending `order`. Unless `overrides` is set a rule only
/// acts on transactions that are still uncategorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: String,
    condition: Condition,
    category: Category,
    order: i32,
    overrides: bool,
}

impl Rule {
    pub fn new(name: &str, condition: Condition, category: Category, order: i32) -> Self {
        Rule {
            name: name.to_string(),
            condition,
            category,
            order,
            overrides: false,
        }
    }

    pub fn with_override(mut self) -> Self {
        self.overrides = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn overrides(&self) -> bool {
        self.overrides
    }

    /// Evaluation order. Only `order` takes part.
    pub fn cmp_order(&self, other: &Rule) -> Ordering {
        self.order.cmp(&other.order)
    }

    /// Whether the rule may touch `tx` at all, before looking at its condition.
    pub fn applies_to(&self, tx: &Transaction) -> bool {
        self.overrides || tx.is_uncategorized()
    }

    /// Guard plus condition. A transaction the rule may not touch is a plain no-match.
    pub fn check(&self, tx: &Transaction) -> Evaluation {
        if !self.applies_to(tx) {
            return Evaluation::NoMatch;
        }
        self.condition.check(tx)
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.check(tx).is_match()
    }

    pub fn from_record(record: RuleRecord) -> Result<Rule, InvalidRuleDefinition> {
        let RuleRecord {
            name,
            category,
            order,
            overrides,
            condition,
            filter_expression,
        } = record;

        match build_parts(&category, condition, filter_expression) {
            Ok((condition, category)) => Ok(Rule {
                name,
                condition,
                category,
                order,
                overrides,
            }),
            Err(defect) => Err(InvalidRuleDefinition { name, defect }),
        }
    }

    pub fn to_record(&self) -> RuleRecord {
        RuleRecord {
            name: self.name.clone(),
            category: self.category.to_string(),
            order: self.order,
            overrides: self.overrides,
            condition: Some(ConditionRecord::from(&self.condition)),
            filter_expression: None,
        }
    }
}

/// Persisted shape of a [`Rule`].
///
/// Values that need validation (dates, amounts, operators, categories) are
/// kept as text so a bad value can be reported against its rule name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub name: String,
    pub category: String,
    pub order: i32,
    #[serde(default, rename = "override")]
    pub overrides: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionRecord>,
    /// Older rule files store a bare description regex here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionRecord {
    Text {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<String>,
    },
    Amount {
        comparison: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        basis: Option<String>,
    },
    AmountRange {
        from: String,
        to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        basis: Option<String>,
    },
    DateRange {
        from: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
    },
    Category {
        category: String,
    },
}

impl ConditionRecord {
    pub fn build(self) -> Result<Condition, RuleDefect> {
        let condition = match self {
            ConditionRecord::Text { pattern, mode } => {
                let mode = mode.as_deref().map(MatchMode::from_str).transpose()?.unwrap_or_default();
                Condition::text(&pattern, mode)?
            }
            ConditionRecord::Amount {
                comparison,
                value,
                basis,
            } => Condition::amount_with_basis(
                comparison.parse()?,
                parse_decimal(&value)?,
                parse_basis(basis.as_deref())?,
            )?,
            ConditionRecord::AmountRange { from, to, basis } => Condition::amount_range_with_basis(
                parse_decimal(&from)?,
                parse_decimal(&to)?,
                parse_basis(basis.as_deref())?,
            )?,
            ConditionRecord::DateRange { from, to } => {
                let from = parse_datetime(&from)?;
                let to = to.as_deref().map(parse_datetime).transpose()?;
                Condition::date_range(from, to)?
            }
            ConditionRecord::Category { category } => Condition::category(category.parse()?),
        };
        Ok(condition)
    }
}

impl From<&Condition> for ConditionRecord {
    fn from(condition: &Condition) -> Self {
        match condition {
            Condition::Text(text) => ConditionRecord::Text {
                pattern: text.pattern().to_string(),
                mode: Some(text.mode().to_string()),
            },
            Condition::Amount {
                comparison,
                value,
                basis,
            } => ConditionRecord::Amount {
                comparison: comparison.to_string(),
                value: value.to_string(),
                basis: Some(basis.to_string()),
            },
            Condition::AmountRange { from, to, basis } => ConditionRecord::AmountRange {
                from: from.to_string(),
                to: to.to_string(),
                basis: Some(basis.to_string()),
            },
            Condition::DateRange(range) => ConditionRecord::DateRange {
                from: range.start().to_string(),
                to: Some(range.end().to_string()),
            },
            Condition::Category(category) => ConditionRecord::Category {
                category: category.to_string(),
            },
        }
    }
}

fn build_parts(
    category: &str,
    condition: Option<ConditionRecord>,
    filter_expression: Option<String>,
) -> Result<(Condition, Category), RuleDefect> {
    let category = Category::from_str(category)?;
    let condition = match (condition, filter_expression) {
        (Some(_), Some(_)) => return Err(RuleDefect::ConflictingCondition),
        (None, None) => return Err(RuleDefect::MissingCondition),
        (Some(record), None) => record.build()?,
        (None, Some(expression)) => Condition::text(&expression, MatchMode::Regex)?,
    };
    Ok((condition, category))
}

fn parse_decimal(s: &str) -> Result<Decimal, ConditionError> {
    Decimal::from_str(s.trim()).map_err(|_| ConditionError::InvalidAmount(s.to_string()))
}

fn parse_basis(s: Option<&str>) -> Result<AmountBasis, ConditionError> {
    s.map(AmountBasis::from_str).transpose().map(Option::unwrap_or_default)
}

/// Accepts `YYYY-MM-DD`, `MM/DD/YYYY` or a full `YYYY-MM-DDTHH:MM:SS` timestamp.
fn parse_datetime(s: &str) -> Result<NaiveDateTime, ConditionError> {
    let s = s.trim();
    if let Ok(moment) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(moment);
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date.and_time(chrono::NaiveTime::MIN));
        }
    }
    Err(ConditionError::InvalidDate(s.to_string()))
}
