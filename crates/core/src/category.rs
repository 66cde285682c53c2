use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Spending buckets a transaction can be filed under.
///
/// The set is closed: rule files naming anything else are rejected when they
/// are loaded. `Uncategorized` doubles as the "not yet resolved" marker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Amazon,
    Auto,
    DateNights,
    Delivery,
    Electric,
    Entertainment,
    Fitness,
    Fraud,
    Gas,
    Gifts,
    Groceries,
    Grubhub,
    Income,
    Insurance,
    Internet,
    Loans,
    Mortgage,
    Pets,
    Phone,
    Savings,
    Takeout,
    Taxes,
    Weed,
    #[default]
    Uncategorized,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown category: '{0}'")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: [Category; 24] = [
        Category::Amazon,
        Category::Auto,
        Category::DateNights,
        Category::Delivery,
        Category::Electric,
        Category::Entertainment,
        Category::Fitness,
        Category::Fraud,
        Category::Gas,
        Category::Gifts,
        Category::Groceries,
        Category::Grubhub,
        Category::Income,
        Category::Insurance,
        Category::Internet,
        Category::Loans,
        Category::Mortgage,
        Category::Pets,
        Category::Phone,
        Category::Savings,
        Category::Takeout,
        Category::Taxes,
        Category::Weed,
        Category::Uncategorized,
    ];

    /// The name written to rule files and batches.
    pub fn name(self) -> &'static str {
        match self {
            Category::Amazon => "Amazon",
            Category::Auto => "Auto",
            Category::DateNights => "Date Nights",
            Category::Delivery => "Delivery",
            Category::Electric => "Electric",
            Category::Entertainment => "Entertainment",
            Category::Fitness => "Gym Fees",
            Category::Fraud => "Fraud",
            Category::Gas => "Gas",
            Category::Gifts => "Gifts",
            Category::Groceries => "Groceries",
            Category::Grubhub => "Grubhub",
            Category::Income => "Income",
            Category::Insurance => "Insurance",
            Category::Internet => "Internet",
            Category::Loans => "Loans",
            Category::Mortgage => "Mortgage",
            Category::Pets => "Pets",
            Category::Phone => "Phone",
            Category::Savings => "Savings",
            Category::Takeout => "Takeout",
            Category::Taxes => "Taxes",
            Category::Weed => "Weed",
            Category::Uncategorized => "Uncategorized",
        }
    }

    /// Upper snake-case identifier, as used by older rule files.
    fn identifier(self) -> &'static str {
        match self {
            Category::DateNights => "DATE_NIGHTS",
            Category::Fitness => "FITNESS",
            Category::Amazon => "AMAZON",
            Category::Auto => "AUTO",
            Category::Delivery => "DELIVERY",
            Category::Electric => "ELECTRIC",
            Category::Entertainment => "ENTERTAINMENT",
            Category::Fraud => "FRAUD",
            Category::Gas => "GAS",
            Category::Gifts => "GIFTS",
            Category::Groceries => "GROCERIES",
            Category::Grubhub => "GRUBHUB",
            Category::Income => "INCOME",
            Category::Insurance => "INSURANCE",
            Category::Internet => "INTERNET",
            Category::Loans => "LOANS",
            Category::Mortgage => "MORTGAGE",
            Category::Pets => "PETS",
            Category::Phone => "PHONE",
            Category::Savings => "SAVINGS",
            Category::Takeout => "TAKEOUT",
            Category::Taxes => "TAXES",
            Category::Weed => "WEED",
            Category::Uncategorized => "UNCATEGORIZED",
        }
    }

    pub fn is_uncategorized(self) -> bool {
        self == Category::Uncategorized
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted) || c.identifier().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl TryFrom<String> for Category {
    type Error = UnknownCategory;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.name().to_string()
    }
}
