use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::category::Category;
use super::money::{Money, MoneyOverflow};

pub type TransactionId = i64;

/// One statement line. Only `category` changes after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub date: NaiveDateTime,
    pub description: String,
    pub amount: Money,
    pub running_balance: Option<Money>,
    #[serde(default)]
    pub category: Category,
}

impl Transaction {
    pub fn new(id: TransactionId, date: NaiveDateTime, description: &str, amount: Money) -> Self {
        Transaction {
            id,
            date,
            description: description.to_string(),
            amount,
            running_balance: None,
            category: Category::Uncategorized,
        }
    }

    pub fn with_running_balance(mut self, balance: Money) -> Self {
        self.running_balance = Some(balance);
        self
    }

    pub fn is_uncategorized(&self) -> bool {
        self.category.is_uncategorized()
    }
}

/// A set of transactions materialized together, stamped with when that happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionBatch {
    pub transactions: Vec<Transaction>,
    pub created: DateTime<Utc>,
}

impl TransactionBatch {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        TransactionBatch {
            transactions,
            created: Utc::now(),
        }
    }

    /// The id a follow-up import should start from to keep ids unique.
    /// `None` once the highest id is `TransactionId::MAX`.
    pub fn next_id(&self) -> Option<TransactionId> {
        match self.transactions.iter().map(|t| t.id).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        }
    }

    pub fn uncategorized_count(&self) -> usize {
        self.transactions.iter().filter(|t| t.is_uncategorized()).count()
    }

    /// Net amount per category, in category order.
    pub fn totals(&self) -> Result<BTreeMap<Category, Money>, MoneyOverflow> {
        let mut totals = BTreeMap::new();
        for tx in &self.transactions {
            let entry = totals.entry(tx.category).or_insert_with(Money::zero);
            *entry = entry.checked_add(tx.amount)?;
        }
        Ok(totals)
    }
}
