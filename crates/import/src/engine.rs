use ledgersort_core::{Category, Transaction, TransactionId};
use std::collections::BTreeMap;

use crate::condition::{Degenerate, Evaluation};
use crate::rules::Rule;
use crate::ruleset::RuleSet;

/// Which transactions a pass looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassMode {
    /// Only uncategorized transactions. Running twice changes nothing the
    /// second time.
    #[default]
    UncategorizedOnly,
    /// Also visits categorized transactions, which only `override` rules can
    /// change.
    IncludeCategorized,
}

/// A rule that could not be judged against a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub transaction_id: TransactionId,
    pub rule: String,
    pub reason: Degenerate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorizationReport {
    /// Transactions the pass evaluated rules for.
    pub examined: usize,
    /// Transactions whose category actually changed.
    pub changed: usize,
    /// Matches per rule name, including matches that left the category as it was.
    pub matches_by_rule: BTreeMap<String, usize>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Applies a rule set to transactions, first match wins.
#[derive(Debug, Clone, Copy)]
pub struct CategorizationEngine<'r> {
    rules: &'r RuleSet,
    mode: PassMode,
    collect_diagnostics: bool,
}

impl<'r> CategorizationEngine<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self {
            rules,
            mode: PassMode::default(),
            collect_diagnostics: false,
        }
    }

    pub fn with_mode(mut self, mode: PassMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_diagnostics(mut self) -> Self {
        self.collect_diagnostics = true;
        self
    }

    /// The rule that would categorize `tx`, without touching it.
    pub fn resolve(&self, tx: &Transaction) -> Option<&'r Rule> {
        self.rules.iter().find(|rule| rule.matches(tx))
    }

    /// Assigns categories in place. Only `category` fields are written and the
    /// slice keeps its order.
    pub fn categorize(&self, transactions: &mut [Transaction]) -> CategorizationReport {
        let mut report = CategorizationReport::default();

        for tx in transactions.iter_mut() {
            if self.mode == PassMode::UncategorizedOnly && !tx.is_uncategorized() {
                continue;
            }
            report.examined += 1;

            let Some(rule) = self.first_match(tx, &mut report.diagnostics) else {
                continue;
            };

            *report.matches_by_rule.entry(rule.name().to_string()).or_default() += 1;
            if tx.category != rule.category() {
                tracing::debug!(
                    "Transaction {} '{}': {} -> {} (rule '{}')",
                    tx.id,
                    tx.description,
                    tx.category,
                    rule.category(),
                    rule.name()
                );
                tx.category = rule.category();
                report.changed += 1;
            }
        }

        tracing::info!(
            "Categorized {} of {} examined transactions using {} rules",
            report.changed,
            report.examined,
            self.rules.len()
        );
        report
    }

    fn first_match(&self, tx: &Transaction, diagnostics: &mut Vec<Diagnostic>) -> Option<&'r Rule> {
        for rule in self.rules {
            match rule.check(tx) {
                Evaluation::Match => return Some(rule),
                Evaluation::NoMatch => {}
                Evaluation::Degenerate(reason) => {
                    if self.collect_diagnostics {
                        tracing::warn!(
                            "Rule '{}' cannot evaluate transaction {}: {reason}",
                            rule.name(),
                            tx.id
                        );
                        diagnostics.push(Diagnostic {
                            transaction_id: tx.id,
                            rule: rule.name().to_string(),
                            reason,
                        });
                    }
                }
            }
        }
        None
    }
}

/// Runs a default pass: uncategorized transactions only, no diagnostics.
pub fn categorize(transactions: &mut [Transaction], rules: &RuleSet) -> CategorizationReport {
    CategorizationEngine::new(rules).categorize(transactions)
}

/// How many transactions ended up in each category.
pub fn category_counts(transactions: &[Transaction]) -> BTreeMap<Category, usize> {
    let mut counts = BTreeMap::new();
    for tx in transactions {
        *counts.entry(tx.category).or_default() += 1;
    }
    counts
}
