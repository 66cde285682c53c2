//! Command implementations behind the `ledgersort` subcommands.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ledgersort_core::{Category, Money, Transaction, TransactionBatch};
use ledgersort_import::{
    category_counts, import_statement, CategorizationEngine, CategorizationReport, PassMode, Rule,
    RuleRecord, RuleSet,
};
use ledgersort_storage::{self as storage, DbPool};

use crate::config::Config;

fn load_rules(config: &Config) -> Result<RuleSet> {
    RuleSet::load(&config.rules_path)
        .with_context(|| format!("Failed to load rules from {}", config.rules_path.display()))
}

fn pass_mode(include_categorized: bool) -> PassMode {
    if include_categorized {
        PassMode::IncludeCategorized
    } else {
        PassMode::UncategorizedOnly
    }
}

pub async fn open_ledger(config: &Config) -> Result<DbPool> {
    if let Some(parent) = config.database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    storage::create_db(&config.database_path)
        .await
        .with_context(|| format!("Failed to open ledger {}", config.database_path.display()))
}

/// Parses, categorizes and saves a statement. Returns the batch file written.
pub async fn cmd_import(
    config: &Config,
    file: &Path,
    start_id: Option<i64>,
    output: Option<PathBuf>,
    record: bool,
) -> Result<PathBuf> {
    let rules = load_rules(config)?;
    let transactions = import_statement(file, start_id.unwrap_or(config.start_id))
        .with_context(|| format!("Failed to import {}", file.display()))?;

    let mut batch = TransactionBatch::new(transactions);
    let report = CategorizationEngine::new(&rules).categorize(&mut batch.transactions);

    let output = output
        .unwrap_or_else(|| config.output_dir.join(storage::batch_file_name(batch.created)));
    storage::save_batch(&output, &batch)?;

    println!(
        "Imported {} transactions from {}",
        batch.transactions.len(),
        file.display()
    );
    print_report(&report);
    println!("Saved batch to {}", output.display());

    if record {
        let pool = open_ledger(config).await?;
        let source = file.display().to_string();
        let batch_id = storage::record_batch(&pool, &batch, Some(&source))
            .await
            .context("Failed to record batch in ledger")?;
        println!("Recorded as ledger batch {batch_id}");
    }

    Ok(output)
}

/// Re-runs the rules over a saved batch and writes it back.
pub fn cmd_categorize(
    config: &Config,
    batch_path: &Path,
    include_categorized: bool,
    diagnostics: bool,
) -> Result<CategorizationReport> {
    let rules = load_rules(config)?;
    let mut batch = storage::load_batch(batch_path)?;

    let mut engine = CategorizationEngine::new(&rules).with_mode(pass_mode(include_categorized));
    if diagnostics {
        engine = engine.with_diagnostics();
    }
    let report = engine.categorize(&mut batch.transactions);

    if report.changed > 0 {
        storage::save_batch(batch_path, &batch)?;
    }
    print_report(&report);
    Ok(report)
}

pub fn cmd_rules_list(config: &Config) -> Result<()> {
    let rules = load_rules(config)?;
    if rules.is_empty() {
        println!("No rules in {}", config.rules_path.display());
        return Ok(());
    }

    println!("{:>6}  {:<24} {:<20} CONDITION", "ORDER", "NAME", "CATEGORY");
    for rule in &rules {
        let flag = if rule.overrides() { " (override)" } else { "" };
        println!(
            "{:>6}  {:<24} {:<20} {}{}",
            rule.order(),
            rule.name(),
            rule.category(),
            rule.condition(),
            flag
        );
    }
    Ok(())
}

/// Validates the rule file, returning how many rules it holds.
pub fn cmd_rules_check(config: &Config) -> Result<usize> {
    let rules = load_rules(config)?;
    let unreachable = rules
        .iter()
        .filter(|r| r.category() == Category::Uncategorized)
        .count();
    if unreachable > 0 {
        println!("{unreachable} rule(s) assign Uncategorized and never change a transaction");
    }
    println!("{} rules OK", rules.len());
    Ok(rules.len())
}

pub fn cmd_rules_add(config: &Config, record: RuleRecord) -> Result<()> {
    let mut rules = load_rules(config)?;
    if rules.get(&record.name).is_some() {
        bail!("A rule named '{}' already exists", record.name);
    }

    let rule = Rule::from_record(record)?;
    println!(
        "Added rule '{}': {} -> {} (order {})",
        rule.name(),
        rule.condition(),
        rule.category(),
        rule.order()
    );
    rules.insert(rule);
    rules
        .save(&config.rules_path)
        .with_context(|| format!("Failed to save rules to {}", config.rules_path.display()))?;
    Ok(())
}

pub fn cmd_rules_remove(config: &Config, name: &str) -> Result<()> {
    let mut rules = load_rules(config)?;
    if rules.remove(name).is_none() {
        bail!("No rule named '{name}'");
    }
    rules
        .save(&config.rules_path)
        .with_context(|| format!("Failed to save rules to {}", config.rules_path.display()))?;
    println!("Removed rule '{name}'");
    Ok(())
}

pub fn cmd_summary(batch_path: &Path) -> Result<()> {
    let batch = storage::load_batch(batch_path)?;
    let counts = category_counts(&batch.transactions);
    let totals = batch
        .totals()
        .with_context(|| format!("Failed to total {}", batch_path.display()))?;
    print_totals(&totals, |category| counts.get(&category).copied());
    println!(
        "{} transactions, {} uncategorized",
        batch.transactions.len(),
        batch.uncategorized_count()
    );
    Ok(())
}

pub async fn cmd_ledger_totals(pool: &DbPool) -> Result<()> {
    let totals = storage::category_totals(pool)
        .await
        .context("Failed to read ledger totals")?;
    if totals.is_empty() {
        println!("Ledger is empty");
        return Ok(());
    }
    print_totals(&totals, |_| None);
    Ok(())
}

pub async fn cmd_ledger_show(pool: &DbPool, batch_id: i64) -> Result<()> {
    let transactions = storage::get_transactions(pool, batch_id)
        .await
        .with_context(|| format!("Failed to read ledger batch {batch_id}"))?;
    if transactions.is_empty() {
        bail!("No ledger batch {batch_id}");
    }
    for tx in &transactions {
        print_transaction(tx);
    }
    Ok(())
}

pub async fn cmd_ledger_recategorize(
    config: &Config,
    pool: &DbPool,
    batch_id: i64,
    include_categorized: bool,
) -> Result<CategorizationReport> {
    let rules = load_rules(config)?;
    let mut transactions = storage::get_transactions(pool, batch_id)
        .await
        .with_context(|| format!("Failed to read ledger batch {batch_id}"))?;
    if transactions.is_empty() {
        bail!("No ledger batch {batch_id}");
    }

    let report = CategorizationEngine::new(&rules)
        .with_mode(pass_mode(include_categorized))
        .categorize(&mut transactions);
    if report.changed > 0 {
        storage::update_categories(pool, batch_id, &transactions)
            .await
            .context("Failed to store new categories")?;
    }
    print_report(&report);
    Ok(report)
}

fn print_report(report: &CategorizationReport) {
    println!(
        "Categorized {} of {} examined transactions",
        report.changed, report.examined
    );
    for (rule, count) in &report.matches_by_rule {
        println!("  {rule:<24} {count}");
    }
    for d in &report.diagnostics {
        println!(
            "  warning: rule '{}' skipped transaction {}: {}",
            d.rule, d.transaction_id, d.reason
        );
    }
}

fn print_totals(
    totals: &std::collections::BTreeMap<Category, Money>,
    count: impl Fn(Category) -> Option<usize>,
) {
    for (category, total) in totals {
        match count(*category) {
            Some(n) => println!("{:<20} {:>12}  ({n})", category, total.to_string()),
            None => println!("{:<20} {:>12}", category, total.to_string()),
        }
    }
}

fn print_transaction(tx: &Transaction) {
    println!(
        "{:>6}  {}  {:<32} {:>12}  {}",
        tx.id,
        tx.date.format("%Y-%m-%d"),
        tx.description,
        tx.amount.to_string(),
        tx.category
    );
}
