//! CLI argument definitions using clap.
//!
//! The command implementations live in `commands`.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use ledgersort_import::{ConditionRecord, RuleRecord};

/// LedgerSort - categorize bank statement transactions with ordered rules
#[derive(Parser, Debug)]
#[command(name = "ledgersort")]
#[command(about = "Rule-based transaction categorization", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ledgersort.toml in the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Rule file, overriding the configured one
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a CSV statement, categorize it and save the batch
    Import {
        /// Headerless CSV: date, description, amount, running balance
        file: PathBuf,

        /// First transaction id (defaults to the configured start id)
        #[arg(long)]
        start_id: Option<i64>,

        /// Batch file to write (defaults to a timestamped file in the output dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also record the batch in the SQLite ledger
        #[arg(long)]
        record: bool,
    },

    /// Re-run the rules over a saved batch, in place
    Categorize {
        batch: PathBuf,

        /// Visit already-categorized transactions so override rules can apply
        #[arg(long)]
        include_categorized: bool,

        /// Report rules that could not be evaluated against a transaction
        #[arg(long)]
        diagnostics: bool,
    },

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Show category totals for a saved batch
    Summary { batch: PathBuf },

    /// Query and update the SQLite ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List rules in evaluation order
    List,
    /// Validate the rule file
    Check,
    /// Add a rule
    Add(RuleArgs),
    /// Remove a rule by name
    Remove { name: String },
}

#[derive(Subcommand, Debug)]
pub enum LedgerAction {
    /// Net amount per category across all recorded batches
    Totals,
    /// List the transactions of a recorded batch
    Show { batch_id: i64 },
    /// Re-run the rules over a recorded batch and store the new categories
    Recategorize {
        batch_id: i64,

        #[arg(long)]
        include_categorized: bool,
    },
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("condition")
        .required(true)
        .args(["text", "amount", "range", "date", "when_category"])
))]
pub struct RuleArgs {
    #[arg(long)]
    pub name: String,

    /// Target category
    #[arg(long)]
    pub category: String,

    /// Lower orders are evaluated first
    #[arg(long, allow_negative_numbers = true)]
    pub order: i32,

    /// Allow this rule to replace an existing category
    #[arg(long = "override")]
    pub overrides: bool,

    /// Match the description against a pattern
    #[arg(long)]
    pub text: Option<String>,

    /// Text match mode: contains, exact, regex
    #[arg(long, requires = "text")]
    pub mode: Option<String>,

    /// Compare the amount, e.g. --amount ">=" 1000
    #[arg(long, num_args = 2, value_names = ["OP", "VALUE"], allow_negative_numbers = true)]
    pub amount: Option<Vec<String>>,

    /// Inclusive amount range
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"], allow_negative_numbers = true)]
    pub range: Option<Vec<String>>,

    /// Amount basis for --amount and --range: absolute or signed
    #[arg(long)]
    pub basis: Option<String>,

    /// Inclusive date range; a single date matches that day
    #[arg(long, num_args = 1..=2, value_names = ["FROM", "TO"])]
    pub date: Option<Vec<String>>,

    /// Match transactions already in this category
    #[arg(long)]
    pub when_category: Option<String>,
}

impl RuleArgs {
    /// Builds the unvalidated record; validation happens when it becomes a rule.
    pub fn into_record(self) -> RuleRecord {
        let condition = if let Some(pattern) = self.text {
            Some(ConditionRecord::Text {
                pattern,
                mode: self.mode,
            })
        } else if let Some([comparison, value]) = self.amount.and_then(pair) {
            Some(ConditionRecord::Amount {
                comparison,
                value,
                basis: self.basis,
            })
        } else if let Some([from, to]) = self.range.and_then(pair) {
            Some(ConditionRecord::AmountRange {
                from,
                to,
                basis: self.basis,
            })
        } else if let Some(dates) = self.date {
            let mut dates = dates.into_iter();
            dates.next().map(|from| ConditionRecord::DateRange {
                from,
                to: dates.next(),
            })
        } else {
            self.when_category
                .map(|category| ConditionRecord::Category { category })
        };

        RuleRecord {
            name: self.name,
            category: self.category,
            order: self.order,
            overrides: self.overrides,
            condition,
            filter_expression: None,
        }
    }
}

fn pair(values: Vec<String>) -> Option<[String; 2]> {
    values.try_into().ok()
}
