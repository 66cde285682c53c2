//! LedgerSort CLI
//!
//! Usage:
//!   ledgersort import statement.csv     Parse, categorize and save a batch
//!   ledgersort categorize batch.json    Re-run rules over a saved batch
//!   ledgersort rules list               Show rules in evaluation order
//!   ledgersort summary batch.json       Category totals

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ledgersort::cli::{Cli, Commands, LedgerAction, RulesAction};
use ledgersort::commands;
use ledgersort::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(rules) = cli.rules {
        config.rules_path = rules;
    }

    // Priority: RUST_LOG env var > --verbose flag > configured level
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(&config.log_level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Import {
            file,
            start_id,
            output,
            record,
        } => {
            commands::cmd_import(&config, &file, start_id, output, record).await?;
            Ok(())
        }
        Commands::Categorize {
            batch,
            include_categorized,
            diagnostics,
        } => {
            commands::cmd_categorize(&config, &batch, include_categorized, diagnostics)?;
            Ok(())
        }
        Commands::Rules { action } => match action {
            RulesAction::List => commands::cmd_rules_list(&config),
            RulesAction::Check => commands::cmd_rules_check(&config).map(|_| ()),
            RulesAction::Add(args) => commands::cmd_rules_add(&config, args.into_record()),
            RulesAction::Remove { name } => commands::cmd_rules_remove(&config, &name),
        },
        Commands::Summary { batch } => commands::cmd_summary(&batch),
        Commands::Ledger { action } => {
            let pool = commands::open_ledger(&config).await?;
            match action {
                LedgerAction::Totals => commands::cmd_ledger_totals(&pool).await,
                LedgerAction::Show { batch_id } => commands::cmd_ledger_show(&pool, batch_id).await,
                LedgerAction::Recategorize {
                    batch_id,
                    include_categorized,
                } => {
                    commands::cmd_ledger_recategorize(&config, &pool, batch_id, include_categorized)
                        .await?;
                    Ok(())
                }
            }
        }
    }
}
