use std::path::Path;

use ledgersort::commands;
use ledgersort::config::Config;
use ledgersort_core::{Category, Money};
use ledgersort_import::{ConditionRecord, RuleRecord, RuleSet};
use ledgersort_storage as storage;

const STATEMENT: &str = "\
03/01/2024,AMAZON.COM*MK1234,-42.50,957.50
03/02/2024,SHELL OIL 5551234,-38.10,919.40
03/03/2024,ACME MORTGAGE CO,-1200.00,-280.60
03/04/2024,CORNER BAKERY,-6.25,-286.85
";

const RULES: &str = r#"[
    {"name": "amazon", "category": "Amazon", "order": 1,
     "condition": {"kind": "text", "pattern": "amazon"}},
    {"name": "shell", "category": "Gas", "order": 2,
     "condition": {"kind": "text", "pattern": "^SHELL OIL", "mode": "regex"}},
    {"name": "big-expense", "category": "Mortgage", "order": 3,
     "condition": {"kind": "amount", "comparison": ">=", "value": "1000"}}
]"#;

fn setup(dir: &Path) -> (Config, std::path::PathBuf) {
    let config = Config::with_data_dir(dir);
    std::fs::write(&config.rules_path, RULES).unwrap();
    let csv = dir.join("march.csv");
    std::fs::write(&csv, STATEMENT).unwrap();
    (config, csv)
}

fn text_record(name: &str, pattern: &str, category: &str, order: i32) -> RuleRecord {
    RuleRecord {
        name: name.to_string(),
        category: category.to_string(),
        order,
        overrides: false,
        condition: Some(ConditionRecord::Text {
            pattern: pattern.to_string(),
            mode: None,
        }),
        filter_expression: None,
    }
}

#[tokio::test]
async fn import_categorizes_and_saves_batch() {
    let dir = tempfile::tempdir().unwrap();
    let (config, csv) = setup(dir.path());

    let output = commands::cmd_import(&config, &csv, None, None, false).await.unwrap();
    assert!(output.starts_with(&config.output_dir));
    assert!(output
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("transactions-") && n.ends_with(".json")));

    let batch = storage::load_batch(&output).unwrap();
    let categories: Vec<_> = batch.transactions.iter().map(|t| t.category).collect();
    assert_eq!(
        categories,
        [
            Category::Amazon,
            Category::Gas,
            Category::Mortgage,
            Category::Uncategorized
        ]
    );
    let ids: Vec<_> = batch.transactions.iter().map(|t| t.id).collect();
    assert_eq!(ids, [1, 2, 3, 4]);
}

#[tokio::test]
async fn import_honours_start_id_and_output() {
    let dir = tempfile::tempdir().unwrap();
    let (config, csv) = setup(dir.path());
    let output = dir.path().join("out").join("march.json");

    let written = commands::cmd_import(&config, &csv, Some(100), Some(output.clone()), false)
        .await
        .unwrap();
    assert_eq!(written, output);
    let batch = storage::load_batch(&output).unwrap();
    assert_eq!(batch.transactions[0].id, 100);
    assert_eq!(batch.next_id(), Some(104));
}

#[tokio::test]
async fn import_rejects_malformed_statement() {
    let dir = tempfile::tempdir().unwrap();
    let (config, csv) = setup(dir.path());
    std::fs::write(&csv, "03/01/2024,AMAZON,forty,0\n").unwrap();

    let err = commands::cmd_import(&config, &csv, None, None, false)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Malformed transaction row on line 1"));
    assert!(!config.output_dir.exists());
}

#[tokio::test]
async fn import_with_invalid_rules_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let (config, csv) = setup(dir.path());
    std::fs::write(
        &config.rules_path,
        r#"[{"name": "broken", "category": "Gas", "order": 1,
             "condition": {"kind": "text", "pattern": "(", "mode": "regex"}}]"#,
    )
    .unwrap();

    let err = commands::cmd_import(&config, &csv, None, None, false)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("'broken'"));
}

#[tokio::test]
async fn new_rule_then_recategorize_batch() {
    let dir = tempfile::tempdir().unwrap();
    let (config, csv) = setup(dir.path());
    let output = commands::cmd_import(&config, &csv, None, None, false).await.unwrap();

    commands::cmd_rules_add(&config, text_record("bakery", "BAKERY", "Takeout", 4)).unwrap();
    let report = commands::cmd_categorize(&config, &output, false, false).unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.changed, 1);

    let batch = storage::load_batch(&output).unwrap();
    assert_eq!(batch.transactions[3].category, Category::Takeout);

    let again = commands::cmd_categorize(&config, &output, false, false).unwrap();
    assert_eq!(again.examined, 0);
    assert_eq!(again.changed, 0);
}

#[tokio::test]
async fn override_rule_applies_only_when_including_categorized() {
    let dir = tempfile::tempdir().unwrap();
    let (config, csv) = setup(dir.path());
    let output = commands::cmd_import(&config, &csv, None, None, false).await.unwrap();

    let mut fraud = text_record("flagged-amazon", "MK1234", "Fraud", 0);
    fraud.overrides = true;
    commands::cmd_rules_add(&config, fraud).unwrap();

    let skipped = commands::cmd_categorize(&config, &output, false, false).unwrap();
    assert_eq!(skipped.changed, 0);

    let report = commands::cmd_categorize(&config, &output, true, false).unwrap();
    assert_eq!(report.changed, 1);
    let batch = storage::load_batch(&output).unwrap();
    assert_eq!(batch.transactions[0].category, Category::Fraud);
    assert_eq!(batch.transactions[1].category, Category::Gas);
}

#[test]
fn rules_add_and_remove_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let (config, _) = setup(dir.path());

    commands::cmd_rules_add(&config, text_record("kroger", "KROGER", "Groceries", 2)).unwrap();
    let rules = RuleSet::load(&config.rules_path).unwrap();
    let names: Vec<_> = rules.iter().map(|r| r.name()).collect();
    assert_eq!(names, ["amazon", "shell", "kroger", "big-expense"]);

    assert!(commands::cmd_rules_add(&config, text_record("kroger", "K", "Gas", 9)).is_err());

    commands::cmd_rules_remove(&config, "kroger").unwrap();
    assert_eq!(commands::cmd_rules_check(&config).unwrap(), 3);
    assert!(commands::cmd_rules_remove(&config, "kroger").is_err());
}

#[test]
fn rules_add_rejects_unknown_category() {
    let dir = tempfile::tempdir().unwrap();
    let (config, _) = setup(dir.path());
    let err = commands::cmd_rules_add(&config, text_record("trip", "HOTEL", "Vacation", 1)).unwrap_err();
    assert!(err.to_string().contains("Vacation"));
    assert_eq!(RuleSet::load(&config.rules_path).unwrap().len(), 3);
}

#[test]
fn rules_work_in_toml_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_data_dir(dir.path());
    config.rules_path = dir.path().join("rules.toml");

    commands::cmd_rules_add(&config, text_record("shell", "SHELL", "Gas", 1)).unwrap();
    let content = std::fs::read_to_string(&config.rules_path).unwrap();
    assert!(content.contains("[[rule]]"));
    assert_eq!(commands::cmd_rules_check(&config).unwrap(), 1);
    commands::cmd_rules_list(&config).unwrap();
}

#[tokio::test]
async fn summary_reads_saved_batch() {
    let dir = tempfile::tempdir().unwrap();
    let (config, csv) = setup(dir.path());
    let output = commands::cmd_import(&config, &csv, None, None, false).await.unwrap();
    commands::cmd_summary(&output).unwrap();

    let totals = storage::load_batch(&output).unwrap().totals().unwrap();
    assert_eq!(totals[&Category::Mortgage], Money::from_cents(-120000));
    assert!(commands::cmd_summary(&dir.path().join("missing.json")).is_err());
}

#[tokio::test]
async fn recorded_batch_can_be_recategorized_in_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let (config, csv) = setup(dir.path());
    commands::cmd_import(&config, &csv, None, None, true).await.unwrap();
    assert!(config.database_path.exists());

    commands::cmd_rules_add(&config, text_record("bakery", "BAKERY", "Takeout", 4)).unwrap();
    let pool = commands::open_ledger(&config).await.unwrap();
    let report = commands::cmd_ledger_recategorize(&config, &pool, 1, false)
        .await
        .unwrap();
    assert_eq!(report.changed, 1);

    let totals = storage::category_totals(&pool).await.unwrap();
    assert_eq!(totals[&Category::Takeout], Money::from_cents(-625));
    assert!(!totals.contains_key(&Category::Uncategorized));

    commands::cmd_ledger_show(&pool, 1).await.unwrap();
    commands::cmd_ledger_totals(&pool).await.unwrap();
    assert!(commands::cmd_ledger_show(&pool, 2).await.is_err());
}
