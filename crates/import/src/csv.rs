use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ledgersort_core::{Money, MoneyParseError, Transaction, TransactionId};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Field positions in a statement row.
const DATE_COLUMN: usize = 0;
const DESCRIPTION_COLUMN: usize = 1;
const AMOUNT_COLUMN: usize = 2;
const BALANCE_COLUMN: usize = 3;
const FIELD_COUNT: usize = 4;

const DATE_FORMAT: &str = "%m/%d/%Y";

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Malformed transaction row on line {line}: {defect}")]
    MalformedTransactionRow { line: u64, defect: RowDefect },
    #[error("Transaction id overflow on line {line}")]
    IdOverflow { line: u64 },
    #[error("No data rows")]
    NoDataRows,
}

#[derive(Error, Debug)]
pub enum RowDefect {
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid date '{0}', expected MM/DD/YYYY")]
    InvalidDate(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(#[source] MoneyParseError),
    #[error("invalid running balance: {0}")]
    InvalidBalance(#[source] MoneyParseError),
}

/// Parses headerless `date,description,amount,running balance` rows.
///
/// Ids run from `start_id` in row order. Any bad row fails the whole
/// statement; errors carry the 1-based line number in the file.
pub fn parse_statement<R: Read>(data: R, start_id: TransactionId) -> Result<Vec<Transaction>, StatementError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut transactions = Vec::new();
    let mut next_id = Some(start_id);

    for (index, result) in reader.records().enumerate() {
        let record = result?;
        let line = record.position().map_or(index as u64 + 1, |p| p.line());

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let id = next_id.ok_or(StatementError::IdOverflow { line })?;
        let tx = parse_row(&record, id)
            .map_err(|defect| StatementError::MalformedTransactionRow { line, defect })?;
        transactions.push(tx);
        next_id = id.checked_add(1);
    }

    let Some(last) = transactions.last() else {
        return Err(StatementError::NoDataRows);
    };

    tracing::debug!(
        "Parsed {} transactions, ids {}..={}",
        transactions.len(),
        start_id,
        last.id
    );
    Ok(transactions)
}

pub fn import_statement(path: &Path, start_id: TransactionId) -> Result<Vec<Transaction>, StatementError> {
    let file = std::fs::File::open(path)?;
    let transactions = parse_statement(std::io::BufReader::new(file), start_id)?;
    tracing::info!("Imported {} transactions from {}", transactions.len(), path.display());
    Ok(transactions)
}

fn parse_row(record: &csv::StringRecord, id: TransactionId) -> Result<Transaction, RowDefect> {
    if record.len() != FIELD_COUNT {
        return Err(RowDefect::FieldCount(record.len()));
    }

    let date = parse_date(&record[DATE_COLUMN])?;
    let amount = record[AMOUNT_COLUMN]
        .parse::<Money>()
        .map_err(RowDefect::InvalidAmount)?;

    let balance_field = &record[BALANCE_COLUMN];
    let running_balance = if balance_field.is_empty() {
        None
    } else {
        Some(balance_field.parse::<Money>().map_err(RowDefect::InvalidBalance)?)
    };

    let mut tx = Transaction::new(id, date, &record[DESCRIPTION_COLUMN], amount);
    tx.running_balance = running_balance;
    Ok(tx)
}

fn parse_date(s: &str) -> Result<NaiveDateTime, RowDefect> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| RowDefect::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersort_core::Category;

    fn parse(data: &str, start_id: TransactionId) -> Result<Vec<Transaction>, StatementError> {
        parse_statement(data.as_bytes(), start_id)
    }

    fn row_error(data: &str) -> (u64, RowDefect) {
        match parse(data, 1) {
            Err(StatementError::MalformedTransactionRow { line, defect }) => (line, defect),
            other => panic!("expected a malformed row, got {other:?}"),
        }
    }

    #[test]
    fn parses_rows_with_sequential_ids() {
        let data = "\
03/15/2024,AMAZON.COM*1234,-42.50,957.50
03/16/2024,\"PAYROLL, ACME INC\",2500.00,3457.50
";
        let txs = parse(data, 100).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].id, 100);
        assert_eq!(txs[1].id, 101);
        assert_eq!(
            txs[0].date,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(txs[0].description, "AMAZON.COM*1234");
        assert_eq!(txs[0].amount, Money::from_cents(-4250));
        assert_eq!(txs[0].running_balance, Some(Money::from_cents(95750)));
        assert_eq!(txs[1].description, "PAYROLL, ACME INC");
        assert!(txs.iter().all(|t| t.category == Category::Uncategorized));
    }

    #[test]
    fn accepts_formatted_amounts_and_blank_balance() {
        let txs = parse("1/5/2024, HOME DEPOT ,\"$1,234.56\",\n01/06/2024,REFUND,(12.00),100\n", 1).unwrap();
        assert_eq!(txs[0].description, "HOME DEPOT");
        assert_eq!(txs[0].amount, Money::from_cents(123456));
        assert_eq!(txs[0].running_balance, None);
        assert_eq!(txs[1].amount, Money::from_cents(-1200));
    }

    #[test]
    fn blank_lines_do_not_consume_ids() {
        let txs = parse("03/15/2024,A,-1,0\n,,,\n03/16/2024,B,-2,0\n", 1).unwrap();
        assert_eq!(txs.iter().map(|t| t.id).collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn bad_date_names_the_row() {
        let (row, defect) = row_error("03/15/2024,A,-1,0\n2024-03-16,B,-2,0\n");
        assert_eq!(row, 2);
        assert!(matches!(defect, RowDefect::InvalidDate(d) if d == "2024-03-16"));
    }

    #[test]
    fn non_numeric_amount_fails_the_batch() {
        let (row, defect) = row_error("03/15/2024,A,lots,0\n");
        assert_eq!(row, 1);
        assert!(matches!(defect, RowDefect::InvalidAmount(_)));
    }

    #[test]
    fn non_numeric_balance_fails_the_batch() {
        let (_, defect) = row_error("03/15/2024,A,-1.00,n/a\n");
        assert!(matches!(defect, RowDefect::InvalidBalance(_)));
    }

    #[test]
    fn wrong_field_count_fails_the_batch() {
        let (row, defect) = row_error("03/15/2024,A,-1.00,0\n03/16/2024,B,-1.00\n");
        assert_eq!(row, 2);
        assert!(matches!(defect, RowDefect::FieldCount(3)));
    }

    #[test]
    fn error_message_mentions_row() {
        let err = parse("13/45/2024,A,-1,0\n", 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed transaction row on line 1: invalid date '13/45/2024', expected MM/DD/YYYY"
        );
    }

    #[test]
    fn error_line_counts_skipped_blank_lines() {
        let (line, defect) = row_error("03/15/2024,A,-1,0\n\n\n03/16/2024,B,bad,0\n");
        assert_eq!(line, 4);
        assert!(matches!(defect, RowDefect::InvalidAmount(_)));

        let (line, _) = row_error(",,,\n03/16/2024,B,bad,0\n");
        assert_eq!(line, 2);
    }

    #[test]
    fn ids_may_end_at_the_maximum() {
        let txs = parse("03/15/2024,A,-1,0\n", TransactionId::MAX).unwrap();
        assert_eq!(txs[0].id, TransactionId::MAX);
    }

    #[test]
    fn running_out_of_ids_is_an_error() {
        let err = parse("03/15/2024,A,-1,0\n03/16/2024,B,-2,0\n", TransactionId::MAX).unwrap_err();
        assert!(matches!(err, StatementError::IdOverflow { line: 2 }));
    }

    #[test]
    fn empty_statement_errors() {
        assert!(matches!(parse("", 1), Err(StatementError::NoDataRows)));
    }

    #[test]
    fn import_statement_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statement.csv");
        std::fs::write(&path, "03/15/2024,SHELL OIL,-30.00,970.00\n").unwrap();
        let txs = import_statement(&path, 5).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].id, 5);
    }
}
