//! History file ingestion
//!
//! The engine's hard input contract (numeric amounts, parseable dates) is
//! enforced here, at the boundary. Rows that fail it are dropped with a
//! warning rather than aborting the load; optional fields are passed
//! through for the engine to infer.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use fluxcast_core::{Transaction, TxType};

/// Raw record as it appears in a history file, before validation
#[derive(Debug, Deserialize)]
struct RawRecord {
    description: String,
    amount: f64,
    #[serde(default)]
    merchant: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(rename = "type", default)]
    tx_type: Option<String>,
    date: String,
}

/// Load a transaction history from a JSON or CSV file, filtering rows
/// with unparseable dates or non-finite amounts.
pub fn load_history(path: &Path) -> Result<Vec<Transaction>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();

    let records = match extension.as_str() {
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        other => bail!("Unsupported history format: {:?} (use .json or .csv)", other),
    };

    let total = records.len();
    let transactions: Vec<Transaction> = records
        .into_iter()
        .filter_map(validate_record)
        .collect();

    info!(
        loaded = transactions.len(),
        dropped = total - transactions.len(),
        file = %path.display(),
        "history loaded"
    );
    Ok(transactions)
}

fn load_json(path: &Path) -> Result<Vec<RawRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON history {}", path.display()))
}

fn load_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<RawRecord>().enumerate() {
        match row {
            Ok(record) => records.push(record),
            Err(err) => warn!(row = index + 1, %err, "skipping malformed CSV row"),
        }
    }
    Ok(records)
}

fn validate_record(record: RawRecord) -> Option<Transaction> {
    let date = match NaiveDate::parse_from_str(&record.date, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => {
            warn!(date = %record.date, description = %record.description, "dropping row with invalid date");
            return None;
        }
    };
    if !record.amount.is_finite() {
        warn!(description = %record.description, "dropping row with non-finite amount");
        return None;
    }

    let tx_type = record
        .tx_type
        .as_deref()
        .and_then(|t| t.parse::<TxType>().ok())
        .unwrap_or(TxType::Expense);

    Some(Transaction {
        description: record.description,
        amount: record.amount.abs(),
        merchant: record.merchant,
        category: record.category.unwrap_or_else(|| "Other".to_string()),
        tx_type,
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_json_history_loads() {
        let path = write_temp(
            "fluxcast_test_history.json",
            r#"[
                {"description": "Coffee", "amount": 450, "category": "Coffee", "type": "expense", "date": "2026-01-10"},
                {"description": "Salary", "amount": 400000, "type": "income", "date": "2026-01-01"}
            ]"#,
        );
        let history = load_history(&path).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].category, "Coffee");
        assert_eq!(history[1].tx_type, TxType::Income);
        // Missing category defaults rather than failing
        assert_eq!(history[1].category, "Other");
    }

    #[test]
    fn test_invalid_dates_filtered() {
        let path = write_temp(
            "fluxcast_test_bad_dates.json",
            r#"[
                {"description": "ok", "amount": 100, "date": "2026-01-10"},
                {"description": "bad", "amount": 100, "date": "not-a-date"}
            ]"#,
        );
        let history = load_history(&path).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].description, "ok");
    }

    #[test]
    fn test_csv_history_loads() {
        let path = write_temp(
            "fluxcast_test_history.csv",
            "description,amount,merchant,category,type,date\n\
             Starbucks Coffee,450,Starbucks,Coffee,expense,2026-01-10\n\
             Salary,400000,,Income,income,2026-01-01\n",
        );
        let history = load_history(&path).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].merchant.as_deref(), Some("Starbucks"));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let path = write_temp("fluxcast_test_history.txt", "not a history");
        assert!(load_history(&path).is_err());
    }
}
