use budget_forecast::data::{OrderKey, RemoteTable, SeriesLoader};
use budget_forecast::{ForecastError, Result};
use serde_json::{json, Value};
use std::cell::Cell;
use std::io::Write;
use tempfile::NamedTempFile;

struct FixedTable {
    rows: Vec<Value>,
    calls: Cell<usize>,
}

impl RemoteTable for FixedTable {
    fn fetch_rows(&self) -> Result<Vec<Value>> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.rows.clone())
    }
}

struct DownTable;

impl RemoteTable for DownTable {
    fn fetch_rows(&self) -> Result<Vec<Value>> {
        Err(ForecastError::RemoteError("connection refused".to_string()))
    }
}

#[test]
fn test_series_loader_from_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "tx_id,current_budget,user_id,date").unwrap();
    writeln!(file, "10,100.0,884,01/01/2023 09:00").unwrap();
    writeln!(file, "11,103.0,884,02/01/2023 09:00").unwrap();
    writeln!(file, "a7,106.0,900,03/01/2023 09:00").unwrap();

    let table = SeriesLoader::from_csv(file.path()).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.keys().into_iter().collect::<Vec<_>>(), vec!["884", "900"]);
    assert_eq!(
        table.series_for("900").observations()[0].order_key,
        OrderKey::Text("a7".to_string())
    );
}

#[test]
fn test_series_loader_error_handling() {
    let result = SeriesLoader::from_csv("nonexistent_file.csv");
    assert!(matches!(result, Err(ForecastError::IoError(_))));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "user_id,tx_id,date,current_budget").unwrap();
    writeln!(file, "884,1,01/01/2023 09:00,lots").unwrap();
    let err = SeriesLoader::from_csv(file.path()).unwrap_err();
    assert!(err.is_load_error());
    assert!(err.to_string().contains("current_budget"));
}

#[test]
fn test_remote_table_fetched_once() {
    let table = FixedTable {
        rows: vec![json!({
            "user_id": 884,
            "tx_id": 1,
            "date": "2024-05-01T00:00:00Z",
            "current_budget": 12.5,
            "created_at": "ignored"
        })],
        calls: Cell::new(0),
    };

    let loaded = SeriesLoader::load_remote(&table).unwrap();
    assert_eq!(table.calls.get(), 1);
    assert_eq!(loaded.series_for("884").values(), vec![12.5]);
}

#[test]
fn test_remote_failure_propagates() {
    let err = SeriesLoader::load_remote(&DownTable).unwrap_err();
    assert!(matches!(err, ForecastError::RemoteError(_)));
}
