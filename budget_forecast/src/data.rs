//! Series records and loading for forecasting
//!
//! Every source shape is normalized into a [`SeriesTable`] of typed
//! [`Observation`]s. Required fields are checked up front and malformed rows
//! are rejected while loading, so nothing downstream looks up columns by name.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Column holding the account key
pub const USER_KEY_FIELD: &str = "user_id";
/// Column holding the tie-break key
pub const ORDER_KEY_FIELD: &str = "tx_id";
/// Column holding the observation time
pub const TIMESTAMP_FIELD: &str = "date";
/// Column holding the observed value
pub const VALUE_FIELD: &str = "current_budget";

/// Every column a source must provide
pub const REQUIRED_FIELDS: [&str; 4] = [USER_KEY_FIELD, ORDER_KEY_FIELD, TIMESTAMP_FIELD, VALUE_FIELD];

/// Day-first timestamp format used by delimited files
pub const DAY_FIRST_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Tie-break key for observations sharing a timestamp.
///
/// Integers and decimals compare numerically with each other and sort
/// before text, which compares lexically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderKey {
    Number(i64),
    Decimal(f64),
    Text(String),
}

impl OrderKey {
    /// Read a raw cell, preferring an integer, then a finite decimal
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return OrderKey::Number(n);
        }
        match trimmed.parse::<f64>() {
            Ok(x) if x.is_finite() => OrderKey::Decimal(x),
            _ => OrderKey::Text(trimmed.to_string()),
        }
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (OrderKey::Number(a), OrderKey::Number(b)) => a.cmp(b),
            (OrderKey::Number(a), OrderKey::Decimal(b)) => (*a as f64).total_cmp(b),
            (OrderKey::Decimal(a), OrderKey::Number(b)) => a.total_cmp(&(*b as f64)),
            (OrderKey::Decimal(a), OrderKey::Decimal(b)) => a.total_cmp(b),
            (OrderKey::Text(a), OrderKey::Text(b)) => a.cmp(b),
            (OrderKey::Text(_), _) => Ordering::Greater,
            (_, OrderKey::Text(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderKey {}

/// A single timestamped value for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub user_key: String,
    pub order_key: OrderKey,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// All observations read from one source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesTable {
    records: Vec<Observation>,
}

/// The ordered observations of one account
#[derive(Debug, Clone, PartialEq)]
pub struct UserSeries {
    key: String,
    observations: Vec<Observation>,
}

impl SeriesTable {
    /// Create a table from already typed records
    pub fn new(records: Vec<Observation>) -> Self {
        Self { records }
    }

    /// Get the records in source order
    pub fn records(&self) -> &[Observation] {
        &self.records
    }

    /// Distinct account keys present
    pub fn keys(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.user_key.clone()).collect()
    }

    /// Observations for `key`, ordered by timestamp then order key
    pub fn series_for(&self, key: &str) -> UserSeries {
        let mut observations: Vec<Observation> = self
            .records
            .iter()
            .filter(|r| r.user_key == key)
            .cloned()
            .collect();
        observations.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.order_key.cmp(&b.order_key))
        });

        UserSeries {
            key: key.to_string(),
            observations,
        }
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl UserSeries {
    /// Get the account key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the ordered observations
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Observed values in order
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    /// Observation times in order
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.observations.iter().map(|o| o.timestamp).collect()
    }

    /// Most recent observed value
    pub fn last_value(&self) -> Option<f64> {
        self.observations.last().map(|o| o.value)
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

/// The source shapes accepted by [`SeriesLoader::load`]
#[derive(Debug, Clone)]
pub enum SeriesSource {
    /// A delimited file with day-first timestamps
    Delimited(PathBuf),
    /// Rows already fetched from the remote table
    Remote(Vec<Value>),
    /// An in-memory frame
    Frame(DataFrame),
}

/// Client for the remote series table.
///
/// Implementations perform one synchronous fetch of every row. Retries and
/// timeouts belong to the implementation or its caller.
pub trait RemoteTable {
    /// Fetch all rows as JSON objects
    fn fetch_rows(&self) -> Result<Vec<Value>>;
}

/// Loader for series tables
#[derive(Debug)]
pub struct SeriesLoader;

impl SeriesLoader {
    /// Load a table from any supported source
    pub fn load(source: &SeriesSource) -> Result<SeriesTable> {
        match source {
            SeriesSource::Delimited(path) => Self::from_csv(path),
            SeriesSource::Remote(rows) => Self::from_json_rows(rows),
            SeriesSource::Frame(df) => Self::from_dataframe(df),
        }
    }

    /// Fetch rows through a remote client and load them
    pub fn load_remote<T: RemoteTable + ?Sized>(table: &T) -> Result<SeriesTable> {
        let rows = table.fetch_rows()?;
        Self::from_json_rows(&rows)
    }

    /// Load a table from a delimited file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<SeriesTable> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load a table from delimited text with a header row
    pub fn from_reader<R: Read>(reader: R) -> Result<SeriesTable> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        check_schema(headers.iter())?;
        let position = |field: &str| headers.iter().position(|h| h == field).unwrap_or(0);
        let (user_idx, order_idx, time_idx, value_idx) = (
            position(USER_KEY_FIELD),
            position(ORDER_KEY_FIELD),
            position(TIMESTAMP_FIELD),
            position(VALUE_FIELD),
        );

        let mut records = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let row = i + 1;

            let user_key = cell(&record, user_idx, row, USER_KEY_FIELD)?.to_string();
            let order_key = OrderKey::parse(cell(&record, order_idx, row, ORDER_KEY_FIELD)?);
            let raw_time = cell(&record, time_idx, row, TIMESTAMP_FIELD)?;
            let timestamp = NaiveDateTime::parse_from_str(raw_time, DAY_FIRST_FORMAT)
                .map_err(|e| {
                    invalid(
                        row,
                        TIMESTAMP_FIELD,
                        &format!("'{}' does not match {}: {}", raw_time, DAY_FIRST_FORMAT, e),
                    )
                })?;
            let raw_value = cell(&record, value_idx, row, VALUE_FIELD)?;
            let value = parse_value(raw_value).ok_or_else(|| {
                invalid(row, VALUE_FIELD, &format!("'{}' is not a number", raw_value))
            })?;

            records.push(Observation {
                user_key,
                order_key,
                timestamp,
                value,
            });
        }

        debug!(rows = records.len(), "loaded delimited series");
        Ok(SeriesTable::new(records))
    }

    /// Load a table from rows returned by the remote table.
    ///
    /// An empty row set is an empty table rather than a schema error.
    pub fn from_json_rows(rows: &[Value]) -> Result<SeriesTable> {
        if rows.is_empty() {
            debug!("remote series returned no rows");
            return Ok(SeriesTable::default());
        }

        let mut objects = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            match row {
                Value::Object(map) => objects.push(map),
                other => {
                    return Err(invalid(
                        i + 1,
                        "<row>",
                        &format!("expected an object, got {}", json_kind(other)),
                    ))
                }
            }
        }
        let present: BTreeSet<&str> = objects
            .iter()
            .flat_map(|map| map.keys().map(String::as_str))
            .collect();
        check_schema(present.into_iter())?;

        let mut records = Vec::with_capacity(objects.len());
        for (i, map) in objects.into_iter().enumerate() {
            let row = i + 1;
            let user_key = match json_field(map, row, USER_KEY_FIELD)? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(invalid(
                        row,
                        USER_KEY_FIELD,
                        &format!("unsupported type {}", json_kind(other)),
                    ))
                }
            };

            let order_key = match json_field(map, row, ORDER_KEY_FIELD)? {
                Value::String(s) => OrderKey::parse(s),
                Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => OrderKey::Number(i),
                    (None, Some(x)) => OrderKey::Decimal(x),
                    (None, None) => {
                        return Err(invalid(
                            row,
                            ORDER_KEY_FIELD,
                            &format!("{} is not representable", n),
                        ))
                    }
                },
                other => {
                    return Err(invalid(
                        row,
                        ORDER_KEY_FIELD,
                        &format!("unsupported type {}", json_kind(other)),
                    ))
                }
            };

            let timestamp = match json_field(map, row, TIMESTAMP_FIELD)? {
                Value::String(s) => parse_iso_timestamp(s).ok_or_else(|| {
                    invalid(row, TIMESTAMP_FIELD, &format!("'{}' is not ISO-8601", s))
                })?,
                Value::Number(n) => n
                    .as_i64()
                    .and_then(DateTime::<Utc>::from_timestamp_millis)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| {
                        invalid(row, TIMESTAMP_FIELD, &format!("{} is not epoch millis", n))
                    })?,
                other => {
                    return Err(invalid(
                        row,
                        TIMESTAMP_FIELD,
                        &format!("unsupported type {}", json_kind(other)),
                    ))
                }
            };

            let value = match json_field(map, row, VALUE_FIELD)? {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => parse_value(s),
                _ => None,
            }
            .ok_or_else(|| invalid(row, VALUE_FIELD, "not a number"))?;

            records.push(Observation {
                user_key,
                order_key,
                timestamp,
                value,
            });
        }

        debug!(rows = records.len(), "loaded remote series");
        Ok(SeriesTable::new(records))
    }

    /// Load a table from an existing DataFrame
    pub fn from_dataframe(df: &DataFrame) -> Result<SeriesTable> {
        check_schema(df.get_column_names().into_iter())?;

        let user_keys = df.column(USER_KEY_FIELD)?.cast(&DataType::Utf8)?;
        let user_keys = user_keys.utf8()?;
        let order_keys = frame_order_keys(df.column(ORDER_KEY_FIELD)?)?;
        let timestamps = frame_timestamps(df.column(TIMESTAMP_FIELD)?)?;
        let values = df.column(VALUE_FIELD)?.cast(&DataType::Float64)?;
        let values = values.f64()?;

        let mut records = Vec::with_capacity(df.height());
        let rows = user_keys
            .into_iter()
            .zip(order_keys)
            .zip(timestamps)
            .zip(values.into_iter());
        for (i, (((user_key, order_key), timestamp), value)) in rows.enumerate() {
            let row = i + 1;
            records.push(Observation {
                user_key: user_key
                    .ok_or_else(|| invalid(row, USER_KEY_FIELD, "missing value"))?
                    .to_string(),
                order_key: order_key
                    .ok_or_else(|| invalid(row, ORDER_KEY_FIELD, "missing value"))?,
                timestamp: timestamp
                    .ok_or_else(|| invalid(row, TIMESTAMP_FIELD, "missing or unparsable"))?,
                value: value.ok_or_else(|| invalid(row, VALUE_FIELD, "missing or not a number"))?,
            });
        }

        debug!(rows = records.len(), "loaded frame series");
        Ok(SeriesTable::new(records))
    }
}

fn invalid(row: usize, field: &str, reason: &str) -> ForecastError {
    ForecastError::InvalidRecord {
        row,
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Fail with every required field absent from `present`, sorted
fn check_schema<'a, I: Iterator<Item = &'a str>>(present: I) -> Result<()> {
    let present: BTreeSet<&str> = present.collect();
    let missing: BTreeSet<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !present.contains(field))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }
    Err(ForecastError::SchemaError {
        missing: missing.into_iter().map(String::from).collect(),
    })
}

fn cell<'r>(record: &'r csv::StringRecord, idx: usize, row: usize, field: &str) -> Result<&'r str> {
    match record.get(idx) {
        Some(raw) if !raw.is_empty() => Ok(raw),
        _ => Err(invalid(row, field, "missing value")),
    }
}

fn json_field<'m>(map: &'m Map<String, Value>, row: usize, field: &str) -> Result<&'m Value> {
    match map.get(field) {
        Some(Value::Null) | None => Err(invalid(row, field, "missing value")),
        Some(value) => Ok(value),
    }
}

fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse an ISO-8601 timestamp, converting offsets to UTC
pub fn parse_iso_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn frame_order_keys(col: &Series) -> Result<Vec<Option<OrderKey>>> {
    match col.dtype() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let ints = col.cast(&DataType::Int64)?;
            let keys = ints.i64()?.into_iter().map(|v| v.map(OrderKey::Number)).collect();
            Ok(keys)
        }
        DataType::Float32 | DataType::Float64 => {
            let floats = col.cast(&DataType::Float64)?;
            let keys = floats
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()).map(OrderKey::Decimal))
                .collect();
            Ok(keys)
        }
        _ => {
            let text = col.cast(&DataType::Utf8)?;
            let keys = text.utf8()?.into_iter().map(|v| v.map(OrderKey::parse)).collect();
            Ok(keys)
        }
    }
}

fn frame_timestamps(col: &Series) -> Result<Vec<Option<NaiveDateTime>>> {
    match col.dtype() {
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let raw = col.cast(&DataType::Int64)?;
            let stamps = raw
                .i64()?
                .into_iter()
                .map(|v| v.and_then(|ts| from_epoch(ts, unit)))
                .collect();
            Ok(stamps)
        }
        DataType::Date => {
            let raw = col.cast(&DataType::Int32)?;
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| ForecastError::InvalidColumn {
                    field: TIMESTAMP_FIELD.to_string(),
                    reason: "epoch out of range".to_string(),
                })?;
            let stamps = raw
                .i32()?
                .into_iter()
                .map(|v| v.and_then(|days| epoch.checked_add_signed(chrono::Duration::days(days as i64))))
                .collect();
            Ok(stamps)
        }
        DataType::Utf8 => Ok(col
            .utf8()?
            .into_iter()
            .map(|v| v.and_then(parse_iso_timestamp))
            .collect()),
        other => Err(ForecastError::InvalidColumn {
            field: TIMESTAMP_FIELD.to_string(),
            reason: format!("unsupported type {}", other),
        }),
    }
}

fn from_epoch(ts: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let per_second: i64 = match unit {
        TimeUnit::Nanoseconds => 1_000_000_000,
        TimeUnit::Microseconds => 1_000_000,
        TimeUnit::Milliseconds => 1_000,
    };
    let secs = ts.div_euclid(per_second);
    let nanos = ts.rem_euclid(per_second) * (1_000_000_000 / per_second);
    DateTime::<Utc>::from_timestamp(secs, nanos as u32).map(|dt| dt.naive_utc())
}
