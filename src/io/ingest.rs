//! JSON / CSV ingest and validation.
//!
//! This module turns parsed documents into typed rows the transforms can fold
//! without further checks.
//!
//! Design goals:
//! - **Required fields validated at parse time** (entity name, dates, metrics)
//! - **Fail fast** on JSON tables: the first malformed row rejects the dataset
//! - **Numeric coercion like the source data expects**: JSON numbers and
//!   numeric strings are accepted, anything else is an `InvalidRecord`
//! - **Separation of concerns**: no joining or scaling here

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde_json::{Map, Value};

use crate::domain::{AggregateRow, Metric, TimedRow, VolumeRow};
use crate::error::PipelineError;

/// Keys accepted for the entity name, in lookup order.
const NAME_KEYS: [&str; 2] = ["Name", "name"];

/// Parse an aggregate table (`[{Name, mean_del?, mean_npa?}, ...]`).
pub fn parse_aggregate_rows(doc: &Value, location: &str) -> Result<Vec<AggregateRow>, PipelineError> {
    let items = as_array(doc, location)?;
    let mut rows = Vec::with_capacity(items.len());

    for (idx, item) in items.iter().enumerate() {
        let obj = as_object(item, idx, location)?;
        let row = AggregateRow {
            name: required_name(obj).map_err(|e| with_row(e, idx, location))?,
            mean_del: optional_number(obj, Metric::MeanDel.column()).map_err(|e| with_row(e, idx, location))?,
            mean_npa: optional_number(obj, Metric::MeanNpa.column()).map_err(|e| with_row(e, idx, location))?,
        };
        rows.push(row);
    }

    tracing::debug!(location, rows = rows.len(), "parsed aggregate table");
    Ok(rows)
}

/// Parse the performance-trends series (`[{Name, date, del, npa}, ...]`).
pub fn parse_timed_rows(doc: &Value, location: &str) -> Result<Vec<TimedRow>, PipelineError> {
    let items = as_array(doc, location)?;
    let mut rows = Vec::with_capacity(items.len());

    for (idx, item) in items.iter().enumerate() {
        let obj = as_object(item, idx, location)?;
        let row = parse_timed_row(obj).map_err(|e| with_row(e, idx, location))?;
        rows.push(row);
    }

    tracing::debug!(location, rows = rows.len(), "parsed time series");
    Ok(rows)
}

fn parse_timed_row(obj: &Map<String, Value>) -> Result<TimedRow, PipelineError> {
    let name = required_name(obj)?;

    let date_raw = match obj.get("date") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(other) => return Err(PipelineError::invalid_record("date", other.to_string())),
        None => return Err(PipelineError::invalid_record("date", "<missing>")),
    };
    let observed_at =
        parse_observation_date(&date_raw).map_err(|_| PipelineError::invalid_record("date", date_raw.clone()))?;

    let del = required_number(obj, Metric::Del.column())?;
    let npa = required_number(obj, Metric::Npa.column())?;

    Ok(TimedRow {
        name,
        date_raw,
        observed_at,
        del,
        npa,
    })
}

/// Parse a date or date-time string.
///
/// Plain dates are midnight UTC, matching how the series' dates are compared.
pub fn parse_observation_date(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }

    const DATETIME_FMTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }

    const DATE_FMTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }

    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, MM/DD/YYYY, or an ISO date-time."
    ))
}

/// Coerce a JSON value to a finite `f64`.
///
/// Numbers pass through; strings are parsed after trimming. Empty strings,
/// booleans, objects, arrays and non-finite results are rejected.
pub fn coerce_number(value: &Value, field: &str) -> Result<f64, PipelineError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(PipelineError::invalid_record(field, value.to_string())),
    }
}

fn as_array<'a>(doc: &'a Value, location: &str) -> Result<&'a Vec<Value>, PipelineError> {
    doc.as_array()
        .ok_or_else(|| PipelineError::data_load(location, "expected a JSON array of records"))
}

fn as_object<'a>(item: &'a Value, idx: usize, location: &str) -> Result<&'a Map<String, Value>, PipelineError> {
    item.as_object().ok_or_else(|| {
        with_row(
            PipelineError::invalid_record("<record>", item.to_string()),
            idx,
            location,
        )
    })
}

fn required_name(obj: &Map<String, Value>) -> Result<String, PipelineError> {
    let Some((key, value)) = NAME_KEYS.iter().find_map(|k| obj.get(*k).map(|v| (*k, v))) else {
        return Err(PipelineError::invalid_record("Name", "<missing>"));
    };
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        other => Err(PipelineError::invalid_record(key, other.to_string())),
    }
}

fn required_number(obj: &Map<String, Value>, field: &str) -> Result<f64, PipelineError> {
    match obj.get(field) {
        Some(v) => coerce_number(v, field),
        None => Err(PipelineError::invalid_record(field, "<missing>")),
    }
}

fn optional_number(obj: &Map<String, Value>, field: &str) -> Result<Option<f64>, PipelineError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => coerce_number(v, field).map(Some),
    }
}

/// Stamp the row position onto an ingest error and log it.
fn with_row(err: PipelineError, idx: usize, location: &str) -> PipelineError {
    let err = err.at_row(idx, location);
    tracing::error!(location, row = idx, error = %err, "rejected record");
    err
}

/// A CSV row that was skipped during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// HMDA volume ingest output: valid rows + what was skipped.
#[derive(Debug, Clone)]
pub struct VolumeIngest {
    pub rows: Vec<VolumeRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Parse the HMDA CSV (`count`, `as_of_year`, `state_name`).
///
/// Missing columns reject the file; malformed rows are skipped and reported.
pub fn parse_volume_csv(text: &str, location: &str) -> Result<VolumeIngest, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::data_load(location, format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for column in ["count", "as_of_year", "state_name"] {
        if !header_map.contains_key(column) {
            return Err(PipelineError::data_load(
                location,
                format!("missing required column: `{column}`"),
            ));
        }
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_volume_row(&record, &header_map) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        tracing::warn!(location, skipped = row_errors.len(), "skipped malformed CSV rows");
    }

    Ok(VolumeIngest {
        rows,
        row_errors,
        rows_read,
    })
}

fn parse_volume_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<VolumeRow, String> {
    let state_name = get_required(record, header_map, "state_name")?.to_string();
    let count_raw = get_required(record, header_map, "count")?;
    let count = count_raw
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Invalid `count` value '{count_raw}'."))?;
    let year_raw = get_required(record, header_map, "as_of_year")?;
    let as_of_year = year_raw
        .parse::<i32>()
        .map_err(|_| format!("Invalid `as_of_year` value '{year_raw}'."))?;

    Ok(VolumeRow {
        state_name,
        as_of_year,
        count,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM;
    // left in place it makes that column look missing.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}
