// Column type inference from a declared schema or a row sample

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::data::{coerce_numeric, value_key, Row};
use crate::EngineConfig;

/// Four-way column classification used to pick candidate fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Date,
    Category,
    String,
}

impl ColumnType {
    /// Fold a declared schema type onto the four-way classification
    pub fn from_declared(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "number" | "numeric" | "integer" | "int" | "float" | "double" => ColumnType::Number,
            "date" | "datetime" | "timestamp" => ColumnType::Date,
            "category" | "categorical" | "boolean" | "bool" => ColumnType::Category,
            _ => ColumnType::String,
        }
    }

    /// Category and date columns are the natural axis / grouping roles
    pub fn is_axis(self) -> bool {
        matches!(self, ColumnType::Category | ColumnType::Date)
    }
}

/// Column name → type, in header order
pub type ColumnTypes = IndexMap<String, ColumnType>;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %b %Y", "%b %d, %Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Classify every header from a row sample using the default configuration
pub fn infer(headers: &[String], sample_rows: &[Row]) -> ColumnTypes {
    infer_with(headers, sample_rows, &EngineConfig::default())
}

/// Classify every header from at most `config.sample_limit` leading rows
pub fn infer_with(headers: &[String], rows: &[Row], config: &EngineConfig) -> ColumnTypes {
    let sample = &rows[..rows.len().min(config.sample_limit)];
    headers
        .iter()
        .map(|header| (header.clone(), classify_column(header, sample, config)))
        .collect()
}

/// Use a declared schema verbatim, one type per header
pub fn from_declared(headers: &[String], declared: &[String]) -> ColumnTypes {
    headers
        .iter()
        .zip(declared)
        .map(|(header, ty)| (header.clone(), ColumnType::from_declared(ty)))
        .collect()
}

fn classify_column(column: &str, sample: &[Row], config: &EngineConfig) -> ColumnType {
    let mut non_empty = 0usize;
    let mut numeric = 0usize;
    let mut dates = 0usize;
    let mut distinct = HashSet::new();

    for value in sample.iter().filter_map(|row| non_empty_value(row, column)) {
        non_empty += 1;
        distinct.insert(value_key(value));
        if coerce_numeric(value).is_some() {
            numeric += 1;
        } else if is_date(value) {
            dates += 1;
        }
    }

    if non_empty > 0 && numeric == non_empty {
        return ColumnType::Number;
    }
    // dates only count for values that did not parse as numbers
    if non_empty > 0 && dates == non_empty {
        return ColumnType::Date;
    }
    if distinct.len() <= config.category_threshold(sample.len()) {
        ColumnType::Category
    } else {
        ColumnType::String
    }
}

fn non_empty_value<'a>(row: &'a Row, column: &str) -> Option<&'a Value> {
    match row.get(column) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

/// True when the value is text that parses as a calendar date or timestamp
pub fn is_date(value: &Value) -> bool {
    let Value::String(text) = value else {
        return false;
    };
    let text = text.trim();

    if DateTime::parse_from_rfc3339(text).is_ok() {
        return true;
    }
    if DATETIME_FORMATS
        .iter()
        .any(|format| NaiveDateTime::parse_from_str(text, format).is_ok())
    {
        return true;
    }
    DATE_FORMATS
        .iter()
        .any(|format| NaiveDate::parse_from_str(text, format).is_ok())
}
