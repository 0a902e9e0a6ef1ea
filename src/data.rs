use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::io::Read;

use crate::infer::{self, ColumnTypes};
use crate::EngineConfig;

/// One dataset record keyed by column name. Absent keys are "undefined".
pub type Row = Map<String, Value>;

/// Tabular dataset as handed over by the import layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub headers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_types: Option<Vec<String>>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            headers,
            declared_types: None,
            rows,
        }
    }

    pub fn with_declared_types(mut self, types: Vec<String>) -> Self {
        self.declared_types = Some(types);
        self
    }

    /// Read CSV text. Every cell is kept as a string; empty cells become null.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        for (line, record) in csv_reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV record {}", line + 1))?;
            let mut row = Row::new();
            for (header, cell) in headers.iter().zip(record.iter()) {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                row.insert(header.clone(), value);
            }
            rows.push(row);
        }

        Ok(Self::new(headers, rows))
    }

    /// Create a Dataset from JSON: either an array of objects or a
    /// `{headers, declaredTypes?, rows}` document
    pub fn from_json(value: &Value) -> Result<Self> {
        if value.is_object() {
            return serde_json::from_value(value.clone()).context("Invalid dataset document");
        }

        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

        let mut headers: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Items in array must be objects"))?;

            // Headers are the union of keys in first-seen order
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
            rows.push(obj.clone());
        }

        Ok(Self::new(headers, rows))
    }

    /// Column types from the declared schema, or inferred from a row sample
    pub fn column_types(&self, config: &EngineConfig) -> ColumnTypes {
        match &self.declared_types {
            Some(declared) if declared.len() == self.headers.len() => {
                infer::from_declared(&self.headers, declared)
            }
            _ => infer::infer_with(&self.headers, &self.rows, config),
        }
    }
}

/// Coerce a cell to a finite number.
///
/// Finite numbers pass through; strings are trimmed and parsed. Everything
/// else (booleans, objects, arrays, null, empty or non-numeric text) is
/// rejected.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Field value of a row, treating both absent keys and null as missing
pub fn field_value<'a>(row: &'a Row, field: &str) -> Option<&'a Value> {
    row.get(field).filter(|v| !v.is_null())
}

/// Numeric field value, or None when missing or not coercible
pub fn field_number(row: &Row, field: &str) -> Option<f64> {
    field_value(row, field).and_then(coerce_numeric)
}

/// Grouping key of a value: strings as-is, everything else as JSON text
pub fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON number for a finite float; non-finite input becomes null
pub fn number_value(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}
