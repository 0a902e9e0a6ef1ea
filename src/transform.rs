use indexmap::IndexMap;
use serde_json::Value;

use crate::chart::{Aggregation, ChartOptions, ChartType, Mappings};
use crate::data::{coerce_numeric, field_number, field_value, number_value, value_key, Row};

/// Main entry point: turn raw rows and a chart spec into render records.
///
/// Total over its inputs: missing mappings or empty rows produce an empty
/// vector, unknown chart kinds pass the rows through unchanged.
pub fn build(
    rows: &[Row],
    chart_type: &ChartType,
    mappings: &Mappings,
    options: &ChartOptions,
) -> Vec<Row> {
    if rows.is_empty() {
        return Vec::new();
    }

    match chart_type {
        ChartType::Line | ChartType::Bar | ChartType::Area => {
            build_cartesian(rows, mappings, options)
        }
        ChartType::Scatter => build_scatter(rows, mappings),
        ChartType::Pie | ChartType::Donut => build_pie(rows, mappings, options),
        ChartType::Radar => build_radar(rows, mappings, options),
        _ => rows.to_vec(),
    }
}

/// Rows sharing one grouping value; `key` is the first value seen
struct Bucket<'a> {
    key: Value,
    rows: Vec<&'a Row>,
}

/// Group rows by a field, in first-occurrence order. Rows missing the field are dropped.
fn group_rows<'a>(rows: &'a [Row], field: &str) -> Vec<Bucket<'a>> {
    let mut buckets: IndexMap<String, Bucket<'a>> = IndexMap::new();
    for row in rows {
        let Some(value) = field_value(row, field) else {
            continue;
        };
        buckets
            .entry(value_key(value))
            .or_insert_with(|| Bucket {
                key: value.clone(),
                rows: Vec::new(),
            })
            .rows
            .push(row);
    }
    buckets.into_values().collect()
}

fn finite_values(rows: &[&Row], field: &str) -> Vec<f64> {
    rows.iter().filter_map(|row| field_number(row, field)).collect()
}

fn build_cartesian(rows: &[Row], mappings: &Mappings, options: &ChartOptions) -> Vec<Row> {
    let Some(x_field) = mappings.x_field.as_deref() else {
        return Vec::new();
    };
    let y_fields = &mappings.y_fields;
    if y_fields.is_empty() {
        return Vec::new();
    }

    if options.aggregation == Aggregation::None {
        // Straight projection, invalid numerics become null
        return rows
            .iter()
            .filter_map(|row| {
                let x = field_value(row, x_field)?;
                let mut record = Row::new();
                record.insert(x_field.to_string(), x.clone());
                for y in y_fields {
                    let value = field_number(row, y).map_or(Value::Null, number_value);
                    record.insert(y.clone(), value);
                }
                Some(record)
            })
            .collect();
    }

    let records: Vec<Row> = group_rows(rows, x_field)
        .into_iter()
        .map(|bucket| {
            let mut record = Row::new();
            record.insert(x_field.to_string(), bucket.key);
            for y in y_fields {
                let values = finite_values(&bucket.rows, y);
                record.insert(y.clone(), number_value(aggregate(&values, &options.aggregation)));
            }
            record
        })
        .collect();

    top_n(&records, options.top_n, y_fields.first().map(String::as_str))
}

fn build_scatter(rows: &[Row], mappings: &Mappings) -> Vec<Row> {
    let (Some(x_field), Some(y_field)) = (mappings.x_field.as_deref(), mappings.y_field.as_deref())
    else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let x = field_number(row, x_field)?;
            let y = field_number(row, y_field)?;
            let mut record = Row::new();
            record.insert(x_field.to_string(), number_value(x));
            record.insert(y_field.to_string(), number_value(y));
            if let Some(color) = mappings.color_field.as_deref() {
                record.insert(color.to_string(), row.get(color).cloned().unwrap_or(Value::Null));
            }
            Some(record)
        })
        .collect()
}

fn build_pie(rows: &[Row], mappings: &Mappings, options: &ChartOptions) -> Vec<Row> {
    let (Some(category_field), Some(value_field)) =
        (mappings.category_field.as_deref(), mappings.value_field.as_deref())
    else {
        return Vec::new();
    };

    // Slices always aggregate; sum stands in for "none"
    let method = match &options.aggregation {
        Aggregation::None => Aggregation::Sum,
        other => other.clone(),
    };

    let records = grouped_records(rows, category_field, value_field, &method);
    top_n(&records, options.top_n, Some(value_field))
}

fn build_radar(rows: &[Row], mappings: &Mappings, options: &ChartOptions) -> Vec<Row> {
    let (Some(angle_field), Some(radius_field)) =
        (mappings.angle_field.as_deref(), mappings.radius_field.as_deref())
    else {
        return Vec::new();
    };

    if options.aggregation == Aggregation::None {
        // Unlike line/bar/area, a bad radius reads as 0 rather than null
        return rows
            .iter()
            .map(|row| {
                let mut record = Row::new();
                record.insert(
                    angle_field.to_string(),
                    row.get(angle_field).cloned().unwrap_or(Value::Null),
                );
                let radius = field_number(row, radius_field).unwrap_or(0.0);
                record.insert(radius_field.to_string(), number_value(radius));
                record
            })
            .collect();
    }

    let records = grouped_records(rows, angle_field, radius_field, &options.aggregation);
    top_n(&records, options.top_n, Some(radius_field))
}

/// One `{key_field, value_field}` record per group of `key_field`
fn grouped_records(
    rows: &[Row],
    key_field: &str,
    value_field: &str,
    method: &Aggregation,
) -> Vec<Row> {
    group_rows(rows, key_field)
        .into_iter()
        .map(|bucket| {
            let values = finite_values(&bucket.rows, value_field);
            let mut record = Row::new();
            record.insert(key_field.to_string(), bucket.key);
            record.insert(value_field.to_string(), number_value(aggregate(&values, method)));
            record
        })
        .collect()
}

/// Reduce a group of values.
///
/// Every reduction yields 0 for an empty group. Methods other than
/// sum/avg/min/max (including `None`) return the last value in input order.
pub fn aggregate(values: &[f64], method: &Aggregation) -> f64 {
    match method {
        Aggregation::Sum => values.iter().fold(0.0, |acc, v| acc + v),
        Aggregation::Avg => {
            if values.is_empty() {
                0.0
            } else {
                values.iter().fold(0.0, |acc, v| acc + v) / values.len() as f64
            }
        }
        Aggregation::Min => values.iter().copied().reduce(f64::min).unwrap_or(0.0),
        Aggregation::Max => values.iter().copied().reduce(f64::max).unwrap_or(0.0),
        Aggregation::None | Aggregation::Other(_) => values.last().copied().unwrap_or(0.0),
    }
}

/// Keep the `n` highest-ranked records by `rank_field`, highest first.
///
/// `n == 0` or no rank field returns the records unchanged. Values that do
/// not coerce to a number rank as 0. Order among equal ranks is unspecified.
pub fn top_n(records: &[Row], n: usize, rank_field: Option<&str>) -> Vec<Row> {
    let Some(field) = rank_field else {
        return records.to_vec();
    };
    if n == 0 {
        return records.to_vec();
    }

    let rank = |record: &Row| record.get(field).and_then(coerce_numeric).unwrap_or(0.0);
    let mut ranked = records.to_vec();
    ranked.sort_by(|a, b| rank(b).total_cmp(&rank(a)));
    ranked.truncate(n);
    ranked
}
