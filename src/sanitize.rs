//! Renderer-side numeric safety pass.
//!
//! Re-validates whatever records reach the rendering boundary, including raw
//! rows that never went through [`crate::transform::build`] (live previews,
//! pasted data). Nothing non-finite and no record missing a required field
//! gets past this layer. The histogram, box and gauge views are derived here
//! and nowhere else.

use serde::Serialize;
use serde_json::Value;

use crate::chart::{ChartType, Mappings};
use crate::data::{field_number, field_value, number_value, Row};
use crate::EngineConfig;

pub use crate::data::coerce_numeric;

/// Result of a sanitize pass.
///
/// `Unconfigured` means the required roles are not mapped yet, which calls
/// for a "configure mappings" placeholder; `Records(vec![])` means the
/// mapping is fine but no row survived, which calls for a "no data" one.
#[derive(Debug, Clone, PartialEq)]
pub enum SanitizeOutcome {
    Unconfigured,
    Records(Vec<Row>),
}

impl SanitizeOutcome {
    pub fn is_unconfigured(&self) -> bool {
        matches!(self, SanitizeOutcome::Unconfigured)
    }

    pub fn records(&self) -> &[Row] {
        match self {
            SanitizeOutcome::Unconfigured => &[],
            SanitizeOutcome::Records(records) => records,
        }
    }

    pub fn into_records(self) -> Vec<Row> {
        match self {
            SanitizeOutcome::Unconfigured => Vec::new(),
            SanitizeOutcome::Records(records) => records,
        }
    }
}

/// One equal-width histogram bin
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub bin_label: String,
    pub count: usize,
}

/// Five-number summary plus outliers.
///
/// Quartiles are read at index `floor(n * q)` of the sorted values with no
/// interpolation. This is a biased estimator kept for parity with existing
/// dashboards; it is not the textbook quartile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxSummary {
    pub min: f64,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub max: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeReading {
    pub value: f64,
    pub scale_max: f64,
    pub percent: f64,
}

/// Sanitize with the default engine configuration
pub fn sanitize(rows: &[Row], chart_type: &ChartType, mappings: &Mappings) -> SanitizeOutcome {
    sanitize_with(rows, chart_type, mappings, &EngineConfig::default())
}

pub fn sanitize_with(
    rows: &[Row],
    chart_type: &ChartType,
    mappings: &Mappings,
    config: &EngineConfig,
) -> SanitizeOutcome {
    match chart_type {
        ChartType::Line | ChartType::Bar | ChartType::Area => sanitize_cartesian(rows, mappings),
        ChartType::Scatter => sanitize_scatter(rows, mappings),
        ChartType::Pie | ChartType::Donut => sanitize_keyed(
            rows,
            mappings.category_field.as_deref(),
            mappings.value_field.as_deref(),
        ),
        ChartType::Radar => sanitize_keyed(
            rows,
            mappings.angle_field.as_deref(),
            mappings.radius_field.as_deref(),
        ),
        ChartType::Histogram => derived_view(rows, mappings, |values| {
            histogram(values, config.histogram_bins).iter().filter_map(to_record).collect()
        }),
        ChartType::Box => derived_view(rows, mappings, |values| {
            box_summary(values).as_ref().and_then(to_record).into_iter().collect()
        }),
        ChartType::Gauge => derived_view(rows, mappings, |values| {
            gauge_reading(values, config.gauge_headroom)
                .as_ref()
                .and_then(to_record)
                .into_iter()
                .collect()
        }),
        ChartType::Unknown(_) => SanitizeOutcome::Records(rows.to_vec()),
    }
}

/// Line/bar/area: keep a record when x is present and at least one y coerces
fn sanitize_cartesian(rows: &[Row], mappings: &Mappings) -> SanitizeOutcome {
    let Some(x_field) = mappings.x_field.as_deref() else {
        return SanitizeOutcome::Unconfigured;
    };
    if mappings.y_fields.is_empty() {
        return SanitizeOutcome::Unconfigured;
    }

    let records = rows
        .iter()
        .filter_map(|row| {
            let x = field_value(row, x_field)?;
            let ys: Vec<(&String, Option<f64>)> = mappings
                .y_fields
                .iter()
                .map(|y| (y, field_number(row, y)))
                .collect();
            if ys.iter().all(|(_, v)| v.is_none()) {
                return None;
            }

            let mut record = Row::new();
            record.insert(x_field.to_string(), x.clone());
            for (y, v) in ys {
                record.insert(y.clone(), v.map_or(Value::Null, number_value));
            }
            Some(record)
        })
        .collect();

    SanitizeOutcome::Records(records)
}

fn sanitize_scatter(rows: &[Row], mappings: &Mappings) -> SanitizeOutcome {
    let (Some(x_field), Some(y_field)) = (mappings.x_field.as_deref(), mappings.y_field.as_deref())
    else {
        return SanitizeOutcome::Unconfigured;
    };

    let records = rows
        .iter()
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
        .collect();

    SanitizeOutcome::Records(records)
}

/// Pie/donut and radar: a present key plus a value that coerces, or the row goes
fn sanitize_keyed(
    rows: &[Row],
    key_field: Option<&str>,
    value_field: Option<&str>,
) -> SanitizeOutcome {
    let (Some(key_field), Some(value_field)) = (key_field, value_field) else {
        return SanitizeOutcome::Unconfigured;
    };

    let records = rows
        .iter()
        .filter_map(|row| {
            let key = field_value(row, key_field)?;
            let value = field_number(row, value_field)?;
            let mut record = Row::new();
            record.insert(key_field.to_string(), key.clone());
            record.insert(value_field.to_string(), number_value(value));
            Some(record)
        })
        .collect();

    SanitizeOutcome::Records(records)
}

fn derived_view<F>(rows: &[Row], mappings: &Mappings, view: F) -> SanitizeOutcome
where
    F: FnOnce(&[f64]) -> Vec<Row>,
{
    let Some(field) = mappings.measure_field() else {
        return SanitizeOutcome::Unconfigured;
    };
    let values: Vec<f64> = rows.iter().filter_map(|row| field_number(row, field)).collect();
    if values.is_empty() {
        return SanitizeOutcome::Records(Vec::new());
    }
    SanitizeOutcome::Records(view(&values))
}

fn to_record<T: Serialize>(item: &T) -> Option<Row> {
    match serde_json::to_value(item) {
        Ok(Value::Object(record)) => Some(record),
        _ => None,
    }
}

/// Partition finite values into `bins` equal-width bins over `[min, max]`.
///
/// Every bin is half-open `[start, end)` except the last, which also takes
/// `max`. Non-finite values are ignored; no finite values means no bins.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    // Bin arithmetic runs on halved values so `max - min` cannot overflow
    let (half_min, half_max) = (min / 2.0, max / 2.0);
    let step = (half_max - half_min) / bins as f64;
    let last = bins - 1;

    let mut counts = vec![0usize; bins];
    for v in &finite {
        let index = if step > 0.0 {
            (((v / 2.0 - half_min) / step).floor() as usize).min(last)
        } else {
            last
        };
        counts[index] += 1;
    }

    let edge = |i: usize| {
        if i == bins {
            max
        } else {
            (half_min + i as f64 * step).clamp(half_min, half_max) * 2.0
        }
    };

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            bin_label: format!("{:.2} - {:.2}", edge(i), edge(i + 1)),
            count,
        })
        .collect()
}

/// Box-plot summary of the finite values, or None when there are none
pub fn box_summary(values: &[f64]) -> Option<BoxSummary> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let at = |q: f64| sorted[((n as f64 * q).floor() as usize).min(n - 1)];
    let q1 = at(0.25);
    let median = at(0.5);
    let q3 = at(0.75);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    // Whiskers: extreme values still inside the fences
    let lower_whisker = sorted.iter().copied().find(|&v| v >= lower_fence).unwrap_or(q1);
    let upper_whisker = sorted.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(q3);

    let outliers: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    Some(BoxSummary {
        min: sorted[0],
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        max: sorted[n - 1],
        outliers,
    })
}

/// Gauge reading: the mean against a scale topping out at `max * headroom`
pub fn gauge_reading(values: &[f64], headroom: f64) -> Option<GaugeReading> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }

    // Running mean; a plain sum overflows on values near f64::MAX
    let value = finite
        .iter()
        .zip(1u32..)
        .fold(0.0, |mean, (v, k)| mean + v / f64::from(k) - mean / f64::from(k));
    let scale_max = (finite.iter().copied().fold(f64::NEG_INFINITY, f64::max) * headroom)
        .clamp(f64::MIN, f64::MAX);
    // NaN.min(1.0) is 1.0, so check the ratio before clamping
    let ratio = value / scale_max;
    let percent = if ratio.is_finite() { ratio.min(1.0) * 100.0 } else { 0.0 };

    Some(GaugeReading {
        value,
        scale_max,
        percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Row> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn measure(field: &str) -> Mappings {
        Mappings {
            value_field: Some(field.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_unconfigured_is_distinct_from_empty() {
        let data = rows(json!([{"x": "a", "y": "bad"}]));
        let unconfigured = sanitize(&data, &ChartType::Line, &Mappings::default());
        assert!(unconfigured.is_unconfigured());

        let mappings = Mappings {
            x_field: Some("x".to_string()),
            y_fields: vec!["y".to_string()],
            ..Default::default()
        };
        let empty = sanitize(&data, &ChartType::Line, &mappings);
        assert_eq!(empty, SanitizeOutcome::Records(Vec::new()));
        assert!(!empty.is_unconfigured());
    }

    #[test]
    fn test_cartesian_keeps_partial_rows() {
        let data = rows(json!([
            {"x": "a", "y1": "1", "y2": "bad"},
            {"x": "b", "y1": null, "y2": {}},
            {"y1": 3, "y2": 4},
        ]));
        let mappings = Mappings {
            x_field: Some("x".to_string()),
            y_fields: vec!["y1".to_string(), "y2".to_string()],
            ..Default::default()
        };
        let out = sanitize(&data, &ChartType::Bar, &mappings).into_records();
        assert_eq!(out.len(), 1);
        assert_eq!(Value::Object(out[0].clone()), json!({"x": "a", "y1": 1.0, "y2": null}));
    }

    #[test]
    fn test_scatter_requires_both_axes() {
        let data = rows(json!([
            {"a": "1", "b": "2"},
            {"a": "1", "b": true},
            {"a": "nope", "b": 2},
        ]));
        let mappings = Mappings {
            x_field: Some("a".to_string()),
            y_field: Some("b".to_string()),
            ..Default::default()
        };
        let out = sanitize(&data, &ChartType::Scatter, &mappings);
        assert_eq!(out.records().len(), 1);
    }

    #[test]
    fn test_pie_and_radar_drop_incomplete_rows() {
        let data = rows(json!([
            {"k": "A", "v": "5"},
            {"k": "B", "v": ""},
            {"v": 3},
        ]));
        let pie = Mappings {
            category_field: Some("k".to_string()),
            value_field: Some("v".to_string()),
            ..Default::default()
        };
        assert_eq!(sanitize(&data, &ChartType::Pie, &pie).records().len(), 1);

        let radar = Mappings {
            angle_field: Some("k".to_string()),
            radius_field: Some("v".to_string()),
            ..Default::default()
        };
        let out = sanitize(&data, &ChartType::Radar, &radar).into_records();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["v"], json!(5.0));
        assert!(sanitize(&data, &ChartType::Radar, &Mappings::default()).is_unconfigured());
    }

    #[test]
    fn test_histogram_bins() {
        let values: Vec<f64> = (0..=10).map(f64::from).collect();
        let bins = histogram(&values, 10);
        assert_eq!(bins.len(), 10);
        // 10.0 lands in the closed final bin together with 9.0
        assert_eq!(bins[9].count, 2);
        assert!(bins[..9].iter().all(|b| b.count == 1));
        assert_eq!(bins[0].bin_label, "0.00 - 1.00");
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 11);
    }

    #[test]
    fn test_histogram_single_value() {
        let bins = histogram(&[4.0, 4.0], 10);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert_eq!(bins[9].count, 2);
    }

    #[test]
    fn test_histogram_extreme_range_keeps_every_value() {
        let bins = histogram(&[-1e308, 0.0, 1e308], 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 3);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[9].count, 1);
        for bin in &bins {
            let edges: Vec<f64> = bin
                .bin_label
                .split(" - ")
                .map(|edge| edge.parse().unwrap())
                .collect();
            assert_eq!(edges.len(), 2);
            assert!(edges.iter().all(|e| e.is_finite()), "label {}", bin.bin_label);
        }
    }

    #[test]
    fn test_gauge_extreme_values_stay_finite() {
        let reading = gauge_reading(&[1e308, 1e308], 1.1).unwrap();
        assert_eq!(reading.value, 1e308);
        assert!(reading.scale_max.is_finite());
        assert!((reading.percent - 100.0 / 1.1).abs() < 1e-6);

        let spread = gauge_reading(&[-1e308, 0.0, 1e308], 1.1).unwrap();
        assert!(spread.value.is_finite());
        assert!(spread.value.abs() < 1e300);

        // max * headroom past f64::MAX is clamped rather than infinite
        let clamped = gauge_reading(&[f64::MAX], 1.1).unwrap();
        assert_eq!(clamped.scale_max, f64::MAX);
        assert!(clamped.percent.is_finite());
    }

    #[test]
    fn test_box_summary_floor_index_quartiles() {
        let summary = box_summary(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        // floor(5 * 0.25) = 1, floor(5 * 0.5) = 2, floor(5 * 0.75) = 3
        assert_eq!(summary.q1, 2.0);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.q3, 4.0);
        assert_eq!(summary.outliers, vec![100.0]);
        assert_eq!(summary.upper_whisker, 4.0);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 100.0);
    }

    #[test]
    fn test_box_summary_empty() {
        assert!(box_summary(&[]).is_none());
    }

    #[test]
    fn test_gauge_reading() {
        let reading = gauge_reading(&[10.0, 20.0, 30.0], 1.1).unwrap();
        assert_eq!(reading.value, 20.0);
        assert!((reading.scale_max - 33.0).abs() < 1e-9);
        assert!((reading.percent - 20.0 / 33.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_gauge_zero_scale_is_finite() {
        let reading = gauge_reading(&[0.0, 0.0], 1.1).unwrap();
        assert_eq!(reading.percent, 0.0);
    }

    #[test]
    fn test_derived_views_through_sanitize() {
        let data = rows(json!([{"v": "1"}, {"v": 2}, {"v": "x"}, {"v": 3}]));
        let hist = sanitize(&data, &ChartType::Histogram, &measure("v")).into_records();
        assert_eq!(hist.len(), 10);
        assert!(hist[0].contains_key("binLabel"));

        let boxed = sanitize(&data, &ChartType::Box, &measure("v")).into_records();
        assert_eq!(boxed.len(), 1);
        assert_eq!(boxed[0]["median"], json!(2.0));

        let gauge = sanitize(&data, &ChartType::Gauge, &measure("v")).into_records();
        assert_eq!(gauge[0]["value"], json!(2.0));

        assert!(sanitize(&data, &ChartType::Gauge, &Mappings::default()).is_unconfigured());
        let none = sanitize(&data, &ChartType::Histogram, &measure("missing"));
        assert_eq!(none, SanitizeOutcome::Records(Vec::new()));
    }

    #[test]
    fn test_unknown_chart_passes_through() {
        let data = rows(json!([{"a": 1}]));
        let out = sanitize(&data, &ChartType::from("funnel"), &Mappings::default());
        assert_eq!(out.records(), data.as_slice());
    }
}
