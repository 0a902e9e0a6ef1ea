// Chart specification model: chart kinds, field roles and options

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chart kind a spec asks for.
///
/// `Histogram`, `Box` and `Gauge` are derived views only the numeric safety
/// layer knows how to produce. Names outside the known set are carried as
/// `Unknown` so the series builder can pass rows straight through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartType {
    Line,
    Bar,
    Area,
    Scatter,
    Pie,
    Donut,
    Radar,
    Histogram,
    Box,
    Gauge,
    Unknown(String),
}

impl ChartType {
    pub fn as_str(&self) -> &str {
        match self {
            ChartType::Line => "line",
            ChartType::Bar => "bar",
            ChartType::Area => "area",
            ChartType::Scatter => "scatter",
            ChartType::Pie => "pie",
            ChartType::Donut => "donut",
            ChartType::Radar => "radar",
            ChartType::Histogram => "histogram",
            ChartType::Box => "box",
            ChartType::Gauge => "gauge",
            ChartType::Unknown(name) => name,
        }
    }

    /// Line, bar and area share the `xField` / `yFields` mapping shape
    pub fn is_cartesian(&self) -> bool {
        matches!(self, ChartType::Line | ChartType::Bar | ChartType::Area)
    }

    pub fn is_pie(&self) -> bool {
        matches!(self, ChartType::Pie | ChartType::Donut)
    }
}

impl From<&str> for ChartType {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "line" => ChartType::Line,
            "bar" => ChartType::Bar,
            "area" => ChartType::Area,
            "scatter" => ChartType::Scatter,
            "pie" => ChartType::Pie,
            "donut" => ChartType::Donut,
            "radar" => ChartType::Radar,
            "histogram" => ChartType::Histogram,
            "box" => ChartType::Box,
            "gauge" => ChartType::Gauge,
            _ => ChartType::Unknown(name.to_string()),
        }
    }
}

impl From<String> for ChartType {
    fn from(name: String) -> Self {
        ChartType::from(name.as_str())
    }
}

impl From<ChartType> for String {
    fn from(chart_type: ChartType) -> Self {
        chart_type.as_str().to_string()
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduction applied to grouped values.
///
/// Names that are not recognised are kept as `Other`; they reduce to the
/// last value of a group rather than failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Aggregation {
    #[default]
    None,
    Sum,
    Avg,
    Min,
    Max,
    Other(String),
}

impl Aggregation {
    pub fn as_str(&self) -> &str {
        match self {
            Aggregation::None => "none",
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Other(name) => name,
        }
    }
}

impl From<&str> for Aggregation {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Aggregation::None,
            "sum" => Aggregation::Sum,
            "avg" => Aggregation::Avg,
            "min" => Aggregation::Min,
            "max" => Aggregation::Max,
            _ => Aggregation::Other(name.to_string()),
        }
    }
}

impl From<String> for Aggregation {
    fn from(name: String) -> Self {
        Aggregation::from(name.as_str())
    }
}

impl From<Aggregation> for String {
    fn from(aggregation: Aggregation) -> Self {
        aggregation.as_str().to_string()
    }
}

/// Field roles bound to dataset column names.
///
/// One flat record covers every chart family; each family reads only its
/// own roles (`xField`/`yFields` for line/bar/area, `xField`/`yField`/
/// `colorField` for scatter, `categoryField`/`valueField` for pie/donut,
/// `angleField`/`radiusField` for radar).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mappings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub y_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donut: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_field: Option<String>,
}

impl Mappings {
    /// True when no role is bound to a column (the `donut` flag is not a role)
    pub fn is_empty(&self) -> bool {
        self.columns().next().is_none()
    }

    /// Every bound column name, in role order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.x_field
            .iter()
            .chain(self.y_fields.iter())
            .chain(self.y_field.iter())
            .chain(self.color_field.iter())
            .chain(self.category_field.iter())
            .chain(self.value_field.iter())
            .chain(self.angle_field.iter())
            .chain(self.radius_field.iter())
            .map(String::as_str)
    }

    /// The single numeric field a distribution view (histogram, box, gauge) reads
    pub fn measure_field(&self) -> Option<&str> {
        self.value_field
            .as_deref()
            .or(self.y_field.as_deref())
            .or(self.y_fields.first().map(String::as_str))
    }

    /// Copy with every role naming an unknown column cleared
    pub fn retain_known(&self, is_known: impl Fn(&str) -> bool) -> Mappings {
        let keep = |field: &Option<String>| field.clone().filter(|name| is_known(name));
        Mappings {
            x_field: keep(&self.x_field),
            y_fields: self.y_fields.iter().filter(|name| is_known(name)).cloned().collect(),
            y_field: keep(&self.y_field),
            color_field: keep(&self.color_field),
            category_field: keep(&self.category_field),
            value_field: keep(&self.value_field),
            donut: self.donut,
            angle_field: keep(&self.angle_field),
            radius_field: keep(&self.radius_field),
        }
    }
}

/// Aggregation and Top-N settings; `top_n == 0` means no limit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub top_n: usize,
}

/// Complete declarative chart specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub chart_type: ChartType,
    #[serde(default)]
    pub mappings: Mappings,
    #[serde(default)]
    pub options: ChartOptions,
}

impl ChartSpec {
    pub fn new(chart_type: ChartType) -> Self {
        Self {
            chart_type,
            mappings: Mappings::default(),
            options: ChartOptions::default(),
        }
    }
}
