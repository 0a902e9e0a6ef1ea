// Library exports for chartmend

pub mod chart;
pub mod data;
pub mod infer;
pub mod parser;
pub mod repair;
pub mod sanitize;
pub mod transform;

pub use chart::{Aggregation, ChartOptions, ChartSpec, ChartType, Mappings};
pub use data::{coerce_numeric, Dataset, Row};
pub use infer::{infer, ColumnType, ColumnTypes};
pub use repair::{repair, RepairOutcome, RepairStage};
pub use sanitize::{sanitize, SanitizeOutcome};
pub use transform::{aggregate, build, top_n};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables for type inference and the renderer-side derived views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rows sampled when a column type has to be inferred
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
    /// Distinct-value count a column may always have and still be a category
    #[serde(default = "default_category_floor")]
    pub category_floor: usize,
    /// Share of the sample size allowed as distinct values for a category
    #[serde(default = "default_category_ratio")]
    pub category_ratio: f64,
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
    /// Gauge scale maximum as a multiple of the largest sample
    #[serde(default = "default_gauge_headroom")]
    pub gauge_headroom: f64,
}

fn default_sample_limit() -> usize {
    100
}

fn default_category_floor() -> usize {
    10
}

fn default_category_ratio() -> f64 {
    0.2
}

fn default_histogram_bins() -> usize {
    10
}

fn default_gauge_headroom() -> f64 {
    1.1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_limit: default_sample_limit(),
            category_floor: default_category_floor(),
            category_ratio: default_category_ratio(),
            histogram_bins: default_histogram_bins(),
            gauge_headroom: default_gauge_headroom(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config document; missing keys keep their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid engine configuration")
    }

    /// Largest distinct-value count a sampled column may have to be a category
    pub fn category_threshold(&self, sample_size: usize) -> usize {
        let scaled = (self.category_ratio * sample_size as f64).ceil() as usize;
        self.category_floor.max(scaled)
    }
}
