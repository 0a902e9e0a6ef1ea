//! Mapping repair: find field roles that make a chart spec produce data.
//!
//! The series builder is used as an oracle. Stages run in a fixed order and
//! the first mapping that yields at least one record wins:
//!
//! ```text
//! as-is ─► fill unset roles by column type ─► ordered search ─► type default
//! ```
//!
//! Every candidate is an owned [`Mappings`] value; the caller's spec and the
//! dataset rows are only read.

use serde::Serialize;
use tracing::{debug, trace};

use crate::chart::{ChartSpec, ChartType, Mappings};
use crate::data::{Dataset, Row};
use crate::infer::{ColumnType, ColumnTypes};
use crate::transform::build;
use crate::EngineConfig;

/// Stage of the search that produced a working mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStage {
    AsIs,
    Filled,
    Searched,
    Default,
}

/// A spec that builds to non-empty data, with that data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairOutcome {
    pub spec: ChartSpec,
    pub stage: RepairStage,
    pub data: Vec<Row>,
}

/// Repair with the default engine configuration
pub fn repair(candidate: &ChartSpec, dataset: &Dataset) -> Option<RepairOutcome> {
    repair_with(candidate, dataset, &EngineConfig::default())
}

/// Returns None when no column combination can back this chart kind
pub fn repair_with(
    candidate: &ChartSpec,
    dataset: &Dataset,
    config: &EngineConfig,
) -> Option<RepairOutcome> {
    let attempt = |mappings: &Mappings, stage: RepairStage| -> Option<RepairOutcome> {
        let data = build(&dataset.rows, &candidate.chart_type, mappings, &candidate.options);
        trace!(?stage, records = data.len(), "mapping attempt");
        if data.is_empty() {
            return None;
        }
        Some(RepairOutcome {
            spec: ChartSpec {
                chart_type: candidate.chart_type.clone(),
                mappings: mappings.clone(),
                options: candidate.options.clone(),
            },
            stage,
            data,
        })
    };

    if let Some(outcome) = attempt(&candidate.mappings, RepairStage::AsIs) {
        return Some(outcome);
    }

    let types = dataset.column_types(config);
    let columns = Columns::new(&types);

    let filled = fill_roles(&candidate.chart_type, &candidate.mappings, &columns);
    if let Some(outcome) = attempt(&filled, RepairStage::Filled) {
        debug!(chart = %candidate.chart_type, "repaired by filling unset roles");
        return Some(outcome);
    }

    let candidates = search_candidates(&candidate.chart_type, &filled, &columns);
    debug!(chart = %candidate.chart_type, candidates = candidates.len(), "searching mappings");
    if let Some(outcome) = candidates
        .iter()
        .find_map(|mappings| attempt(mappings, RepairStage::Searched))
    {
        return Some(outcome);
    }

    if candidate.mappings.is_empty() {
        if let Some(outcome) = default_mappings(&candidate.chart_type, &columns)
            .and_then(|mappings| attempt(&mappings, RepairStage::Default))
        {
            return Some(outcome);
        }
    }

    debug!(chart = %candidate.chart_type, "no mapping produces data");
    None
}

/// Read-only view over the dataset's column types, in header order
struct Columns<'a> {
    types: &'a ColumnTypes,
}

impl<'a> Columns<'a> {
    fn new(types: &'a ColumnTypes) -> Self {
        Self { types }
    }

    fn names(&self) -> impl Iterator<Item = &'a str> {
        let types: &'a ColumnTypes = self.types;
        types.keys().map(String::as_str)
    }

    fn of_type(&self, ty: ColumnType) -> impl Iterator<Item = &'a str> {
        let types: &'a ColumnTypes = self.types;
        types
            .iter()
            .filter(move |(_, t)| **t == ty)
            .map(|(name, _)| name.as_str())
    }

    fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    fn first_of(&self, ty: ColumnType) -> Option<&'a str> {
        self.of_type(ty).next()
    }

    /// First category column, else first date column
    fn first_axis(&self) -> Option<&'a str> {
        self.first_of(ColumnType::Category)
            .or_else(|| self.first_of(ColumnType::Date))
    }

    /// First number column not already used, else first unused column
    fn pick_numeric(&self, used: &[&str]) -> Option<&'a str> {
        self.of_type(ColumnType::Number)
            .find(|name| !used.contains(name))
            .or_else(|| self.names().find(|name| !used.contains(name)))
    }
}

/// Fill every unset role (or one naming a missing column) from the column types
fn fill_roles(chart_type: &ChartType, mappings: &Mappings, columns: &Columns) -> Mappings {
    let mut filled = mappings.retain_known(|name| columns.contains(name));
    let axis = || columns.first_axis().or_else(|| columns.names().next());

    match chart_type {
        ChartType::Line | ChartType::Bar | ChartType::Area => {
            if filled.x_field.is_none() {
                filled.x_field = axis().map(String::from);
            }
            if filled.y_fields.is_empty() {
                let used: Vec<&str> = filled.x_field.as_deref().into_iter().collect();
                filled.y_fields = columns
                    .pick_numeric(&used)
                    .map(String::from)
                    .into_iter()
                    .collect();
            }
        }
        ChartType::Scatter => {
            if filled.x_field.is_none() {
                let used: Vec<&str> = filled.y_field.as_deref().into_iter().collect();
                filled.x_field = columns.pick_numeric(&used).map(String::from);
            }
            if filled.y_field.is_none() {
                let used: Vec<&str> = filled.x_field.as_deref().into_iter().collect();
                filled.y_field = columns.pick_numeric(&used).map(String::from);
            }
        }
        ChartType::Pie | ChartType::Donut => {
            if filled.category_field.is_none() {
                filled.category_field = axis().map(String::from);
            }
            if filled.value_field.is_none() {
                let used: Vec<&str> = filled.category_field.as_deref().into_iter().collect();
                filled.value_field = columns.pick_numeric(&used).map(String::from);
            }
            if *chart_type == ChartType::Donut {
                filled.donut = Some(true);
            }
        }
        ChartType::Radar => {
            if filled.angle_field.is_none() {
                filled.angle_field = axis().map(String::from);
            }
            if filled.radius_field.is_none() {
                let used: Vec<&str> = filled.angle_field.as_deref().into_iter().collect();
                filled.radius_field = columns.pick_numeric(&used).map(String::from);
            }
        }
        _ => {}
    }

    filled
}

/// Ordered alternative mappings for one chart family, starting from `base`.
///
/// The order decides which mapping wins when several would work.
fn search_candidates(chart_type: &ChartType, base: &Mappings, columns: &Columns) -> Vec<Mappings> {
    let numeric: Vec<&str> = columns.of_type(ColumnType::Number).collect();
    let with = |edit: &dyn Fn(&mut Mappings)| {
        let mut candidate = base.clone();
        edit(&mut candidate);
        candidate
    };

    let candidates: Vec<Mappings> = match chart_type {
        ChartType::Pie | ChartType::Donut => {
            // Value column first (current one leading), then the category column
            let mut values: Vec<&str> = base.value_field.as_deref().into_iter().collect();
            values.extend(
                numeric
                    .iter()
                    .copied()
                    .filter(|n| Some(*n) != base.value_field.as_deref()),
            );

            let by_value = values
                .into_iter()
                .map(|v| with(&|m: &mut Mappings| m.value_field = Some(v.to_string())));
            let by_category = columns
                .names()
                .filter(|c| {
                    Some(*c) != base.category_field.as_deref()
                        && Some(*c) != base.value_field.as_deref()
                })
                .map(|c| with(&|m: &mut Mappings| m.category_field = Some(c.to_string())));
            by_value.chain(by_category).collect()
        }
        ChartType::Line | ChartType::Bar | ChartType::Area => {
            // Grow the series list before touching the x axis
            let ys: Vec<&str> = numeric
                .iter()
                .copied()
                .filter(|n| Some(*n) != base.x_field.as_deref())
                .collect();
            let grown = (1..=ys.len().min(3)).map(|len| {
                with(&|m: &mut Mappings| {
                    m.y_fields = ys[..len].iter().map(|s| s.to_string()).collect()
                })
            });

            let xs = columns
                .of_type(ColumnType::Date)
                .chain(columns.of_type(ColumnType::Category))
                .filter(|x| Some(*x) != base.x_field.as_deref())
                .map(|x| with(&|m: &mut Mappings| m.x_field = Some(x.to_string())));
            grown.chain(xs).collect()
        }
        ChartType::Scatter => numeric
            .iter()
            .flat_map(|&x| {
                numeric
                    .iter()
                    .filter(move |&&y| y != x)
                    .map(move |&y| (x, y))
            })
            .map(|(x, y)| {
                with(&|m: &mut Mappings| {
                    m.x_field = Some(x.to_string());
                    m.y_field = Some(y.to_string());
                })
            })
            .collect(),
        ChartType::Radar => numeric
            .iter()
            .map(|r| with(&|m: &mut Mappings| m.radius_field = Some(r.to_string())))
            .collect(),
        _ => Vec::new(),
    };

    // The base mapping was already tried by the fill stage
    candidates.into_iter().filter(|m| m != base).collect()
}

/// Mapping built purely from column classes, for specs that arrived with no roles at all
fn default_mappings(chart_type: &ChartType, columns: &Columns) -> Option<Mappings> {
    let numeric = columns.first_of(ColumnType::Number).map(String::from);
    let mut mappings = Mappings::default();

    match chart_type {
        ChartType::Line | ChartType::Bar | ChartType::Area => {
            mappings.x_field = Some(columns.first_axis()?.to_string());
            mappings.y_fields = vec![numeric?];
        }
        ChartType::Scatter => {
            // Both scatter axes are value roles
            mappings.x_field = numeric.clone();
            mappings.y_field = Some(numeric?);
        }
        ChartType::Pie | ChartType::Donut => {
            mappings.category_field = Some(columns.first_axis()?.to_string());
            mappings.value_field = Some(numeric?);
            if *chart_type == ChartType::Donut {
                mappings.donut = Some(true);
            }
        }
        ChartType::Radar => {
            mappings.angle_field = Some(columns.first_axis()?.to_string());
            mappings.radius_field = Some(numeric?);
        }
        _ => return None,
    }

    Some(mappings)
}
