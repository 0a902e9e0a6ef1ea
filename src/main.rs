use anyhow::{bail, Context, Result};
use chartmend::{parser, repair, sanitize, transform, Dataset, EngineConfig};
use clap::Parser;
use serde_json::{json, Value};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chartmend")]
#[command(
    about = "Build, sanitize and repair chart data from CSV/JSON using a chart spec DSL",
    long_about = None
)]
struct Args {
    /// Dataset file (.csv or .json array of objects); `-` reads CSV from stdin
    data: PathBuf,

    /// Chart spec DSL string (e.g., 'pie(category: region, value: revenue) | agg(sum) | top(5)')
    spec: String,

    /// Search for a mapping that produces data instead of building as-is
    #[arg(long, conflicts_with = "sanitize")]
    repair: bool,

    /// Run the renderer-side safety layer instead of the series builder
    #[arg(long)]
    sanitize: bool,

    /// Engine configuration JSON file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            EngineConfig::from_json(&text)?
        }
        None => EngineConfig::default(),
    };

    let dataset = load_dataset(&args.data)?;
    debug!(rows = dataset.rows.len(), columns = dataset.headers.len(), "dataset loaded");

    // Parse the DSL string
    let spec = match parser::parse(&args.spec) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let output = if args.repair {
        match repair::repair_with(&spec, &dataset, &config) {
            Some(outcome) => {
                serde_json::to_value(&outcome).context("Failed to serialize repair outcome")?
            }
            None => bail!("cannot support a {} chart with this dataset", spec.chart_type),
        }
    } else if args.sanitize {
        let outcome =
            sanitize::sanitize_with(&dataset.rows, &spec.chart_type, &spec.mappings, &config);
        if outcome.is_unconfigured() {
            warn!(chart = %spec.chart_type, "chart mappings are not configured");
            json!({"status": "unconfigured"})
        } else {
            json!({"status": "ok", "records": outcome.into_records()})
        }
    } else {
        let records =
            transform::build(&dataset.rows, &spec.chart_type, &spec.mappings, &spec.options);
        if records.is_empty() && !dataset.rows.is_empty() {
            warn!(chart = %spec.chart_type, "spec produced no records");
        }
        Value::Array(records.into_iter().map(Value::Object).collect())
    };

    let rendered = serde_json::to_string_pretty(&output).context("Failed to serialize output")?;

    // Write JSON to stdout
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(rendered.as_bytes())
        .and_then(|_| handle.write_all(b"\n"))
        .context("Failed to write JSON to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read CSV from stdin")?;
        return Dataset::from_csv_reader(buffer.as_bytes());
    }

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;
        Dataset::from_json(&value)
    } else {
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open dataset {}", path.display()))?;
        Dataset::from_csv_reader(file)
    }
}
