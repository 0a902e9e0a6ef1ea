// Chart spec DSL parser module

pub mod chart;
pub mod lexer;
pub mod pipeline;

pub use pipeline::parse_chart_spec;

use crate::chart::ChartSpec;
use anyhow::{anyhow, Result};

/// Parse a whole DSL string, converting nom's error into an `anyhow` one
pub fn parse(input: &str) -> Result<ChartSpec> {
    parse_chart_spec(input)
        .map(|(_, spec)| spec)
        .map_err(|e| anyhow!("Parse error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartType;

    #[test]
    fn test_parse_ok() {
        let spec = parse("  scatter(x: a, y: b)  ").unwrap();
        assert_eq!(spec.chart_type, ChartType::Scatter);
    }

    #[test]
    fn test_parse_error_message() {
        let err = parse("line(x: a) extra").unwrap_err();
        assert!(err.to_string().starts_with("Parse error"));
    }
}
