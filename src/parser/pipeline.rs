// Pipeline parser for the chart spec DSL

use super::chart::parse_chart;
use super::lexer::{identifier, integer, ws};
use crate::chart::{Aggregation, ChartOptions, ChartSpec};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{eof, map},
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};

#[derive(Debug)]
enum Stage {
    Agg(Aggregation),
    Top(usize),
}

fn parse_agg(input: &str) -> IResult<&str, Stage> {
    preceded(
        ws(tag("agg")),
        delimited(
            ws(char('(')),
            map(ws(identifier), |method| Stage::Agg(Aggregation::from(method))),
            ws(char(')')),
        ),
    )(input)
}

fn parse_top(input: &str) -> IResult<&str, Stage> {
    preceded(
        ws(tag("top")),
        delimited(ws(char('(')), map(ws(integer), Stage::Top), ws(char(')'))),
    )(input)
}

/// Parse a complete chart specification
/// Format: chart(...) | agg(method) | top(n)
pub fn parse_chart_spec(input: &str) -> IResult<&str, ChartSpec> {
    let (input, (chart_type, mappings)) = parse_chart(input)?;

    let (input, stages) = many0(preceded(ws(char('|')), alt((parse_agg, parse_top))))(input)?;

    // Consume trailing whitespace and ensure end of input
    let (input, _) = ws(eof)(input)?;

    let mut options = ChartOptions::default();
    for stage in stages {
        match stage {
            Stage::Agg(aggregation) => options.aggregation = aggregation,
            Stage::Top(n) => options.top_n = n,
        }
    }

    Ok((
        input,
        ChartSpec {
            chart_type,
            mappings,
            options,
        },
    ))
}
