// Chart call parser: kind(role: column, ...)

use super::lexer::{column_name, identifier, ws};
use crate::chart::{ChartType, Mappings};
use nom::{
    character::complete::char,
    combinator::map_res,
    multi::separated_list0,
    sequence::{delimited, separated_pair},
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    X,
    Y,
    Color,
    Category,
    Value,
    Angle,
    Radius,
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        match name {
            "x" => Ok(Role::X),
            "y" => Ok(Role::Y),
            "color" => Ok(Role::Color),
            "category" => Ok(Role::Category),
            "value" => Ok(Role::Value),
            "angle" => Ok(Role::Angle),
            "radius" => Ok(Role::Radius),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Parse a `role: column` argument; unknown roles fail the parse
fn parse_arg(input: &str) -> IResult<&str, (Role, String)> {
    map_res(
        separated_pair(ws(identifier), ws(char(':')), ws(column_name)),
        |(role, column)| Role::try_from(role.as_str()).map(|role| (role, column)),
    )(input)
}

/// Parse a chart call
/// Format: pie(category: region, value: revenue) or line(x: month, y: a, y: b)
pub fn parse_chart(input: &str) -> IResult<&str, (ChartType, Mappings)> {
    let (input, kind) = ws(identifier)(input)?;
    let (input, args) = delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), parse_arg),
        ws(char(')')),
    )(input)?;

    let chart_type = ChartType::from(kind.as_str());
    let mut mappings = Mappings::default();

    for (role, column) in args {
        match role {
            Role::X => mappings.x_field = Some(column),
            // repeated y builds the series list on cartesian charts
            Role::Y if chart_type.is_cartesian() => mappings.y_fields.push(column),
            Role::Y => mappings.y_field = Some(column),
            Role::Color => mappings.color_field = Some(column),
            Role::Category => mappings.category_field = Some(column),
            Role::Value => mappings.value_field = Some(column),
            Role::Angle => mappings.angle_field = Some(column),
            Role::Radius => mappings.radius_field = Some(column),
        }
    }

    if chart_type == ChartType::Donut {
        mappings.donut = Some(true);
    }

    Ok((input, (chart_type, mappings)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pie() {
        let result = parse_chart("pie(category: region, value: revenue)");
        assert!(result.is_ok());
        let (rest, (chart_type, mappings)) = result.unwrap();
        assert_eq!(rest, "");
        assert_eq!(chart_type, ChartType::Pie);
        assert_eq!(mappings.category_field.as_deref(), Some("region"));
        assert_eq!(mappings.value_field.as_deref(), Some("revenue"));
        assert_eq!(mappings.donut, None);
    }

    #[test]
    fn test_parse_line_multiple_y() {
        let (_, (chart_type, mappings)) =
            parse_chart("line(x: month, y: revenue, y: cost)").unwrap();
        assert_eq!(chart_type, ChartType::Line);
        assert_eq!(mappings.x_field.as_deref(), Some("month"));
        assert_eq!(mappings.y_fields, vec!["revenue", "cost"]);
        assert_eq!(mappings.y_field, None);
    }

    #[test]
    fn test_parse_scatter_y_is_single_field() {
        let (_, (_, mappings)) = parse_chart("scatter(x: a, y: b, y: c, color: g)").unwrap();
        assert!(mappings.y_fields.is_empty());
        // last one wins
        assert_eq!(mappings.y_field.as_deref(), Some("c"));
        assert_eq!(mappings.color_field.as_deref(), Some("g"));
    }

    #[test]
    fn test_parse_quoted_column() {
        let (_, (_, mappings)) = parse_chart(r#"bar(x: "Sales Region", y: "Total $")"#).unwrap();
        assert_eq!(mappings.x_field.as_deref(), Some("Sales Region"));
        assert_eq!(mappings.y_fields, vec!["Total $"]);
    }

    #[test]
    fn test_parse_donut_sets_flag() {
        let (_, (chart_type, mappings)) = parse_chart("donut()").unwrap();
        assert_eq!(chart_type, ChartType::Donut);
        assert!(mappings.is_empty());
        assert_eq!(mappings.donut, Some(true));
    }

    #[test]
    fn test_parse_unknown_kind_is_carried() {
        let (_, (chart_type, _)) = parse_chart("sankey(x: a)").unwrap();
        assert_eq!(chart_type, ChartType::Unknown("sankey".to_string()));
    }

    #[test]
    fn test_parse_radar() {
        let (_, (_, mappings)) = parse_chart("radar( angle : skill , radius : score )").unwrap();
        assert_eq!(mappings.angle_field.as_deref(), Some("skill"));
        assert_eq!(mappings.radius_field.as_deref(), Some("score"));
    }

    #[test]
    fn test_parse_unknown_role_fails() {
        assert!(parse_chart("line(size: 3)").is_err());
    }

    #[test]
    fn test_parse_missing_paren_fails() {
        assert!(parse_chart("line(x: a").is_err());
    }
}
