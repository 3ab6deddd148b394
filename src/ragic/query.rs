//! Query compilation
//!
//! Translates human-readable filter conditions into Ragic's URL query
//! grammar. Column names are resolved to backend field identifiers through
//! the table's declared structure; the resulting query string is bundled
//! with the (tab, table) pair it targets in an immutable `QueryDescriptor`.

use super::error::{RagicError, Result};
use super::schema::{Schema, TableDef};
use std::fmt;
use std::str::FromStr;

/// Filter operator supported by Ragic's `where` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    GreaterOrEqual,
    LessOrEqual,
    GreaterThan,
    LessThan,
    Contains,
}

impl Operator {
    /// Operator code in the `where=<fieldId>,<code>,<value>` clause
    pub fn code(self) -> &'static str {
        match self {
            Operator::Equal => "eq",
            Operator::GreaterOrEqual => "gte",
            Operator::LessOrEqual => "lte",
            Operator::GreaterThan => "gt",
            Operator::LessThan => "lt",
            Operator::Contains => "like",
        }
    }
}

/// Value side of a filter condition, rendered verbatim into the query
///
/// Values are not URL-escaped: a value containing `&` or `#` splits or
/// truncates the query string sent to Ragic.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) => f.write_str(s),
            FilterValue::Integer(i) => write!(f, "{}", i),
            FilterValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        FilterValue::Integer(i)
    }
}

impl From<i32> for FilterValue {
    fn from(i: i32) -> Self {
        FilterValue::Integer(i as i64)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

/// One `(field, operator, value)` filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: FilterValue,
}

impl Condition {
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Condition {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Parse the command-line form `<field><op><value>`
///
/// Operators: `>=`, `<=`, `>`, `<`, `=`, `~` (contains). The leftmost
/// operator wins, two-character operators before their one-character prefix.
impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        const OPERATORS: [(&str, Operator); 6] = [
            (">=", Operator::GreaterOrEqual),
            ("<=", Operator::LessOrEqual),
            (">", Operator::GreaterThan),
            ("<", Operator::LessThan),
            ("=", Operator::Equal),
            ("~", Operator::Contains),
        ];

        let (pos, token, operator) = OPERATORS
            .iter()
            .filter_map(|(token, op)| s.find(token).map(|pos| (pos, *token, *op)))
            .min_by_key(|(pos, token, _)| (*pos, std::cmp::Reverse(token.len())))
            .ok_or_else(|| format!("No operator in condition '{}'", s))?;

        let field = s[..pos].trim();
        if field.is_empty() {
            return Err(format!("Missing field name in condition '{}'", s));
        }
        let value = s[pos + token.len()..].trim();

        Ok(Condition::new(field, operator, value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn code(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(format!("Invalid sort direction '{}'", other)),
        }
    }
}

/// Sort order applied by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub order_by: String,
    pub direction: Direction,
}

impl Ordering {
    pub fn new(order_by: impl Into<String>, direction: Direction) -> Self {
        Ordering {
            order_by: order_by.into(),
            direction,
        }
    }
}

/// GET parameters besides filters and pagination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub include_subtables: bool,
    pub listing: bool,
    pub ordering: Option<Ordering>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            include_subtables: false,
            listing: true,
            ordering: None,
        }
    }
}

/// Compiled, backend-ready query for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    tab: String,
    table: String,
    query_string: String,
}

impl QueryDescriptor {
    pub fn tab(&self) -> &str {
        &self.tab
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Query string without pagination parameters
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Query string with `limit`/`offset` appended
    pub fn page_query(&self, offset: usize, limit: usize) -> String {
        format!("{}&limit={}&offset={}", self.query_string, limit, offset)
    }
}

fn field_id<'a>(table_name: &str, table: &'a TableDef, field: &str) -> Result<&'a str> {
    table
        .column(field)
        .map(|c| c.field_id.as_str())
        .ok_or_else(|| RagicError::FieldNotFound {
            table: table_name.to_string(),
            field: field.to_string(),
        })
}

/// Compile filter conditions into the `&where=...` query segment
///
/// One clause per condition, in input order. Every field is resolved before
/// any output is produced, so a bad field never yields a partial segment.
/// An empty condition list compiles to an empty segment.
pub fn compile_filters(
    table_name: &str,
    table: &TableDef,
    conditions: &[Condition],
) -> Result<String> {
    let clauses = conditions
        .iter()
        .map(|c| -> Result<String> {
            let id = field_id(table_name, table, &c.field)?;
            Ok(format!("where={},{},{}", id, c.operator.code(), c.value))
        })
        .collect::<Result<Vec<_>>>()?;

    if clauses.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("&{}", clauses.join("&")))
}

/// Compile an ordering into the `&order=<fieldId>,<ASC|DESC>` segment
pub fn compile_ordering(
    table_name: &str,
    table: &TableDef,
    ordering: &Ordering,
) -> Result<String> {
    let id = field_id(table_name, table, &ordering.order_by)?;
    Ok(format!("&order={},{}", id, ordering.direction.code()))
}

/// Build the query for `tab`/`table`
///
/// Base string is `v=<version>&info=true&listing=<bool>&subtables=<0|1>`,
/// followed by the filter segment (when conditions are given) and the
/// ordering segment.
pub fn define_query(
    schema: &Schema,
    version: u32,
    tab: &str,
    table: &str,
    conditions: Option<&[Condition]>,
    options: &QueryOptions,
) -> Result<QueryDescriptor> {
    let table_def = schema.table(tab, table)?;

    let mut query_string = format!(
        "v={}&info=true&listing={}&subtables={}",
        version,
        options.listing,
        if options.include_subtables { 1 } else { 0 }
    );

    if let Some(conditions) = conditions {
        query_string.push_str(&compile_filters(table, table_def, conditions)?);
    }

    if let Some(ordering) = &options.ordering {
        query_string.push_str(&compile_ordering(table, table_def, ordering)?);
    }

    tracing::debug!(tab, table, query = %query_string, "Defined query");

    Ok(QueryDescriptor {
        tab: tab.to_string(),
        table: table.to_string(),
        query_string,
    })
}
