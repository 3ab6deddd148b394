//! Ragic records to Polars DataFrame conversion
//!
//! A Ragic listing is a JSON object keyed by record id whose values map
//! field keys to (mostly string) values. Records in one response need not
//! carry the same fields. This module flattens such a response into one
//! rectangular DataFrame:
//!
//! 1. Column 0 is `index`, the record id. A field that would also be
//!    called `index` is reported as `index_field`.
//! 2. Remaining columns follow first-seen order across records (or declared
//!    order, see `ColumnPolicy`). Cells a record does not carry are null.
//! 3. Fields starting with `_` are system fields and dropped, except the
//!    creation/update timestamps.
//! 4. Declared `number` columns become Float32 with empty cells null;
//!    declared `text` columns get `"Missing Value"` in place of empty cells.

use super::data::RawRecordSet;
use super::error::{RagicError, Result};
use super::schema::{ColumnType, TableDef};
use polars::prelude::*;
use serde_json::Value;
use std::collections::HashMap;

/// Name of the record id column
pub const INDEX_COLUMN: &str = "index";

/// Output name of a field or declared column called `index`
pub const RENAMED_INDEX_FIELD: &str = "index_field";

/// Replacement for empty cells in text columns
pub const MISSING_TEXT: &str = "Missing Value";

/// System fields kept in the output
pub const RETAINED_SYSTEM_FIELDS: [&str; 2] = ["_create_date", "_update_date"];

const SYSTEM_FIELD_PREFIX: char = '_';

/// How the column set of a normalized page is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnPolicy {
    /// Columns seen in this response, in first-seen order
    #[default]
    Observed,
    /// Every declared column in declared order, even when no record carries
    /// it; undeclared columns seen in the response follow
    Declared,
}

fn is_dropped_field(key: &str) -> bool {
    key.starts_with(SYSTEM_FIELD_PREFIX) && !RETAINED_SYSTEM_FIELDS.contains(&key)
}

/// Keep field columns clear of the record id column
fn output_name(name: &str) -> &str {
    if name == INDEX_COLUMN {
        RENAMED_INDEX_FIELD
    } else {
        name
    }
}

/// Output column name for a record field key
///
/// Records may key fields by column name or by field id; ids of declared
/// columns are reported under the column name.
fn column_name<'a>(table: &'a TableDef, key: &'a str) -> &'a str {
    if table.columns.contains_key(key) {
        return output_name(key);
    }
    let name = table
        .column_by_field_id(key)
        .map(|(name, _)| name)
        .unwrap_or(key);
    output_name(name)
}

/// Text form of one cell
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        // Multiple-selection fields come back as arrays
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(cell_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Flatten a record set into a table of raw text cells
///
/// Returns `None` when the record set has no records.
pub fn records_to_dataframe(
    records: &RawRecordSet,
    table: &TableDef,
    policy: ColumnPolicy,
) -> Result<Option<DataFrame>> {
    if records.is_empty() {
        return Ok(None);
    }

    let mut index: Vec<String> = Vec::with_capacity(records.len());
    let mut columns: Vec<(String, Vec<Option<String>>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    if policy == ColumnPolicy::Declared {
        for name in table.columns.keys().map(|k| output_name(k)) {
            positions.insert(name.to_string(), columns.len());
            columns.push((name.to_string(), Vec::with_capacity(records.len())));
        }
    }

    for (row, (record_id, record)) in records.iter().enumerate() {
        index.push(record_id.to_string());

        for (key, value) in record {
            if is_dropped_field(key) {
                continue;
            }

            let name = column_name(table, key);
            let pos = *positions.entry(name.to_string()).or_insert_with(|| {
                columns.push((name.to_string(), vec![None; row]));
                columns.len() - 1
            });

            let cells = &mut columns[pos].1;
            cells.resize(row + 1, None);
            cells[row] = cell_text(value);
        }

        for (_, cells) in columns.iter_mut() {
            cells.resize(row + 1, None);
        }
    }

    if positions.contains_key(RENAMED_INDEX_FIELD) {
        tracing::warn!(
            column = RENAMED_INDEX_FIELD,
            "Field named '{}' renamed to keep the record id column",
            INDEX_COLUMN
        );
    }

    let mut frame_columns = Vec::with_capacity(columns.len() + 1);
    frame_columns.push(Column::new(INDEX_COLUMN.into(), index));
    for (name, cells) in columns {
        frame_columns.push(Column::new(name.as_str().into(), cells));
    }

    let df = DataFrame::new(frame_columns)?;
    Ok(Some(df))
}

/// Apply declared column types to a table
///
/// Declared columns missing from the table are skipped; undeclared columns
/// are left untouched. Applying this twice gives the same table as applying
/// it once.
pub fn coerce_columns(df: &mut DataFrame, table: &TableDef) -> Result<()> {
    for (name, def) in table.columns.iter() {
        let name = output_name(name);
        let coerced = match df.column(name) {
            Ok(column) => {
                let series = column.as_materialized_series();
                match def.column_type {
                    ColumnType::Number => coerce_number(name, series)?,
                    ColumnType::Text => coerce_text(series)?,
                }
            }
            Err(_) => continue,
        };

        if let Some(series) = coerced {
            df.with_column(series)?;
        }
    }
    Ok(())
}

fn coerce_number(name: &str, series: &Series) -> Result<Option<Series>> {
    match series.dtype() {
        DataType::Float32 => Ok(None),
        DataType::String => {
            let values = series
                .str()?
                .into_iter()
                .map(|cell| match cell {
                    None | Some("") => Ok(None),
                    Some(text) => text
                        .trim()
                        .parse::<f32>()
                        .map(Some)
                        .map_err(|_| RagicError::Coercion {
                            column: name.to_string(),
                            value: text.to_string(),
                        }),
                })
                .collect::<Result<Vec<Option<f32>>>>()?;
            Ok(Some(Series::new(series.name().clone(), values)))
        }
        _ => Ok(Some(series.cast(&DataType::Float32)?)),
    }
}

fn coerce_text(series: &Series) -> Result<Option<Series>> {
    if series.dtype() != &DataType::String {
        return Ok(None);
    }

    let values: Vec<Option<&str>> = series
        .str()?
        .into_iter()
        .map(|cell| match cell {
            Some("") => Some(MISSING_TEXT),
            other => other,
        })
        .collect();
    Ok(Some(Series::new(series.name().clone(), values)))
}

/// Convert one page of records into a typed DataFrame
///
/// `None` signals a page without records, which ends a pagination loop.
pub fn normalize(
    records: &RawRecordSet,
    table: &TableDef,
    policy: ColumnPolicy,
) -> Result<Option<DataFrame>> {
    let Some(mut df) = records_to_dataframe(records, table, policy)? else {
        return Ok(None);
    };

    tracing::debug!(
        rows = df.height(),
        columns = ?df.get_column_names(),
        "Normalizing page"
    );

    coerce_columns(&mut df, table)?;
    Ok(Some(df))
}
