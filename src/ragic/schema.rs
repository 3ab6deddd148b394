//! Structure file loading and lookup
//!
//! The structure file is a YAML document describing the Ragic database the
//! client talks to. Ragic addresses data by opaque identifiers, so every
//! human-readable name used in a query is resolved through this file:
//!
//! ```yaml
//! tabs:
//!   PB:
//!     identifier: pb
//!     tables:
//!       Donations:
//!         identifier: 3
//!         columns:
//!           Amount: { fieldId: 1001, type: number }
//!           Name: { fieldId: 1002, type: text }
//! ```
//!
//! Declared order is preserved at every level. The schema is loaded once and
//! is read-only afterwards.

use super::error::{RagicError, Result};
use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::Deserialize;
use std::path::Path;

/// Identifier that may be written as a YAML string or a bare number
#[derive(Debug, Clone, PartialEq, Eq)]
struct Identifier(String);

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Int(i64),
            Uint(u64),
        }

        Ok(Identifier(match Raw::deserialize(deserializer)? {
            Raw::Str(s) => s,
            Raw::Int(i) => i.to_string(),
            Raw::Uint(u) => u.to_string(),
        }))
    }
}

fn identifier<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Identifier::deserialize(deserializer).map(|id| id.0)
}

/// `columns:` with nothing under it reads as an empty map
fn empty_if_null<'de, D, T>(deserializer: D) -> std::result::Result<IndexMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<IndexMap<String, T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Declared column type
///
/// Anything other than `number` is treated as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum ColumnType {
    Number,
    #[default]
    Text,
}

impl From<String> for ColumnType {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("number") {
            ColumnType::Number
        } else {
            ColumnType::Text
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnDef {
    #[serde(rename = "fieldId", deserialize_with = "identifier")]
    pub field_id: String,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableDef {
    #[serde(deserialize_with = "identifier")]
    pub identifier: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub columns: IndexMap<String, ColumnDef>,
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.get(name)
    }

    /// Declared column whose backend field identifier is `field_id`
    pub fn column_by_field_id(&self, field_id: &str) -> Option<(&str, &ColumnDef)> {
        self.columns
            .iter()
            .find(|(_, c)| c.field_id == field_id)
            .map(|(name, c)| (name.as_str(), c))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tab {
    #[serde(deserialize_with = "identifier")]
    pub identifier: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub tables: IndexMap<String, TableDef>,
}

/// Parsed structure file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Schema {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub tabs: IndexMap<String, Tab>,
}

impl Schema {
    /// Load the structure file at `path`
    ///
    /// Fails with `StructureNotFound` when the file is absent and with
    /// `StructureInvalid` when it does not have the expected shape.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RagicError::StructureNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let schema: Schema =
            serde_yaml::from_str(&contents).map_err(|source| RagicError::StructureInvalid {
                path: path.display().to_string(),
                source,
            })?;

        tracing::debug!(
            path = %path.display(),
            tabs = schema.tabs.len(),
            "Loaded structure file"
        );
        Ok(schema)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|source| RagicError::StructureInvalid {
            path: "<inline>".to_string(),
            source,
        })
    }

    pub fn lookup_tab(&self, tab: &str) -> Option<&Tab> {
        self.tabs.get(tab)
    }

    pub fn lookup_table(&self, tab: &str, table: &str) -> Option<&TableDef> {
        self.lookup_tab(tab).and_then(|t| t.tables.get(table))
    }

    pub fn tab(&self, tab: &str) -> Result<&Tab> {
        self.lookup_tab(tab)
            .ok_or_else(|| RagicError::UnknownTab(tab.to_string()))
    }

    pub fn table(&self, tab: &str, table: &str) -> Result<&TableDef> {
        self.tab(tab)?
            .tables
            .get(table)
            .ok_or_else(|| RagicError::UnknownTable {
                tab: tab.to_string(),
                table: table.to_string(),
            })
    }

    /// Tables declared under `tab`
    pub fn tables(&self, tab: &str) -> Result<&IndexMap<String, TableDef>> {
        self.tab(tab).map(|t| &t.tables)
    }

    /// Columns declared for `tab`/`table`
    pub fn columns(&self, tab: &str, table: &str) -> Result<&IndexMap<String, ColumnDef>> {
        self.table(tab, table).map(|t| &t.columns)
    }

    /// Resource path `<tab identifier>/<table identifier>` for a table
    pub fn resource_path(&self, tab: &str, table: &str) -> Result<String> {
        let tab_def = self.tab(tab)?;
        let table_def = self.table(tab, table)?;
        Ok(format!("{}/{}", tab_def.identifier, table_def.identifier))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) const DONATIONS_YAML: &str = r#"
tabs:
  PB:
    identifier: pb
    tables:
      Donations:
        identifier: 3
        columns:
          Amount:
            fieldId: 1001
            type: number
          Name:
            fieldId: "1002"
            type: text
          Date:
            fieldId: "1003"
"#;

    pub(crate) fn donations_schema() -> Schema {
        Schema::from_yaml(DONATIONS_YAML).unwrap()
    }

    #[test]
    fn test_parse_structure() {
        let schema = donations_schema();
        let table = schema.table("PB", "Donations").unwrap();
        assert_eq!(table.identifier, "3");

        let amount = table.column("Amount").unwrap();
        assert_eq!(amount.field_id, "1001");
        assert_eq!(amount.column_type, ColumnType::Number);

        // Missing type defaults to text
        assert_eq!(table.column("Date").unwrap().column_type, ColumnType::Text);
    }

    #[test]
    fn test_declared_order_preserved() {
        let schema = donations_schema();
        let columns = schema.columns("PB", "Donations").unwrap();
        let names: Vec<&str> = columns.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Amount", "Name", "Date"]);
    }

    #[test]
    fn test_table_without_columns() {
        let schema = Schema::from_yaml(
            "tabs:\n  PB:\n    identifier: pb\n    tables:\n      Empty:\n        identifier: 4\n        columns:\n",
        )
        .unwrap();
        assert!(schema.columns("PB", "Empty").unwrap().is_empty());
    }

    #[test]
    fn test_resource_path() {
        let schema = donations_schema();
        assert_eq!(schema.resource_path("PB", "Donations").unwrap(), "pb/3");
    }

    #[test]
    fn test_unknown_tab_and_table() {
        let schema = donations_schema();
        assert!(matches!(schema.tables("XX"), Err(RagicError::UnknownTab(t)) if t == "XX"));
        assert!(matches!(
            schema.columns("PB", "Nope"),
            Err(RagicError::UnknownTable { .. })
        ));
        assert!(schema.lookup_table("PB", "Nope").is_none());
        assert!(schema.lookup_table("PB", "Donations").is_some());
    }

    #[test]
    fn test_column_by_field_id() {
        let schema = donations_schema();
        let table = schema.table("PB", "Donations").unwrap();
        let (name, _) = table.column_by_field_id("1002").unwrap();
        assert_eq!(name, "Name");
        assert!(table.column_by_field_id("9999").is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Schema::load("/definitely/not/here/structure.yaml");
        assert!(matches!(result, Err(RagicError::StructureNotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DONATIONS_YAML.as_bytes()).unwrap();

        let schema = Schema::load(file.path()).unwrap();
        assert!(schema.lookup_tab("PB").is_some());
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"tabs:\n  PB:\n    tables: 12\n").unwrap();

        let result = Schema::load(file.path());
        assert!(matches!(result, Err(RagicError::StructureInvalid { .. })));
    }
}
