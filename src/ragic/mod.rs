//! Ragic HTTP client module
//!
//! Everything that knows about the Ragic backend lives here.
//!
//! Structure:
//! - `schema.rs`: structure file loading and name → identifier lookup
//! - `query.rs`: filter/ordering compilation into Ragic's query grammar
//! - `client.rs`: authenticated page requests
//! - `session.rs`: single active query on top of the client
//! - `data.rs`: raw listing payloads
//! - `normalize.rs`: listing payloads → typed DataFrames
//! - `pages.rs`: pagination loop and page stacking
//! - `export.rs`: CSV / JSON output
//! - `error.rs`: error types

pub mod client;
pub mod data;
pub mod error;
pub mod export;
pub mod normalize;
pub mod pages;
pub mod query;
pub mod schema;
pub mod session;

// Re-exports for convenience
pub use client::{Page, RagicClient};
pub use data::{RawRecordSet, Record};
pub use error::{RagicError, Result};
pub use export::ExportFormat;
pub use normalize::{coerce_columns, normalize, ColumnPolicy, INDEX_COLUMN, MISSING_TEXT};
pub use pages::{concat_pages, fetch_all, PageOptions};
pub use query::{
    compile_filters, Condition, Direction, FilterValue, Operator, Ordering, QueryDescriptor,
    QueryOptions,
};
pub use schema::{ColumnDef, ColumnType, Schema, TableDef};
pub use session::QuerySession;
