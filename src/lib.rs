//! Ragic Extract Library
//!
//! Schema-driven extraction of tables from a Ragic hosted database into
//! Polars DataFrames. Used by the `ragic-extract` binary.

pub mod config;
pub mod ragic;
