//! Core contracts and helpers for dbslice.
//!
//! This crate defines the table model consumed by the subset engine, the
//! catalog snapshot it is usually derived from, SQL dialect quoting, and
//! validation helpers shared across the workspace.

pub mod catalog;
pub mod dialect;
pub mod error;
pub mod table;
pub mod validation;

pub use catalog::{
    CatalogColumn, CatalogSchema, CatalogSnapshot, CatalogTable, ForeignKey, PrimaryKey,
};
pub use dialect::{Dialect, Quoting};
pub use error::{Error, Result};
pub use table::{Key, Reference, Table};
pub use validation::validate_tables;

/// Current contract version for catalog snapshots.
pub const CATALOG_VERSION: &str = "0.1";
