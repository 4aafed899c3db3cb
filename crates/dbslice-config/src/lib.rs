//! Subset configuration contracts and validation.
//!
//! A config names subset conditions per table and declares virtual
//! references. It is validated structurally with JSON Schema, then against
//! the catalog tables, and finally merged into them with [`apply_config`].

pub mod apply;
pub mod errors;
pub mod load;
pub mod model;
pub mod schema;
pub mod validate;

pub use apply::apply_config;
pub use errors::{ConfigError, IssueSeverity, Result, ValidationIssue, ValidationReport};
pub use load::load_config_value;
pub use model::{
    CONFIG_VERSION, SubsetConfig, TableConditions, VirtualReference, VirtualReferences,
};
pub use schema::config_json_schema;
pub use validate::{
    ValidatedConfig, validate_config, validate_config_against_tables, validate_config_json,
};
