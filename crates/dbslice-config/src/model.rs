use dbslice_core::{Dialect, Key};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Contract version accepted by this crate.
pub const CONFIG_VERSION: &str = "0.1";

/// Subset configuration: row filters and extra references for one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubsetConfig {
    /// Contract version for the config format.
    pub config_version: String,
    /// Dialect override; defaults to the catalog engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
    /// Subset conditions per table.
    #[serde(default)]
    pub tables: Vec<TableConditions>,
    /// References that are not declared as foreign keys in the database.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_references: Vec<VirtualReferences>,
}

/// Row filters for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableConditions {
    pub schema: String,
    pub table: String,
    /// Raw SQL predicates over the unaliased table, ANDed together.
    #[serde(default)]
    pub conditions: Vec<String>,
}

/// Virtual references declared on one referencing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VirtualReferences {
    pub schema: String,
    pub table: String,
    pub references: Vec<VirtualReference>,
}

/// A reference to the primary key of another table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VirtualReference {
    /// Schema of the referenced table.
    pub schema: String,
    /// Name of the referenced table.
    pub name: String,
    /// Referencing columns or expressions, paired with the target primary key.
    pub columns: Vec<Key>,
    /// Every referencing row has a parent.
    #[serde(default)]
    pub not_null: bool,
    /// Predicates that select the rows this reference applies to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polymorphic_exprs: Vec<String>,
}
