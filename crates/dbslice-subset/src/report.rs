use dbslice_core::Dialect;
use serde::{Deserialize, Serialize};

/// Counts describing a planned subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetSummary {
    pub tables: usize,
    pub edges: usize,
    pub components: usize,
    pub cyclic_components: usize,
    /// Tables exported through a subset query rather than in full.
    pub planned_tables: usize,
}

/// One strongly connected component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentReport {
    pub id: usize,
    pub tables: Vec<String>,
    pub cyclic: bool,
    /// Each cycle as a closed list of table names.
    pub cycles: Vec<Vec<String>>,
}

/// Subset query of one table; `None` exports every row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQuery {
    pub schema: String,
    pub table: String,
    pub query: Option<String>,
}

/// Serializable view of a planned subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetReport {
    pub dialect: Dialect,
    pub summary: SubsetSummary,
    pub components: Vec<ComponentReport>,
    pub queries: Vec<TableQuery>,
    /// Parents-first table order; absent when the schema has cycles.
    pub restore_order: Option<Vec<String>>,
}
