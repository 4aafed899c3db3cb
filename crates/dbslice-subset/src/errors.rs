use thiserror::Error;

/// Tables and cycle groups of one cyclic component touched by a subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclicComponent {
    pub scc: usize,
    pub tables: Vec<String>,
    pub cycle_groups: usize,
}

/// Errors raised while planning subset queries.
#[derive(Debug, Error)]
pub enum SubsetError {
    #[error("core error: {0}")]
    Core(#[from] dbslice_core::Error),
    #[error("table {table} references {referenced} which is not in the schema")]
    ReferenceTableNotFound { table: String, referenced: String },
    #[error(
        "reference from {table} to {referenced} has {keys} key(s) but the target has {target_keys}"
    )]
    KeyCountMismatch {
        table: String,
        referenced: String,
        keys: usize,
        target_keys: usize,
    },
    #[error("edge {edge} is already present under component {scc}")]
    EdgeIsNotUnique { edge: usize, scc: usize },
    #[error("subset of {root} touches cyclic components: {}", describe(.components))]
    CyclicSubsetNotSupported {
        root: String,
        components: Vec<CyclicComponent>,
    },
    #[error("table graph has cycles: {}", .tables.join(", "))]
    TableGraphHasCycles { tables: Vec<String> },
    #[error("invalid alias pattern: {0}")]
    Regex(#[from] regex::Error),
}

fn describe(components: &[CyclicComponent]) -> String {
    components
        .iter()
        .map(|c| {
            format!(
                "#{} [{}] ({} cycle group(s))",
                c.scc,
                c.tables.join(", "),
                c.cycle_groups
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for subset planning.
pub type Result<T> = std::result::Result<T, SubsetError>;
