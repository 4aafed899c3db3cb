use dbslice_core::{Reference, Table};
use tracing::debug;

use crate::model::SubsetConfig;

/// Merge conditions and virtual references into the catalog tables.
///
/// Entries naming unknown tables are skipped; run validation first to report
/// them.
pub fn apply_config(mut tables: Vec<Table>, config: &SubsetConfig) -> Vec<Table> {
    let mut conditions = 0;
    for entry in &config.tables {
        if let Some(table) = tables.iter_mut().find(|t| t.is(&entry.schema, &entry.table)) {
            table.subset_conditions.extend(entry.conditions.iter().cloned());
            conditions += entry.conditions.len();
        }
    }

    let mut references = 0;
    for entry in &config.virtual_references {
        if let Some(table) = tables.iter_mut().find(|t| t.is(&entry.schema, &entry.table)) {
            for virtual_ref in &entry.references {
                table.references.push(Reference {
                    referenced_schema: virtual_ref.schema.clone(),
                    referenced_name: virtual_ref.name.clone(),
                    keys: virtual_ref.columns.clone(),
                    referenced_keys: Vec::new(),
                    is_nullable: !virtual_ref.not_null,
                    polymorphic_exprs: virtual_ref.polymorphic_exprs.clone(),
                });
                references += 1;
            }
        }
    }

    debug!(event = "config_applied", conditions, virtual_references = references);
    tables
}
