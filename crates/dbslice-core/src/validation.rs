use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::table::Table;

/// Validate internal consistency of a table list before graph construction.
///
/// This checks:
/// - empty or duplicate table identities
/// - references with an empty or blank key list
/// - blank subset conditions
///
/// Reference targets are resolved by the table graph itself.
pub fn validate_tables(tables: &[Table]) -> Result<()> {
    let mut seen = BTreeSet::new();

    for table in tables {
        if table.name.trim().is_empty() {
            return Err(Error::InvalidSchema(format!(
                "table name is empty in schema '{}'",
                table.schema
            )));
        }

        if !seen.insert((table.schema.as_str(), table.name.as_str())) {
            return Err(Error::InvalidSchema(format!(
                "duplicate table name: {}",
                table.full_name()
            )));
        }

        for reference in &table.references {
            if reference.keys.is_empty() || reference.keys.iter().any(|key| key.is_blank()) {
                return Err(Error::InvalidSchema(format!(
                    "reference from {} to {}.{} has an empty key",
                    table.full_name(),
                    reference.referenced_schema,
                    reference.referenced_name
                )));
            }
        }

        if table
            .subset_conditions
            .iter()
            .any(|condition| condition.trim().is_empty())
        {
            return Err(Error::InvalidSchema(format!(
                "blank subset condition on {}",
                table.full_name()
            )));
        }
    }

    Ok(())
}
