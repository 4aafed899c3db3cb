use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::table::{Reference, Table};

/// Introspected catalog snapshot of a source database.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogSnapshot {
    /// Contract version for this snapshot format.
    #[serde(default = "default_catalog_version")]
    pub catalog_version: String,
    /// Database engine identifier (e.g. `postgres`).
    pub engine: String,
    /// Database name when available.
    #[serde(default)]
    pub database: Option<String>,
    /// Schemas captured from the database.
    pub schemas: Vec<CatalogSchema>,
}

/// A namespace containing tables.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogSchema {
    pub name: String,
    pub tables: Vec<CatalogTable>,
}

/// A table with the metadata the subset engine needs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogTable {
    pub name: String,
    pub columns: Vec<CatalogColumn>,
    #[serde(default)]
    pub primary_key: Option<PrimaryKey>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

/// Column name and nullability.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogColumn {
    pub name: String,
    #[serde(default)]
    pub is_nullable: bool,
}

/// Primary key definition preserving column order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PrimaryKey {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Foreign key definition preserving column ordering.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKey {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

fn default_catalog_version() -> String {
    crate::CATALOG_VERSION.to_string()
}

impl CatalogSnapshot {
    /// Dialect matching the snapshot engine.
    pub fn dialect(&self) -> Result<Dialect> {
        self.engine.parse()
    }

    /// Convert the snapshot into subset engine tables, in snapshot order.
    ///
    /// A reference is nullable when any of its columns is nullable. Explicit
    /// parent keys are only kept when the foreign key does not target the
    /// referenced primary key.
    pub fn into_tables(self) -> Result<Vec<Table>> {
        let mut primary_keys: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
        for schema in &self.schemas {
            for table in &schema.tables {
                let pk = table
                    .primary_key
                    .as_ref()
                    .map(|pk| pk.columns.clone())
                    .unwrap_or_default();
                primary_keys.insert((schema.name.clone(), table.name.clone()), pk);
            }
        }

        let mut tables = Vec::new();
        for schema in self.schemas {
            for table in schema.tables {
                let mut converted = Table::new(
                    schema.name.clone(),
                    table.name.clone(),
                    table
                        .primary_key
                        .map(|pk| pk.columns)
                        .unwrap_or_default(),
                );

                for fk in table.foreign_keys {
                    let mut is_nullable = false;
                    for column in &fk.columns {
                        let found = table
                            .columns
                            .iter()
                            .find(|c| &c.name == column)
                            .ok_or_else(|| {
                                Error::InvalidSchema(format!(
                                    "foreign key column not found: {}.{}.{}",
                                    schema.name, table.name, column
                                ))
                            })?;
                        is_nullable |= found.is_nullable;
                    }

                    let mut reference = Reference::new(
                        fk.referenced_schema.clone(),
                        fk.referenced_table.clone(),
                        fk.columns,
                        is_nullable,
                    );
                    let target_pk = primary_keys
                        .get(&(fk.referenced_schema, fk.referenced_table))
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    if !fk.referenced_columns.is_empty() && fk.referenced_columns != target_pk {
                        reference = reference.with_referenced_keys(fk.referenced_columns);
                    }
                    converted.references.push(reference);
                }

                tables.push(converted);
            }
        }

        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, is_nullable: bool) -> CatalogColumn {
        CatalogColumn {
            name: name.to_string(),
            is_nullable,
        }
    }

    fn snapshot(fk_columns: Vec<CatalogColumn>, referenced_columns: &[&str]) -> CatalogSnapshot {
        CatalogSnapshot {
            catalog_version: "0.1".to_string(),
            engine: "postgres".to_string(),
            database: None,
            schemas: vec![CatalogSchema {
                name: "public".to_string(),
                tables: vec![
                    CatalogTable {
                        name: "users".to_string(),
                        columns: vec![column("id", false), column("email", false)],
                        primary_key: Some(PrimaryKey {
                            name: None,
                            columns: vec!["id".to_string()],
                        }),
                        foreign_keys: Vec::new(),
                    },
                    CatalogTable {
                        name: "orders".to_string(),
                        columns: fk_columns,
                        primary_key: Some(PrimaryKey {
                            name: None,
                            columns: vec!["id".to_string()],
                        }),
                        foreign_keys: vec![ForeignKey {
                            name: Some("orders_user_fk".to_string()),
                            columns: vec!["user_ref".to_string()],
                            referenced_schema: "public".to_string(),
                            referenced_table: "users".to_string(),
                            referenced_columns: referenced_columns
                                .iter()
                                .map(|c| c.to_string())
                                .collect(),
                        }],
                    },
                ],
            }],
        }
    }

    #[test]
    fn nullability_follows_fk_columns() {
        let tables = snapshot(vec![column("id", false), column("user_ref", true)], &["id"])
            .into_tables()
            .expect("convert snapshot");
        assert_eq!(tables.len(), 2);
        let reference = &tables[1].references[0];
        assert!(reference.is_nullable);
        assert!(reference.referenced_keys.is_empty());
    }

    #[test]
    fn unique_targets_keep_referenced_columns() {
        let tables = snapshot(vec![column("id", false), column("user_ref", false)], &["email"])
            .into_tables()
            .expect("convert snapshot");
        let reference = &tables[1].references[0];
        assert!(!reference.is_nullable);
        assert_eq!(reference.referenced_keys, vec!["email".to_string()]);
    }

    #[test]
    fn missing_fk_column_is_invalid() {
        let err = snapshot(vec![column("id", false)], &["id"])
            .into_tables()
            .expect_err("missing column must fail");
        assert!(err.to_string().contains("public.orders.user_ref"));
    }
}
