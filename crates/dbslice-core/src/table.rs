use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A table as seen by the subset engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    /// Position in the table graph arena, assigned when the graph is built.
    #[serde(default)]
    pub id: usize,
    pub schema: String,
    pub name: String,
    /// Primary key columns in key order.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Outgoing foreign key declarations.
    #[serde(default)]
    pub references: Vec<Reference>,
    /// Raw SQL predicates, ANDed together, referencing the unaliased table.
    #[serde(default)]
    pub subset_conditions: Vec<String>,
}

impl Table {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        primary_key: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: 0,
            schema: schema.into(),
            name: name.into(),
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            references: Vec::new(),
            subset_conditions: Vec::new(),
        }
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn with_subset_condition(mut self, condition: impl Into<String>) -> Self {
        self.subset_conditions.push(condition.into());
        self
    }

    pub fn has_subset_conditions(&self) -> bool {
        !self.subset_conditions.is_empty()
    }

    /// Unquoted `schema.name`, or just `name` when the schema is empty.
    pub fn full_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }

    pub fn is(&self, schema: &str, name: &str) -> bool {
        self.schema == schema && self.name == name
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// A foreign key (or virtual reference) from one table to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Reference {
    pub referenced_schema: String,
    pub referenced_name: String,
    /// Child-side keys, positionally paired with the parent keys.
    pub keys: Vec<Key>,
    /// Parent-side columns; empty means the referenced primary key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_keys: Vec<String>,
    /// True if any child-side column may be NULL.
    #[serde(default)]
    pub is_nullable: bool,
    /// Predicates over the child table that must hold for the reference to apply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polymorphic_exprs: Vec<String>,
}

impl Reference {
    pub fn new(
        referenced_schema: impl Into<String>,
        referenced_name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
        is_nullable: bool,
    ) -> Self {
        Self {
            referenced_schema: referenced_schema.into(),
            referenced_name: referenced_name.into(),
            keys: columns.into_iter().map(|c| Key::Column(c.into())).collect(),
            referenced_keys: Vec::new(),
            is_nullable,
            polymorphic_exprs: Vec::new(),
        }
    }

    pub fn with_referenced_keys(
        mut self,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.referenced_keys = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_polymorphic_expr(mut self, expr: impl Into<String>) -> Self {
        self.polymorphic_exprs.push(expr.into());
        self
    }

    pub fn targets(&self, schema: &str, name: &str) -> bool {
        self.referenced_schema == schema && self.referenced_name == name
    }
}

/// One side of a join key: a plain column or a raw SQL expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Key {
    Column(String),
    Expression { expression: String },
}

impl Key {
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    pub fn expression(expr: impl Into<String>) -> Self {
        Self::Expression {
            expression: expr.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Key::Column(name) => name.trim().is_empty(),
            Key::Expression { expression } => expression.trim().is_empty(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Column(name) => f.write_str(name),
            Key::Expression { expression } => write!(f, "({expression})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_omits_empty_schema() {
        assert_eq!(Table::new("public", "orders", ["id"]).full_name(), "public.orders");
        assert_eq!(Table::new("", "orders", ["id"]).full_name(), "orders");
    }

    #[test]
    fn keys_deserialize_from_plain_strings_and_objects() {
        let keys: Vec<Key> =
            serde_json::from_str(r#"["user_id", {"expression": "lower(email)"}]"#)
                .expect("parse keys");
        assert_eq!(
            keys,
            vec![Key::column("user_id"), Key::expression("lower(email)")]
        );
    }

    #[test]
    fn reference_defaults_optional_fields() {
        let reference: Reference = serde_json::from_str(
            r#"{"referenced_schema": "public", "referenced_name": "users", "keys": ["user_id"]}"#,
        )
        .expect("parse reference");
        assert!(!reference.is_nullable);
        assert!(reference.referenced_keys.is_empty());
        assert!(reference.polymorphic_exprs.is_empty());
        assert!(reference.targets("public", "users"));
    }
}
