use std::collections::HashMap;

use dbslice_core::{Key, Table, validate_tables};
use tracing::debug;

use crate::errors::{Result, SubsetError};

/// Index of an edge in the table graph edge arena.
pub type EdgeId = usize;

/// One endpoint of an edge: a table and the keys used on this edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLink {
    pub table: usize,
    pub keys: Vec<Key>,
    pub polymorphic_exprs: Vec<String>,
}

/// A reference from a child table (`from`) to its parent (`to`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub is_nullable: bool,
    pub from: TableLink,
    pub to: TableLink,
}

impl Edge {
    /// True when rows of the child may legitimately lack a parent.
    pub fn is_optional(&self) -> bool {
        self.is_nullable || !self.from.polymorphic_exprs.is_empty()
    }
}

/// Directed graph of tables with one edge per declared reference.
///
/// Tables and edges live in two arenas; adjacency lists hold edge ids. The
/// transposed adjacency lists each edge under its parent table.
#[derive(Debug, Clone)]
pub struct TableGraph {
    tables: Vec<Table>,
    edges: Vec<Edge>,
    graph: Vec<Vec<EdgeId>>,
    transposed: Vec<Vec<EdgeId>>,
}

impl TableGraph {
    pub fn build(mut tables: Vec<Table>) -> Result<Self> {
        validate_tables(&tables)?;
        for (idx, table) in tables.iter_mut().enumerate() {
            table.id = idx;
        }

        let index: HashMap<(&str, &str), usize> = tables
            .iter()
            .map(|t| ((t.schema.as_str(), t.name.as_str()), t.id))
            .collect();

        let mut edges = Vec::new();
        let mut graph = vec![Vec::new(); tables.len()];
        let mut transposed = vec![Vec::new(); tables.len()];

        for table in &tables {
            for reference in &table.references {
                let target = *index
                    .get(&(
                        reference.referenced_schema.as_str(),
                        reference.referenced_name.as_str(),
                    ))
                    .ok_or_else(|| SubsetError::ReferenceTableNotFound {
                        table: table.full_name(),
                        referenced: format!(
                            "{}.{}",
                            reference.referenced_schema, reference.referenced_name
                        ),
                    })?;
                let parent = &tables[target];

                let parent_keys = if reference.referenced_keys.is_empty() {
                    &parent.primary_key
                } else {
                    &reference.referenced_keys
                };
                if parent_keys.len() != reference.keys.len() {
                    return Err(SubsetError::KeyCountMismatch {
                        table: table.full_name(),
                        referenced: parent.full_name(),
                        keys: reference.keys.len(),
                        target_keys: parent_keys.len(),
                    });
                }

                let id = edges.len();
                edges.push(Edge {
                    id,
                    is_nullable: reference.is_nullable,
                    from: TableLink {
                        table: table.id,
                        keys: reference.keys.clone(),
                        polymorphic_exprs: reference.polymorphic_exprs.clone(),
                    },
                    to: TableLink {
                        table: target,
                        keys: parent_keys.iter().cloned().map(Key::Column).collect(),
                        polymorphic_exprs: Vec::new(),
                    },
                });
                graph[table.id].push(id);
                transposed[target].push(id);
            }
        }

        debug!(
            event = "table_graph_built",
            tables = tables.len(),
            edges = edges.len()
        );

        Ok(Self {
            tables,
            edges,
            graph,
            transposed,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.tables.len()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, idx: usize) -> &Table {
        &self.tables[idx]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    pub fn find(&self, schema: &str, name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.is(schema, name))
    }

    /// Edges from `table` to the tables it references, in declaration order.
    pub fn outgoing(&self, table: usize) -> impl Iterator<Item = &Edge> + '_ {
        self.graph[table].iter().map(|&id| &self.edges[id])
    }

    /// Edges pointing at `table`, in edge id order.
    pub fn incoming(&self, table: usize) -> impl Iterator<Item = &Edge> + '_ {
        self.transposed[table].iter().map(|&id| &self.edges[id])
    }

    pub(crate) fn outgoing_ids(&self, table: usize) -> &[EdgeId] {
        &self.graph[table]
    }

    pub(crate) fn incoming_ids(&self, table: usize) -> &[EdgeId] {
        &self.transposed[table]
    }
}
