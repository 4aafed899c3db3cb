use std::collections::{BTreeMap, HashMap};

use dbslice_core::{Dialect, Key, Quoting, Table};
use tracing::debug;

use super::{AliasRewriter, JoinKind, QueryBuilder, SelectQuery, and_group, or_group};
use crate::condensation::{CondensationGraph, SccId};
use crate::errors::Result;
use crate::subset_graph::SubsetGraph;
use crate::table_graph::{Edge, TableGraph};

/// Query builder for subset graphs made of single-table components.
///
/// Every edge becomes a join from the referencing table to the referenced
/// one. A table joined more than once gets a fresh `schema_table__N` alias per
/// occurrence; aliases stay in scope for the subtree below their join only.
pub struct DagQueryBuilder<'a> {
    table_graph: &'a TableGraph,
    condensation: &'a CondensationGraph,
    subset: &'a SubsetGraph,
    quoting: Quoting,
}

impl<'a> DagQueryBuilder<'a> {
    pub fn new(
        table_graph: &'a TableGraph,
        condensation: &'a CondensationGraph,
        subset: &'a SubsetGraph,
        dialect: Dialect,
    ) -> Self {
        Self {
            table_graph,
            condensation,
            subset,
            quoting: dialect.quoting(),
        }
    }

    fn table_of(&self, scc: SccId) -> &'a Table {
        self.table_graph
            .table(self.condensation.scc(scc).single_table())
    }

    /// How many times each table will be joined below the root.
    fn join_counts(&self, scc: SccId, counts: &mut HashMap<usize, usize>) {
        for &id in self.subset.edges_from(scc) {
            let edge = self.condensation.edge(id);
            *counts.entry(self.table_of(edge.to).id).or_default() += 1;
            self.join_counts(edge.to, counts);
        }
    }

    fn emit_joins(
        &self,
        scc: SccId,
        inherited_optional: bool,
        query: &mut SelectQuery,
        scope: &mut AliasScope,
    ) -> Result<()> {
        for &id in self.subset.edges_from(scc) {
            let condensed = self.condensation.edge(id);
            let edge = self.table_graph.edge(condensed.original);
            let left = self.table_graph.table(edge.from.table);
            let right = self.table_of(condensed.to);
            let optional = inherited_optional || edge.is_optional();

            let left_keys = self.render_keys(left, &edge.from.keys, scope)?;
            let polymorphic = edge
                .from
                .polymorphic_exprs
                .iter()
                .map(|expr| scope.rewrite(self.quoting, left, expr))
                .collect::<Result<Vec<_>>>()?;

            let alias = scope.next_alias(right);
            let previous = scope.enter(right.id, alias.clone());
            let right_keys = self.render_keys(right, &edge.to.keys, scope)?;

            let kind = if optional {
                JoinKind::Left
            } else {
                JoinKind::Inner
            };
            query.join(
                kind,
                self.join_target(right, alias.as_deref()),
                on_clause(edge, &left_keys, &right_keys, &polymorphic),
            );

            if right.has_subset_conditions() {
                let conditions = right
                    .subset_conditions
                    .iter()
                    .map(|condition| scope.rewrite(self.quoting, right, condition))
                    .collect::<Result<Vec<_>>>()?;
                if optional {
                    query.push_condition(null_guarded(&left_keys, &polymorphic, &conditions));
                } else {
                    query.push_condition(and_group(&conditions));
                }
            }

            self.emit_joins(condensed.to, optional, query, scope)?;
            scope.leave(right.id, previous);
        }
        Ok(())
    }

    fn join_target(&self, table: &Table, alias: Option<&str>) -> String {
        let target = self.quoting.table(&table.schema, &table.name);
        match alias {
            Some(alias) => format!("{target} AS {}", self.quoting.ident(alias)),
            None => target,
        }
    }

    fn render_keys(&self, table: &Table, keys: &[Key], scope: &AliasScope) -> Result<Vec<String>> {
        let qualifier = scope.qualifier(self.quoting, table);
        keys.iter()
            .map(|key| match key {
                Key::Column(column) => Ok(self.quoting.column(&qualifier, column)),
                Key::Expression { expression } => Ok(format!(
                    "({})",
                    scope.rewrite(self.quoting, table, expression)?
                )),
            })
            .collect()
    }
}

impl QueryBuilder for DagQueryBuilder<'_> {
    fn build(&self) -> Result<BTreeMap<usize, String>> {
        let root = self.table_of(self.subset.root());
        let mut query = SelectQuery::new(self.quoting.table(&root.schema, &root.name));
        if root.has_subset_conditions() {
            query.push_condition(and_group(&root.subset_conditions));
        }

        let mut counts = HashMap::new();
        self.join_counts(self.subset.root(), &mut counts);
        let mut scope = AliasScope::new(counts);
        self.emit_joins(self.subset.root(), false, &mut query, &mut scope)?;

        let sql = query.render();
        debug!(event = "subset_query_built", table = %root, joins = scope.joined);
        Ok(BTreeMap::from([(root.id, sql)]))
    }
}

fn on_clause(
    edge: &Edge,
    left_keys: &[String],
    right_keys: &[String],
    polymorphic: &[String],
) -> String {
    assert_eq!(
        left_keys.len(),
        right_keys.len(),
        "edge {} pairs {} key(s) with {}",
        edge.id,
        left_keys.len(),
        right_keys.len()
    );
    let mut on: Vec<String> = left_keys
        .iter()
        .zip(right_keys)
        .map(|(left, right)| format!("{left} = {right}"))
        .collect();
    on.extend(polymorphic.iter().map(|expr| format!("({expr})")));
    on.join(" AND ")
}

/// `((fk IS NULL) [OR NOT (poly)] OR (conditions))`
fn null_guarded(left_keys: &[String], polymorphic: &[String], conditions: &[String]) -> String {
    let nulls: Vec<String> = left_keys.iter().map(|key| format!("{key} IS NULL")).collect();
    let mut guard = vec![or_group(&nulls)];
    if !polymorphic.is_empty() {
        guard.push(format!("NOT {}", and_group(polymorphic)));
    }
    guard.push(and_group(conditions));
    or_group(&guard)
}

/// Aliases in scope along the current join path.
struct AliasScope {
    counts: HashMap<usize, usize>,
    sequences: HashMap<usize, usize>,
    aliases: HashMap<usize, String>,
    joined: usize,
}

impl AliasScope {
    fn new(counts: HashMap<usize, usize>) -> Self {
        Self {
            counts,
            sequences: HashMap::new(),
            aliases: HashMap::new(),
            joined: 0,
        }
    }

    /// Alias for the next join of `table`, if it is joined more than once.
    fn next_alias(&mut self, table: &Table) -> Option<String> {
        self.joined += 1;
        if self.counts.get(&table.id).copied().unwrap_or_default() < 2 {
            return None;
        }
        let sequence = self.sequences.entry(table.id).or_default();
        let prefix = if table.schema.is_empty() {
            table.name.clone()
        } else {
            format!("{}_{}", table.schema, table.name)
        };
        let alias = format!("{prefix}__{sequence}");
        *sequence += 1;
        Some(alias)
    }

    fn enter(&mut self, table: usize, alias: Option<String>) -> Option<String> {
        match alias {
            Some(alias) => self.aliases.insert(table, alias),
            None => self.aliases.remove(&table),
        }
    }

    fn leave(&mut self, table: usize, previous: Option<String>) {
        match previous {
            Some(alias) => {
                self.aliases.insert(table, alias);
            }
            None => {
                self.aliases.remove(&table);
            }
        }
    }

    fn qualifier(&self, quoting: Quoting, table: &Table) -> String {
        match self.aliases.get(&table.id) {
            Some(alias) => quoting.ident(alias),
            None => quoting.table(&table.schema, &table.name),
        }
    }

    fn rewrite(&self, quoting: Quoting, table: &Table, text: &str) -> Result<String> {
        match self.aliases.get(&table.id) {
            Some(alias) => Ok(AliasRewriter::new(quoting, table, alias)?.rewrite(text)),
            None => Ok(text.to_string()),
        }
    }
}
