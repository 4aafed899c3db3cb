use dbslice_core::{Dialect, Table};
use tracing::{info, warn};

use crate::condensation::{CondensationGraph, SccId};
use crate::errors::{Result, SubsetError};
use crate::query::{CyclesQueryBuilder, DagQueryBuilder, QueryBuilder};
use crate::report::{ComponentReport, SubsetReport, SubsetSummary, TableQuery};
use crate::subset_graph::SubsetGraph;
use crate::table_graph::TableGraph;

/// Planned subset of one schema: graphs plus one optional query per table.
#[derive(Debug, Clone)]
pub struct Subset {
    dialect: Dialect,
    table_graph: TableGraph,
    condensation: CondensationGraph,
    subset_graphs: Vec<Option<SubsetGraph>>,
    queries: Vec<Option<String>>,
}

impl Subset {
    pub fn new(tables: Vec<Table>, dialect: Dialect) -> Result<Self> {
        let table_graph = TableGraph::build(tables)?;
        let condensation = CondensationGraph::build(&table_graph);

        let mut subset_graphs = Vec::with_capacity(condensation.sccs().len());
        for scc in condensation.sccs() {
            let graph = SubsetGraph::build(scc.id(), &condensation)?;
            subset_graphs.push((!graph.is_empty()).then_some(graph));
        }

        let mut queries = vec![None; table_graph.vertex_count()];
        for graph in subset_graphs.iter().flatten() {
            let built = if graph.has_cycles(&condensation) {
                warn!(event = "cyclic_subset_graph", scc = graph.root());
                CyclesQueryBuilder::new(&table_graph, &condensation, graph).build()?
            } else {
                DagQueryBuilder::new(&table_graph, &condensation, graph, dialect).build()?
            };
            for (table, sql) in built {
                queries[table] = Some(sql);
            }
        }

        info!(
            event = "subset_planned",
            dialect = %dialect,
            tables = table_graph.vertex_count(),
            components = condensation.sccs().len(),
            planned_tables = queries.iter().filter(|q| q.is_some()).count()
        );

        Ok(Self {
            dialect,
            table_graph,
            condensation,
            subset_graphs,
            queries,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn table_graph(&self) -> &TableGraph {
        &self.table_graph
    }

    pub fn condensation(&self) -> &CondensationGraph {
        &self.condensation
    }

    /// Subset graph rooted at `scc`, if the component depends on any condition.
    pub fn subset_graph(&self, scc: SccId) -> Option<&SubsetGraph> {
        self.subset_graphs.get(scc).and_then(Option::as_ref)
    }

    /// Queries indexed by table id; `None` exports the whole table.
    pub fn table_queries(&self) -> &[Option<String>] {
        &self.queries
    }

    pub fn query_for(&self, schema: &str, name: &str) -> Option<&str> {
        let table = self.table_graph.find(schema, name)?;
        self.queries[table].as_deref()
    }

    /// Table ids with referenced tables before the tables referencing them.
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        let cyclic: Vec<String> = self
            .condensation
            .sccs()
            .iter()
            .filter(|scc| scc.has_cycle())
            .flat_map(|scc| scc.tables())
            .map(|&t| self.table_graph.table(t).full_name())
            .collect();
        if !cyclic.is_empty() {
            return Err(SubsetError::TableGraphHasCycles { tables: cyclic });
        }
        Ok(self
            .condensation
            .sccs()
            .iter()
            .rev()
            .map(|scc| scc.single_table())
            .collect())
    }

    /// Every elementary cycle as a closed list of table names.
    pub fn cycled_tables(&self) -> Vec<Vec<String>> {
        self.condensation
            .sccs()
            .iter()
            .flat_map(|scc| scc.cycles().cycles())
            .map(|cycle| self.cycle_names(cycle))
            .collect()
    }

    fn cycle_names(&self, cycle: &[usize]) -> Vec<String> {
        let mut names: Vec<String> = cycle
            .iter()
            .map(|&e| {
                let edge = self.table_graph.edge(e);
                self.table_graph.table(edge.from.table).full_name()
            })
            .collect();
        if let Some(first) = names.first().cloned() {
            names.push(first);
        }
        names
    }

    pub fn report(&self) -> SubsetReport {
        let names = |tables: &[usize]| -> Vec<String> {
            tables
                .iter()
                .map(|&t| self.table_graph.table(t).full_name())
                .collect()
        };
        let components: Vec<ComponentReport> = self
            .condensation
            .sccs()
            .iter()
            .map(|scc| ComponentReport {
                id: scc.id(),
                tables: names(scc.tables()),
                cyclic: scc.has_cycle(),
                cycles: scc
                    .cycles()
                    .cycles()
                    .iter()
                    .map(|cycle| self.cycle_names(cycle))
                    .collect(),
            })
            .collect();
        let queries: Vec<TableQuery> = self
            .table_graph
            .tables()
            .iter()
            .zip(&self.queries)
            .map(|(table, query)| TableQuery {
                schema: table.schema.clone(),
                table: table.name.clone(),
                query: query.clone(),
            })
            .collect();
        let restore_order = self.topological_order().ok().map(|order| names(&order));

        SubsetReport {
            dialect: self.dialect,
            summary: SubsetSummary {
                tables: self.table_graph.vertex_count(),
                edges: self.table_graph.edges().len(),
                components: components.len(),
                cyclic_components: components.iter().filter(|c| c.cyclic).count(),
                planned_tables: queries.iter().filter(|q| q.query.is_some()).count(),
            },
            components,
            queries,
            restore_order,
        }
    }
}
