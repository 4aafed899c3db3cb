use std::collections::BTreeMap;

use tracing::warn;

use super::QueryBuilder;
use crate::condensation::CondensationGraph;
use crate::errors::{CyclicComponent, Result, SubsetError};
use crate::subset_graph::SubsetGraph;
use crate::table_graph::TableGraph;

/// Query builder for subset graphs that touch cyclic components.
///
/// Rows of a cyclic component can only be validated by walking the cycle
/// (recursive CTE), which is not emitted yet. The builder reports every cyclic
/// component the subset depends on instead of producing a query that would
/// silently break referential integrity.
pub struct CyclesQueryBuilder<'a> {
    table_graph: &'a TableGraph,
    condensation: &'a CondensationGraph,
    subset: &'a SubsetGraph,
}

impl<'a> CyclesQueryBuilder<'a> {
    pub fn new(
        table_graph: &'a TableGraph,
        condensation: &'a CondensationGraph,
        subset: &'a SubsetGraph,
    ) -> Self {
        Self {
            table_graph,
            condensation,
            subset,
        }
    }

    fn table_names(&self, tables: &[usize]) -> Vec<String> {
        tables
            .iter()
            .map(|&t| self.table_graph.table(t).full_name())
            .collect()
    }
}

impl QueryBuilder for CyclesQueryBuilder<'_> {
    fn build(&self) -> Result<BTreeMap<usize, String>> {
        let root = self
            .table_names(self.condensation.scc(self.subset.root()).tables())
            .join(", ");
        let components: Vec<CyclicComponent> = self
            .subset
            .vertexes()
            .iter()
            .map(|&id| self.condensation.scc(id))
            .filter(|scc| scc.has_cycle())
            .map(|scc| CyclicComponent {
                scc: scc.id(),
                tables: self.table_names(scc.tables()),
                cycle_groups: scc.cycles().cycles_group_count(),
            })
            .collect();

        warn!(
            event = "cyclic_subset_unsupported",
            root = %root,
            components = components.len()
        );
        Err(SubsetError::CyclicSubsetNotSupported { root, components })
    }
}
