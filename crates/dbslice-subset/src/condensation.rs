use std::collections::BTreeMap;

use tracing::debug;

use crate::cycles::CyclesGraph;
use crate::table_graph::{EdgeId, TableGraph};

/// Index of a component in the condensation graph.
pub type SccId = usize;

/// A strongly connected component of the table graph.
#[derive(Debug, Clone)]
pub struct Scc {
    id: SccId,
    tables: Vec<usize>,
    graph: BTreeMap<usize, Vec<EdgeId>>,
    cycles: CyclesGraph,
    has_subset_conditions: bool,
}

impl Scc {
    pub fn id(&self) -> SccId {
        self.id
    }

    /// Table ids in ascending order.
    pub fn tables(&self) -> &[usize] {
        &self.tables
    }

    /// Internal adjacency: every member table to its edges inside the component.
    pub fn internal_edges(&self) -> &BTreeMap<usize, Vec<EdgeId>> {
        &self.graph
    }

    pub fn cycles(&self) -> &CyclesGraph {
        &self.cycles
    }

    pub fn has_cycle(&self) -> bool {
        self.cycles.has_cycle()
    }

    pub fn has_subset_conditions(&self) -> bool {
        self.has_subset_conditions
    }

    /// The only table of an acyclic component.
    ///
    /// # Panics
    ///
    /// Panics if the component does not hold exactly one table.
    pub fn single_table(&self) -> usize {
        match self.tables.as_slice() {
            [table] => *table,
            tables => panic!(
                "component {} must contain exactly one table, got {}",
                self.id,
                tables.len()
            ),
        }
    }
}

/// Edge between two components, induced by one table graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CondensedEdge {
    pub id: usize,
    pub from: SccId,
    pub to: SccId,
    pub original: EdgeId,
}

/// DAG of strongly connected components (Kosaraju).
///
/// Components are numbered in topological order, so every condensed edge
/// goes from a lower to a higher component id.
#[derive(Debug, Clone)]
pub struct CondensationGraph {
    sccs: Vec<Scc>,
    component_of: Vec<SccId>,
    edges: Vec<CondensedEdge>,
    graph: Vec<Vec<usize>>,
    transposed: Vec<Vec<usize>>,
}

impl CondensationGraph {
    pub fn build(table_graph: &TableGraph) -> Self {
        let order = finishing_order(table_graph);
        let (component_of, count) = mark_components(table_graph, &order);

        let mut members = vec![Vec::new(); count];
        for (table, &component) in component_of.iter().enumerate() {
            members[component].push(table);
        }

        let mut condensed = vec![false; table_graph.edges().len()];
        let mut sccs = Vec::with_capacity(count);
        for (id, tables) in members.into_iter().enumerate() {
            let mut graph: BTreeMap<usize, Vec<EdgeId>> = BTreeMap::new();
            for &table in &tables {
                let internal = graph.entry(table).or_default();
                for edge in table_graph.outgoing(table) {
                    if component_of[edge.to.table] == id {
                        internal.push(edge.id);
                        condensed[edge.id] = true;
                    }
                }
            }

            let has_subset_conditions = tables
                .iter()
                .any(|&t| table_graph.table(t).has_subset_conditions());
            let cycles = CyclesGraph::build(&graph, table_graph.edges());
            sccs.push(Scc {
                id,
                tables,
                graph,
                cycles,
                has_subset_conditions,
            });
        }

        let mut edges = Vec::new();
        let mut graph = vec![Vec::new(); count];
        let mut transposed = vec![Vec::new(); count];
        for table in 0..table_graph.vertex_count() {
            for edge in table_graph.outgoing(table) {
                if condensed[edge.id] {
                    continue;
                }
                let from = component_of[edge.from.table];
                let to = component_of[edge.to.table];
                assert!(
                    from < to,
                    "edge {} joins components {from} and {to} out of topological order",
                    edge.id
                );
                let id = edges.len();
                edges.push(CondensedEdge {
                    id,
                    from,
                    to,
                    original: edge.id,
                });
                graph[from].push(id);
                transposed[to].push(id);
            }
        }

        debug!(
            event = "condensation_built",
            components = sccs.len(),
            cyclic_components = sccs.iter().filter(|s| s.has_cycle()).count(),
            edges = edges.len()
        );

        Self {
            sccs,
            component_of,
            edges,
            graph,
            transposed,
        }
    }

    pub fn sccs(&self) -> &[Scc] {
        &self.sccs
    }

    pub fn scc(&self, id: SccId) -> &Scc {
        &self.sccs[id]
    }

    pub fn component_of(&self, table: usize) -> SccId {
        self.component_of[table]
    }

    pub fn edges(&self) -> &[CondensedEdge] {
        &self.edges
    }

    pub fn edge(&self, id: usize) -> &CondensedEdge {
        &self.edges[id]
    }

    pub fn outgoing(&self, scc: SccId) -> impl Iterator<Item = &CondensedEdge> + '_ {
        self.graph[scc].iter().map(|&id| &self.edges[id])
    }

    pub fn incoming(&self, scc: SccId) -> impl Iterator<Item = &CondensedEdge> + '_ {
        self.transposed[scc].iter().map(|&id| &self.edges[id])
    }

    pub fn has_cycles(&self) -> bool {
        self.sccs.iter().any(Scc::has_cycle)
    }
}

/// Forward DFS post-order, reversed.
fn finishing_order(table_graph: &TableGraph) -> Vec<usize> {
    let count = table_graph.vertex_count();
    let mut visited = vec![false; count];
    let mut order = Vec::with_capacity(count);
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..count {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push((start, 0));

        while let Some(top) = stack.len().checked_sub(1) {
            let (vertex, pos) = stack[top];
            stack[top].1 += 1;
            match table_graph.outgoing_ids(vertex).get(pos) {
                Some(&edge) => {
                    let next = table_graph.edge(edge).to.table;
                    if !visited[next] {
                        visited[next] = true;
                        stack.push((next, 0));
                    }
                }
                None => {
                    order.push(vertex);
                    stack.pop();
                }
            }
        }
    }

    order.reverse();
    order
}

/// Transposed DFS in finishing order; returns component per table and the count.
fn mark_components(table_graph: &TableGraph, order: &[usize]) -> (Vec<SccId>, usize) {
    let mut component: Vec<Option<SccId>> = vec![None; table_graph.vertex_count()];
    let mut count = 0;
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for &start in order {
        if component[start].is_some() {
            continue;
        }
        component[start] = Some(count);
        stack.push((start, 0));

        while let Some(top) = stack.len().checked_sub(1) {
            let (vertex, pos) = stack[top];
            stack[top].1 += 1;
            match table_graph.incoming_ids(vertex).get(pos) {
                Some(&edge) => {
                    let next = table_graph.edge(edge).from.table;
                    if component[next].is_none() {
                        component[next] = Some(count);
                        stack.push((next, 0));
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }
        count += 1;
    }

    let component = component
        .into_iter()
        .enumerate()
        .map(|(table, c)| c.unwrap_or_else(|| panic!("table {table} was not assigned a component")))
        .collect();
    (component, count)
}
