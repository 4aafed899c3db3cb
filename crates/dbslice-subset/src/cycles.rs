use std::collections::{BTreeMap, BTreeSet};

use crate::table_graph::{Edge, EdgeId};

/// Link between two cycle groups that share at least one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleGroupEdge {
    pub id: usize,
    pub from: String,
    pub to: String,
    /// Table ids present in both groups, ascending.
    pub shared_tables: Vec<usize>,
}

/// Elementary cycles of one strongly connected component.
///
/// Cycles are unique by their edge set and grouped by the set of tables
/// they pass through. Groups sharing a table are linked once.
#[derive(Debug, Clone, Default)]
pub struct CyclesGraph {
    cycles: Vec<Vec<EdgeId>>,
    cycle_idents: BTreeSet<String>,
    groups: BTreeMap<String, Vec<usize>>,
    graph: BTreeMap<String, Vec<CycleGroupEdge>>,
}

impl CyclesGraph {
    /// Build from an SCC's internal adjacency (vertex to internal edge ids).
    pub fn build(scc_graph: &BTreeMap<usize, Vec<EdgeId>>, edges: &[Edge]) -> Self {
        let mut search = CycleSearch {
            graph: scc_graph,
            edges,
            visited: BTreeSet::new(),
            on_stack: BTreeSet::new(),
            path: Vec::new(),
            cycles: Vec::new(),
            idents: BTreeSet::new(),
        };
        for &vertex in scc_graph.keys() {
            if !search.visited.contains(&vertex) {
                search.visit(vertex);
            }
        }

        let mut graph = Self {
            cycles: search.cycles,
            cycle_idents: search.idents,
            ..Self::default()
        };
        graph.group_cycles(edges);
        graph.build_cycles_graph(edges);
        graph
    }

    pub fn has_cycle(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn cycles_group_count(&self) -> usize {
        self.groups.len()
    }

    /// Cycles in discovery order, each as edge ids in traversal order.
    pub fn cycles(&self) -> &[Vec<EdgeId>] {
        &self.cycles
    }

    pub fn cycle_idents(&self) -> impl Iterator<Item = &str> + '_ {
        self.cycle_idents.iter().map(String::as_str)
    }

    /// Group id to indexes into [`CyclesGraph::cycles`].
    pub fn groups(&self) -> &BTreeMap<String, Vec<usize>> {
        &self.groups
    }

    /// Group id to links towards other groups.
    pub fn group_edges(&self) -> &BTreeMap<String, Vec<CycleGroupEdge>> {
        &self.graph
    }

    fn group_cycles(&mut self, edges: &[Edge]) {
        for (idx, cycle) in self.cycles.iter().enumerate() {
            self.groups
                .entry(group_ident(cycle, edges))
                .or_default()
                .push(idx);
        }
    }

    fn build_cycles_graph(&mut self, edges: &[Edge]) {
        let keys: Vec<String> = self.groups.keys().cloned().collect();
        let mut next_id = 0;

        for left in &keys {
            for right in &keys {
                if left == right {
                    continue;
                }
                let shared = shared_tables(
                    &self.cycles[self.groups[left][0]],
                    &self.cycles[self.groups[right][0]],
                    edges,
                );
                if shared.is_empty() || self.linked(left, right) || self.linked(right, left) {
                    continue;
                }
                self.graph
                    .entry(left.clone())
                    .or_default()
                    .push(CycleGroupEdge {
                        id: next_id,
                        from: left.clone(),
                        to: right.clone(),
                        shared_tables: shared,
                    });
                next_id += 1;
            }
        }
    }

    fn linked(&self, from: &str, to: &str) -> bool {
        self.graph
            .get(from)
            .is_some_and(|links| links.iter().any(|link| link.to == to))
    }
}

struct CycleSearch<'a> {
    graph: &'a BTreeMap<usize, Vec<EdgeId>>,
    edges: &'a [Edge],
    visited: BTreeSet<usize>,
    on_stack: BTreeSet<usize>,
    path: Vec<EdgeId>,
    cycles: Vec<Vec<EdgeId>>,
    idents: BTreeSet<String>,
}

impl CycleSearch<'_> {
    fn visit(&mut self, vertex: usize) {
        self.visited.insert(vertex);
        self.on_stack.insert(vertex);

        let mut outgoing = self.graph.get(&vertex).cloned().unwrap_or_default();
        outgoing.sort_by_key(|&id| self.edges[id].to.table);

        for id in outgoing {
            self.path.push(id);
            let target = self.edges[id].to.table;
            if !self.visited.contains(&target) {
                self.visit(target);
            } else if self.on_stack.contains(&target) {
                self.record_cycle(target);
            }
            self.path.pop();
        }

        self.on_stack.remove(&vertex);
    }

    fn record_cycle(&mut self, target: usize) {
        let mut cycle = Vec::new();
        for &id in self.path.iter().rev() {
            cycle.push(id);
            if self.edges[id].from.table == target {
                break;
            }
        }
        cycle.reverse();

        if self.idents.insert(cycle_ident(&cycle)) {
            self.cycles.push(cycle);
        }
    }
}

/// Sorted edge ids joined with `_`.
pub fn cycle_ident(cycle: &[EdgeId]) -> String {
    let mut ids = cycle.to_vec();
    ids.sort_unstable();
    join_ids(&ids)
}

/// Sorted ids of the tables a cycle passes through, joined with `_`.
pub fn group_ident(cycle: &[EdgeId], edges: &[Edge]) -> String {
    let tables: BTreeSet<usize> = cycle.iter().map(|&id| edges[id].to.table).collect();
    join_ids(&tables.into_iter().collect::<Vec<_>>())
}

fn shared_tables(left: &[EdgeId], right: &[EdgeId], edges: &[Edge]) -> Vec<usize> {
    let left: BTreeSet<usize> = left.iter().map(|&id| edges[id].to.table).collect();
    let right: BTreeSet<usize> = right.iter().map(|&id| edges[id].to.table).collect();
    left.intersection(&right).copied().collect()
}

fn join_ids(ids: &[usize]) -> String {
    ids.iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join("_")
}
