use std::collections::{BTreeMap, BTreeSet};

use crate::condensation::{CondensationGraph, CondensedEdge, SccId};
use crate::errors::{Result, SubsetError};

/// Part of the condensation graph reachable from one root component that lies
/// on a path to some component carrying subset conditions.
///
/// Holds condensed edge ids only; edges are resolved through the
/// [`CondensationGraph`] they came from.
#[derive(Debug, Clone)]
pub struct SubsetGraph {
    root: SccId,
    graph: BTreeMap<SccId, Vec<usize>>,
    vertexes: BTreeSet<SccId>,
}

impl SubsetGraph {
    pub fn new(root: SccId) -> Self {
        Self {
            root,
            graph: BTreeMap::new(),
            vertexes: BTreeSet::new(),
        }
    }

    /// Collect every edge run that ends in a component with subset conditions.
    ///
    /// Runs are accumulated along the DFS path and flushed when a conditioned
    /// component is reached. Edges already flushed through another parent are
    /// skipped, which keeps diamond-shaped schemas valid.
    pub fn build(root: SccId, condensation: &CondensationGraph) -> Result<Self> {
        let mut graph = Self::new(root);
        if condensation.scc(root).has_subset_conditions() {
            graph.add_vertex(root);
        }
        let mut run = Vec::new();
        graph.search(root, condensation, &mut run)?;
        Ok(graph)
    }

    fn search(
        &mut self,
        scc: SccId,
        condensation: &CondensationGraph,
        run: &mut Vec<usize>,
    ) -> Result<()> {
        for edge in condensation.outgoing(scc) {
            run.push(edge.id);
            if condensation.scc(edge.to).has_subset_conditions() {
                for id in run.drain(..) {
                    if !self.contains_edge(id) {
                        self.add_edge(condensation.edge(id))?;
                    }
                }
            }
            self.search(edge.to, condensation, run)?;
            run.pop();
        }
        Ok(())
    }

    pub fn add_vertex(&mut self, scc: SccId) {
        self.graph.entry(scc).or_default();
        self.vertexes.insert(scc);
    }

    /// Record an edge under its source component.
    pub fn add_edge(&mut self, edge: &CondensedEdge) -> Result<()> {
        let edges = self.graph.entry(edge.from).or_default();
        if edges.contains(&edge.id) {
            return Err(SubsetError::EdgeIsNotUnique {
                edge: edge.id,
                scc: edge.from,
            });
        }
        edges.push(edge.id);
        self.graph.entry(edge.to).or_default();
        self.vertexes.insert(edge.from);
        self.vertexes.insert(edge.to);
        Ok(())
    }

    pub fn contains_edge(&self, edge_id: usize) -> bool {
        self.graph.values().any(|edges| edges.contains(&edge_id))
    }

    pub fn root(&self) -> SccId {
        self.root
    }

    pub fn vertexes(&self) -> &BTreeSet<SccId> {
        &self.vertexes
    }

    pub fn vertex_count(&self) -> usize {
        self.vertexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertexes.is_empty()
    }

    /// Condensed edge ids leaving `scc`, in insertion order.
    pub fn edges_from(&self, scc: SccId) -> &[usize] {
        self.graph.get(&scc).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.values().map(Vec::len).sum()
    }

    /// True when any touched component is cyclic.
    pub fn has_cycles(&self, condensation: &CondensationGraph) -> bool {
        self.vertexes
            .iter()
            .any(|&scc| condensation.scc(scc).has_cycle())
    }
}

#[cfg(test)]
mod tests {
    use dbslice_core::{Reference, Table};

    use super::*;
    use crate::table_graph::TableGraph;

    fn reference(target: &str) -> Reference {
        Reference::new("public", target, [format!("{target}_id")], false)
    }

    fn condensation(tables: Vec<Table>) -> CondensationGraph {
        CondensationGraph::build(&TableGraph::build(tables).expect("build graph"))
    }

    // Tables e, a, b, c, d with a and c filtered; components are d=0 c=1 b=2 a=3 e=4.
    fn ambiguous_dag() -> CondensationGraph {
        condensation(vec![
            Table::new("public", "e", ["id"]),
            Table::new("public", "a", ["id"])
                .with_reference(reference("e"))
                .with_subset_condition("public.a.id = 1"),
            Table::new("public", "b", ["id"]).with_reference(reference("a")),
            Table::new("public", "c", ["id"])
                .with_reference(reference("b"))
                .with_reference(reference("a"))
                .with_subset_condition("public.c.id = 1"),
            Table::new("public", "d", ["id"]).with_reference(reference("c")),
        ])
    }

    fn targets(graph: &SubsetGraph, condensation: &CondensationGraph, scc: SccId) -> Vec<SccId> {
        graph
            .edges_from(scc)
            .iter()
            .map(|&id| condensation.edge(id).to)
            .collect()
    }

    #[test]
    fn keeps_only_paths_to_conditions() {
        let condensation = ambiguous_dag();
        let graph = SubsetGraph::build(0, &condensation).expect("build subset graph");

        assert_eq!(graph.root(), 0);
        assert_eq!(graph.vertexes().iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(targets(&graph, &condensation, 0), vec![1]);
        assert_eq!(targets(&graph, &condensation, 1), vec![2, 3]);
        assert_eq!(targets(&graph, &condensation, 2), vec![3]);
        assert!(graph.edges_from(3).is_empty());
        assert!(!graph.has_cycles(&condensation));
    }

    #[test]
    fn root_with_condition_and_no_edges() {
        let condensation = ambiguous_dag();
        let graph = SubsetGraph::build(3, &condensation).expect("build subset graph");
        assert_eq!(graph.vertex_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn unrelated_root_is_empty() {
        let condensation = ambiguous_dag();
        let graph = SubsetGraph::build(4, &condensation).expect("build subset graph");
        assert!(graph.is_empty());
    }

    #[test]
    fn diamond_reuses_shared_tail() {
        // x -> y -> w -> v, x -> z -> w; v filtered
        let condensation = condensation(vec![
            Table::new("public", "x", ["id"])
                .with_reference(reference("y"))
                .with_reference(reference("z")),
            Table::new("public", "y", ["id"]).with_reference(reference("w")),
            Table::new("public", "z", ["id"]).with_reference(reference("w")),
            Table::new("public", "w", ["id"]).with_reference(reference("v")),
            Table::new("public", "v", ["id"]).with_subset_condition("public.v.id = 1"),
        ]);
        let root = condensation.component_of(0);
        let graph = SubsetGraph::build(root, &condensation).expect("diamond must plan");
        assert_eq!(graph.vertex_count(), 5);
        assert_eq!(graph.edge_count(), 5);
    }

    #[test]
    fn add_edge_rejects_duplicates() {
        let condensation = ambiguous_dag();
        let mut graph = SubsetGraph::new(0);
        let edge = condensation.outgoing(0).next().copied().expect("edge from d");
        graph.add_edge(&edge).expect("first insert");
        let err = graph.add_edge(&edge).expect_err("second insert");
        assert!(matches!(err, SubsetError::EdgeIsNotUnique { scc: 0, .. }));
    }

    #[test]
    fn add_edge_keeps_existing_target_edges() {
        let condensation = ambiguous_dag();
        let mut graph = SubsetGraph::new(1);
        let b_to_a = *condensation.outgoing(2).next().expect("edge from b");
        let c_to_b = *condensation.outgoing(1).next().expect("edge from c");
        graph.add_edge(&b_to_a).expect("insert b -> a");
        graph.add_edge(&c_to_b).expect("insert c -> b");
        assert_eq!(graph.edges_from(2), &[b_to_a.id]);
    }
}
