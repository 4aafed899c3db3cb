//! Referentially consistent subset planning.
//!
//! The planner turns a list of [`Table`](dbslice_core::Table)s with foreign
//! keys and subset conditions into one `SELECT` per table whose rows must be
//! filtered to keep every reference intact:
//!
//! 1. [`TableGraph`] models references as edges from child to parent.
//! 2. [`CondensationGraph`] collapses strongly connected components.
//! 3. [`SubsetGraph`] keeps the paths from a root component to conditions.
//! 4. A [`QueryBuilder`] renders the joins and guarded predicates.

pub mod condensation;
pub mod cycles;
pub mod engine;
pub mod errors;
pub mod query;
pub mod report;
pub mod subset_graph;
pub mod table_graph;

pub use condensation::{CondensationGraph, CondensedEdge, Scc, SccId};
pub use cycles::{CycleGroupEdge, CyclesGraph};
pub use engine::Subset;
pub use errors::{CyclicComponent, Result, SubsetError};
pub use query::{CyclesQueryBuilder, DagQueryBuilder, QueryBuilder};
pub use report::{ComponentReport, SubsetReport, SubsetSummary, TableQuery};
pub use subset_graph::SubsetGraph;
pub use table_graph::{Edge, EdgeId, TableGraph, TableLink};
