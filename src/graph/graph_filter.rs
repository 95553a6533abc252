//! Edge-weight, molecule-count and component-size filters.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::data_structures::BarcodeGraph;

/// Filter thresholds. Zero (or `None`) disables a filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Remove edges with fewer common markers than this
    pub min_n: u32,
    /// Remove vertices with this many molecules or more
    pub max_molecules: Option<u32>,
    /// Remove components with fewer vertices than this
    pub min_component_size: usize,
}

/// What a filter pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub edges_removed: usize,
    pub isolated_removed: usize,
    pub molecule_vertices_removed: usize,
    pub components_removed: usize,
    pub component_vertices_removed: usize,
}

/// Remove isolated vertices and return how many were removed
pub fn remove_isolated(graph: &mut BarcodeGraph) -> usize {
    let isolated = graph.isolated_vertices();
    graph.remove_vertices(&isolated)
}

/// Remove edges with weight below `min_n`, then the vertices left isolated.
/// A threshold of zero leaves the graph untouched, isolated vertices included.
/// Returns `(edges removed, vertices removed)`.
pub fn filter_edges(graph: &mut BarcodeGraph, min_n: u32) -> (usize, usize) {
    if min_n == 0 {
        return (0, 0);
    }
    let edges = graph.remove_edges_where(|_, _, edge| edge.n < min_n);
    let isolated = remove_isolated(graph);
    info!(
        "✂️  Removed {} edges with fewer than {} common markers. Removed {} isolated vertices.",
        edges, min_n, isolated
    );
    (edges, isolated)
}

/// Remove vertices whose molecule count is at least `max_molecules`.
/// Vertices without a molecule count are kept.
pub fn remove_vertices_with_molecules_at_least(
    graph: &mut BarcodeGraph,
    max_molecules: u32,
) -> usize {
    let doomed: Vec<String> = graph
        .vertices()
        .filter(|(_, attrs)| attrs.m.is_some_and(|m| m >= max_molecules))
        .map(|(name, _)| name.to_string())
        .collect();
    let removed = graph.remove_vertices(&doomed);
    info!(
        "✂️  Removed {} vertices with {} or more molecules.",
        removed, max_molecules
    );
    removed
}

/// Remove every component with fewer than `min_size` vertices.
/// Returns `(components removed, vertices removed)`.
pub fn remove_small_components(graph: &mut BarcodeGraph, min_size: usize) -> (usize, usize) {
    if min_size == 0 {
        return (0, 0);
    }
    let small: Vec<Vec<String>> = graph
        .connected_components()
        .into_iter()
        .filter(|component| component.len() < min_size)
        .collect();
    let components = small.len();
    let vertices = graph.remove_vertices(small.iter().flatten());
    info!(
        "✂️  Removed {} vertices in {} components with fewer than {} vertices in a component.",
        vertices, components, min_size
    );
    (components, vertices)
}

/// Apply the configured filters in order: edge weight, molecule count, component size
pub fn apply_filters(graph: &mut BarcodeGraph, config: &FilterConfig) -> FilterReport {
    let mut report = FilterReport::default();
    (report.edges_removed, report.isolated_removed) = filter_edges(graph, config.min_n);
    if let Some(max_molecules) = config.max_molecules {
        report.molecule_vertices_removed =
            remove_vertices_with_molecules_at_least(graph, max_molecules);
    }
    (report.components_removed, report.component_vertices_removed) =
        remove_small_components(graph, config.min_component_size);
    report
}
