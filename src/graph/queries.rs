//! Derived views of a graph or sketch index: induced subgraphs, backbone and
//! tiling-path subgraphs, marker frequencies and pairwise intersections.

use ahash::{AHashMap, AHashSet};
use anyhow::Result;
use petgraph::algo::dijkstra;
use std::collections::BTreeMap;
use tracing::info;

use crate::core::data_structures::BarcodeGraph;
use crate::core::error::PhyslrError;
use crate::core::minimizer_index::{BarcodeId, MinimizerIndex};
use crate::graph::backbone::determine_backbones;
use crate::graph::graph_filter::{filter_edges, remove_isolated};

/// Subgraph induced by `vertices`, optionally grown by one hop, minus `exclude`.
/// Only distances 0 and 1 are supported.
pub fn extract_subgraph(
    graph: &BarcodeGraph,
    vertices: &[String],
    exclude: &[String],
    distance: u32,
) -> Result<BarcodeGraph> {
    if distance > 1 {
        return Err(PhyslrError::UnsupportedArgument(format!(
            "only -d0 and -d1 are currently supported (got -d{distance})"
        ))
        .into());
    }
    let mut selected: AHashSet<&str> = vertices.iter().map(String::as_str).collect();
    if distance == 1 {
        for u in vertices {
            selected.extend(graph.neighbors(u));
        }
    }
    for u in exclude {
        selected.remove(u.as_str());
    }
    let subgraph = graph.induced_subgraph(selected);
    info!(
        "🔍 Extracted subgraph: {} vertices, {} edges",
        subgraph.vertex_count(),
        subgraph.edge_count()
    );
    Ok(subgraph)
}

/// Subgraph induced by the backbone vertices, sorted by vertex name
pub fn backbone_graph(graph: &BarcodeGraph) -> BarcodeGraph {
    let mut working = graph.clone();
    remove_isolated(&mut working);
    let backbones = determine_backbones(&working);
    let subgraph = working.induced_subgraph(backbones.iter().flatten()).sorted();
    info!(
        "🦴 Backbone subgraph: {} vertices, {} edges",
        subgraph.vertex_count(),
        subgraph.edge_count()
    );
    subgraph
}

/// Unweighted shortest path between two vertices, `None` when unreachable.
/// Among equally short paths, each step back from `to` takes the first
/// neighbour in canonical order.
pub fn shortest_path(graph: &BarcodeGraph, from: &str, to: &str) -> Option<Vec<String>> {
    let start = graph.node_index(from)?;
    let goal = graph.node_index(to)?;
    let hops = dijkstra(graph.inner(), start, Some(goal), |_| 1u64);
    let mut remaining = *hops.get(&goal)?;
    let mut path = vec![goal];
    let mut current = goal;
    while remaining > 0 {
        remaining -= 1;
        current = graph
            .sorted_neighbors(current)
            .into_iter()
            .find(|nb| hops.get(nb) == Some(&remaining))?;
        path.push(current);
    }
    path.reverse();
    Some(
        path.into_iter()
            .map(|ix| graph.name_of(ix).to_string())
            .collect(),
    )
}

/// Subgraph induced by the shortest paths joining each backbone's endpoints,
/// after removing edges with fewer than `min_n` common markers.
/// Paths are searched within a copy of the backbone's own component.
pub fn tiling_graph(graph: &BarcodeGraph, min_n: u32) -> BarcodeGraph {
    let mut working = graph.clone();
    filter_edges(&mut working, min_n);
    let backbones = determine_backbones(&working);

    let components = working.connected_components();
    let mut component_of: AHashMap<&str, usize> = AHashMap::new();
    for (i, component) in components.iter().enumerate() {
        component_of.extend(component.iter().map(|name| (name.as_str(), i)));
    }
    let mut ends_by_component: BTreeMap<usize, Vec<(&str, &str)>> = BTreeMap::new();
    for path in &backbones {
        if let (Some(first), Some(last)) = (path.first(), path.last()) {
            if let Some(&i) = component_of.get(first.as_str()) {
                ends_by_component
                    .entry(i)
                    .or_default()
                    .push((first.as_str(), last.as_str()));
            }
        }
    }

    let mut tiling: AHashSet<String> = AHashSet::new();
    for (i, ends) in ends_by_component {
        let component = working.induced_subgraph(&components[i]);
        for (first, last) in ends {
            if let Some(route) = shortest_path(&component, first, last) {
                tiling.extend(route);
            }
        }
    }
    let subgraph = working.induced_subgraph(&tiling);
    info!(
        "🧱 Tiling subgraph: {} vertices, {} edges",
        subgraph.vertex_count(),
        subgraph.edge_count()
    );
    subgraph
}

/// Markers owned by at least two barcodes with their owner counts,
/// ascending by count (then by marker)
pub fn count_markers(index: &MinimizerIndex) -> Vec<(u64, usize)> {
    let mut counts: Vec<(u64, usize)> = index
        .marker_counts()
        .into_iter()
        .filter(|&(_, count)| count >= 2)
        .collect();
    counts.sort_unstable_by_key(|&(marker, count)| (count, marker));
    counts
}

/// Markers shared by a pair of barcodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intersection {
    pub u: String,
    pub v: String,
    /// Common markers, ascending
    pub common: Vec<u64>,
}

/// Pairs of barcodes sharing at least `min_common` markers (a minimum of 0 means 1).
///
/// With `barcodes` every pair of the listed barcodes is tested in the given order;
/// otherwise every pair co-owning some marker is, ordered by barcode name.
pub fn intersect(
    index: &MinimizerIndex,
    min_common: usize,
    barcodes: Option<&[String]>,
) -> Vec<Intersection> {
    let min_common = min_common.max(1);
    let pairs: Vec<(String, String)> = match barcodes {
        Some(listed) => listed
            .iter()
            .enumerate()
            .flat_map(|(i, u)| listed[i + 1..].iter().map(move |v| (u.clone(), v.clone())))
            .collect(),
        None => {
            let mut ids: AHashSet<(BarcodeId, BarcodeId)> = AHashSet::new();
            for owners in index.invert().values() {
                for (i, &a) in owners.iter().enumerate() {
                    for &b in &owners[i + 1..] {
                        ids.insert(if a < b { (a, b) } else { (b, a) });
                    }
                }
            }
            let mut pairs: Vec<(String, String)> = ids
                .into_iter()
                .map(|(a, b)| {
                    let (u, v) = (index.barcode(a), index.barcode(b));
                    if u <= v {
                        (u.to_string(), v.to_string())
                    } else {
                        (v.to_string(), u.to_string())
                    }
                })
                .collect();
            pairs.sort_unstable();
            pairs
        }
    };

    pairs
        .into_iter()
        .filter_map(|(u, v)| {
            let (a, b) = (index.sketch(&u)?, index.sketch(&v)?);
            let mut common: Vec<u64> = a.intersection(b).copied().collect();
            if common.len() < min_common {
                return None;
            }
            common.sort_unstable();
            Some(Intersection { u, v, common })
        })
        .collect()
}
