//! Molecule partitioning.
//!
//! A barcode's neighbours usually cluster into one group per DNA molecule the
//! barcode sampled. Removing the cut vertices of the neighbourhood subgraph splits
//! those groups apart; each surviving component becomes one molecule.

use ahash::{AHashMap, AHashSet};
use anyhow::Result;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::info;

use crate::core::data_structures::{BarcodeGraph, VertexAttrs};
use crate::graph::connectivity::{articulation_points, decompose};

/// Neighbour → 0-based molecule index. Cut vertices and isolated neighbours are absent.
pub type MoleculePartition = AHashMap<String, usize>;

const BATCH_SIZE: usize = 100;

/// Biconnected components smaller than this (edges and triangles) are not molecules
const MIN_MOLECULE_COMPONENT: usize = 4;

/// Partition the neighbours of `u` into molecules, largest molecule first
pub fn determine_molecules(graph: &BarcodeGraph, u: &str) -> MoleculePartition {
    let neighbourhood = graph.induced_subgraph(graph.neighbors(u));
    let cut_vertices: AHashSet<String> = articulation_points(&neighbourhood).into_iter().collect();
    let remainder = if cut_vertices.is_empty() {
        neighbourhood
    } else {
        let names = neighbourhood
            .vertex_names()
            .into_iter()
            .filter(|name| !cut_vertices.contains(*name));
        neighbourhood.induced_subgraph(names)
    };

    let mut components: Vec<Vec<String>> = remainder
        .connected_components()
        .into_iter()
        .filter(|component| component.len() >= 2)
        .collect();
    components.sort_by(|a: &Vec<String>, b| b.len().cmp(&a.len()));

    components
        .into_iter()
        .enumerate()
        .flat_map(|(i, component)| component.into_iter().map(move |v| (v, i)))
        .collect()
}

/// Partition every vertex, returning results sorted by vertex name.
///
/// With more than one thread the vertices are processed in batches on a dedicated
/// pool; the graph is shared read-only between the workers.
pub fn partition_all(
    graph: Arc<BarcodeGraph>,
    threads: usize,
) -> Result<Vec<(String, MoleculePartition)>> {
    let vertices: Vec<String> = graph.vertex_names().into_iter().map(str::to_string).collect();
    let mut partitions: Vec<(String, MoleculePartition)> = if threads <= 1 {
        vertices
            .iter()
            .map(|u| (u.clone(), determine_molecules(&graph, u)))
            .collect()
    } else {
        worker_pool(threads)?.install(|| {
            vertices
                .par_chunks(BATCH_SIZE)
                .flat_map_iter(|batch| {
                    let graph = Arc::clone(&graph);
                    batch
                        .iter()
                        .map(move |u| (u.clone(), determine_molecules(&graph, u)))
                        .collect::<Vec<_>>()
                })
                .collect()
        })
    };
    partitions.sort_by(|a, b| a.0.cmp(&b.0));
    info!("🧬 Identified molecules for {} barcodes", partitions.len());
    Ok(partitions)
}

fn worker_pool(threads: usize) -> Result<rayon::ThreadPool> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("molecule-worker-{i}"))
        .build()?)
}

/// Build the molecule graph from per-barcode partitions.
///
/// Barcode `u` with `k` molecules becomes `u_0 .. u_{k-1}`, each inheriting `n`.
/// An edge `(u, v)` is kept only when both endpoints classify each other.
pub fn build_molecule_graph(
    graph: &BarcodeGraph,
    partitions: &[(String, MoleculePartition)],
) -> Result<BarcodeGraph> {
    let mut molecules = BarcodeGraph::new();
    let lookup: AHashMap<&str, &MoleculePartition> = partitions
        .iter()
        .map(|(u, partition)| (u.as_str(), partition))
        .collect();

    for (u, partition) in partitions {
        let n = graph.vertex(u).map_or(0, |attrs| attrs.n);
        let count = partition.values().max().map_or(0, |&max| max + 1);
        for i in 0..count {
            molecules.add_vertex(&format!("{u}_{i}"), VertexAttrs::new(n));
        }
    }
    info!(
        "🧬 Identified {} molecules in {} barcodes ({:.2} mean molecules per barcode)",
        molecules.vertex_count(),
        graph.vertex_count(),
        if graph.is_empty() {
            0.0
        } else {
            molecules.vertex_count() as f64 / graph.vertex_count() as f64
        }
    );

    for (u, v, n) in graph.edges() {
        let (Some(pu), Some(pv)) = (lookup.get(u), lookup.get(v)) else {
            continue;
        };
        if let (Some(i), Some(j)) = (pu.get(v), pv.get(u)) {
            molecules.add_edge(&format!("{u}_{i}"), &format!("{v}_{j}"), n)?;
        }
    }
    info!("✅ Separated molecules: {} edges", molecules.edge_count());
    Ok(molecules)
}

fn molecule_count(graph: &BarcodeGraph, u: &str) -> u32 {
    let neighbourhood = graph.induced_subgraph(graph.neighbors(u));
    decompose(&neighbourhood)
        .components
        .iter()
        .filter(|component| component.len() >= MIN_MOLECULE_COMPONENT)
        .count() as u32
}

/// Set `m` on every vertex: the number of biconnected components of its
/// neighbourhood with at least four vertices.
///
/// More than one thread runs the vertices on a dedicated pool of that size.
pub fn count_molecules(graph: &mut BarcodeGraph, threads: usize) -> Result<()> {
    let counts: Vec<(String, u32)> = {
        let shared: &BarcodeGraph = graph;
        let names: Vec<&str> = shared.vertex_names();
        let count = |&u: &&str| (u.to_string(), molecule_count(shared, u));
        if threads <= 1 {
            names.iter().map(count).collect()
        } else {
            worker_pool(threads)?.install(|| names.par_iter().map(count).collect())
        }
    };
    for (u, m) in counts {
        if let Some(attrs) = graph.vertex_mut(&u) {
            attrs.m = Some(m);
        }
    }
    info!("🧬 Counted molecules for {} barcodes", graph.vertex_count());
    Ok(())
}
