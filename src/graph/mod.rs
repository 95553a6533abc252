//! Graph construction and analysis over barcode overlap graphs.

pub mod backbone;
pub mod bed_overlap;
pub mod connectivity;
pub mod graph_filter;
pub mod molecules;
pub mod overlap_graph;
pub mod queries;

pub use backbone::{
    backbones_of_trees, determine_backbones, diameter_of_tree, maximum_spanning_forest, PathWeight,
};
pub use bed_overlap::{build_overlap_graphs, BedOverlapGraphs};
pub use connectivity::{
    articulation_points, biconnected_components, remove_cut_vertices, triconnected_components,
    PairwiseTwoCutFinder, TwoCutFinder,
};
pub use graph_filter::{apply_filters, filter_edges, remove_isolated, FilterConfig, FilterReport};
pub use molecules::{
    build_molecule_graph, count_molecules, determine_molecules, partition_all, MoleculePartition,
};
pub use overlap_graph::{OverlapConfig, OverlapGraphBuilder, OverlapStats};
