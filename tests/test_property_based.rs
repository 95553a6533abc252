//! Property-based tests for graph construction and analysis
//! Invariants that should hold for any input graph or sketch set

use physlr::core::data_structures::*;
use physlr::core::minimizer_index::MinimizerIndex;
use physlr::graph::*;
use physlr::utils::graph_io::{read_tsv_str, write_tsv};
use proptest::prelude::*;
use std::collections::HashSet;

fn build_graph(edges: &[(u8, u8, u32)]) -> BarcodeGraph {
    let mut graph = BarcodeGraph::new();
    for &(u, v, n) in edges {
        if u != v {
            graph.add_edge(&format!("v{u}"), &format!("v{v}"), n).unwrap();
        }
    }
    graph
}

fn edge_list() -> impl Strategy<Value = Vec<(u8, u8, u32)>> {
    prop::collection::vec((0u8..12, 0u8..12, 1u32..50), 0..40)
}

#[cfg(test)]
mod graph_properties {
    use super::*;

    proptest! {
        #[test]
        fn tsv_output_reads_back(edges in edge_list(), extra in 0u8..4) {
            let mut graph = build_graph(&edges);
            for i in 0..extra {
                let attrs = VertexAttrs::with_molecules(u32::from(i), 1);
                graph.add_vertex(&format!("lonely{i}"), attrs);
            }
            let mut buffer = Vec::new();
            write_tsv(&graph, &mut buffer).unwrap();
            let back = read_tsv_str(&String::from_utf8(buffer).unwrap()).unwrap();
            prop_assert_eq!(back, graph);
        }

        #[test]
        fn zero_threshold_filter_is_a_no_op(edges in edge_list()) {
            let mut graph = build_graph(&edges);
            graph.add_vertex("isolated", VertexAttrs::new(1));
            let before = graph.clone();
            prop_assert_eq!(filter_edges(&mut graph, 0), (0, 0));
            prop_assert_eq!(graph, before);
        }

        #[test]
        fn spanning_forest_spans_every_component(edges in edge_list()) {
            let graph = build_graph(&edges);
            let forest = maximum_spanning_forest(&graph);
            let components = graph.connected_components().len();
            prop_assert_eq!(forest.vertex_count(), graph.vertex_count());
            prop_assert_eq!(forest.edge_count(), graph.vertex_count() - components);
            for (u, v, n) in forest.edges() {
                prop_assert_eq!(graph.edge_weight(u, v), Some(n));
            }
        }

        #[test]
        fn backbones_are_disjoint_paths(edges in edge_list()) {
            let graph = build_graph(&edges);
            let backbones = determine_backbones(&graph);
            let mut seen = HashSet::new();
            for path in &backbones {
                for pair in path.windows(2) {
                    prop_assert!(graph.has_edge(&pair[0], &pair[1]));
                }
                for vertex in path {
                    prop_assert!(seen.insert(vertex.clone()), "{} on two backbones", vertex);
                }
            }
            for pair in backbones.windows(2) {
                prop_assert!(pair[0].len() >= pair[1].len());
            }
            for (i, first) in backbones.iter().enumerate() {
                for second in &backbones[i + 1..] {
                    for u in first {
                        for v in second {
                            prop_assert!(!graph.has_edge(u, v), "{} touches {}", u, v);
                        }
                    }
                }
            }
        }

        #[test]
        fn isolated_vertices_become_singleton_backbones(edges in edge_list(), lonely in 1u8..4) {
            let mut graph = build_graph(&edges);
            for i in 0..lonely {
                graph.add_vertex(&format!("lonely{i}"), VertexAttrs::new(1));
            }
            let backbones = determine_backbones(&graph);
            for i in 0..lonely {
                let name = format!("lonely{i}");
                let expected = if graph.edge_count() > 0 { 1 } else { 0 };
                let found = backbones
                    .iter()
                    .filter(|path| path.len() == 1 && path[0] == name)
                    .count();
                prop_assert_eq!(found, expected);
            }
            let mut seen = HashSet::new();
            for vertex in backbones.iter().flatten() {
                prop_assert!(seen.insert(vertex.clone()), "{} on two backbones", vertex);
            }
        }

        #[test]
        fn removing_a_cut_vertex_splits_its_component(edges in edge_list()) {
            let graph = build_graph(&edges);
            let before = graph.connected_components().len();
            for cut in articulation_points(&graph) {
                let mut rest = graph.clone();
                rest.remove_vertex(&cut);
                prop_assert!(rest.connected_components().len() > before);
            }
        }

        #[test]
        fn path_diameter_is_its_length(len in 2usize..30) {
            let mut graph = BarcodeGraph::new();
            for i in 1..len {
                graph.add_edge(&format!("p{}", i - 1), &format!("p{i}"), 7).unwrap();
            }
            let (_, _, hops) = diameter_of_tree(&graph, PathWeight::Hops).unwrap();
            prop_assert_eq!(hops, (len - 1) as u64);
            let (_, _, markers) = diameter_of_tree(&graph, PathWeight::Markers).unwrap();
            prop_assert_eq!(markers, 7 * (len - 1) as u64);
        }
    }
}

#[cfg(test)]
mod overlap_properties {
    use super::*;

    fn sketches() -> impl Strategy<Value = Vec<Vec<u64>>> {
        prop::collection::vec(prop::collection::vec(0u64..60, 1..12), 1..15)
    }

    proptest! {
        #[test]
        fn overlap_edges_are_positive_and_bounded(sketches in sketches(), coef in 0.0f64..3.0) {
            let mut index = MinimizerIndex::new();
            for (i, values) in sketches.iter().enumerate() {
                index.insert(&format!("bx{i:02}"), values.iter().copied());
            }
            let config = OverlapConfig { coef, max_count: None };
            let builder = OverlapGraphBuilder::new(config).unwrap();
            let (graph, stats) = builder.build(index).unwrap();

            prop_assert_eq!(graph.vertex_count(), sketches.len());
            let names = graph.vertex_names();
            let mut sorted = names.clone();
            sorted.sort_unstable();
            prop_assert_eq!(names, sorted);

            for (u, v, n) in graph.edges() {
                prop_assert_ne!(u, v);
                prop_assert!(n > 0);
                let bound = graph.vertex(u).unwrap().n.min(graph.vertex(v).unwrap().n);
                prop_assert!(n <= bound);
            }
            prop_assert_eq!(stats.edges, graph.edge_count());
        }
    }
}
