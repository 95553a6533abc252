//! Backbone extraction: maximum spanning forests, tree diameters and the
//! iterative peeling of diameter paths off the overlap graph.

use ahash::AHashSet;
use petgraph::algo::dijkstra;
use petgraph::stable_graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::core::data_structures::BarcodeGraph;
use crate::graph::graph_filter::remove_isolated;

/// Distance measure along tree paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathWeight {
    /// Number of edges
    Hops,
    /// Sum of the edges' shared-marker counts
    Markers,
}

impl PathWeight {
    fn length(self, n: u32) -> u64 {
        match self {
            PathWeight::Hops => 1,
            PathWeight::Markers => u64::from(n),
        }
    }
}

/// Maximum-weight spanning forest (Kruskal).
///
/// Edges are taken by descending weight, ties in canonical edge order.
/// Every vertex is kept, isolated ones included.
pub fn maximum_spanning_forest(graph: &BarcodeGraph) -> BarcodeGraph {
    let mut edges = graph.canonical_edges();
    edges.sort_by(|a, b| b.2.cmp(&a.2));

    let mut sets = UnionFind::<usize>::new(graph.node_bound());
    let tree: Vec<(NodeIndex, NodeIndex, u32)> = edges
        .into_iter()
        .filter(|&(a, b, _)| sets.union(a.index(), b.index()))
        .collect();
    debug!(
        "Spanning forest keeps {} of {} edges",
        tree.len(),
        graph.edge_count()
    );
    graph.with_edges(&tree)
}

/// Distances from `start` to every vertex of its tree
fn tree_distances(
    tree: &BarcodeGraph,
    start: NodeIndex,
    weight: PathWeight,
) -> HashMap<NodeIndex, u64> {
    dijkstra(tree.inner(), start, None, |e| weight.length(e.weight().n))
}

/// Farthest reached vertex; ties go to the first in canonical order
fn farthest(distance: &HashMap<NodeIndex, u64>) -> Option<(NodeIndex, u64)> {
    distance
        .iter()
        .map(|(&ix, &d)| (ix, d))
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
}

/// Two-sweep diameter of the tree containing `start`
struct Diameter {
    from: NodeIndex,
    to: NodeIndex,
    length: u64,
    distance: HashMap<NodeIndex, u64>,
}

impl Diameter {
    fn of(tree: &BarcodeGraph, start: NodeIndex, weight: PathWeight) -> Self {
        let (from, _) = farthest(&tree_distances(tree, start, weight)).unwrap_or((start, 0));
        let distance = tree_distances(tree, from, weight);
        let (to, length) = farthest(&distance).unwrap_or((from, 0));
        Diameter {
            from,
            to,
            length,
            distance,
        }
    }

    /// Vertices from `from` to `to`. Edge lengths are positive, so in a tree the
    /// only neighbour closer to `from` is the parent.
    fn path(&self, tree: &BarcodeGraph) -> Vec<NodeIndex> {
        let mut path = vec![self.to];
        let mut current = self.to;
        while current != self.from {
            let here = self.distance.get(&current).copied().unwrap_or(0);
            let parent = tree
                .inner()
                .neighbors(current)
                .find(|nb| matches!(self.distance.get(nb), Some(&d) if d < here));
            match parent {
                Some(p) => {
                    path.push(p);
                    current = p;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }
}

/// Diameter of the tree containing the first vertex: `(u, v, length)`.
/// The graph must be a forest; only the first vertex's component is considered.
pub fn diameter_of_tree(
    forest: &BarcodeGraph,
    weight: PathWeight,
) -> Option<(String, String, u64)> {
    let start = forest.inner().node_indices().next()?;
    let diameter = Diameter::of(forest, start, weight);
    Some((
        forest.name_of(diameter.from).to_string(),
        forest.name_of(diameter.to).to_string(),
        diameter.length,
    ))
}

/// Marker-weighted diameter path of one tree, walked on its own copy
fn tree_backbone(forest: &BarcodeGraph, component: &[NodeIndex]) -> Vec<String> {
    if let [single] = component {
        return vec![forest.name_of(*single).to_string()];
    }
    let tree = forest.induced_by_indices(component);
    match tree.inner().node_indices().next() {
        Some(start) => Diameter::of(&tree, start, PathWeight::Markers)
            .path(&tree)
            .into_iter()
            .map(|ix| tree.name_of(ix).to_string())
            .collect(),
        None => Vec::new(),
    }
}

/// One marker-weighted diameter path per tree, longest first
pub fn backbones_of_trees(forest: &BarcodeGraph) -> Vec<Vec<String>> {
    let mut paths: Vec<Vec<String>> = forest
        .component_indices()
        .iter()
        .map(|component| tree_backbone(forest, component))
        .collect();
    paths.sort_by(|a: &Vec<String>, b| b.len().cmp(&a.len()));
    paths
}

/// Iteratively extract backbone paths.
///
/// While edges remain: take the maximum spanning forest, record the diameter path
/// of each tree, remove the path vertices together with their neighbours, then drop
/// isolated vertices. Backbones are returned longest first and never share a vertex
/// or touch each other's neighbourhood.
pub fn determine_backbones(graph: &BarcodeGraph) -> Vec<Vec<String>> {
    let mut working = graph.clone();
    let mut backbones = Vec::new();
    let mut round = 0;
    while working.edge_count() > 0 {
        round += 1;
        let forest = maximum_spanning_forest(&working);
        let paths = backbones_of_trees(&forest);

        let mut doomed: AHashSet<String> = AHashSet::new();
        for vertex in paths.iter().flatten() {
            doomed.extend(working.neighbors(vertex).into_iter().map(str::to_string));
            doomed.insert(vertex.clone());
        }
        working.remove_vertices(&doomed);
        remove_isolated(&mut working);
        debug!(
            "Backbone round {}: {} paths, {} vertices left",
            round,
            paths.len(),
            working.vertex_count()
        );
        backbones.extend(paths);
    }
    backbones.sort_by(|a: &Vec<String>, b| b.len().cmp(&a.len()));
    info!("🦴 Determined {} backbone paths", backbones.len());
    backbones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_structures::VertexAttrs;

    fn path_graph(n: usize) -> BarcodeGraph {
        let mut g = BarcodeGraph::new();
        for i in 1..n {
            g.add_edge(&format!("v{i:02}"), &format!("v{:02}", i + 1), 1).unwrap();
        }
        g
    }

    #[test]
    fn test_diameter_of_path_graph() {
        let g = path_graph(6);
        let (u, v, d) = diameter_of_tree(&g, PathWeight::Hops).unwrap();
        assert_eq!(d, 5);
        let mut ends = [u, v];
        ends.sort();
        assert_eq!(ends, ["v01".to_string(), "v06".to_string()]);
    }

    #[test]
    fn test_diameter_uses_weights() {
        // Star: heavy arms win under marker weights
        let mut g = BarcodeGraph::new();
        g.add_edge("hub", "a", 1).unwrap();
        g.add_edge("hub", "b", 10).unwrap();
        g.add_edge("hub", "c", 20).unwrap();
        let (u, v, d) = diameter_of_tree(&g, PathWeight::Markers).unwrap();
        assert_eq!(d, 30);
        assert_eq!((u.as_str(), v.as_str()), ("c", "b"));
        let (_, _, hops) = diameter_of_tree(&g, PathWeight::Hops).unwrap();
        assert_eq!(hops, 2);
    }

    #[test]
    fn test_diameter_of_empty_graph() {
        assert!(diameter_of_tree(&BarcodeGraph::new(), PathWeight::Hops).is_none());
    }

    #[test]
    fn test_maximum_spanning_forest() {
        let mut g = BarcodeGraph::new();
        g.add_edge("A", "B", 5).unwrap();
        g.add_edge("B", "C", 4).unwrap();
        g.add_edge("A", "C", 1).unwrap();
        g.add_edge("X", "Y", 2).unwrap();
        g.add_vertex("Z", VertexAttrs::new(3));
        let forest = maximum_spanning_forest(&g);
        assert_eq!(forest.vertex_count(), 6);
        assert_eq!(forest.edge_count(), 3);
        assert!(!forest.has_edge("A", "C"));
        assert_eq!(forest.vertex("Z"), Some(&VertexAttrs::new(3)));
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn test_spanning_forest_ties_follow_canonical_order() {
        let mut g = BarcodeGraph::new();
        g.add_edge("A", "B", 1).unwrap();
        g.add_edge("B", "C", 1).unwrap();
        g.add_edge("A", "C", 1).unwrap();
        let forest = maximum_spanning_forest(&g);
        assert!(forest.has_edge("A", "B"));
        assert!(forest.has_edge("A", "C"));
        assert!(!forest.has_edge("B", "C"));
    }

    #[test]
    fn test_backbones_of_trees_sorted_by_length() {
        let mut g = path_graph(4);
        g.add_edge("x", "y", 1).unwrap();
        g.add_vertex("z", VertexAttrs::new(1));
        let paths = backbones_of_trees(&g);
        let lengths: Vec<usize> = paths.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![4, 2, 1]);
    }

    #[test]
    fn test_determine_backbones_single_path() {
        let g = path_graph(5);
        let backbones = determine_backbones(&g);
        assert_eq!(backbones.len(), 1);
        assert_eq!(backbones[0].len(), 5);
    }

    #[test]
    fn test_determine_backbones_empty_and_edgeless() {
        assert!(determine_backbones(&BarcodeGraph::new()).is_empty());
        let mut g = BarcodeGraph::new();
        g.add_vertex("A", VertexAttrs::new(1));
        assert!(determine_backbones(&g).is_empty());
    }

    #[test]
    fn test_backbones_of_many_small_trees() {
        let mut g = BarcodeGraph::new();
        for i in 0..5000 {
            g.add_edge(&format!("a{i}"), &format!("b{i}"), 1 + i % 7).unwrap();
            g.add_vertex(&format!("lone{i}"), VertexAttrs::new(1));
        }
        let paths = backbones_of_trees(&g);
        assert_eq!(paths.len(), 10_000);
        assert!(paths[..5000].iter().all(|p| p.len() == 2));
        assert!(paths[5000..].iter().all(|p| p.len() == 1));
        assert_eq!(paths[0], vec!["b0".to_string(), "a0".to_string()]);

        let backbones = determine_backbones(&g);
        assert_eq!(backbones.len(), 10_000);
        let covered: AHashSet<&String> = backbones.iter().flatten().collect();
        assert_eq!(covered.len(), g.vertex_count());
    }

    #[test]
    fn test_diameter_path_follows_heaviest_route() {
        // Caterpillar: spine s0-s1-s2-s3 with light legs; a heavy leg on s1
        let mut g = BarcodeGraph::new();
        for i in 0..3 {
            g.add_edge(&format!("s{i}"), &format!("s{}", i + 1), 5).unwrap();
            g.add_edge(&format!("s{i}"), &format!("leg{i}"), 1).unwrap();
        }
        g.add_edge("s1", "heavy", 9).unwrap();
        let paths = backbones_of_trees(&g);
        assert_eq!(paths.len(), 1);
        let mut path = paths[0].clone();
        if path[0] != "heavy" {
            path.reverse();
        }
        assert_eq!(path, vec!["heavy", "s1", "s2", "s3"]);
    }

    #[test]
    fn test_backbones_are_separated() {
        let mut g = path_graph(5);
        for i in 1..4 {
            g.add_edge(&format!("w{i}"), &format!("w{}", i + 1), 3).unwrap();
        }
        g.add_edge("w4", "v05", 1).unwrap();
        let backbones = determine_backbones(&g);
        let mut seen = AHashSet::new();
        for path in &backbones {
            for vertex in path {
                assert!(seen.insert(vertex.clone()), "{vertex} appears twice");
            }
        }
        for (i, a) in backbones.iter().enumerate() {
            for b in &backbones[i + 1..] {
                for u in a {
                    for v in b {
                        assert!(!g.has_edge(u, v));
                    }
                }
            }
        }
    }
}
