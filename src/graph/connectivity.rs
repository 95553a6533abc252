//! Cut-vertex analysis: biconnected components, articulation points and an
//! approximate triconnected decomposition built on 2-vertex cuts.

use ahash::AHashSet;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::{Bfs, VisitMap};
use tracing::info;

use crate::core::data_structures::BarcodeGraph;

/// Biconnected components and articulation points of one graph, as node indices
#[derive(Debug, Clone, Default)]
pub(crate) struct BiconnectedDecomposition {
    /// Vertex sets, each sorted; a bridge forms a two-vertex component
    pub components: Vec<Vec<NodeIndex>>,
    /// Cut vertices, sorted
    pub articulation_points: Vec<NodeIndex>,
}

struct DfsFrame {
    vertex: NodeIndex,
    parent: Option<NodeIndex>,
    neighbors: Vec<NodeIndex>,
    next: usize,
}

/// Hopcroft-Tarjan over an explicit stack so deep neighbourhoods cannot overflow
pub(crate) fn decompose(graph: &BarcodeGraph) -> BiconnectedDecomposition {
    const UNSEEN: usize = usize::MAX;
    let bound = graph.node_bound();
    let mut discovery = vec![UNSEEN; bound];
    let mut low = vec![0usize; bound];
    let mut is_cut = vec![false; bound];
    let mut timer = 0;
    let mut edge_stack: Vec<(NodeIndex, NodeIndex)> = Vec::new();
    let mut components = Vec::new();

    for root in graph.inner().node_indices() {
        if discovery[root.index()] != UNSEEN {
            continue;
        }
        discovery[root.index()] = timer;
        low[root.index()] = timer;
        timer += 1;
        let mut root_children = 0;
        let mut stack = vec![DfsFrame {
            vertex: root,
            parent: None,
            neighbors: graph.sorted_neighbors(root),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let v = frame.vertex;
            if frame.next < frame.neighbors.len() {
                let w = frame.neighbors[frame.next];
                frame.next += 1;
                if Some(w) == frame.parent {
                    continue;
                }
                if discovery[w.index()] == UNSEEN {
                    if v == root {
                        root_children += 1;
                    }
                    edge_stack.push((v, w));
                    discovery[w.index()] = timer;
                    low[w.index()] = timer;
                    timer += 1;
                    stack.push(DfsFrame {
                        vertex: w,
                        parent: Some(v),
                        neighbors: graph.sorted_neighbors(w),
                        next: 0,
                    });
                } else if discovery[w.index()] < discovery[v.index()] {
                    low[v.index()] = low[v.index()].min(discovery[w.index()]);
                    edge_stack.push((v, w));
                }
                continue;
            }

            let parent = frame.parent;
            stack.pop();
            let Some(p) = parent else {
                continue;
            };
            low[p.index()] = low[p.index()].min(low[v.index()]);
            if low[v.index()] >= discovery[p.index()] {
                if p != root {
                    is_cut[p.index()] = true;
                }
                let mut component = Vec::new();
                while let Some((a, b)) = edge_stack.pop() {
                    component.push(a);
                    component.push(b);
                    if (a, b) == (p, v) {
                        break;
                    }
                }
                component.sort_unstable();
                component.dedup();
                components.push(component);
            }
        }
        if root_children > 1 {
            is_cut[root.index()] = true;
        }
    }

    let articulation_points = graph
        .inner()
        .node_indices()
        .filter(|ix| is_cut[ix.index()])
        .collect();
    BiconnectedDecomposition {
        components,
        articulation_points,
    }
}

/// Biconnected components as vertex names. Isolated vertices belong to none.
pub fn biconnected_components(graph: &BarcodeGraph) -> Vec<Vec<String>> {
    decompose(graph)
        .components
        .into_iter()
        .map(|component| names(graph, &component))
        .collect()
}

/// Articulation points in canonical order
pub fn articulation_points(graph: &BarcodeGraph) -> Vec<String> {
    names(graph, &decompose(graph).articulation_points)
}

/// Remove every cut vertex, separating the graph into its biconnected pieces.
/// Returns the number of vertices removed.
pub fn remove_cut_vertices(graph: &mut BarcodeGraph) -> usize {
    let cut_vertices = articulation_points(graph);
    let removed = graph.remove_vertices(&cut_vertices);
    info!("✂️  Removed {} cut vertices.", removed);
    removed
}

fn names(graph: &BarcodeGraph, indices: &[NodeIndex]) -> Vec<String> {
    indices
        .iter()
        .map(|&ix| graph.name_of(ix).to_string())
        .collect()
}

/// Strategy for finding a 2-vertex cut in a biconnected graph
pub trait TwoCutFinder: Send + Sync {
    /// Return a pair of vertices whose removal disconnects the graph, if one is found
    fn find_two_cut(&self, graph: &BarcodeGraph) -> Option<(String, String)>;
}

/// Tests vertex pairs in canonical order and returns the first separating pair
#[derive(Debug, Clone, Copy, Default)]
pub struct PairwiseTwoCutFinder;

impl PairwiseTwoCutFinder {
    fn separates(graph: &BarcodeGraph, a: NodeIndex, b: NodeIndex) -> bool {
        let inner = graph.inner();
        let Some(start) = inner.node_indices().find(|&ix| ix != a && ix != b) else {
            return false;
        };
        let mut bfs = Bfs::new(inner, start);
        bfs.discovered.visit(a);
        bfs.discovered.visit(b);
        let mut reached = 0;
        while bfs.next(inner).is_some() {
            reached += 1;
        }
        reached < graph.vertex_count() - 2
    }
}

impl TwoCutFinder for PairwiseTwoCutFinder {
    fn find_two_cut(&self, graph: &BarcodeGraph) -> Option<(String, String)> {
        if graph.vertex_count() < 4 {
            return None;
        }
        let order: Vec<NodeIndex> = graph.inner().node_indices().collect();
        for (i, &a) in order.iter().enumerate() {
            for &b in &order[i + 1..] {
                if Self::separates(graph, a, b) {
                    return Some((graph.name_of(a).to_string(), graph.name_of(b).to_string()));
                }
            }
        }
        None
    }
}

/// Approximate triconnected decomposition.
///
/// Each biconnected component of three or more vertices is split once along a
/// 2-vertex cut when the finder supplies one: the pieces left after removing the
/// cut are emitted, followed by the cut pair itself. Not a canonical SPQR split.
pub fn triconnected_components(
    graph: &BarcodeGraph,
    finder: &dyn TwoCutFinder,
) -> Vec<Vec<String>> {
    let mut result = Vec::new();
    for component in decompose(graph).components {
        if component.len() < 3 {
            result.push(names(graph, &component));
            continue;
        }
        let sub = graph.induced_by_indices(&component);
        let Some((a, b)) = finder.find_two_cut(&sub) else {
            result.push(names(graph, &component));
            continue;
        };
        let cut: AHashSet<&str> = [a.as_str(), b.as_str()].into_iter().collect();
        let rest = sub.induced_subgraph(
            sub.vertex_names()
                .into_iter()
                .filter(|name| !cut.contains(name)),
        );
        let pieces = rest.connected_components();
        if pieces.len() <= 1 {
            result.push(names(graph, &component));
            continue;
        }
        result.extend(pieces);
        result.push(vec![a, b]);
    }
    result
}
