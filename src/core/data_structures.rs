//! Core data structures for barcode overlap graphs
//! Vertices are barcodes (or `<barcode>_<molecule>`), edges carry shared-marker counts

use ahash::{AHashMap, AHashSet};
use anyhow::Result;
use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use petgraph::visit::{Bfs, EdgeRef, IntoEdgeReferences, NodeIndexable, VisitMap, Visitable};
use std::collections::VecDeque;

use crate::core::error::PhyslrError;

/// Vertex attributes. The vocabulary is fixed: `n` is always present,
/// `m` appears after molecule counting and `l` only in BED-derived graphs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VertexAttrs {
    /// Number of markers (minimizers) owned by the barcode
    pub n: u32,
    /// Estimated number of molecules
    pub m: Option<u32>,
    /// Total molecule span length
    pub l: Option<u64>,
}

impl VertexAttrs {
    pub fn new(n: u32) -> Self {
        Self { n, m: None, l: None }
    }

    pub fn with_molecules(n: u32, m: u32) -> Self {
        Self {
            n,
            m: Some(m),
            l: None,
        }
    }

    /// Overwrite `n` and any optional attribute present in `other`
    fn merge(&mut self, other: VertexAttrs) {
        self.n = other.n;
        if other.m.is_some() {
            self.m = other.m;
        }
        if other.l.is_some() {
            self.l = other.l;
        }
    }
}

/// Edge attributes: `n` is the number of shared markers and is always positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeAttrs {
    pub n: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    pub name: String,
    pub attrs: VertexAttrs,
}

/// Simple weighted undirected graph keyed by barcode name.
///
/// Iteration order (vertices, neighbours, edges) follows node insertion order,
/// which is the tie-breaking order for every spanning tree and backbone
/// computation. [`BarcodeGraph::sorted`] rebuilds the graph in lexicographic order.
#[derive(Debug, Clone, Default)]
pub struct BarcodeGraph {
    graph: StableUnGraph<Vertex, EdgeAttrs>,
    index: AHashMap<String, NodeIndex>,
}

impl BarcodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, edges: usize) -> Self {
        Self {
            graph: StableUnGraph::with_capacity(vertices, edges),
            index: AHashMap::with_capacity(vertices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// True when the graph has no vertices at all
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains_vertex(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn vertex(&self, name: &str) -> Option<&VertexAttrs> {
        self.index.get(name).map(|&ix| &self.graph[ix].attrs)
    }

    pub fn vertex_mut(&mut self, name: &str) -> Option<&mut VertexAttrs> {
        match self.index.get(name) {
            Some(&ix) => Some(&mut self.graph[ix].attrs),
            None => None,
        }
    }

    /// Add a vertex, merging attributes into an existing vertex of the same name
    pub fn add_vertex(&mut self, name: &str, attrs: VertexAttrs) -> NodeIndex {
        if let Some(&ix) = self.index.get(name) {
            self.graph[ix].attrs.merge(attrs);
            return ix;
        }
        let ix = self.graph.add_node(Vertex {
            name: name.to_string(),
            attrs,
        });
        self.index.insert(name.to_string(), ix);
        ix
    }

    fn ensure_vertex(&mut self, name: &str) -> NodeIndex {
        match self.index.get(name) {
            Some(&ix) => ix,
            None => self.add_vertex(name, VertexAttrs::default()),
        }
    }

    fn check_edge(u: &str, v: &str, n: u32) -> Result<()> {
        if u == v {
            return Err(PhyslrError::SelfLoop(u.to_string()).into());
        }
        if n == 0 {
            return Err(PhyslrError::ZeroWeightEdge {
                u: u.to_string(),
                v: v.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Add an edge, creating missing endpoints with `n = 0`.
    /// An existing edge has its weight overwritten.
    pub fn add_edge(&mut self, u: &str, v: &str, n: u32) -> Result<()> {
        Self::check_edge(u, v, n)?;
        let a = self.ensure_vertex(u);
        let b = self.ensure_vertex(v);
        self.graph.update_edge(a, b, EdgeAttrs { n });
        Ok(())
    }

    /// Add an edge, summing the weight into an existing edge
    pub fn accumulate_edge(&mut self, u: &str, v: &str, n: u32) -> Result<()> {
        Self::check_edge(u, v, n)?;
        let a = self.ensure_vertex(u);
        let b = self.ensure_vertex(v);
        match self.graph.find_edge(a, b) {
            Some(e) => self.graph[e].n = self.graph[e].n.saturating_add(n),
            None => {
                self.graph.add_edge(a, b, EdgeAttrs { n });
            }
        }
        Ok(())
    }

    pub fn edge_weight(&self, u: &str, v: &str) -> Option<u32> {
        let a = *self.index.get(u)?;
        let b = *self.index.get(v)?;
        self.graph.find_edge(a, b).map(|e| self.graph[e].n)
    }

    pub fn has_edge(&self, u: &str, v: &str) -> bool {
        self.edge_weight(u, v).is_some()
    }

    /// Remove a vertex and its incident edges
    pub fn remove_vertex(&mut self, name: &str) -> bool {
        match self.index.remove(name) {
            Some(ix) => {
                self.graph.remove_node(ix);
                true
            }
            None => false,
        }
    }

    /// Remove every named vertex that exists; returns the number removed
    pub fn remove_vertices<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter(|name| self.remove_vertex(name.as_ref()))
            .count()
    }

    /// Remove edges for which the predicate returns true; returns the number removed
    pub fn remove_edges_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&str, &str, &EdgeAttrs) -> bool,
    {
        let doomed: Vec<_> = self
            .graph
            .edge_references()
            .filter(|e| {
                predicate(
                    &self.graph[e.source()].name,
                    &self.graph[e.target()].name,
                    e.weight(),
                )
            })
            .map(|e| e.id())
            .collect();
        for e in &doomed {
            self.graph.remove_edge(*e);
        }
        doomed.len()
    }

    /// Degree of a vertex; zero for an unknown vertex
    pub fn degree(&self, name: &str) -> usize {
        self.index
            .get(name)
            .map(|&ix| self.graph.neighbors(ix).count())
            .unwrap_or(0)
    }

    /// Neighbours in canonical order; empty for an unknown vertex
    pub fn neighbors(&self, name: &str) -> Vec<&str> {
        match self.index.get(name) {
            Some(&ix) => self
                .sorted_neighbors(ix)
                .into_iter()
                .map(|nb| self.graph[nb].name.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Vertices in canonical order
    pub fn vertices(&self) -> impl Iterator<Item = (&str, &VertexAttrs)> + '_ {
        self.graph
            .node_indices()
            .map(move |ix| (self.graph[ix].name.as_str(), &self.graph[ix].attrs))
    }

    pub fn vertex_names(&self) -> Vec<&str> {
        self.vertices().map(|(name, _)| name).collect()
    }

    /// Edges in canonical order: by first endpoint, then by neighbour, each edge once
    pub fn edges(&self) -> Vec<(&str, &str, u32)> {
        self.canonical_edges()
            .into_iter()
            .map(|(a, b, n)| (self.graph[a].name.as_str(), self.graph[b].name.as_str(), n))
            .collect()
    }

    /// Names of degree-zero vertices
    pub fn isolated_vertices(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&ix| self.graph.neighbors(ix).next().is_none())
            .map(|ix| self.graph[ix].name.clone())
            .collect()
    }

    /// Independent copy of the subgraph induced by `names`.
    /// Unknown names are ignored and the parent's vertex order is preserved.
    pub fn induced_subgraph<I, S>(&self, names: I) -> BarcodeGraph
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut members: Vec<NodeIndex> = names
            .into_iter()
            .filter_map(|name| self.index.get(name.as_ref()).copied())
            .collect();
        members.sort_unstable();
        members.dedup();
        self.induced_by_indices(&members)
    }

    /// Same vertices (and node indices) with only the given edges
    pub(crate) fn with_edges(&self, edges: &[(NodeIndex, NodeIndex, u32)]) -> BarcodeGraph {
        let mut out = self.clone();
        out.graph.clear_edges();
        for &(a, b, n) in edges {
            out.graph.add_edge(a, b, EdgeAttrs { n });
        }
        out
    }

    pub(crate) fn induced_by_indices(&self, members: &[NodeIndex]) -> BarcodeGraph {
        let keep: AHashSet<NodeIndex> = members.iter().copied().collect();
        let mut sub = BarcodeGraph::with_capacity(members.len(), members.len());
        for &ix in members {
            let vertex = &self.graph[ix];
            sub.add_vertex(&vertex.name, vertex.attrs);
        }
        for &a in members {
            for (b, attrs) in self.sorted_incident(a) {
                if b > a && keep.contains(&b) {
                    let (x, y) = (sub.index[&self.graph[a].name], sub.index[&self.graph[b].name]);
                    sub.graph.add_edge(x, y, attrs);
                }
            }
        }
        sub
    }

    /// Connected components as vertex names, in canonical order
    pub fn connected_components(&self) -> Vec<Vec<String>> {
        self.component_indices()
            .into_iter()
            .map(|component| {
                component
                    .into_iter()
                    .map(|ix| self.graph[ix].name.clone())
                    .collect()
            })
            .collect()
    }

    /// Rebuild with vertices in lexicographic order and edges inserted in that order,
    /// so tie-breaking no longer depends on how the graph was read.
    pub fn sorted(&self) -> BarcodeGraph {
        let mut order: Vec<NodeIndex> = self.graph.node_indices().collect();
        order.sort_by(|&a, &b| self.graph[a].name.cmp(&self.graph[b].name));

        let mut out = BarcodeGraph::with_capacity(self.vertex_count(), self.edge_count());
        for &ix in &order {
            out.add_vertex(&self.graph[ix].name, self.graph[ix].attrs);
        }
        for &a in &order {
            let mut nbs = self.sorted_incident(a);
            nbs.sort_by(|x, y| self.graph[x.0].name.cmp(&self.graph[y.0].name));
            for (b, attrs) in nbs {
                if self.graph[b].name > self.graph[a].name {
                    let (x, y) = (out.index[&self.graph[a].name], out.index[&self.graph[b].name]);
                    out.graph.add_edge(x, y, attrs);
                }
            }
        }
        out
    }

    // Index-level accessors shared with the graph algorithms.

    pub(crate) fn inner(&self) -> &StableUnGraph<Vertex, EdgeAttrs> {
        &self.graph
    }

    pub(crate) fn node_index(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    pub(crate) fn name_of(&self, ix: NodeIndex) -> &str {
        &self.graph[ix].name
    }

    pub(crate) fn node_bound(&self) -> usize {
        self.graph.node_bound()
    }

    pub(crate) fn sorted_neighbors(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        let mut nbs: Vec<NodeIndex> = self.graph.neighbors(ix).collect();
        nbs.sort_unstable();
        nbs
    }

    /// Neighbours of `ix` with the connecting edge's attributes, sorted by index
    pub(crate) fn sorted_incident(&self, ix: NodeIndex) -> Vec<(NodeIndex, EdgeAttrs)> {
        let mut incident: Vec<(NodeIndex, EdgeAttrs)> = self
            .graph
            .edges(ix)
            .map(|e| {
                let other = if e.source() == ix { e.target() } else { e.source() };
                (other, *e.weight())
            })
            .collect();
        incident.sort_unstable_by_key(|&(nb, _)| nb);
        incident
    }

    pub(crate) fn canonical_edges(&self) -> Vec<(NodeIndex, NodeIndex, u32)> {
        let mut edges = Vec::with_capacity(self.edge_count());
        for a in self.graph.node_indices() {
            for (b, attrs) in self.sorted_incident(a) {
                if b > a {
                    edges.push((a, b, attrs.n));
                }
            }
        }
        edges
    }

    /// Components with their members sorted by index, ordered by first member.
    /// One breadth-first search shares its visit map across all components.
    pub(crate) fn component_indices(&self) -> Vec<Vec<NodeIndex>> {
        let mut bfs = Bfs {
            stack: VecDeque::new(),
            discovered: self.graph.visit_map(),
        };
        let mut components = Vec::new();
        for start in self.graph.node_indices() {
            if !bfs.discovered.visit(start) {
                continue;
            }
            bfs.stack.push_back(start);
            let mut component = Vec::new();
            while let Some(ix) = bfs.next(&self.graph) {
                component.push(ix);
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }
}

impl PartialEq for BarcodeGraph {
    /// Graphs are equal when they hold the same vertices, attributes and weighted edges,
    /// regardless of insertion order.
    fn eq(&self, other: &Self) -> bool {
        if self.vertex_count() != other.vertex_count() || self.edge_count() != other.edge_count() {
            return false;
        }
        let same_vertices = self
            .vertices()
            .all(|(name, attrs)| other.vertex(name) == Some(attrs));
        same_vertices
            && self
                .edges()
                .into_iter()
                .all(|(u, v, n)| other.edge_weight(u, v) == Some(n))
    }
}

impl Eq for BarcodeGraph {}
