//! Barcode overlap graph construction from minimizer sketches.
//!
//! Markers owned by a single barcode carry no linkage and are dropped first. Markers
//! owned by unusually many barcodes are likely repeats: the owner-count distribution
//! is summarised by its quartiles and everything at or above the upper whisker
//! (or an explicit cap) is removed before edges are drawn.

use ahash::AHashSet;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::data_structures::{BarcodeGraph, VertexAttrs};
use crate::core::error::PhyslrError;
use crate::core::minimizer_index::{BarcodeId, MinimizerIndex};

/// Parameters of the repetitive-marker filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlapConfig {
    /// Whisker coefficient: the cap is `Q3 + coef * (Q3 - Q1)`
    pub coef: f64,
    /// Explicit cap on marker owner count; overrides the whisker
    pub max_count: Option<usize>,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            coef: 1.5,
            max_count: None,
        }
    }
}

/// Statistics collected while building an overlap graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapStats {
    pub barcodes: usize,
    pub markers: usize,
    pub singletons_removed: usize,
    pub q1: usize,
    pub q2: usize,
    pub q3: usize,
    pub whisker: usize,
    pub cap: usize,
    pub repetitive_removed: usize,
    pub edges: usize,
}

/// Nearest-rank quantile `sorted[round(p * (len - 1))]`, rounding half to even.
/// Returns 0 for empty input.
pub fn quantile(sorted: &[usize], p: f64) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (p * (sorted.len() - 1) as f64).round_ties_even() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (10_000.0 * part as f64 / whole as f64).round() / 100.0
    }
}

fn intersection_size(a: &AHashSet<u64>, b: &AHashSet<u64>) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|value| large.contains(value)).count()
}

/// Builds the barcode overlap graph
pub struct OverlapGraphBuilder {
    config: OverlapConfig,
}

impl OverlapGraphBuilder {
    pub fn new(config: OverlapConfig) -> Result<Self> {
        if !config.coef.is_finite() || config.coef < 0.0 {
            return Err(PhyslrError::ValidationError {
                field: "overlap.coef".to_string(),
                reason: format!("must be a non-negative number, got {}", config.coef),
            }
            .into());
        }
        Ok(Self { config })
    }

    /// Consume the index and build the overlap graph
    pub fn build(&self, mut index: MinimizerIndex) -> Result<(BarcodeGraph, OverlapStats)> {
        let inverse = index.invert();
        let mut stats = OverlapStats {
            barcodes: index.len(),
            markers: inverse.len(),
            ..Default::default()
        };

        let singletons: AHashSet<u64> = inverse
            .iter()
            .filter(|(_, owners)| owners.len() < 2)
            .map(|(&value, _)| value)
            .collect();
        index.remove_values(&singletons);
        stats.singletons_removed = singletons.len();
        info!(
            "🧹 Removed {} markers that occur only once of {} ({}%)",
            stats.singletons_removed,
            stats.markers,
            percent(stats.singletons_removed, stats.markers)
        );

        let mut shared: Vec<(u64, &Vec<BarcodeId>)> = inverse
            .iter()
            .filter(|(_, owners)| owners.len() >= 2)
            .map(|(&value, owners)| (value, owners))
            .collect();
        shared.sort_unstable_by_key(|&(value, _)| value);

        let mut frequencies: Vec<usize> = shared.iter().map(|(_, owners)| owners.len()).collect();
        frequencies.sort_unstable();
        stats.q1 = quantile(&frequencies, 0.25);
        stats.q2 = quantile(&frequencies, 0.5);
        stats.q3 = quantile(&frequencies, 0.75);
        stats.whisker =
            (stats.q3 as f64 + self.config.coef * (stats.q3 - stats.q1) as f64) as usize;
        stats.cap = self.config.max_count.unwrap_or(stats.whisker);
        info!(
            "📊 Marker frequency: Q1={} Q2={} Q3={} Q3+{}*(Q3-Q1)={} C={}",
            stats.q1, stats.q2, stats.q3, self.config.coef, stats.whisker, stats.cap
        );

        let repetitive: AHashSet<u64> = shared
            .iter()
            .filter(|(_, owners)| owners.len() >= stats.cap)
            .map(|&(value, _)| value)
            .collect();
        index.remove_values(&repetitive);
        stats.repetitive_removed = repetitive.len();
        info!(
            "🧹 Removed {} most frequent markers of {} ({}%)",
            stats.repetitive_removed,
            shared.len(),
            percent(stats.repetitive_removed, shared.len())
        );

        let mut graph = BarcodeGraph::with_capacity(index.len(), shared.len());
        let mut names: Vec<(&str, &AHashSet<u64>)> = index.iter().collect();
        names.sort_unstable_by(|a, b| a.0.cmp(b.0));
        for (barcode, sketch) in names {
            graph.add_vertex(barcode, VertexAttrs::new(sketch.len() as u32));
        }
        debug!("Added {} vertices", graph.vertex_count());

        let mut seen: AHashSet<(BarcodeId, BarcodeId)> = AHashSet::new();
        for (value, owners) in &shared {
            if repetitive.contains(value) {
                continue;
            }
            for (i, &a) in owners.iter().enumerate() {
                for &b in &owners[i + 1..] {
                    let key = if a < b { (a, b) } else { (b, a) };
                    if !seen.insert(key) {
                        continue;
                    }
                    let weight = intersection_size(index.sketch_by_id(a), index.sketch_by_id(b));
                    graph.add_edge(index.barcode(a), index.barcode(b), weight as u32)?;
                }
            }
        }
        stats.edges = graph.edge_count();
        info!(
            "✅ Constructed the overlap graph: {} vertices, {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );
        Ok((graph, stats))
    }
}
