//! Molecule and barcode overlap graphs from pairwise molecule-interval overlaps.
//!
//! Input records come from intersecting a molecule BED file with itself and have
//! eleven tab-separated columns:
//! `chr1 start1 end1 bx1 mi1 chr2 start2 end2 bx2 mi2 overlap`.

use anyhow::Result;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::data_structures::{BarcodeGraph, VertexAttrs};
use crate::core::error::PhyslrError;

pub const DEFAULT_MIN_OVERLAP: u32 = 500;
pub const DEFAULT_PREFIX: &str = "barcode_overlap";

const EXPECTED_ROW: &str = "chr1 start1 end1 bx1 mi1 chr2 start2 end2 bx2 mi2 overlap";

#[derive(Debug, Clone, PartialEq, Eq)]
struct OverlapRecord {
    start1: u64,
    end1: u64,
    bx1: String,
    mi1: u64,
    start2: u64,
    bx2: String,
    mi2: u64,
    overlap: u32,
}

impl OverlapRecord {
    fn parse(line: &str, source: &Path, line_number: usize) -> Result<Self> {
        let error = || PhyslrError::UnexpectedRow {
            path: PathBuf::from(source),
            line_number,
            line: line.to_string(),
            expected: EXPECTED_ROW.to_string(),
        };
        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        if fields.len() < 11 {
            return Err(error().into());
        }
        let int = |i: usize| fields[i].trim().parse::<u64>().map_err(|_| error());
        let record = OverlapRecord {
            start1: int(1)?,
            end1: int(2)?,
            bx1: fields[3].to_string(),
            mi1: int(4)?,
            start2: int(6)?,
            bx2: fields[8].to_string(),
            mi2: int(9)?,
            overlap: fields[10].trim().parse::<u32>().map_err(|_| error())?,
        };
        if record.end1 < record.start1 {
            return Err(error().into());
        }
        Ok(record)
    }

    fn molecule1(&self) -> String {
        format!("{}_{}", self.bx1, self.mi1)
    }

    fn molecule2(&self) -> String {
        format!("{}_{}", self.bx2, self.mi2)
    }

    /// Each overlapping pair appears twice in the input; keep one orientation
    fn is_forward(&self) -> bool {
        self.start1 < self.start2 || (self.start1 == self.start2 && self.bx1 < self.bx2)
    }
}

/// The two graphs derived from one overlap file
#[derive(Debug, Clone, Default)]
pub struct BedOverlapGraphs {
    /// Vertices `<barcode>_<molecule>`, edges weighted by interval overlap
    pub molecules: BarcodeGraph,
    /// Vertices are barcodes, edge weights sum the overlaps of their molecules
    pub barcodes: BarcodeGraph,
    pub records: usize,
    pub skipped: usize,
}

/// Build molecule and barcode overlap graphs, skipping overlaps below `min_overlap`
pub fn build_overlap_graphs<R: BufRead>(
    reader: R,
    source: &Path,
    min_overlap: u32,
) -> Result<BedOverlapGraphs> {
    let mut graphs = BedOverlapGraphs::default();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = OverlapRecord::parse(&line, source, i + 1)?;
        graphs.records += 1;
        if record.overlap < min_overlap {
            graphs.skipped += 1;
            continue;
        }

        if record.mi1 == record.mi2 {
            let length = record.end1 - record.start1;
            let molecule = VertexAttrs {
                l: Some(length),
                ..VertexAttrs::default()
            };
            graphs.molecules.add_vertex(&record.molecule1(), molecule);
            let total = graphs
                .barcodes
                .vertex(&record.bx1)
                .and_then(|attrs| attrs.l)
                .unwrap_or(0)
                + length;
            graphs.barcodes.add_vertex(
                &record.bx1,
                VertexAttrs {
                    l: Some(total),
                    ..VertexAttrs::default()
                },
            );
        }

        if !record.is_forward() || record.overlap == 0 {
            continue;
        }
        let (m1, m2) = (record.molecule1(), record.molecule2());
        if m1 != m2 {
            graphs.molecules.add_edge(&m1, &m2, record.overlap)?;
        }
        if record.bx1 == record.bx2 {
            debug!("Skipping overlap within barcode {}", record.bx1);
            continue;
        }
        for barcode in [&record.bx1, &record.bx2] {
            if !graphs.barcodes.contains_vertex(barcode) {
                graphs.barcodes.add_vertex(
                    barcode,
                    VertexAttrs {
                        l: Some(0),
                        ..VertexAttrs::default()
                    },
                );
            }
        }
        graphs
            .barcodes
            .accumulate_edge(&record.bx1, &record.bx2, record.overlap)?;
    }
    info!(
        "✅ Read {} overlap records ({} below the minimum overlap of {})",
        graphs.records, graphs.skipped, min_overlap
    );
    info!(
        "🧬 Molecule graph: {} vertices, {} edges; barcode graph: {} vertices, {} edges",
        graphs.molecules.vertex_count(),
        graphs.molecules.edge_count(),
        graphs.barcodes.vertex_count(),
        graphs.barcodes.edge_count()
    );
    Ok(graphs)
}
