//! Per-barcode minimizer sketches and the inverse minimizer → barcodes index.

use ahash::{AHashMap, AHashSet};
use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::error::PhyslrError;
use crate::utils::file_reader::{display_name, open_input};

/// Dense identifier of a barcode within one [`MinimizerIndex`]
pub type BarcodeId = u32;

/// Minimizer value → ids of the barcodes owning it (ascending, unique)
pub type InverseIndex = AHashMap<u64, Vec<BarcodeId>>;

/// Barcode → deduplicated set of minimizer values.
///
/// Barcodes are interned in first-seen order so the inverse index can store
/// compact ids instead of strings.
#[derive(Debug, Clone, Default)]
pub struct MinimizerIndex {
    barcodes: Vec<String>,
    ids: AHashMap<String, BarcodeId>,
    sketches: Vec<AHashSet<u64>>,
}

impl MinimizerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and merge sketch files. Each line is `barcode<TAB>v1 v2 ...`.
    pub fn read_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut index = Self::new();
        for path in paths {
            let path = path.as_ref();
            info!("📖 Reading {}", display_name(path).display());
            let reader = open_input(path)?;
            index.read_from(reader, &display_name(path))?;
            info!("✅ Read {} ({} barcodes so far)", display_name(path).display(), index.len());
        }
        Ok(index)
    }

    /// Accumulate records from a reader. Lines with fewer than two fields are skipped.
    pub fn read_from<R: BufRead>(&mut self, reader: R, source: &Path) -> Result<()> {
        for (i, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read {}", source.display()))?;
            let mut fields = line.split_whitespace();
            let Some(barcode) = fields.next() else {
                continue;
            };
            let mut values = Vec::new();
            for field in fields {
                let value = field.parse::<u64>().map_err(|_| PhyslrError::UnexpectedRow {
                    path: PathBuf::from(source),
                    line_number: i + 1,
                    line: line.clone(),
                    expected: "barcode followed by integer minimizers".to_string(),
                })?;
                values.push(value);
            }
            if values.is_empty() {
                continue;
            }
            self.insert(barcode, values);
        }
        Ok(())
    }

    /// Add minimizer values to a barcode's sketch
    pub fn insert<I: IntoIterator<Item = u64>>(&mut self, barcode: &str, values: I) {
        let id = match self.ids.get(barcode) {
            Some(&id) => id,
            None => {
                let id = self.barcodes.len() as BarcodeId;
                self.barcodes.push(barcode.to_string());
                self.ids.insert(barcode.to_string(), id);
                self.sketches.push(AHashSet::new());
                id
            }
        };
        self.sketches[id as usize].extend(values);
    }

    /// Number of barcodes
    pub fn len(&self) -> usize {
        self.barcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.barcodes.is_empty()
    }

    pub fn id(&self, barcode: &str) -> Option<BarcodeId> {
        self.ids.get(barcode).copied()
    }

    pub fn barcode(&self, id: BarcodeId) -> &str {
        &self.barcodes[id as usize]
    }

    pub fn sketch(&self, barcode: &str) -> Option<&AHashSet<u64>> {
        self.id(barcode).map(|id| &self.sketches[id as usize])
    }

    pub fn sketch_by_id(&self, id: BarcodeId) -> &AHashSet<u64> {
        &self.sketches[id as usize]
    }

    /// Barcodes with their sketches, in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AHashSet<u64>)> + '_ {
        self.barcodes
            .iter()
            .map(String::as_str)
            .zip(self.sketches.iter())
    }

    /// Build the inverse index: every minimizer value → the barcodes owning it
    pub fn invert(&self) -> InverseIndex {
        let mut inverse: InverseIndex = AHashMap::new();
        for (id, sketch) in self.sketches.iter().enumerate() {
            for &value in sketch {
                inverse.entry(value).or_default().push(id as BarcodeId);
            }
        }
        info!("🗂️  Indexed {} minimizers", inverse.len());
        inverse
    }

    /// Number of barcodes owning each minimizer value
    pub fn marker_counts(&self) -> AHashMap<u64, usize> {
        let mut counts: AHashMap<u64, usize> = AHashMap::new();
        for sketch in &self.sketches {
            for &value in sketch {
                *counts.entry(value).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Remove the given values from every sketch
    pub(crate) fn remove_values(&mut self, values: &AHashSet<u64>) {
        if values.is_empty() {
            return;
        }
        for sketch in &mut self.sketches {
            sketch.retain(|value| !values.contains(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_from(text: &str) -> MinimizerIndex {
        let mut index = MinimizerIndex::new();
        index
            .read_from(text.as_bytes(), Path::new("test.tsv"))
            .unwrap();
        index
    }

    #[test]
    fn test_read_accumulates_and_deduplicates() {
        let index = index_from("A\t1 2 3\nB\t2 3 4\nA\t3 5\n");
        assert_eq!(index.len(), 2);
        let a = index.sketch("A").unwrap();
        assert_eq!(a.len(), 4);
        assert!(a.contains(&5));
    }

    #[test]
    fn test_short_lines_are_skipped() {
        let index = index_from("Barcode\n\nA\t7\n");
        assert_eq!(index.len(), 1);
        assert!(index.sketch("Barcode").is_none());
    }

    #[test]
    fn test_bad_integer_is_fatal() {
        let mut index = MinimizerIndex::new();
        let result = index.read_from("A\t1 x 3\n".as_bytes(), Path::new("bad.tsv"));
        let message = result.unwrap_err().to_string();
        assert!(message.contains("bad.tsv:1"));
    }

    #[test]
    fn test_invert() {
        let index = index_from("A\t1 2\nB\t2 3\n");
        let inverse = index.invert();
        assert_eq!(inverse.len(), 3);
        let owners: Vec<&str> = inverse[&2].iter().map(|&id| index.barcode(id)).collect();
        assert_eq!(owners, vec!["A", "B"]);
        assert_eq!(inverse[&1].len(), 1);
    }

    #[test]
    fn test_marker_counts() {
        let index = index_from("A\t1 2\nB\t2 3\nC\t2\n");
        let counts = index.marker_counts();
        assert_eq!(counts[&2], 3);
        assert_eq!(counts[&3], 1);
    }
}
