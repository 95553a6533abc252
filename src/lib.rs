//! # physlr
//!
//! Physical maps from linked reads. Barcodes sharing minimizers are joined in a
//! weighted overlap graph, which is filtered, split into molecules by cut-vertex
//! analysis and reduced to backbone paths through maximum spanning trees.

pub mod core;
pub mod graph;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types at crate level
pub use crate::core::data_structures::{BarcodeGraph, EdgeAttrs, VertexAttrs};
pub use crate::core::error::PhyslrError;
pub use crate::core::minimizer_index::MinimizerIndex;
pub use crate::utils::graph_io::GraphFormat;

/// Result type used throughout the crate
pub type Result<T> = anyhow::Result<T>;

/// Error type used throughout the crate
pub type Error = anyhow::Error;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_result_type() -> Result<()> {
        let success: Result<i32> = Ok(42);
        let error: Result<i32> = Err(anyhow::anyhow!("test error"));

        assert_eq!(success?, 42);
        assert!(error.unwrap_err().to_string().contains("test error"));
        Ok(())
    }

    #[test]
    fn test_typed_errors_convert() {
        let error: Error = PhyslrError::SelfLoop("AAAC".to_string()).into();
        assert!(error.downcast_ref::<PhyslrError>().is_some());
    }

    #[test]
    fn test_module_exports() {
        let mut graph = BarcodeGraph::new();
        graph.add_vertex("A", VertexAttrs::new(3));
        assert_eq!(graph.vertex_count(), 1);
        assert_eq!("gv".parse::<GraphFormat>().unwrap(), GraphFormat::Gv);
        assert!(MinimizerIndex::new().is_empty());
    }
}
