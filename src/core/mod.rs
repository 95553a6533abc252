pub mod data_structures;
pub mod error;
pub mod minimizer_index;

// Re-export the graph model and sketch index
pub use data_structures::{BarcodeGraph, EdgeAttrs, Vertex, VertexAttrs};
pub use error::PhyslrError;
pub use minimizer_index::{BarcodeId, InverseIndex, MinimizerIndex};
