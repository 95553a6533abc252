pub mod configuration;
pub mod file_reader;
pub mod graph_io;

pub use configuration::{setup_logging, ConfigurationManager, PhyslrConfig};
pub use graph_io::{read_graph, write_graph, GraphFormat};
