use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::core::minimizer_index::MinimizerIndex;
use crate::graph::backbone::{determine_backbones, maximum_spanning_forest};
use crate::graph::bed_overlap::{build_overlap_graphs, DEFAULT_MIN_OVERLAP, DEFAULT_PREFIX};
use crate::graph::connectivity::remove_cut_vertices;
use crate::graph::graph_filter::{apply_filters, filter_edges, FilterConfig};
use crate::graph::molecules::{build_molecule_graph, count_molecules, partition_all};
use crate::graph::overlap_graph::{OverlapConfig, OverlapGraphBuilder};
use crate::graph::queries::{
    backbone_graph, count_markers, extract_subgraph, intersect, tiling_graph,
};
use crate::utils::configuration::{generate_config_template, PhyslrConfig};
use crate::utils::file_reader::{display_name, open_input};
use crate::utils::graph_io::{prefixed_path, read_graph, write_graph, write_graph_file, GraphFormat};

#[derive(Parser, Debug)]
#[command(name = "physlr")]
#[command(about = "Construct and analyse barcode overlap graphs of linked reads")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Number of threads (overrides config)
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    /// Output graph format
    #[arg(
        short = 'O',
        long = "output-format",
        value_enum,
        global = true,
        default_value_t = GraphFormat::Tsv
    )]
    pub output_format: GraphFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the barcode overlap graph from minimizer sketches
    Overlap {
        /// Sketch files (`-` for stdin)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Ignore markers in Q3+c*(Q3-Q1) or more barcodes
        #[arg(short = 'c', long)]
        coef: Option<f64>,

        /// Ignore markers in C or more barcodes
        #[arg(short = 'C', long = "max-count")]
        max_count: Option<usize>,
    },

    /// Filter edges, high-molecule barcodes and small components
    Filter {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Remove edges with fewer than n shared markers
        #[arg(short = 'n', long = "min-n")]
        min_n: Option<u32>,

        /// Remove barcodes with M or more molecules
        #[arg(short = 'M', long = "max-molecules")]
        max_molecules: Option<u32>,

        /// Remove components with fewer than N vertices
        #[arg(long = "min-component-size")]
        min_component_size: Option<usize>,
    },

    /// Extract a vertex-induced subgraph
    Subgraph {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Space-separated vertices
        #[arg(short = 'v', long = "vertices", default_value = "")]
        vertices: String,

        /// Space-separated vertices to exclude
        #[arg(short = 'V', long = "exclude-vertices", default_value = "")]
        exclude_vertices: String,

        /// Include vertices within d edges (0 or 1)
        #[arg(short = 'd', long = "distance", default_value_t = 0)]
        distance: u32,
    },

    /// Maximum spanning forest
    Mst {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Backbone paths, one per line
    Backbone {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Subgraph induced by the backbone paths
    BackboneGraph {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove cut vertices, separating the biconnected components
    BiconnectedComponents {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Subgraph induced by the tiling paths between backbone ends
    TilingGraph {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short = 'n', long = "min-n", default_value_t = 0)]
        min_n: u32,
    },

    /// Estimate the number of molecules per barcode
    CountMolecules {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short = 'n', long = "min-n", default_value_t = 0)]
        min_n: u32,
    },

    /// Split barcodes into molecules
    Molecules {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short = 'n', long = "min-n", default_value_t = 0)]
        min_n: u32,
    },

    /// Count the barcodes owning each marker
    CountMarkers {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the markers shared by pairs of barcodes
    Intersect {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Report pairs with at least n shared markers
        #[arg(short = 'n', long = "min-n", default_value_t = 0)]
        min_n: usize,

        /// Space-separated barcodes to compare pairwise
        #[arg(short = 'v', long = "vertices")]
        vertices: Option<String>,
    },

    /// Build molecule and barcode overlap graphs from an interval-overlap BED file
    BedOverlap {
        /// Overlap BED file
        bed: PathBuf,

        /// Minimum overlap between molecules to create an edge
        #[arg(short = 'm', long = "min-overlap", default_value_t = DEFAULT_MIN_OVERLAP)]
        min_overlap: u32,

        /// Prefix for output files
        #[arg(short = 'p', long, default_value = DEFAULT_PREFIX)]
        prefix: String,
    },

    /// Write a configuration template
    Config {
        /// Output file
        #[arg(short, long, default_value = "physlr.toml")]
        output: PathBuf,
    },
}

fn split_list(list: &str) -> Vec<String> {
    list.split_whitespace().map(str::to_string).collect()
}

/// Run one command, writing its primary output to `out`
pub fn execute<W: Write>(cli: &Cli, config: &PhyslrConfig, out: &mut W) -> Result<()> {
    let format = cli.output_format;
    let threads = cli.threads.unwrap_or(config.performance.num_threads).max(1);

    match &cli.command {
        Commands::Overlap {
            files,
            coef,
            max_count,
        } => {
            let overlap = OverlapConfig {
                coef: coef.unwrap_or(config.overlap.coef),
                max_count: max_count.or(config.overlap.max_count),
            };
            let builder = OverlapGraphBuilder::new(overlap)?;
            let index = MinimizerIndex::read_files(files)?;
            let (graph, _) = builder.build(index)?;
            write_graph(&graph, out, format)?;
        }
        Commands::Filter {
            files,
            min_n,
            max_molecules,
            min_component_size,
        } => {
            let filter = FilterConfig {
                min_n: min_n.unwrap_or(config.filter.min_n),
                max_molecules: max_molecules.or(config.filter.max_molecules),
                min_component_size: min_component_size.unwrap_or(config.filter.min_component_size),
            };
            let mut graph = read_graph(files)?;
            apply_filters(&mut graph, &filter);
            write_graph(&graph, out, format)?;
        }
        Commands::Subgraph {
            files,
            vertices,
            exclude_vertices,
            distance,
        } => {
            let graph = read_graph(files)?;
            let subgraph = extract_subgraph(
                &graph,
                &split_list(vertices),
                &split_list(exclude_vertices),
                *distance,
            )?;
            write_graph(&subgraph, out, format)?;
        }
        Commands::Mst { files } => {
            let graph = read_graph(files)?;
            write_graph(&maximum_spanning_forest(&graph), out, format)?;
        }
        Commands::Backbone { files } => {
            let graph = read_graph(files)?;
            for path in determine_backbones(&graph) {
                writeln!(out, "{}", path.join(" "))?;
            }
        }
        Commands::BackboneGraph { files } => {
            let graph = read_graph(files)?;
            write_graph(&backbone_graph(&graph), out, format)?;
        }
        Commands::BiconnectedComponents { files } => {
            let mut graph = read_graph(files)?;
            remove_cut_vertices(&mut graph);
            write_graph(&graph, out, format)?;
        }
        Commands::TilingGraph { files, min_n } => {
            let graph = read_graph(files)?;
            write_graph(&tiling_graph(&graph, *min_n), out, format)?;
        }
        Commands::CountMolecules { files, min_n } => {
            let mut graph = read_graph(files)?;
            filter_edges(&mut graph, *min_n);
            info!("🧬 Separating barcodes into molecules");
            count_molecules(&mut graph, threads)?;
            write_graph(&graph, out, format)?;
        }
        Commands::Molecules { files, min_n } => {
            let mut graph = read_graph(files)?;
            filter_edges(&mut graph, *min_n);
            info!("🧬 Separating barcodes into molecules with {} threads", threads);
            let graph = Arc::new(graph);
            let partitions = partition_all(Arc::clone(&graph), threads)?;
            let molecules = build_molecule_graph(&graph, &partitions)?;
            write_graph(&molecules, out, format)?;
        }
        Commands::CountMarkers { files } => {
            let index = MinimizerIndex::read_files(files)?;
            writeln!(out, "Marker\tCount")?;
            for (marker, count) in count_markers(&index) {
                writeln!(out, "{marker}\t{count}")?;
            }
        }
        Commands::Intersect {
            files,
            min_n,
            vertices,
        } => {
            let index = MinimizerIndex::read_files(files)?;
            let listed = vertices.as_deref().map(split_list);
            for pair in intersect(&index, *min_n, listed.as_deref()) {
                let common: Vec<String> = pair.common.iter().map(u64::to_string).collect();
                writeln!(out, "{}\t{}\t{}", pair.u, pair.v, common.join(" "))?;
            }
        }
        Commands::BedOverlap {
            bed,
            min_overlap,
            prefix,
        } => {
            let reader = open_input(bed)?;
            let graphs = build_overlap_graphs(reader, &display_name(bed), *min_overlap)?;
            write_graph_file(
                &graphs.molecules,
                &prefixed_path(prefix, "overlap_graph_molec", format),
                format,
            )?;
            write_graph_file(
                &graphs.barcodes,
                &prefixed_path(prefix, "overlap_graph", format),
                format,
            )?;
        }
        Commands::Config { output } => {
            let template = generate_config_template(config)?;
            std::fs::write(output, template)
                .with_context(|| format!("Failed to write configuration: {}", output.display()))?;
            info!("💾 Configuration template written to {}", output.display());
        }
    }
    out.flush()?;
    Ok(())
}
