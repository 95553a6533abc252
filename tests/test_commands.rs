//! End-to-end command tests
//! Each test parses a command line, runs it on temporary inputs and checks the output

use anyhow::Result;
use clap::Parser;
use physlr::pipeline::{execute, Cli};
use physlr::utils::configuration::ConfigurationManager;
use physlr::utils::graph_io::read_tsv_str;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const SKETCHES: &str = "A\t1 2 3 4\nB\t3 4 5 6\nC\t5 6 7 8\nD\t7 8 9 10\n";

fn run(args: &[&str]) -> Result<String> {
    let cli = Cli::parse_from(std::iter::once("physlr").chain(args.iter().copied()));
    let config = ConfigurationManager::create_minimal_config();
    let mut out = Vec::new();
    execute(&cli, &config, &mut out)?;
    Ok(String::from_utf8(out)?)
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[cfg(test)]
mod graph_command_tests {
    use super::*;

    #[test]
    fn test_overlap_command() -> Result<()> {
        let dir = tempdir()?;
        let sketches = write_file(&dir, "sketches.tsv", SKETCHES);
        let text = run(&["overlap", "-C", "100", arg(&sketches)])?;
        let graph = read_tsv_str(&text)?;
        assert_eq!(graph.vertex_names(), vec!["A", "B", "C", "D"]);
        assert_eq!(graph.edge_weight("A", "B"), Some(2));
        assert_eq!(graph.edge_weight("C", "D"), Some(2));
        assert!(!graph.has_edge("A", "C"));
        // Markers 1, 2, 9 and 10 occur once and are dropped
        assert_eq!(graph.vertex("A").unwrap().n, 2);
        Ok(())
    }

    #[test]
    fn test_overlap_then_backbone() -> Result<()> {
        let dir = tempdir()?;
        let sketches = write_file(&dir, "sketches.tsv", SKETCHES);
        let graph = write_file(&dir, "graph.tsv", &run(&["overlap", "-C", "100", arg(&sketches)])?);
        let text = run(&["backbone", arg(&graph)])?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0] == "A B C D" || lines[0] == "D C B A", "{text}");
        Ok(())
    }

    #[test]
    fn test_filter_command() -> Result<()> {
        let dir = tempdir()?;
        let graph = write_file(
            &dir,
            "graph.tsv",
            "U\tn\nA\t5\nB\t5\nC\t5\n\nU\tV\tn\nA\tB\t10\nB\tC\t2\n",
        );
        let text = run(&["filter", "-n", "5", arg(&graph)])?;
        assert_eq!(text, "U\tn\nA\t5\nB\t5\n\nU\tV\tn\nA\tB\t10\n");
        Ok(())
    }

    #[test]
    fn test_dot_output_format() -> Result<()> {
        let dir = tempdir()?;
        let graph = write_file(&dir, "graph.tsv", "U\tn\nA\t5\nB\t5\n\nU\tV\tn\nA\tB\t10\n");
        let text = run(&["-O", "gv", "mst", arg(&graph)])?;
        assert!(text.starts_with("strict graph {"));
        assert!(text.contains("\"A\" -- \"B\"\t[n=10];"));
        Ok(())
    }

    #[test]
    fn test_subgraph_distance_one() -> Result<()> {
        let dir = tempdir()?;
        let graph = write_file(
            &dir,
            "graph.tsv",
            "U\tn\nA\t1\nB\t1\nC\t1\nD\t1\n\nU\tV\tn\nA\tB\t1\nB\tC\t1\nC\tD\t1\n",
        );
        let text = run(&["subgraph", "-v", "B", "-d", "1", arg(&graph)])?;
        let sub = read_tsv_str(&text)?;
        assert_eq!(sub.vertex_count(), 3);
        assert!(!sub.contains_vertex("D"));

        let err = run(&["subgraph", "-v", "B", "-d", "2", arg(&graph)]).unwrap_err();
        assert!(err.to_string().contains("only -d0 and -d1 are currently supported"));
        Ok(())
    }

    #[test]
    fn test_count_molecules_adds_m_column() -> Result<()> {
        let dir = tempdir()?;
        let graph = write_file(&dir, "graph.tsv", "U\tn\nA\t1\nB\t1\n\nU\tV\tn\nA\tB\t3\n");
        let text = run(&["-t", "2", "count-molecules", arg(&graph)])?;
        assert!(text.starts_with("U\tn\tm\nA\t1\t0\nB\t1\t0\n"), "{text}");
        Ok(())
    }
}

#[cfg(test)]
mod sketch_command_tests {
    use super::*;

    #[test]
    fn test_count_markers() -> Result<()> {
        let dir = tempdir()?;
        let sketches = write_file(&dir, "sketches.tsv", "A\t1 2 3\nB\t2 3\nC\t3\n");
        let text = run(&["count-markers", arg(&sketches)])?;
        assert_eq!(text, "Marker\tCount\n2\t2\n3\t3\n");
        Ok(())
    }

    #[test]
    fn test_intersect_selected_barcodes() -> Result<()> {
        let dir = tempdir()?;
        let sketches = write_file(&dir, "sketches.tsv", "A\t1 2 3\nB\t2 3 4\nC\t9\n");
        let text = run(&["intersect", "-v", "A B C", arg(&sketches)])?;
        assert_eq!(text, "A\tB\t2 3\n");
        Ok(())
    }

    #[test]
    fn test_bed_overlap_writes_both_graphs() -> Result<()> {
        let dir = tempdir()?;
        let bed = write_file(
            &dir,
            "overlaps.bed",
            "chr1\t100\t1100\tAAA\t1\tchr1\t600\t1600\tBBB\t2\t500\n",
        );
        let prefix = dir.path().join("run");
        run(&["bed-overlap", "-p", arg(&prefix), arg(&bed)])?;
        let molecules = fs::read_to_string(dir.path().join("run.overlap_graph_molec.tsv"))?;
        let barcodes = fs::read_to_string(dir.path().join("run.overlap_graph.tsv"))?;
        assert!(molecules.contains("AAA_1\tBBB_2\t500"));
        assert!(barcodes.contains("AAA\tBBB\t500"));
        Ok(())
    }

    #[test]
    fn test_config_template_is_loadable() -> Result<()> {
        let dir = tempdir()?;
        let output = dir.path().join("physlr.toml");
        run(&["config", "-o", arg(&output)])?;
        let manager = ConfigurationManager::from_file(&output)?;
        assert_eq!(manager.config().performance.num_threads, 1);
        Ok(())
    }
}
