//! Input helpers shared by the sketch and graph readers.
//!
//! A path of `-` reads standard input, matching the command-line convention.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Open a file (or stdin for `-`) as a buffered reader
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open input: {}", path.display()))?;
    Ok(Box::new(BufReader::with_capacity(1 << 16, file)))
}

/// Read a whole input into memory
pub fn read_input_to_string(path: &Path) -> Result<String> {
    let mut reader = open_input(path)?;
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read input: {}", path.display()))?;
    Ok(content)
}

/// Display name for an input, used in log lines and parse errors
pub fn display_name(path: &Path) -> PathBuf {
    if path.as_os_str() == "-" {
        PathBuf::from("<stdin>")
    } else {
        path.to_path_buf()
    }
}
