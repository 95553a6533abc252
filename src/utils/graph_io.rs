//! Graph serialization: the tabular (TSV) format and the GraphViz-style structured format.
//!
//! TSV layout:
//!
//! ```text
//! U	n	m
//! A	3	1
//! B	2	1
//!
//! U	V	n
//! A	B	5
//! ```
//!
//! The vertex header is `U\tn` optionally followed by `m` and/or `l` columns. Edge rows are
//! written with `u < v`. Structured files are `strict graph { ... }` with
//! `[n=...]` attribute lists.
//! Parsing is strict: any malformed header or row aborts the whole read.

use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::core::data_structures::{BarcodeGraph, VertexAttrs};
use crate::core::error::PhyslrError;
use crate::utils::file_reader::{display_name, read_input_to_string};

const EDGE_HEADER: &str = "U\tV\tn";
const VERTEX_HEADERS: [&str; 4] = ["U\tn", "U\tn\tm", "U\tn\tl", "U\tn\tm\tl"];
const MISSING: &str = ".";

/// Output graph format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum GraphFormat {
    /// Tab-separated vertex and edge tables
    #[default]
    Tsv,
    /// GraphViz `strict graph`
    #[value(alias = "dot")]
    Gv,
}

impl FromStr for GraphFormat {
    type Err = PhyslrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tsv" => Ok(GraphFormat::Tsv),
            "gv" | "dot" => Ok(GraphFormat::Gv),
            other => Err(PhyslrError::UnknownOutputFormat(other.to_string())),
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphFormat::Tsv => write!(f, "tsv"),
            GraphFormat::Gv => write!(f, "gv"),
        }
    }
}

impl GraphFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            GraphFormat::Tsv => "tsv",
            GraphFormat::Gv => "dot",
        }
    }
}

/// Write a graph in the requested format
pub fn write_graph<W: Write>(graph: &BarcodeGraph, out: &mut W, format: GraphFormat) -> Result<()> {
    match format {
        GraphFormat::Tsv => write_tsv(graph, out),
        GraphFormat::Gv => write_dot(graph, out),
    }
}

/// Write a graph to a file
pub fn write_graph_file(graph: &BarcodeGraph, path: &Path, format: GraphFormat) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create graph file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_graph(graph, &mut writer, format)?;
    writer.flush()?;
    info!(
        "💾 Wrote {} vertices and {} edges to {}",
        graph.vertex_count(),
        graph.edge_count(),
        path.display()
    );
    Ok(())
}

fn optional_cell<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// Write the TSV format. The `m` and `l` columns appear when any vertex carries them.
pub fn write_tsv<W: Write>(graph: &BarcodeGraph, out: &mut W) -> Result<()> {
    let has_m = graph.vertices().any(|(_, attrs)| attrs.m.is_some());
    let has_l = graph.vertices().any(|(_, attrs)| attrs.l.is_some());

    write!(out, "U\tn")?;
    if has_m {
        write!(out, "\tm")?;
    }
    if has_l {
        write!(out, "\tl")?;
    }
    writeln!(out)?;

    for (name, attrs) in graph.vertices() {
        write!(out, "{}\t{}", name, attrs.n)?;
        if has_m {
            write!(out, "\t{}", optional_cell(attrs.m))?;
        }
        if has_l {
            write!(out, "\t{}", optional_cell(attrs.l))?;
        }
        writeln!(out)?;
    }

    writeln!(out, "\n{EDGE_HEADER}")?;
    for (u, v, n) in graph.edges() {
        let (u, v) = if u <= v { (u, v) } else { (v, u) };
        writeln!(out, "{u}\t{v}\t{n}")?;
    }
    Ok(())
}

fn quote(id: &str) -> String {
    format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Write the structured `strict graph` format
pub fn write_dot<W: Write>(graph: &BarcodeGraph, out: &mut W) -> Result<()> {
    writeln!(out, "strict graph {{")?;
    for (name, attrs) in graph.vertices() {
        let mut list = format!("n={}", attrs.n);
        if let Some(m) = attrs.m {
            list.push_str(&format!(", m={m}"));
        }
        if let Some(l) = attrs.l {
            list.push_str(&format!(", l={l}"));
        }
        writeln!(out, "\t{}\t[{}];", quote(name), list)?;
    }
    for (u, v, n) in graph.edges() {
        let (u, v) = if u <= v { (u, v) } else { (v, u) };
        writeln!(out, "\t{} -- {}\t[n={}];", quote(u), quote(v), n)?;
    }
    writeln!(out, "}}")?;
    Ok(())
}

/// Read and merge one or more graph files, detecting each file's format.
///
/// When any structured file was read the merged graph is re-sorted by vertex name,
/// so spanning tree and backbone tie-breaks do not depend on the file layout.
pub fn read_graph<P: AsRef<Path>>(paths: &[P]) -> Result<BarcodeGraph> {
    let mut graph = BarcodeGraph::new();
    let mut read_structured = false;
    for path in paths {
        let path = path.as_ref();
        let name = display_name(path);
        info!("📖 Reading {}", name.display());
        let content = read_input_to_string(path)?;
        match detect_format(&content, &name)? {
            GraphFormat::Tsv => parse_tsv(&content, &name, &mut graph)?,
            GraphFormat::Gv => {
                parse_dot(&content, &name, &mut graph)?;
                read_structured = true;
            }
        }
    }
    info!(
        "✅ Read {} vertices and {} edges",
        graph.vertex_count(),
        graph.edge_count()
    );
    if read_structured {
        debug!("Sorting the vertices");
        graph = graph.sorted();
    }
    Ok(graph)
}

fn detect_format(content: &str, source: &Path) -> Result<GraphFormat> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('U') {
        return Ok(GraphFormat::Tsv);
    }
    let first_word = trimmed.split_whitespace().next().unwrap_or("");
    if first_word == "strict" || first_word == "graph" || first_word.starts_with("graph{") {
        return Ok(GraphFormat::Gv);
    }
    Err(PhyslrError::UnknownInputFormat {
        path: source.to_path_buf(),
        start: content.lines().next().unwrap_or("").to_string(),
    }
    .into())
}

/// Parse a TSV graph from a string
pub fn read_tsv_str(content: &str) -> Result<BarcodeGraph> {
    let mut graph = BarcodeGraph::new();
    parse_tsv(content, Path::new("<string>"), &mut graph)?;
    Ok(graph)
}

/// Parse a structured graph from a string
pub fn read_dot_str(content: &str) -> Result<BarcodeGraph> {
    let mut graph = BarcodeGraph::new();
    parse_dot(content, Path::new("<string>"), &mut graph)?;
    Ok(graph.sorted())
}

fn row_error(source: &Path, line_number: usize, line: &str, expected: &str) -> anyhow::Error {
    PhyslrError::UnexpectedRow {
        path: source.to_path_buf(),
        line_number,
        line: line.to_string(),
        expected: expected.to_string(),
    }
    .into()
}

fn header_error(source: &Path, line_number: usize, line: &str, expected: &str) -> anyhow::Error {
    PhyslrError::UnexpectedHeader {
        path: source.to_path_buf(),
        line_number,
        line: line.to_string(),
        expected: expected.to_string(),
    }
    .into()
}

fn parse_count<T: FromStr>(
    field: &str,
    source: &Path,
    line_number: usize,
    line: &str,
) -> Result<T> {
    field
        .parse::<T>()
        .map_err(|_| row_error(source, line_number, line, "non-negative integer attributes"))
}

fn parse_optional<T: FromStr>(
    field: Option<&&str>,
    source: &Path,
    line_number: usize,
    line: &str,
) -> Result<Option<T>> {
    match field {
        None => Ok(None),
        Some(&MISSING) => Ok(None),
        Some(value) => parse_count(value, source, line_number, line).map(Some),
    }
}

/// Parse a TSV graph, merging it into `graph`
pub fn parse_tsv(content: &str, source: &Path, graph: &mut BarcodeGraph) -> Result<()> {
    let mut lines: Vec<&str> = content.lines().collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    let header = lines.first().copied().unwrap_or("");
    if !VERTEX_HEADERS.contains(&header) {
        return Err(header_error(source, 1, header, "U\\tn or U\\tn\\tm"));
    }
    let columns: Vec<&str> = header.split('\t').collect();
    let m_column = columns.iter().position(|&c| c == "m");
    let l_column = columns.iter().position(|&c| c == "l");
    let vertex_shape = header.replace('\t', " ");

    let mut reading_vertices = true;
    let mut i = 1;
    while i < lines.len() {
        let line = lines[i];
        let line_number = i + 1;
        if line.is_empty() {
            if !reading_vertices {
                return Err(row_error(source, line_number, line, "U V n"));
            }
            let next = lines.get(i + 1).copied().unwrap_or("");
            if next != EDGE_HEADER {
                return Err(header_error(source, line_number + 1, next, "U\\tV\\tn"));
            }
            reading_vertices = false;
            i += 2;
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if reading_vertices {
            if fields.len() < 2 || fields.len() > columns.len() {
                return Err(row_error(source, line_number, line, &vertex_shape));
            }
            let attrs = VertexAttrs {
                n: parse_count(fields[1], source, line_number, line)?,
                m: parse_optional(m_column.and_then(|c| fields.get(c)), source, line_number, line)?,
                l: parse_optional(l_column.and_then(|c| fields.get(c)), source, line_number, line)?,
            };
            graph.add_vertex(fields[0], attrs);
        } else {
            if fields.len() != 3 {
                return Err(row_error(source, line_number, line, "U V n"));
            }
            let n: u32 = parse_count(fields[2], source, line_number, line)?;
            graph
                .add_edge(fields[0], fields[1], n)
                .with_context(|| format!("{}:{}", source.display(), line_number))?;
        }
        i += 1;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Id(String),
    Quoted(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Equals,
    Semicolon,
    Comma,
    EdgeOp,
}

/// Remainder of the text from the next newline on
fn skip_line(rest: &str) -> &str {
    rest.find('\n').map_or("", |at| &rest[at..])
}

/// Byte length of the bare identifier at the start of `rest`.
/// A `-` continues the identifier unless it starts an edge operator.
fn id_len(rest: &str) -> usize {
    let mut chars = rest.char_indices().peekable();
    while let Some((at, ch)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        let continues = ch.is_alphanumeric()
            || ch == '_'
            || ch == '.'
            || (ch == '-' && !matches!(next, Some('-' | '>')));
        if !continues {
            return at;
        }
    }
    rest.len()
}

fn tokenize(content: &str, source: &Path) -> Result<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut rest = content;
    while let Some(c) = rest.chars().next() {
        match c {
            '\n' => {
                line += 1;
                rest = &rest[1..];
            }
            c if c.is_whitespace() => rest = &rest[c.len_utf8()..],
            '#' => rest = skip_line(rest),
            '/' if rest.starts_with("//") => rest = skip_line(rest),
            '/' if rest.starts_with("/*") => {
                let body = &rest[2..];
                let end = body.find("*/").unwrap_or(body.len());
                line += body[..end].matches('\n').count();
                rest = body.get(end + 2..).unwrap_or("");
            }
            '{' | '}' | '[' | ']' | '=' | ';' | ',' => {
                let token = match c {
                    '{' => Token::LBrace,
                    '}' => Token::RBrace,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '=' => Token::Equals,
                    ';' => Token::Semicolon,
                    _ => Token::Comma,
                };
                tokens.push((token, line));
                rest = &rest[1..];
            }
            '-' if rest.starts_with("--") => {
                tokens.push((Token::EdgeOp, line));
                rest = &rest[2..];
            }
            '-' if rest.starts_with("->") => {
                return Err(row_error(source, line, "->", "undirected edges (--)"));
            }
            '"' => {
                let start_line = line;
                let quoted = &rest[1..];
                let mut value = String::new();
                let mut chars = quoted.char_indices().peekable();
                let end = loop {
                    match chars.next() {
                        None => return Err(row_error(source, start_line, &value, "closing quote")),
                        Some((at, '"')) => break at,
                        Some((_, '\\')) if matches!(chars.peek(), Some((_, '"' | '\\'))) => {
                            if let Some((_, escaped)) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        Some((_, ch)) => {
                            if ch == '\n' {
                                line += 1;
                            }
                            value.push(ch);
                        }
                    }
                };
                rest = &quoted[end + 1..];
                tokens.push((Token::Quoted(value), start_line));
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' || c == '-' => {
                let len = id_len(rest);
                tokens.push((Token::Id(rest[..len].to_string()), line));
                rest = &rest[len..];
            }
            other => {
                return Err(row_error(source, line, &other.to_string(), "a GraphViz statement"));
            }
        }
    }
    Ok(tokens)
}

struct DotParser<'a> {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    source: &'a Path,
}

impl<'a> DotParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, line)| *line)
            .unwrap_or(1)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn error(&self, expected: &str) -> anyhow::Error {
        let found = self
            .peek()
            .map(|t| format!("{t:?}"))
            .unwrap_or_else(|| "end of input".to_string());
        row_error(self.source, self.line(), &found, expected)
    }

    fn id(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Id(s)) | Some(Token::Quoted(s)) => {
                let s = s.clone();
                self.pos += 1;
                Some(s)
            }
            _ => None,
        }
    }

    /// Parse `[k=v, k=v; ...]` lists, possibly repeated
    fn attributes(&mut self) -> Result<Vec<(String, String)>> {
        let mut attrs = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.pos += 1;
            loop {
                match self.peek() {
                    Some(Token::RBracket) => {
                        self.pos += 1;
                        break;
                    }
                    Some(Token::Comma) | Some(Token::Semicolon) => self.pos += 1,
                    _ => {
                        let key = self.id().ok_or_else(|| self.error("attribute name"))?;
                        if self.next() != Some(Token::Equals) {
                            return Err(self.error("="));
                        }
                        let value = self.id().ok_or_else(|| self.error("attribute value"))?;
                        attrs.push((key, value));
                    }
                }
            }
        }
        Ok(attrs)
    }

    fn integer<T: FromStr>(
        &self,
        attrs: &[(String, String)],
        key: &str,
        line: usize,
    ) -> Result<Option<T>> {
        match attrs.iter().rev().find(|(k, _)| k == key) {
            None => Ok(None),
            Some((_, value)) => value
                .parse::<T>()
                .map(Some)
                .map_err(|_| {
                    row_error(self.source, line, value, &format!("integer attribute {key}"))
                }),
        }
    }

    fn graph(&mut self, graph: &mut BarcodeGraph) -> Result<()> {
        let expected_header = "strict graph {";
        if matches!(self.peek(), Some(Token::Id(s)) if s == "strict") {
            self.pos += 1;
        }
        match self.next() {
            Some(Token::Id(s)) if s == "graph" => {}
            _ => {
                return Err(header_error(self.source, self.line(), "", expected_header));
            }
        }
        self.id();
        if self.next() != Some(Token::LBrace) {
            return Err(header_error(self.source, self.line(), "", expected_header));
        }

        loop {
            let line = self.line();
            match self.peek() {
                None => return Err(self.error("}")),
                Some(Token::RBrace) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::Semicolon) | Some(Token::Comma) => self.pos += 1,
                Some(Token::Id(_)) | Some(Token::Quoted(_)) => {
                    let is_keyword = matches!(
                        self.peek(),
                        Some(Token::Id(s)) if s == "graph" || s == "node" || s == "edge"
                    );
                    let first = self.id().ok_or_else(|| self.error("identifier"))?;
                    if self.peek() == Some(&Token::Equals) {
                        self.pos += 1;
                        self.id().ok_or_else(|| self.error("attribute value"))?;
                        continue;
                    }
                    if is_keyword && self.peek() == Some(&Token::LBracket) {
                        self.attributes()?;
                        continue;
                    }
                    let mut chain = vec![first];
                    while self.peek() == Some(&Token::EdgeOp) {
                        self.pos += 1;
                        chain.push(self.id().ok_or_else(|| self.error("vertex identifier"))?);
                    }
                    let attrs = self.attributes()?;
                    if chain.len() == 1 {
                        let name = &chain[0];
                        match self.integer::<u32>(&attrs, "n", line)? {
                            Some(n) => {
                                let vertex = VertexAttrs {
                                    n,
                                    m: self.integer(&attrs, "m", line)?,
                                    l: self.integer(&attrs, "l", line)?,
                                };
                                graph.add_vertex(name, vertex);
                            }
                            None => {
                                if !graph.contains_vertex(name) {
                                    graph.add_vertex(name, VertexAttrs::default());
                                }
                            }
                        }
                    } else {
                        let n = self
                            .integer::<u32>(&attrs, "n", line)?
                            .ok_or_else(|| {
                                let row = chain.join(" -- ");
                                row_error(self.source, line, &row, "edge attribute n")
                            })?;
                        for pair in chain.windows(2) {
                            graph
                                .add_edge(&pair[0], &pair[1], n)
                                .with_context(|| format!("{}:{}", self.source.display(), line))?;
                        }
                    }
                }
                Some(_) => return Err(self.error("statement")),
            }
        }
        Ok(())
    }
}

/// Parse a structured graph, merging it into `graph`
pub fn parse_dot(content: &str, source: &Path, graph: &mut BarcodeGraph) -> Result<()> {
    let tokens = tokenize(content, source)?;
    let mut parser = DotParser {
        tokens,
        pos: 0,
        source,
    };
    parser.graph(graph)
}

/// Resolve an output path for a `<prefix>.<stem>.<ext>` style file
pub fn prefixed_path(prefix: &str, stem: &str, format: GraphFormat) -> PathBuf {
    PathBuf::from(format!("{prefix}.{stem}.{}", format.extension()))
}
