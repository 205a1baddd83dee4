//! DIMACS text import/export for colored, unlabeled graphs.
//!
//! ```text
//! c optional comment
//! p edge <vertices> <edges>
//! n <vertex> <label>
//! e <vertex> <vertex>
//! ```
//!
//! Vertex ids are 1-based on disk.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::storage::descriptor::GraphDescriptor;
use crate::types::{DejavuError, Result};

/// Writes `desc` to `path`. Edge-labeled descriptors are `Unsupported`.
pub fn write_dimacs(desc: &GraphDescriptor, path: &Path) -> Result<()> {
    if desc.is_edge_labeled() {
        return Err(DejavuError::Unsupported(
            "DIMACS export has no edge-label encoding",
        ));
    }
    let mut out = BufWriter::new(File::create(path)?);
    write_to(desc, &mut out)?;
    out.flush()?;
    debug!(
        path = %path.display(),
        vertices = desc.vertex_count(),
        edges = desc.edges().len(),
        "dimacs.write"
    );
    Ok(())
}

fn write_to<W: Write>(desc: &GraphDescriptor, out: &mut W) -> Result<()> {
    writeln!(out, "p edge {} {}", desc.vertex_count(), desc.edges().len())?;
    for (v, label) in desc.labels().iter().enumerate() {
        writeln!(out, "n {} {}", v + 1, label)?;
    }
    for &(a, b) in desc.edges() {
        writeln!(out, "e {} {}", a + 1, b + 1)?;
    }
    Ok(())
}

/// Reads a descriptor from `path`.
pub fn read_dimacs(path: &Path) -> Result<GraphDescriptor> {
    let reader = BufReader::new(File::open(path)?);
    let desc = read_from(reader)?;
    debug!(
        path = %path.display(),
        vertices = desc.vertex_count(),
        edges = desc.edges().len(),
        "dimacs.read"
    );
    Ok(desc)
}

fn read_from<R: BufRead>(reader: R) -> Result<GraphDescriptor> {
    let mut desc: Option<GraphDescriptor> = None;
    let mut declared_edges = 0usize;
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let mut fields = line.split_whitespace();
        let Some(tag) = fields.next() else {
            continue;
        };
        match tag {
            "c" => {}
            "p" => {
                if desc.is_some() {
                    return Err(parse_error(line_no, "duplicate problem line"));
                }
                if fields.next() != Some("edge") {
                    return Err(parse_error(line_no, "expected `p edge <n> <m>`"));
                }
                let n = field(&mut fields, line_no, "vertex count")?;
                declared_edges = usize::try_from(field(&mut fields, line_no, "edge count")?)
                    .map_err(|_| parse_error(line_no, "negative edge count"))?;
                desc = Some(
                    GraphDescriptor::with_signed_size(n)
                        .map_err(|err| parse_error(line_no, err.to_string()))?,
                );
            }
            "n" | "e" => {
                let g = desc
                    .as_mut()
                    .ok_or_else(|| parse_error(line_no, "record before problem line"))?;
                let first = field(&mut fields, line_no, "vertex")?.saturating_sub(1);
                let second = field(&mut fields, line_no, "value")?;
                let applied = if tag == "n" {
                    g.set_label(first, second)
                } else {
                    g.add_edge(first, second.saturating_sub(1))
                };
                applied.map_err(|err| parse_error(line_no, err.to_string()))?;
            }
            other => {
                return Err(parse_error(line_no, format!("unknown record `{other}`")));
            }
        }
    }
    let desc = desc.ok_or_else(|| parse_error(0, "missing problem line"))?;
    if desc.edges().len() != declared_edges {
        warn!(
            declared = declared_edges,
            found = desc.edges().len(),
            "dimacs edge count mismatch"
        );
    }
    Ok(desc)
}

fn field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    line: usize,
    what: &str,
) -> Result<i64> {
    let raw = fields
        .next()
        .ok_or_else(|| parse_error(line, format!("missing {what}")))?;
    raw.parse::<i64>()
        .map_err(|_| parse_error(line, format!("bad {what} `{raw}`")))
}

fn parse_error(line: usize, message: impl Into<String>) -> DejavuError {
    DejavuError::Parse {
        line,
        message: message.into(),
    }
}
