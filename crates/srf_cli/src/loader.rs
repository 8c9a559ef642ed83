//! Problem instance loading.
//!
//! Files:
//! - sequence / alignment strings: the first whitespace-delimited token
//! - graphs: one `from to weight` triple per line, `#` starts a comment
//!
//! Without an input file the commands use the synthetic generators below.

use std::path::Path;

use srf_core::problem::{parse_observations, AlignmentPair, Dag, Observation};

use crate::{CliError, Result};

fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Reads the first whitespace-delimited token of a file.
pub fn read_token(path: &Path) -> Result<String> {
    let content = read_file(path)?;
    content
        .split_whitespace()
        .next()
        .map(str::to_owned)
        .ok_or_else(|| CliError::parse(path, "file contains no token"))
}

/// Reads an observation sequence (`A`/`C`/`G`, anything else missing).
pub fn read_sequence(path: &Path) -> Result<Vec<Observation>> {
    Ok(parse_observations(&read_token(path)?))
}

/// Reads two alignment strings, one per file.
pub fn read_pair(a: &Path, b: &Path) -> Result<AlignmentPair> {
    Ok(AlignmentPair::new(read_token(a)?, read_token(b)?)?)
}

/// Reads a weighted DAG edge list.
pub fn read_graph(path: &Path) -> Result<Dag> {
    let content = read_file(path)?;
    let mut edges = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [from, to, weight] = fields.as_slice() else {
            return Err(CliError::parse(
                path,
                format!("line {}: expected `from to weight`, got {:?}", lineno + 1, line),
            ));
        };
        let bad = |what: &str, value: &str| {
            CliError::parse(path, format!("line {}: invalid {} {:?}", lineno + 1, what, value))
        };
        edges.push((
            from.parse::<usize>().map_err(|_| bad("node", *from))?,
            to.parse::<usize>().map_err(|_| bad("node", *to))?,
            weight.parse::<i64>().map_err(|_| bad("weight", *weight))?,
        ));
    }

    Ok(Dag::from_edges(&edges)?)
}

/// `len` observations: Walk, with Shop on every third step.
pub fn synthetic_sequence(len: usize) -> Vec<Observation> {
    (0..len)
        .map(|i| if i % 3 == 0 { Observation::SHOP } else { Observation::WALK })
        .collect()
}

/// `A` repeated `len` times with `T` on every fifth position, against `T`
/// repeated `len` times.
pub fn synthetic_pair(len: usize) -> Result<AlignmentPair> {
    let a: Vec<u8> = (0..len).map(|i| if i % 5 == 0 { b'T' } else { b'A' }).collect();
    Ok(AlignmentPair::new(a, vec![b'T'; len])?)
}

/// Chain `0 -> 1 -> ... -> nodes - 1` with unit weights.
pub fn synthetic_chain(nodes: usize) -> Result<Dag> {
    let edges: Vec<(usize, usize, i64)> = (1..nodes).map(|i| (i - 1, i, 1)).collect();
    if edges.is_empty() {
        return Err(CliError::InvalidArgument(format!(
            "a synthetic graph needs at least 2 nodes, got {}",
            nodes
        )));
    }
    Ok(Dag::from_edges(&edges)?)
}
