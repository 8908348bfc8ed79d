//! Whitespace-delimited dataset records.
//!
//! All three input files share one layout: one record per line, fields
//! separated by any whitespace. Blank lines and lines starting with `#` are
//! skipped.
//!
//! | File | Record |
//! |------|--------|
//! | `label.txt` | `node label` |
//! | `feature.txt` | `node f1 f2 ... fd` |
//! | `network.txt` | `node_a node_b` or `node_a node_b weight` |

use crate::error::{Error, Result};
use std::path::Path;

/// One `(node, label)` pair. A node may appear in several records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRecord {
    pub node: String,
    pub label: String,
}

impl LabelRecord {
    pub fn new(node: impl Into<String>, label: impl Into<String>) -> Self {
        Self { node: node.into(), label: label.into() }
    }
}

/// One feature row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub node: String,
    pub values: Vec<f32>,
}

impl FeatureRecord {
    pub fn new(node: impl Into<String>, values: Vec<f32>) -> Self {
        Self { node: node.into(), values }
    }
}

/// One edge. `weight: None` means an unweighted edge (weight 1.0).
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub weight: Option<f64>,
}

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { source: source.into(), target: target.into(), weight: None }
    }

    pub fn weighted(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
        Self { source: source.into(), target: target.into(), weight: Some(weight) }
    }

    /// Effective weight.
    pub fn value(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

/// Read a dataset file into memory.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

/// Iterate `(line_number, fields)` over meaningful lines (1-based line numbers).
fn records(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines().enumerate().filter_map(|(i, line)| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            None
        } else {
            Some((i + 1, line.split_whitespace().collect()))
        }
    })
}

fn parse_error(origin: &str, line: usize, message: impl Into<String>) -> Error {
    Error::Parse { origin: origin.to_string(), line, message: message.into() }
}

/// Parse `label.txt` content.
pub fn parse_labels(text: &str, origin: &str) -> Result<Vec<LabelRecord>> {
    records(text)
        .map(|(line, fields)| match fields.as_slice() {
            [node, label] => Ok(LabelRecord::new(*node, *label)),
            _ => Err(parse_error(
                origin,
                line,
                format!("expected `node label`, found {} fields", fields.len()),
            )),
        })
        .collect()
}

/// Parse `feature.txt` content. Every row must have the same width.
pub fn parse_features(text: &str, origin: &str) -> Result<Vec<FeatureRecord>> {
    let mut rows: Vec<FeatureRecord> = Vec::new();
    let mut width: Option<usize> = None;

    for (line, fields) in records(text) {
        let Some((node, raw)) = fields.split_first() else {
            continue;
        };
        if raw.is_empty() {
            return Err(parse_error(origin, line, "feature row has no values"));
        }
        match width {
            Some(w) if w != raw.len() => {
                return Err(parse_error(
                    origin,
                    line,
                    format!("expected {w} feature values, found {}", raw.len()),
                ));
            }
            None => width = Some(raw.len()),
            _ => {}
        }

        let values = raw
            .iter()
            .map(|v| match v.parse::<f32>() {
                Ok(x) if x.is_finite() => Ok(x),
                _ => Err(parse_error(origin, line, format!("invalid feature value `{v}`"))),
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(FeatureRecord::new(*node, values));
    }

    Ok(rows)
}

/// Parse `network.txt` content.
///
/// The first record fixes the layout: two columns (unweighted) or three
/// (weighted). Mixing layouts in one file is an error.
pub fn parse_edges(text: &str, origin: &str) -> Result<Vec<EdgeRecord>> {
    let mut edges = Vec::new();
    let mut columns: Option<usize> = None;

    for (line, fields) in records(text) {
        let n = fields.len();
        if n != 2 && n != 3 {
            return Err(parse_error(
                origin,
                line,
                format!("expected 2 or 3 columns, found {n}"),
            ));
        }
        match columns {
            Some(c) if c != n => {
                return Err(parse_error(
                    origin,
                    line,
                    format!("expected {c} columns like the first edge, found {n}"),
                ));
            }
            None => columns = Some(n),
            _ => {}
        }

        let edge = if n == 3 {
            let weight = match fields[2].parse::<f64>() {
                Ok(w) if w.is_finite() => w,
                _ => {
                    return Err(parse_error(
                        origin,
                        line,
                        format!("invalid edge weight `{}`", fields[2]),
                    ))
                }
            };
            EdgeRecord::weighted(fields[0], fields[1], weight)
        } else {
            EdgeRecord::new(fields[0], fields[1])
        };
        edges.push(edge);
    }

    Ok(edges)
}

/// Read and parse a label file.
pub fn read_labels(path: &Path) -> Result<Vec<LabelRecord>> {
    parse_labels(&read_text(path)?, &path.display().to_string())
}

/// Read and parse a feature file.
pub fn read_features(path: &Path) -> Result<Vec<FeatureRecord>> {
    parse_features(&read_text(path)?, &path.display().to_string())
}

/// Read and parse an edge list.
pub fn read_edges(path: &Path) -> Result<Vec<EdgeRecord>> {
    parse_edges(&read_text(path)?, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_skip_comments_and_blanks() {
        let text = "# header\n\na l1\n  b   l2  \nb l1\n";
        let labels = parse_labels(text, "label.txt").unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[1], LabelRecord::new("b", "l2"));
    }

    #[test]
    fn test_labels_reject_extra_columns() {
        let err = parse_labels("a l1 extra\n", "label.txt").unwrap_err();
        match err {
            Error::Parse { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_features_fixed_width() {
        let rows = parse_features("a 1 0 0.5\nb 0 1 2\n", "feature.txt").unwrap();
        assert_eq!(rows[0].values, vec![1.0, 0.0, 0.5]);

        let err = parse_features("a 1 0\nb 0 1 2\n", "feature.txt").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_features_reject_garbage() {
        assert!(parse_features("a 1 x\n", "feature.txt").is_err());
        assert!(parse_features("a\n", "feature.txt").is_err());
    }

    #[test]
    fn test_edges_unweighted_and_weighted() {
        let unweighted = parse_edges("a b\nb c\n", "network.txt").unwrap();
        assert_eq!(unweighted[0].value(), 1.0);
        assert_eq!(unweighted[1].weight, None);

        let weighted = parse_edges("a b 0.25\nb c 3\n", "network.txt").unwrap();
        assert_eq!(weighted[0].weight, Some(0.25));
        assert_eq!(weighted[1].value(), 3.0);
    }

    #[test]
    fn test_edges_reject_mixed_layout() {
        let err = parse_edges("a b\nb c 2.0\n", "network.txt").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
        assert!(parse_edges("a\n", "network.txt").is_err());
        assert!(parse_edges("a b nan\n", "network.txt").is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_labels(Path::new("/definitely/not/here/label.txt")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
