//! Input record reader for JSON-lines files.
//!
//! Each non-blank line holds one record, as a JSON object or a JSON array
//! tuple (see [`InputNode`] and [`InputEdge`]). Lines starting with `#` are
//! comments.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::{InputEdge, InputNode};

/// Reads node records from a JSON-lines file.
pub fn read_nodes(path: &Path) -> Result<Vec<InputNode>, AppError> {
    let nodes = read_json_lines(BufReader::new(File::open(path)?))?;
    tracing::info!("Read {} node record(s) from {}", nodes.len(), path.display());
    Ok(nodes)
}

/// Reads edge records from a JSON-lines file.
pub fn read_edges(path: &Path) -> Result<Vec<InputEdge>, AppError> {
    let edges = read_json_lines(BufReader::new(File::open(path)?))?;
    tracing::info!("Read {} edge record(s) from {}", edges.len(), path.display());
    Ok(edges)
}

/// Parses JSON-lines records from any buffered reader.
pub fn read_json_lines<T: DeserializeOwned, R: BufRead>(reader: R) -> Result<Vec<T>, AppError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record = serde_json::from_str(trimmed).map_err(|e| AppError::Record {
            line: index + 1,
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_mixed_forms_and_skips_comments() {
        let input = r#"
# proteins
["uniprot:P04637", "protein", {"length": 393}]
{"id": "ncbigene:7157", "label": "gene"}

["ncbitaxon:9606", "organism"]
"#;
        let nodes: Vec<InputNode> = read_json_lines(input.as_bytes()).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].label, "gene");
        assert_eq!(nodes[2].id, "ncbitaxon:9606");
    }

    #[test]
    fn test_reports_line_number() {
        let input = "{\"id\": \"a\", \"label\": \"protein\"}\nnot json\n";
        let err = read_json_lines::<InputNode, _>(input.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Record { line: 2, .. }));
    }

    #[test]
    fn test_reads_edges() {
        let input = "[null, \"ncbigene:7157\", \"uniprot:P04637\", \"Encodes\", {}]\n";
        let edges: Vec<InputEdge> = read_json_lines(input.as_bytes()).unwrap();
        assert_eq!(edges[0].target, "uniprot:P04637");
    }
}
