//! CTF chunk references and subset selection
//!
//! Each line of the raw listing names one CTF and embeds the EPN that
//! produced it. Reprocessing every chunk would be far too slow, so the
//! subset keeps all chunks from the most productive EPN plus the first and
//! last chunk of the run, which delimit its time range.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{DeadmapError, Result};

/// Fixed pattern for the EPN identifier embedded in a CTF path
const NODE_PATTERN: &str = "epn[0-9]{3}";

/// Data-catalog path prefix as it appears in the listing
const CATALOG_PREFIX: &str = "/alice/";

/// Retrieval-URI prefix expected by the CTF reader
const URI_PREFIX: &str = "alien:///alice/";

/// One line of the raw CTF listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReference {
    /// Catalog path of the chunk
    pub path: String,
    /// EPN identifier extracted from the path
    pub node: String,
}

/// The EPN chosen to represent the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSelection {
    pub node: String,
    pub count: usize,
}

/// Parse the raw listing into chunk references.
///
/// A run with fewer than 3 chunks cannot be meaningfully processed; a line
/// without an EPN identifier means the listing format changed under us.
/// Both are fatal.
pub fn parse_chunks(lines: &[String]) -> Result<Vec<ChunkReference>> {
    if lines.len() < 3 {
        return Err(DeadmapError::InsufficientData { found: lines.len() });
    }

    let re = node_regex()?;
    lines
        .iter()
        .map(|line| {
            let node = re
                .find(line)
                .ok_or_else(|| DeadmapError::PatternExtraction { line: line.clone() })?
                .as_str()
                .to_string();
            Ok(ChunkReference {
                path: line.trim().to_string(),
                node,
            })
        })
        .collect()
}

/// Pick the EPN that produced the most chunks.
///
/// Counts are accumulated in first-seen order and compared strictly
/// greater-than, so ties resolve to the EPN that appears earliest in the
/// listing. Selection is deterministic for a given input.
pub fn select_node(chunks: &[ChunkReference]) -> Result<NodeSelection> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for chunk in chunks {
        match counts.iter_mut().find(|(node, _)| *node == chunk.node) {
            Some(entry) => entry.1 += 1,
            None => counts.push((chunk.node.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for &(node, count) in &counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((node, count));
        }
    }

    best.map(|(node, count)| NodeSelection {
        node: node.to_string(),
        count,
    })
    .ok_or(DeadmapError::InsufficientData { found: 0 })
}

/// Build the reprocessing subset: first chunk (if produced elsewhere), all
/// chunks from the selected EPN, last chunk (if produced elsewhere).
/// Paths are rewritten to retrieval-URI form on emission.
pub fn build_subset(chunks: &[ChunkReference], selection: &NodeSelection) -> Vec<String> {
    let (first, last) = match (chunks.first(), chunks.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Vec::new(),
    };

    let mut subset = Vec::with_capacity(selection.count + 2);
    if first.node != selection.node {
        subset.push(to_uri(&first.path));
    }
    for chunk in chunks {
        if chunk.node == selection.node {
            subset.push(to_uri(&chunk.path));
        }
    }
    if last.node != selection.node {
        subset.push(to_uri(&last.path));
    }
    subset
}

/// Persist the subset next to the full listing, named after the EPN.
pub fn write_subset(workdir: &Path, selection: &NodeSelection, subset: &[String]) -> Result<PathBuf> {
    let path = workdir.join(format!("alien_ctf_{}.dat", selection.node));
    let mut contents = subset.join("\n");
    contents.push('\n');
    fs::write(&path, contents)?;
    Ok(path)
}

fn to_uri(path: &str) -> String {
    path.replacen(CATALOG_PREFIX, URI_PREFIX, 1)
}

fn node_regex() -> Result<Regex> {
    Regex::new(NODE_PATTERN)
        .map_err(|e| DeadmapError::Other(format!("invalid EPN pattern: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(nodes: &[&str]) -> Vec<String> {
        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| format!("/alice/data/2024/LHC24af/123456/raw/{node}/o2_ctf_{i:04}.root"))
            .collect()
    }

    #[test]
    fn test_short_listing_is_fatal() {
        let lines = listing(&["epn001", "epn001"]);
        let err = parse_chunks(&lines).unwrap_err();
        assert!(matches!(err, DeadmapError::InsufficientData { found: 2 }));
    }

    #[test]
    fn test_line_without_node_is_fatal() {
        let mut lines = listing(&["epn001", "epn001"]);
        lines.push("/alice/data/2024/LHC24af/123456/raw/unknown/o2_ctf.root".to_string());
        let err = parse_chunks(&lines).unwrap_err();
        assert!(matches!(err, DeadmapError::PatternExtraction { .. }));
    }

    #[test]
    fn test_majority_node_selected() {
        let lines = listing(&["epn001", "epn002", "epn002", "epn002", "epn003"]);
        let chunks = parse_chunks(&lines).unwrap();
        let selection = select_node(&chunks).unwrap();
        assert_eq!(selection.node, "epn002");
        assert_eq!(selection.count, 3);
    }

    #[test]
    fn test_tie_breaks_to_first_seen() {
        let lines = listing(&["epn007", "epn003", "epn003", "epn007"]);
        let chunks = parse_chunks(&lines).unwrap();
        let selection = select_node(&chunks).unwrap();
        assert_eq!(selection.node, "epn007");
        assert_eq!(selection.count, 2);
    }

    #[test]
    fn test_selection_is_idempotent() {
        let lines = listing(&["epn005", "epn009", "epn009", "epn005", "epn001"]);
        let chunks = parse_chunks(&lines).unwrap();
        let first = select_node(&chunks).unwrap();
        for _ in 0..10 {
            assert_eq!(select_node(&chunks).unwrap(), first);
        }
    }

    #[test]
    fn test_subset_keeps_first_and_last_foreign_chunks() {
        let lines = listing(&["epn001", "epn002", "epn002", "epn002", "epn003"]);
        let chunks = parse_chunks(&lines).unwrap();
        let selection = select_node(&chunks).unwrap();
        let subset = build_subset(&chunks, &selection);
        assert_eq!(subset.len(), 5);
        assert!(subset[0].contains("epn001"));
        assert!(subset[4].contains("epn003"));
    }

    #[test]
    fn test_subset_does_not_duplicate_boundary_chunks() {
        let lines = listing(&["epn002", "epn002", "epn001", "epn002"]);
        let chunks = parse_chunks(&lines).unwrap();
        let selection = select_node(&chunks).unwrap();
        let subset = build_subset(&chunks, &selection);
        // first and last already belong to epn002
        assert_eq!(subset.len(), 3);
    }

    #[test]
    fn test_subset_rewrites_catalog_prefix() {
        let lines = listing(&["epn001", "epn002", "epn002"]);
        let chunks = parse_chunks(&lines).unwrap();
        let selection = select_node(&chunks).unwrap();
        let subset = build_subset(&chunks, &selection);
        for path in &subset {
            assert!(path.starts_with("alien:///alice/"), "not rewritten: {path}");
        }
    }

    #[test]
    fn test_dominant_node_scenario() {
        // 500 chunks, epn007 producing 480 of them
        let mut nodes = vec!["epn010"; 10];
        nodes.extend(vec!["epn007"; 480]);
        nodes.extend(vec!["epn011"; 10]);
        let lines = listing(&nodes);
        let chunks = parse_chunks(&lines).unwrap();
        let selection = select_node(&chunks).unwrap();
        assert_eq!(selection.node, "epn007");
        assert_eq!(selection.count, 480);
        let subset = build_subset(&chunks, &selection);
        // 480 majority chunks plus a foreign first and last
        assert_eq!(subset.len(), 482);
    }

    #[test]
    fn test_write_subset() {
        let dir = tempfile::tempdir().unwrap();
        let lines = listing(&["epn001", "epn002", "epn002"]);
        let chunks = parse_chunks(&lines).unwrap();
        let selection = select_node(&chunks).unwrap();
        let subset = build_subset(&chunks, &selection);
        let path = write_subset(dir.path(), &selection, &subset).unwrap();
        assert_eq!(path.file_name().unwrap(), "alien_ctf_epn002.dat");
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), subset.len());
    }
}
