//! Merge engine concatenating the data sections of a validated batch

use crate::error::{Error, Result};
use crate::header::{classify_line, display_name, split_lines, LineKind, ValidatedBatch};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An attribute line from a later file that is not part of the merged header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergentAttribute {
    /// File the line came from
    pub file: String,
    /// The attribute declaration
    pub line: String,
}

/// Data rows contributed by one input file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRows {
    /// Source file path
    pub source: PathBuf,
    /// Raw data lines, terminators included
    pub lines: Vec<String>,
}

impl FileRows {
    /// Number of instances (non-blank, non-comment lines)
    pub fn row_count(&self) -> usize {
        count_rows(&self.lines)
    }
}

/// The merged ARFF document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedDocument {
    /// Synthetic relation line, without terminator
    pub relation: String,
    /// Deduplicated header lines following the relation, ending with the data marker
    pub header: Vec<String>,
    /// Data rows per file, in merge order
    pub files: Vec<FileRows>,
    /// Attribute lines from later files that differ from the first file's
    pub divergent_attributes: Vec<DivergentAttribute>,
}

impl MergedDocument {
    /// Total number of data rows
    pub fn data_row_count(&self) -> usize {
        self.files.iter().map(FileRows::row_count).sum()
    }

    /// Files that contributed rows, in merge order
    pub fn sources(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.source.as_path()).collect()
    }

    /// Render the document as ARFF text
    pub fn render(&self) -> String {
        let mut out = String::new();
        push_line(&mut out, &self.relation);
        out.push('\n');
        for line in &self.header {
            push_line(&mut out, line);
        }
        for file in &self.files {
            for line in &file.lines {
                push_line(&mut out, line);
            }
        }
        out
    }

    /// Write the document in a single write
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.render()).map_err(|e| Error::OutputWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(output = %path.display(), rows = self.data_row_count(), "merged file written");
        Ok(())
    }
}

/// Append a line, terminating the previous one first if it lacked a newline
fn push_line(out: &mut String, line: &str) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(line);
}

fn count_rows(lines: &[String]) -> usize {
    lines
        .iter()
        .filter(|l| !matches!(classify_line(l), LineKind::Blank | LineKind::Comment))
        .count()
}

/// Relation line naming the merge
pub fn synthetic_relation(name: &str) -> String {
    format!("@relation {}", name)
}

fn line_text(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Build the merged header from the first file's header.
///
/// Relation lines are dropped. Attribute lines equal by text are kept once.
/// Attribute lines of later files not present in the first file are returned
/// as divergent; they are not added, since data rows carry one column per
/// attribute of the first file.
pub fn build_header(batch: &ValidatedBatch) -> (Vec<String>, Vec<DivergentAttribute>) {
    let mut header = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut divergent = Vec::new();

    let Some((first, rest)) = batch.files.split_first() else {
        return (header, divergent);
    };

    for line in &first.header_lines {
        match classify_line(line) {
            LineKind::Relation => continue,
            LineKind::Attribute => {
                if !seen.insert(line_text(line).to_string()) {
                    debug!(line = line_text(line), "duplicate attribute dropped");
                    continue;
                }
            }
            _ => {}
        }
        header.push(line.clone());
    }

    for scan in rest {
        for line in scan.attribute_lines() {
            if seen.insert(line_text(line).to_string()) {
                warn!(
                    file = %scan.file_name(),
                    line = line_text(line),
                    "attribute not in merged header"
                );
                divergent.push(DivergentAttribute {
                    file: scan.file_name(),
                    line: line_text(line).to_string(),
                });
            }
        }
    }

    (header, divergent)
}

/// Data lines of in-memory content, starting at `offset`
pub fn data_rows_str(content: &str, offset: usize) -> Vec<String> {
    split_lines(content).skip(offset).map(str::to_string).collect()
}

/// Read a file's data lines starting at its recorded data offset
pub fn read_data_rows<P: AsRef<Path>>(path: P, offset: usize) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(data_rows_str(&content, offset))
}

/// Assemble a merged document from a validated batch and per-file data lines
pub fn assemble(
    batch: &ValidatedBatch,
    relation_name: &str,
    rows: Vec<FileRows>,
) -> MergedDocument {
    let (header, divergent_attributes) = build_header(batch);
    MergedDocument {
        relation: synthetic_relation(relation_name),
        header,
        files: rows,
        divergent_attributes,
    }
}

/// Read every file's data rows and merge them under one header
pub fn merge_batch(batch: &ValidatedBatch, relation_name: &str) -> Result<MergedDocument> {
    let mut rows = Vec::with_capacity(batch.files.len());
    for scan in &batch.files {
        let lines = read_data_rows(&scan.path, scan.data_offset)?;
        let file_rows = FileRows {
            source: scan.path.clone(),
            lines,
        };
        info!(
            file = %display_name(&scan.path),
            rows = file_rows.row_count(),
            "data rows extracted"
        );
        rows.push(file_rows);
    }
    Ok(assemble(batch, relation_name, rows))
}
