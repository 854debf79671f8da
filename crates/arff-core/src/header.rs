//! Header scanning and cross-file schema validation

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Marker line separating the header from the data rows
pub const DATA_MARKER: &str = "@data";

const ATTRIBUTE_KEYWORD: &str = "@attribute";
const RELATION_KEYWORD: &str = "@relation";
const CLASS_ATTRIBUTE: &str = "class";

/// Label used in reports for files that declare no class attribute
pub const NO_CLASS_LABEL: &str = "(no class)";

/// Classification of a single header line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    /// `@relation <name>`
    Relation,
    /// `@attribute <name> <type>`
    Attribute,
    /// `% ...`
    Comment,
    /// Empty or whitespace-only
    Blank,
    /// The `@data` marker
    DataMarker,
    /// Anything else
    Other,
}

/// Classify a line of an ARFF header. Keywords are case-insensitive.
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed.starts_with('%') {
        LineKind::Comment
    } else if trimmed.eq_ignore_ascii_case(DATA_MARKER) {
        LineKind::DataMarker
    } else if has_keyword(trimmed, ATTRIBUTE_KEYWORD) {
        LineKind::Attribute
    } else if has_keyword(trimmed, RELATION_KEYWORD) {
        LineKind::Relation
    } else {
        LineKind::Other
    }
}

fn has_keyword(trimmed: &str, keyword: &str) -> bool {
    match trimmed.get(..keyword.len()) {
        Some(head) if head.eq_ignore_ascii_case(keyword) => trimmed[keyword.len()..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace),
        _ => false,
    }
}

/// Byte-order mark some editors put at the start of a text file
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Split text into lines, keeping each line's terminator.
///
/// A leading byte-order mark is dropped so the first line classifies normally.
pub(crate) fn split_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .strip_prefix(BYTE_ORDER_MARK)
        .unwrap_or(content)
        .split_inclusive('\n')
}

/// Returns the attribute name of an `@attribute` line, without quotes
pub fn attribute_name(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if !has_keyword(trimmed, ATTRIBUTE_KEYWORD) {
        return None;
    }
    let rest = trimmed[ATTRIBUTE_KEYWORD.len()..].trim_start();
    let name = match rest.chars().next() {
        Some(quote @ ('\'' | '"')) => {
            let inner = &rest[1..];
            &inner[..inner.find(quote).unwrap_or(inner.len())]
        }
        _ => rest
            .split(|c: char| c.is_whitespace() || c == '{')
            .next()
            .unwrap_or(""),
    };
    Some(name)
}

fn is_class_declaration(line: &str) -> bool {
    attribute_name(line) == Some(CLASS_ATTRIBUTE)
}

/// Normalized value list of a class declaration.
///
/// `@attribute class { x, y }` becomes `{x,y}`. Values are compared
/// case-sensitively; only surrounding whitespace is dropped.
pub fn class_values(declaration: &str) -> String {
    let trimmed = declaration.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(open), Some(close)) if open < close => {
            let values: Vec<&str> = trimmed[open + 1..close].split(',').map(str::trim).collect();
            format!("{{{}}}", values.join(","))
        }
        _ => {
            // Non-nominal class (e.g. numeric): compare the type text
            let rest = trimmed.get(ATTRIBUTE_KEYWORD.len()..).unwrap_or("").trim_start();
            let type_text = match rest.chars().next() {
                Some(quote @ ('\'' | '"')) => rest[1..]
                    .find(quote)
                    .map(|i| &rest[i + 2..])
                    .unwrap_or(""),
                _ => rest
                    .split_once(char::is_whitespace)
                    .map(|(_, tail)| tail)
                    .unwrap_or(""),
            };
            type_text.trim().to_string()
        }
    }
}

/// Structural signature used to decide whether two files can be merged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSignature {
    /// Number of `@attribute` lines
    pub attribute_count: usize,
    /// Normalized class value list, if the file declares a class attribute
    pub class_values: Option<String>,
}

/// Result of scanning one file's header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderScan {
    /// Source file path
    pub path: PathBuf,
    /// Header lines up to and including the data marker, with terminators
    pub header_lines: Vec<String>,
    /// Number of attribute declarations
    pub attribute_count: usize,
    /// The class declaration line, trimmed
    pub class_declaration: Option<String>,
    /// Index of the first line after the data marker
    pub data_offset: usize,
}

impl HeaderScan {
    /// The file's structural signature
    pub fn signature(&self) -> AttributeSignature {
        AttributeSignature {
            attribute_count: self.attribute_count,
            class_values: self.class_declaration.as_deref().map(class_values),
        }
    }

    /// File name used in reports
    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }

    /// Attribute declaration lines in header order
    pub fn attribute_lines(&self) -> impl Iterator<Item = &str> {
        self.header_lines
            .iter()
            .map(String::as_str)
            .filter(|l| classify_line(l) == LineKind::Attribute)
    }
}

/// File name of a path, or the full path when it has none
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Scan the header of an ARFF file on disk
pub fn scan_header<P: AsRef<Path>>(path: P) -> Result<HeaderScan> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    scan_header_str(&content, path)
}

/// Scan the header of ARFF content held in memory
pub fn scan_header_str<P: AsRef<Path>>(content: &str, source: P) -> Result<HeaderScan> {
    let path = source.as_ref().to_path_buf();
    let mut header_lines = Vec::new();
    let mut attribute_count = 0;
    let mut class_declaration: Option<String> = None;

    for (index, line) in split_lines(content).enumerate() {
        header_lines.push(line.to_string());

        match classify_line(line) {
            LineKind::DataMarker => {
                debug!(
                    path = %path.display(),
                    attribute_count,
                    data_offset = index + 1,
                    "header scanned"
                );
                return Ok(HeaderScan {
                    path,
                    header_lines,
                    attribute_count,
                    class_declaration,
                    data_offset: index + 1,
                });
            }
            LineKind::Attribute => {
                attribute_count += 1;
                if class_declaration.is_none() && is_class_declaration(line) {
                    class_declaration = Some(line.trim().to_string());
                }
            }
            _ => {}
        }
    }

    Err(Error::MalformedFile { path })
}

/// Files sharing one distinct value of a checked property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileGroup {
    /// The distinct value (attribute count or class value list)
    pub value: String,
    /// File names that produced it, in input order
    pub files: Vec<String>,
}

/// Group scans by a key, preserving first-seen order of keys and files
fn group_by<F>(scans: &[HeaderScan], key: F) -> Vec<FileGroup>
where
    F: Fn(&HeaderScan) -> String,
{
    let mut groups: Vec<FileGroup> = Vec::new();
    for scan in scans {
        let value = key(scan);
        match groups.iter_mut().find(|g| g.value == value) {
            Some(group) => group.files.push(scan.file_name()),
            None => groups.push(FileGroup {
                value,
                files: vec![scan.file_name()],
            }),
        }
    }
    groups
}

/// A batch whose files all share one attribute signature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedBatch {
    /// Per-file scans, in input order
    pub files: Vec<HeaderScan>,
    /// The shared signature
    pub signature: AttributeSignature,
}

/// Check that all scanned files share one attribute count and one class
/// declaration. Attribute counts are checked first.
pub fn check_consistency(scans: Vec<HeaderScan>) -> Result<ValidatedBatch> {
    let count_groups = group_by(&scans, |s| s.attribute_count.to_string());
    if count_groups.len() > 1 {
        return Err(Error::AttributeCountMismatch {
            groups: count_groups,
        });
    }

    let class_groups = group_by(&scans, |s| {
        s.signature()
            .class_values
            .unwrap_or_else(|| NO_CLASS_LABEL.to_string())
    });
    if class_groups.len() > 1 {
        return Err(Error::ClassDeclarationMismatch {
            groups: class_groups,
        });
    }

    let signature = scans
        .first()
        .map(HeaderScan::signature)
        .unwrap_or(AttributeSignature {
            attribute_count: 0,
            class_values: None,
        });

    Ok(ValidatedBatch {
        files: scans,
        signature,
    })
}

/// Scan every file and check cross-file consistency
pub fn validate_files<P: AsRef<Path>>(paths: &[P]) -> Result<ValidatedBatch> {
    let mut scans = Vec::with_capacity(paths.len());
    for path in paths {
        let scan = scan_header(path)?;
        info!(
            file = %scan.file_name(),
            attributes = scan.attribute_count,
            "header parsed"
        );
        scans.push(scan);
    }
    check_consistency(scans)
}
