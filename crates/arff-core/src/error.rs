//! Error types for arff-core

use crate::header::FileGroup;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in arff-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file has no `@data` marker line
    #[error("malformed ARFF file '{path}': no @data marker found")]
    MalformedFile { path: PathBuf },

    /// Input files declare different numbers of attributes
    #[error("input files have different numbers of attributes ({} groups)", groups.len())]
    AttributeCountMismatch { groups: Vec<FileGroup> },

    /// Input files declare different class values
    #[error("input files have different class declarations ({} groups)", groups.len())]
    ClassDeclarationMismatch { groups: Vec<FileGroup> },

    /// No ARFF files were found at the input location
    #[error("no .arff files found in '{location}'")]
    EmptyInput { location: PathBuf },

    /// The destination could not be written
    #[error("cannot write to '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested output file name is unusable
    #[error("invalid output file name '{name}': {reason}")]
    InvalidFileName { name: String, reason: String },

    /// Incomplete or contradictory run options
    #[error("{0}")]
    Usage(String),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short category name used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::FileRead { .. } => "FileRead",
            Error::MalformedFile { .. } => "MalformedFile",
            Error::AttributeCountMismatch { .. } => "AttributeCountMismatch",
            Error::ClassDeclarationMismatch { .. } => "ClassDeclarationMismatch",
            Error::EmptyInput { .. } => "EmptyInput",
            Error::OutputWrite { .. } => "OutputWrite",
            Error::InvalidFileName { .. } => "InvalidFileName",
            Error::Usage(_) => "Usage",
            Error::WalkDir(_) => "WalkDir",
            Error::Io(_) => "Io",
            Error::Json(_) => "Json",
        }
    }

    /// Grouped diagnostics for mismatch errors, empty for everything else
    pub fn groups(&self) -> &[FileGroup] {
        match self {
            Error::AttributeCountMismatch { groups }
            | Error::ClassDeclarationMismatch { groups } => groups,
            _ => &[],
        }
    }
}
