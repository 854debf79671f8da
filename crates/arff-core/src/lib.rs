//! arff-core: Core library for validating and merging ARFF files
//!
//! This library provides functionality to:
//! - Discover `.arff` files in an input folder
//! - Scan headers and check that a batch shares one attribute count and class declaration
//! - Concatenate the data sections under one deduplicated header
//! - Keep a timestamped audit trail and persist result/error reports

pub mod config;
pub mod error;
pub mod header;
pub mod merger;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod scanner;

pub use config::{normalize_file_name, MergeConfig, MergeJob};
pub use error::{Error, Result};
pub use header::{
    check_consistency, scan_header, validate_files, AttributeSignature, FileGroup, HeaderScan,
    ValidatedBatch,
};
pub use merger::{merge_batch, MergedDocument};
pub use notify::{NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use pipeline::{run_merge, MergeFailure, MergeOutcome, MergeSuccess};
pub use report::{EntryStatus, Outcome, RunReport};
pub use scanner::discover_arff_files;
