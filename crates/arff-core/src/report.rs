//! Run reporting: an append-only audit trail persisted as timestamped files
//!
//! A report is created when a run starts, receives one entry per file per
//! stage, and is finalized with either a success or a failure outcome.
//! Persisting writes `<PREFIX>_<YYYY-MM-DD_HH-MM-SS>.txt` (and optionally a
//! `.json` twin) into the output directory.

use crate::error::{Error, Result};
use crate::header::FileGroup;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name prefix of failure reports
pub const ERROR_REPORT_PREFIX: &str = "ARFFMERGER_ERROR";

/// File name prefix of success reports
pub const RESULT_REPORT_PREFIX: &str = "ARFFMERGER_RESULT";

/// Timestamp format embedded in report file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const ENTRY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Status recorded for a file at one stage of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    /// Header scan started
    Attempted,
    /// Header parsed and accepted
    Validated,
    /// Data rows appended to the merged output
    Merged { rows: usize },
    /// File caused the run to fail
    Rejected { reason: String },
    /// Non-fatal observation
    Warning { message: String },
}

/// One line of the audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    /// When the entry was recorded
    pub timestamp: DateTime<Local>,
    /// File the entry refers to, if any
    pub file: Option<String>,
    /// What happened
    #[serde(flatten)]
    pub status: EntryStatus,
}

/// Terminal outcome of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// Merge completed
    Success {
        /// Path of the merged file
        output: PathBuf,
        /// Merged file names, in merge order
        merged_files: Vec<String>,
        /// Total data rows written
        rows: usize,
    },
    /// Run aborted
    Failure {
        /// Error category (e.g. `AttributeCountMismatch`)
        kind: String,
        /// Human-readable reason
        message: String,
        /// Grouped diagnostics for mismatches
        groups: Vec<FileGroup>,
    },
}

/// Audit trail for one merge run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// When the run started; also stamps the report file name
    pub started_at: DateTime<Local>,
    /// Ordered status entries
    pub entries: Vec<ReportEntry>,
    /// Terminal outcome, set once
    pub outcome: Option<Outcome>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    /// Start a new report stamped with the current time
    pub fn new() -> Self {
        Self::started_at(Local::now())
    }

    /// Start a new report with an explicit start time
    pub fn started_at(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            entries: Vec::new(),
            outcome: None,
        }
    }

    /// Append an entry
    pub fn record(&mut self, file: Option<&str>, status: EntryStatus) {
        self.entries.push(ReportEntry {
            timestamp: Local::now(),
            file: file.map(str::to_string),
            status,
        });
    }

    /// Finalize as a success
    pub fn succeed(&mut self, output: PathBuf, merged_files: Vec<String>, rows: usize) {
        self.outcome = Some(Outcome::Success {
            output,
            merged_files,
            rows,
        });
    }

    /// Finalize as a failure caused by `error`
    pub fn fail(&mut self, error: &Error) {
        if let Error::MalformedFile { path } | Error::FileRead { path, .. } = error {
            let file = crate::header::display_name(path);
            self.record(
                Some(&file),
                EntryStatus::Rejected {
                    reason: error.to_string(),
                },
            );
        }
        for group in error.groups() {
            for file in &group.files {
                self.record(
                    Some(file),
                    EntryStatus::Rejected {
                        reason: format!("{} group '{}'", error.kind(), group.value),
                    },
                );
            }
        }
        self.outcome = Some(Outcome::Failure {
            kind: error.kind().to_string(),
            message: failure_message(error),
            groups: error.groups().to_vec(),
        });
    }

    /// True once finalized as a success
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Some(Outcome::Success { .. }))
    }

    /// File name prefix matching the outcome
    pub fn prefix(&self) -> &'static str {
        if self.is_success() {
            RESULT_REPORT_PREFIX
        } else {
            ERROR_REPORT_PREFIX
        }
    }

    /// The user-facing summary, also sent to the notification sink
    pub fn summary(&self) -> String {
        match &self.outcome {
            Some(Outcome::Success {
                output,
                merged_files,
                ..
            }) => format!(
                "Merging successful.\nFiles merged:\n\n{}\n\nFile saved with name: {}",
                quote_list(merged_files),
                crate::header::display_name(output)
            ),
            Some(Outcome::Failure {
                kind,
                message,
                groups,
            }) => {
                let label = if kind == "AttributeCountMismatch" {
                    "-attribute files"
                } else {
                    " class files"
                };
                let mut text = message.clone();
                for group in groups {
                    text.push_str(&format!(
                        "\n\n{}{}:\n{}",
                        group.value,
                        label,
                        quote_list(&group.files)
                    ));
                }
                text
            }
            None => "Merge run did not finish.".to_string(),
        }
    }

    /// Full text of the report file
    pub fn render_text(&self) -> String {
        let mut text = self.summary();
        text.push_str("\n\nRun log:\n");
        for entry in &self.entries {
            text.push_str(&format!(
                "{} {}{}\n",
                entry.timestamp.format(ENTRY_TIMESTAMP_FORMAT),
                entry.file.as_deref().map(|f| format!("{f}: ")).unwrap_or_default(),
                describe(&entry.status)
            ));
        }
        text
    }

    /// Write the report into `dir`, returning the text report's path.
    ///
    /// With `with_json`, a JSON copy is written beside it under the same stem.
    pub fn persist<P: AsRef<Path>>(&self, dir: P, with_json: bool) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let (path, mut file) = create_unique(dir, self.prefix(), &self.started_at)?;
        let written = file
            .write_all(self.render_text().as_bytes())
            .map_err(|e| Error::OutputWrite {
                path: path.clone(),
                source: e,
            })
            .and_then(|()| {
                if with_json {
                    self.write_json(&path.with_extension("json"))
                } else {
                    Ok(())
                }
            });
        drop(file);

        // A half-written report must not survive
        if let Err(e) = written {
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        Ok(path)
    }

    fn write_json(&self, json_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(json_path, content).map_err(|e| Error::OutputWrite {
            path: json_path.to_path_buf(),
            source: e,
        })
    }
}

/// Report file name for a prefix and timestamp
pub fn report_file_name(prefix: &str, time: &DateTime<Local>) -> String {
    format!("{}_{}.txt", prefix, time.format(FILE_TIMESTAMP_FORMAT))
}

/// Create a report file that does not exist yet, appending `_<n>` on collision
fn create_unique(
    dir: &Path,
    prefix: &str,
    time: &DateTime<Local>,
) -> Result<(PathBuf, std::fs::File)> {
    let base = report_file_name(prefix, time);
    let stem = base.trim_end_matches(".txt");
    let mut attempt = 1;
    loop {
        let path = if attempt == 1 {
            dir.join(&base)
        } else {
            dir.join(format!("{}_{}.txt", stem, attempt))
        };
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(Error::OutputWrite { path, source: e }),
        }
    }
}

fn failure_message(error: &Error) -> String {
    match error {
        Error::AttributeCountMismatch { .. } => concat!(
            "Merging procedure cannot continue while input files ",
            "have different numbers of attributes."
        )
        .to_string(),
        Error::ClassDeclarationMismatch { .. } => concat!(
            "Merging procedure cannot continue while input files ",
            "have different class declarations."
        )
        .to_string(),
        other => format!("Merging procedure cannot continue: {}", other),
    }
}

fn describe(status: &EntryStatus) -> String {
    match status {
        EntryStatus::Attempted => "attempted".to_string(),
        EntryStatus::Validated => "header validated".to_string(),
        EntryStatus::Merged { rows } => format!("merged ({} rows)", rows),
        EntryStatus::Rejected { reason } => format!("rejected: {}", reason),
        EntryStatus::Warning { message } => format!("warning: {}", message),
    }
}

fn quote_list(files: &[String]) -> String {
    files
        .iter()
        .map(|f| format!("'{}'", f))
        .collect::<Vec<_>>()
        .join(", ")
}
