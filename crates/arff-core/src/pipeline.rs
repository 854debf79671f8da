//! End-to-end merge run: validate, merge, report

use crate::config::MergeConfig;
use crate::error::{Error, Result};
use crate::header::{check_consistency, display_name, scan_header};
use crate::merger::merge_batch;
use crate::notify::{NoticeLevel, Notifier};
use crate::report::{EntryStatus, Outcome, RunReport};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn};

/// A completed merge
#[derive(Debug)]
pub struct MergeSuccess {
    /// The merged ARFF file
    pub output_path: PathBuf,
    /// The persisted result report
    pub report_path: PathBuf,
    /// Total data rows written
    pub rows: usize,
    /// The run's audit trail
    pub report: RunReport,
}

/// An aborted merge. Validation failures never leave a merged file behind.
#[derive(Debug)]
pub struct MergeFailure {
    /// What went wrong
    pub error: Error,
    /// The persisted error report, when the output directory allowed one
    pub report_path: Option<PathBuf>,
    /// The run's audit trail
    pub report: RunReport,
}

impl fmt::Display for MergeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Result of a merge run
pub type MergeOutcome = std::result::Result<MergeSuccess, MergeFailure>;

/// Run a full merge.
///
/// The output file name and directory are checked before anything is read.
/// Any later failure leaves an error report in the output directory and no
/// merged file. Both outcomes are sent to `notifier`.
pub fn run_merge(config: &MergeConfig, notifier: &dyn Notifier) -> MergeOutcome {
    let span = info_span!("merge", output = %config.output_file_name);
    let _guard = span.enter();

    let mut report = RunReport::new();
    let mut config = config.clone();

    if let Err(error) = config.validate().and_then(|()| check_output_dir(&config)) {
        return Err(abort(error, report, None, notifier));
    }

    match execute(&config, &mut report) {
        Ok((output_path, rows)) => match report.persist(&config.output_dir, config.json_report) {
            Ok(report_path) => {
                notifier.notify(NoticeLevel::Info, &report.summary());
                info!(report = %report_path.display(), "result report written");
                Ok(MergeSuccess {
                    output_path,
                    report_path,
                    rows,
                    report,
                })
            }
            Err(error) => {
                // Without its result report the merge does not count
                discard_output(&output_path);
                report.fail(&error);
                let report_path = persist_error_report(&report, &config);
                Err(abort(error, report, report_path, notifier))
            }
        },
        Err(error) => {
            report.fail(&error);
            let report_path = persist_error_report(&report, &config);
            Err(abort(error, report, report_path, notifier))
        }
    }
}

fn persist_error_report(report: &RunReport, config: &MergeConfig) -> Option<PathBuf> {
    match report.persist(&config.output_dir, config.json_report) {
        Ok(path) => {
            info!(report = %path.display(), "error report written");
            Some(path)
        }
        Err(e) => {
            error!(error = %e, "could not write error report");
            None
        }
    }
}

fn discard_output(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "could not remove merged output");
    }
}

fn abort(
    error: Error,
    mut report: RunReport,
    report_path: Option<PathBuf>,
    notifier: &dyn Notifier,
) -> MergeFailure {
    if !matches!(report.outcome, Some(Outcome::Failure { .. })) {
        report.fail(&error);
    }
    error!(kind = error.kind(), "{}", error);
    notifier.notify(NoticeLevel::Error, &report.summary());
    MergeFailure {
        error,
        report_path,
        report,
    }
}

fn check_output_dir(config: &MergeConfig) -> Result<()> {
    let dir = &config.output_dir;
    let problem = match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => io::Error::other("not a directory"),
        Err(e) => e,
    };
    Err(Error::OutputWrite {
        path: dir.clone(),
        source: problem,
    })
}

/// Validation and merge stages. Nothing is written unless validation passes.
fn execute(config: &MergeConfig, report: &mut RunReport) -> Result<(PathBuf, usize)> {
    if config.input_paths.is_empty() {
        return Err(Error::EmptyInput {
            location: config.input_location(),
        });
    }
    info!(files = config.input_paths.len(), "validating headers");

    let mut scans = Vec::with_capacity(config.input_paths.len());
    for path in &config.input_paths {
        report.record(Some(&display_name(path)), EntryStatus::Attempted);
        let scan = scan_header(path)?;
        info!(file = %scan.file_name(), attributes = scan.attribute_count, "header parsed");
        scans.push(scan);
    }

    let batch = check_consistency(scans)?;
    for scan in &batch.files {
        report.record(Some(&scan.file_name()), EntryStatus::Validated);
    }

    let document = merge_batch(&batch, &config.output_file_name)?;
    for divergent in &document.divergent_attributes {
        report.record(
            Some(&divergent.file),
            EntryStatus::Warning {
                message: format!("attribute not in merged header: {}", divergent.line),
            },
        );
    }

    let output_path = config.output_path();
    document.write_to(&output_path)?;

    for file in &document.files {
        report.record(
            Some(&display_name(&file.source)),
            EntryStatus::Merged {
                rows: file.row_count(),
            },
        );
    }
    let merged_files = document.sources().into_iter().map(display_name).collect();

    let rows = document.data_row_count();
    report.succeed(output_path.clone(), merged_files, rows);
    Ok((output_path, rows))
}
