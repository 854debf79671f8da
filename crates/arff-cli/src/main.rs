//! ARFF Merger CLI
//!
//! Command-line tool for validating and merging ARFF files that share one schema.

mod logging;

use arff_core::merger::{read_data_rows, FileRows};
use arff_core::{
    discover_arff_files, run_merge, scan_header, validate_files, Error, MergeJob, NoticeLevel,
    Notifier,
};
use clap::{Args, Parser, Subcommand};
use logging::{init_logging, LogFormat};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "arff-merge")]
#[command(about = "Validate and merge ARFF files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormat,
}

/// Where the input files come from
#[derive(Args)]
struct InputArgs {
    /// Folder containing .arff files
    #[arg(short, long, conflicts_with = "file")]
    input: Option<PathBuf>,

    /// Explicit input files, merged in the order given
    #[arg(short, long)]
    file: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge ARFF files into one output file
    Merge {
        #[command(flatten)]
        inputs: InputArgs,

        /// Job file (JSON); command-line options override its values
        #[arg(short, long)]
        job: Option<PathBuf>,

        /// Output directory for the merged file and reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Merged file name (no spaces or special characters)
        #[arg(short, long)]
        name: Option<String>,

        /// Also write the run report as JSON
        #[arg(long)]
        json_report: bool,
    },

    /// Check that ARFF files can be merged without writing anything
    Validate {
        #[command(flatten)]
        inputs: InputArgs,
    },

    /// List the ARFF files found in a folder
    Scan {
        /// Folder to scan
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show header details of a single ARFF file
    Inspect {
        /// Path to ARFF file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Create a merge job file template
    CreateJob {
        /// Output path for the job file
        #[arg(short, long)]
        output: PathBuf,

        /// Folder containing .arff files
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for the merge
        #[arg(long)]
        output_dir: PathBuf,

        /// Merged file name
        #[arg(short, long, default_value = "merged")]
        name: String,
    },
}

/// Prints run outcomes to the terminal
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => println!("{}", message),
            NoticeLevel::Error => eprintln!("{}", message),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> arff_core::Result<ExitCode> {
    let result = match command {
        Commands::Merge {
            inputs,
            job,
            output_dir,
            name,
            json_report,
        } => {
            let merged = cmd_merge(inputs, job, output_dir, name, json_report)?;
            return Ok(if merged {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Commands::Validate { inputs } => cmd_validate(inputs),
        Commands::Scan { input } => cmd_scan(&input),
        Commands::Inspect { file } => cmd_inspect(&file),
        Commands::CreateJob {
            output,
            input,
            output_dir,
            name,
        } => cmd_create_job(&output, input, output_dir, name),
    };
    result.map(|()| ExitCode::SUCCESS)
}

fn missing(what: &str) -> Error {
    Error::Usage(format!("{} is required (pass it or set it in a job file)", what))
}

/// Returns `false` when the run failed; the notifier has reported it already.
fn cmd_merge(
    inputs: InputArgs,
    job: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    name: Option<String>,
    json_report: bool,
) -> arff_core::Result<bool> {
    let mut job = match job {
        Some(path) => MergeJob::load(path)?,
        None => MergeJob {
            input_dir: None,
            files: Vec::new(),
            output_dir: output_dir.clone().ok_or_else(|| missing("--output-dir"))?,
            output_name: name.clone().ok_or_else(|| missing("--name"))?,
            json_report,
        },
    };

    // Command-line values win over the job file
    if let Some(dir) = inputs.input {
        job.input_dir = Some(dir);
        job.files.clear();
    }
    if !inputs.file.is_empty() {
        job.files = inputs.file;
    }
    if let Some(dir) = output_dir {
        job.output_dir = dir;
    }
    if let Some(name) = name {
        job.output_name = name;
    }
    job.json_report |= json_report;

    if job.input_dir.is_none() && job.files.is_empty() {
        return Err(missing("--input or --file"));
    }

    let config = job.into_config()?;
    let Ok(success) = run_merge(&config, &ConsoleNotifier) else {
        return Ok(false);
    };

    println!();
    println!("Wrote {} rows to {}", success.rows, success.output_path.display());
    println!("Report: {}", success.report_path.display());

    Ok(true)
}

fn resolve_inputs(inputs: InputArgs) -> arff_core::Result<Vec<PathBuf>> {
    let files = match inputs.input {
        Some(dir) => {
            let files = discover_arff_files(&dir, &[])?;
            if files.is_empty() {
                return Err(Error::EmptyInput { location: dir });
            }
            files
        }
        None => inputs.file,
    };
    if files.is_empty() {
        return Err(missing("--input or --file"));
    }
    Ok(files)
}

fn cmd_validate(inputs: InputArgs) -> arff_core::Result<()> {
    let files = resolve_inputs(inputs)?;

    match validate_files(&files) {
        Ok(batch) => {
            println!("{} files can be merged", batch.files.len());
            println!("Attributes: {}", batch.signature.attribute_count);
            println!(
                "Class: {}",
                batch
                    .signature
                    .class_values
                    .as_deref()
                    .unwrap_or(arff_core::header::NO_CLASS_LABEL)
            );
            Ok(())
        }
        Err(e) => {
            for group in e.groups() {
                println!("{}:", group.value);
                for file in &group.files {
                    println!("  {}", file);
                }
            }
            Err(e)
        }
    }
}

fn cmd_scan(input: &Path) -> arff_core::Result<()> {
    let files = discover_arff_files(input, &[])?;

    println!("Found {} ARFF files in {}", files.len(), input.display());
    for file in &files {
        println!("  {}", file.display());
    }

    Ok(())
}

fn cmd_inspect(file: &Path) -> arff_core::Result<()> {
    let scan = scan_header(file)?;
    let rows = FileRows {
        source: file.to_path_buf(),
        lines: read_data_rows(file, scan.data_offset)?,
    };

    println!("File: {}", file.display());
    println!("Attributes: {}", scan.attribute_count);
    println!(
        "Class: {}",
        scan.class_declaration
            .as_deref()
            .unwrap_or(arff_core::header::NO_CLASS_LABEL)
    );
    println!("Data starts at line: {}", scan.data_offset + 1);
    println!("Data rows: {}", rows.row_count());
    println!();

    for line in scan.attribute_lines() {
        println!("  {}", line.trim_end());
    }

    Ok(())
}

fn cmd_create_job(
    output: &Path,
    input: PathBuf,
    output_dir: PathBuf,
    name: String,
) -> arff_core::Result<()> {
    let job = MergeJob {
        input_dir: Some(input),
        files: Vec::new(),
        output_dir,
        output_name: arff_core::normalize_file_name(&name)?,
        json_report: false,
    };

    job.save(output)?;
    println!("Created job file: {}", output.display());
    println!();
    println!("Edit the file to configure your merge, then run:");
    println!("  arff-merge merge --job {}", output.display());

    Ok(())
}
