//! Merge configuration and JSON job files

use crate::error::{Error, Result};
use crate::scanner::discover_arff_files;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Characters not allowed in the merged output's file name
pub const FORBIDDEN_NAME_CHARS: &str = "!@#$%^&*()-+?_=,<>/\\ ";

/// Everything a merge run needs. The core reads no other state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Input files, in merge order
    pub input_paths: Vec<PathBuf>,
    /// Where the input list came from, for messages
    pub input_location: Option<PathBuf>,
    /// Directory receiving the merged file and the reports
    pub output_dir: PathBuf,
    /// Merged file name without the `.arff` extension
    pub output_file_name: String,
    /// Also write a JSON copy of the run report
    pub json_report: bool,
}

impl MergeConfig {
    /// Create a config from an explicit file list
    pub fn new(
        input_paths: Vec<PathBuf>,
        output_dir: impl Into<PathBuf>,
        output_file_name: impl Into<String>,
    ) -> Self {
        Self {
            input_paths,
            input_location: None,
            output_dir: output_dir.into(),
            output_file_name: output_file_name.into(),
            json_report: false,
        }
    }

    /// Create a config from every `.arff` file in `input_dir`.
    ///
    /// The output name is normalized first so that an existing merge output
    /// in the input folder can be left out of the list.
    pub fn from_directory(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        output_file_name: &str,
    ) -> Result<Self> {
        let input_dir = input_dir.into();
        let output_dir = output_dir.into();
        let name = normalize_file_name(output_file_name)?;
        let output_path = output_dir.join(format!("{}.arff", name));

        let input_paths = discover_arff_files(&input_dir, &[output_path])?;

        Ok(Self {
            input_paths,
            input_location: Some(input_dir),
            output_dir,
            output_file_name: name,
            json_report: false,
        })
    }

    /// Enable or disable the JSON report copy
    pub fn with_json_report(mut self, enable: bool) -> Self {
        self.json_report = enable;
        self
    }

    /// Path of the merged output file
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.arff", self.output_file_name))
    }

    /// Description of the input location for messages
    pub fn input_location(&self) -> PathBuf {
        self.input_location
            .clone()
            .unwrap_or_else(|| PathBuf::from("<file list>"))
    }

    /// Check the output file name and normalize it in place
    pub fn validate(&mut self) -> Result<()> {
        self.output_file_name = normalize_file_name(&self.output_file_name)?;
        Ok(())
    }
}

/// Strip a trailing `.arff` and reject empty names or forbidden characters
pub fn normalize_file_name(name: &str) -> Result<String> {
    let invalid = |reason: &str| Error::InvalidFileName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let split = name.len().saturating_sub(".arff".len());
    let stem = match name.get(split..) {
        Some(ext) if ext.eq_ignore_ascii_case(".arff") => &name[..split],
        _ => name,
    };

    if stem.is_empty() {
        return Err(invalid("name is empty"));
    }
    if let Some(c) = stem
        .chars()
        .find(|c| FORBIDDEN_NAME_CHARS.contains(*c) || c.is_control())
    {
        return Err(invalid(&format!(
            "character '{}' is not allowed (no spaces or any of {})",
            c.escape_default(),
            FORBIDDEN_NAME_CHARS.trim_end()
        )));
    }
    Ok(stem.to_string())
}

/// A merge job stored as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeJob {
    /// Folder scanned for `.arff` files when `files` is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,
    /// Explicit input files, in merge order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
    /// Output directory
    pub output_dir: PathBuf,
    /// Merged file name
    pub output_name: String,
    /// Also write a JSON copy of the run report
    #[serde(default)]
    pub json_report: bool,
}

impl MergeJob {
    /// Load a job file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the job file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the job into a run configuration
    pub fn into_config(self) -> Result<MergeConfig> {
        let config = match (self.files.is_empty(), self.input_dir) {
            (true, Some(dir)) => {
                MergeConfig::from_directory(dir, self.output_dir, &self.output_name)?
            }
            (_, input_dir) => {
                let mut config = MergeConfig::new(self.files, self.output_dir, self.output_name);
                config.input_location = input_dir;
                config
            }
        };
        Ok(config.with_json_report(self.json_report))
    }
}
