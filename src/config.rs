//! UDLF configuration model
//!
//! An ordered list of `KEY = value #comment` entries loaded from the INI-like
//! `config.ini` shipped with the binary. Entries keep their file order and
//! their comments, and are written back in the same layout.
//!
//! Every setter runs the value through [`crate::validation`], so a config
//! built through this API only carries values the binary accepts.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::assets::Installation;
use crate::data_io;
use crate::error::{Result, UdlfError};
use crate::types::{
    InputFileFormat, InputRkFormat, MatrixSorting, MatrixType, OutputFileFormat, OutputRkFormat,
    UdlMethod, UdlTask,
};
use crate::validation::{validate_param, validate_path, ParamValue};

const FUSION_KEY_PREFIX: &str = "INPUT_FILES_FUSION_";

/// One `KEY = value #comment` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub comment: Option<String>,
}

impl ConfigEntry {
    /// Render the entry in the column layout of `config.ini`
    pub fn to_line(&self) -> String {
        let line = match &self.comment {
            Some(comment) => format!("{:<37} = {:<15} #{}", self.key, self.value, comment),
            None => format!("{:<37} = {:<15}", self.key, self.value),
        };
        line.trim_end().to_string()
    }
}

/// Input files configured for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFiles {
    /// `UDL_TASK = UDL`: a single `INPUT_FILE`
    Single(String),
    /// `UDL_TASK = FUSION`: the consecutive `INPUT_FILES_FUSION_{i}` entries
    Fusion(Vec<String>),
}

/// Parameter set for one UDLF run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UdlfConfig {
    entries: Vec<ConfigEntry>,
    source: Option<PathBuf>,
}

impl UdlfConfig {
    /// Load a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            UdlfError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::parse(&content);
        if config.entries.is_empty() {
            return Err(UdlfError::config(format!(
                "Config {} holds no parameters",
                path.display()
            )));
        }
        config.source = Some(path.to_path_buf());
        debug!("Loaded {} parameters from {}", config.entries.len(), path.display());
        Ok(config)
    }

    /// Load the default config bundled with the binary, installing it first
    /// when it is missing
    pub fn from_installation(installation: &Installation) -> Result<Self> {
        if !installation.config_path().is_file() {
            info!("Config is missing, installing UDLF assets");
        }
        installation.ensure_installed()?;
        Self::load(installation.config_path())
    }

    /// Parse config text.
    ///
    /// Blank lines, `#` comment lines and lines without `=` are skipped.
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, rest)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let (value, comment) = match rest.split_once('#') {
                Some((value, comment)) => (value.trim(), Some(comment.trim().to_string())),
                None => (rest.trim(), None),
            };
            let entry = ConfigEntry {
                key: key.to_string(),
                value: value.to_string(),
                comment,
            };
            match config.position(key) {
                Some(idx) => config.entries[idx] = entry,
                None => config.entries.push(entry),
            }
        }
        config
    }

    /// Path this config was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// All entries in file order
    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// Look up an entry
    pub fn get(&self, key: &str) -> Option<&ConfigEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Value of an existing parameter
    pub fn value(&self, key: &str) -> Result<&str> {
        self.get(key)
            .map(|e| e.value.as_str())
            .ok_or_else(|| UdlfError::config(format!("{} does not exist in parameters", key)))
    }

    /// Whether a boolean parameter is set to `TRUE`
    pub fn flag(&self, key: &str) -> bool {
        self.value(key)
            .map(|v| v.eq_ignore_ascii_case("TRUE"))
            .unwrap_or(false)
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.value(key)?;
        raw.parse::<T>()
            .map_err(|_| UdlfError::config(format!("{} has unexpected value '{}'", key, raw)))
    }

    /// Change the value of an existing parameter, keeping its comment
    pub fn set_param(&mut self, key: &str, value: impl Into<ParamValue>) -> Result<()> {
        let idx = self
            .position(key)
            .ok_or_else(|| UdlfError::config(format!("{} does not exist in parameters", key)))?;
        let normalized = validate_param(key, &value.into())?;
        debug!("{} set to {:?}", key, normalized);
        self.entries[idx].value = normalized;
        Ok(())
    }

    /// Append a parameter that is not yet in the config
    pub fn add_parameter(&mut self, key: &str, value: impl Into<ParamValue>) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(UdlfError::validation("Parameter name must be a non-empty string"));
        }
        if self.contains(key) {
            return Err(UdlfError::config(format!("Parameter {} already exists", key)));
        }
        let normalized = validate_param(key, &value.into())?;
        self.entries.push(ConfigEntry {
            key: key.to_string(),
            value: normalized,
            comment: None,
        });
        Ok(())
    }

    fn set_or_add(&mut self, key: &str, value: impl Into<ParamValue>) -> Result<()> {
        if self.contains(key) {
            self.set_param(key, value)
        } else {
            self.add_parameter(key, value)
        }
    }

    fn set_path(&mut self, key: &str, value: &str) -> Result<()> {
        let path = validate_path(value, false)?;
        self.set_param(key, path)
    }

    // ------------------------------------------------------------------
    // Typed setters
    // ------------------------------------------------------------------

    pub fn set_task(&mut self, task: UdlTask) -> Result<()> {
        self.set_param("UDL_TASK", task.to_string())
    }

    pub fn set_method(&mut self, method: UdlMethod) -> Result<()> {
        self.set_param("UDL_METHOD", method.to_string())
    }

    pub fn set_output_file_format(&mut self, format: OutputFileFormat) -> Result<()> {
        self.set_param("OUTPUT_FILE_FORMAT", format.to_string())
    }

    pub fn set_output_matrix_type(&mut self, matrix_type: MatrixType) -> Result<()> {
        self.set_param("OUTPUT_MATRIX_TYPE", matrix_type.to_string())
    }

    pub fn set_output_rk_format(&mut self, format: OutputRkFormat) -> Result<()> {
        self.set_param("OUTPUT_RK_FORMAT", format.to_string())
    }

    /// Base path of the output file, without extension
    pub fn set_output_file_path(&mut self, path: &str) -> Result<()> {
        self.set_path("OUTPUT_FILE_PATH", path)
    }

    pub fn set_input_rk_format(&mut self, format: InputRkFormat) -> Result<()> {
        self.set_param("INPUT_RK_FORMAT", format.to_string())
    }

    pub fn set_input_matrix_type(&mut self, matrix_type: MatrixType) -> Result<()> {
        self.set_param("INPUT_MATRIX_TYPE", matrix_type.to_string())
    }

    pub fn set_matrix_to_rk_sorting(&mut self, sorting: MatrixSorting) -> Result<()> {
        self.set_param("MATRIX_TO_RK_SORTING", sorting.to_string())
    }

    pub fn set_dataset_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(UdlfError::validation(
                "Invalid dataset size: 0. Must be a positive integer",
            ));
        }
        self.set_param("SIZE_DATASET", size)
    }

    pub fn set_lists_file(&mut self, path: &str) -> Result<()> {
        self.set_path("INPUT_FILE_LIST", path)
    }

    pub fn set_classes_file(&mut self, path: &str) -> Result<()> {
        self.set_path("INPUT_FILE_CLASSES", path)
    }

    pub fn set_output_log_file(&mut self, path: &str) -> Result<()> {
        self.set_path("OUTPUT_LOG_FILE_PATH", path)
    }

    pub fn set_input_images_path(&mut self, path: &str) -> Result<()> {
        self.set_path("INPUT_IMAGES_PATH", path)
    }

    /// Set every `PARAM_<METHOD>_L` ranked list size at once
    pub fn set_ranked_lists_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(UdlfError::validation(
                "Invalid ranked list size: 0. Must be a positive integer",
            ));
        }
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| is_ranked_list_size_key(&e.key))
            .map(|e| e.key.clone())
            .collect();
        for key in keys {
            self.set_param(&key, size)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Input files
    // ------------------------------------------------------------------

    /// Configure a single input file for a UDL run
    pub fn set_input_file(&mut self, path: &str) -> Result<()> {
        self.set_input_files(&[path])
    }

    /// Configure the input files.
    ///
    /// One file selects the UDL task; two or more select FUSION and fill
    /// `INPUT_FILES_FUSION_1..n`.
    pub fn set_input_files<S: AsRef<str>>(&mut self, paths: &[S]) -> Result<()> {
        if paths.is_empty() {
            return Err(UdlfError::validation("Input file list cannot be empty"));
        }
        let paths: Vec<String> = paths
            .iter()
            .map(|p| validate_path(p.as_ref(), false))
            .collect::<Result<_>>()?;

        self.set_param("INPUT_FILE_FORMAT", InputFileFormat::Auto.to_string())?;
        if let [single] = paths.as_slice() {
            self.set_task(UdlTask::Udl)?;
            return self.set_param("INPUT_FILE", single);
        }

        self.set_task(UdlTask::Fusion)?;
        for (i, path) in paths.iter().enumerate() {
            self.set_or_add(&format!("{}{}", FUSION_KEY_PREFIX, i + 1), path)?;
        }
        let count = paths.len();
        self.entries
            .retain(|e| fusion_index(&e.key).is_none_or(|i| i <= count));
        if self.contains("NUM_INPUT_FUSION_FILES") {
            self.set_param("NUM_INPUT_FUSION_FILES", paths.len())?;
        }
        Ok(())
    }

    /// Write in-memory ranked lists to `dir` and use them as input files.
    ///
    /// Each input lands in a fresh `rks_{n}.txt`; the written paths are
    /// returned.
    pub fn set_input_ranked_lists(
        &mut self,
        inputs: &[Vec<Vec<usize>>],
        dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        if inputs.is_empty() {
            return Err(UdlfError::validation("Input file list cannot be empty"));
        }
        let mut written = Vec::with_capacity(inputs.len());
        let mut counter = 1usize;
        for ranked_lists in inputs {
            let mut path = dir.join(format!("rks_{}.txt", counter));
            while path.exists() {
                counter += 1;
                path = dir.join(format!("rks_{}.txt", counter));
            }
            data_io::write_ranked_lists(&path, ranked_lists)?;
            written.push(path);
            counter += 1;
        }

        let as_str: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
        self.set_input_files(&as_str)?;
        Ok(written)
    }

    /// Append fusion inputs at the first unused `INPUT_FILES_FUSION_{i}` slots
    pub fn add_input_files<S: AsRef<str>>(&mut self, paths: &[S]) -> Result<()> {
        if self.task()? != UdlTask::Fusion {
            return Err(UdlfError::config(
                "Input files can only be added to a FUSION task",
            ));
        }
        let mut index = 1usize;
        for path in paths {
            let path = validate_path(path.as_ref(), false)?;
            while self.contains(&format!("{}{}", FUSION_KEY_PREFIX, index)) {
                index += 1;
            }
            self.add_parameter(&format!("{}{}", FUSION_KEY_PREFIX, index), path)?;
        }
        if self.contains("NUM_INPUT_FUSION_FILES") {
            let count = self.fusion_files().len();
            self.set_param("NUM_INPUT_FUSION_FILES", count)?;
        }
        Ok(())
    }

    fn fusion_files(&self) -> Vec<String> {
        (1..)
            .map(|i| self.get(&format!("{}{}", FUSION_KEY_PREFIX, i)))
            .take_while(Option::is_some)
            .flatten()
            .map(|e| e.value.clone())
            .collect()
    }

    /// The configured input file(s)
    pub fn input_files(&self) -> Result<InputFiles> {
        match self.task()? {
            UdlTask::Udl => Ok(InputFiles::Single(self.value("INPUT_FILE")?.to_string())),
            UdlTask::Fusion => Ok(InputFiles::Fusion(self.fusion_files())),
        }
    }

    // ------------------------------------------------------------------
    // Typed getters
    // ------------------------------------------------------------------

    pub fn task(&self) -> Result<UdlTask> {
        self.parsed("UDL_TASK")
    }

    pub fn method(&self) -> Result<UdlMethod> {
        self.parsed("UDL_METHOD")
    }

    pub fn input_file_format(&self) -> Result<InputFileFormat> {
        self.parsed("INPUT_FILE_FORMAT")
    }

    pub fn output_file_format(&self) -> Result<OutputFileFormat> {
        self.parsed("OUTPUT_FILE_FORMAT")
    }

    pub fn output_matrix_type(&self) -> Result<MatrixType> {
        self.parsed("OUTPUT_MATRIX_TYPE")
    }

    pub fn output_rk_format(&self) -> Result<OutputRkFormat> {
        self.parsed("OUTPUT_RK_FORMAT")
    }

    pub fn input_matrix_type(&self) -> Result<MatrixType> {
        self.parsed("INPUT_MATRIX_TYPE")
    }

    pub fn input_rk_format(&self) -> Result<InputRkFormat> {
        self.parsed("INPUT_RK_FORMAT")
    }

    pub fn matrix_to_rk_sorting(&self) -> Result<MatrixSorting> {
        self.parsed("MATRIX_TO_RK_SORTING")
    }

    pub fn dataset_size(&self) -> Result<usize> {
        self.parsed("SIZE_DATASET")
    }

    pub fn output_file_path(&self) -> Result<&str> {
        self.value("OUTPUT_FILE_PATH")
    }

    pub fn output_log_file(&self) -> Result<&str> {
        self.value("OUTPUT_LOG_FILE_PATH")
    }

    pub fn lists_file(&self) -> Result<&str> {
        self.value("INPUT_FILE_LIST")
    }

    pub fn classes_file(&self) -> Result<&str> {
        self.value("INPUT_FILE_CLASSES")
    }

    pub fn input_images_path(&self) -> Result<&str> {
        self.value("INPUT_IMAGES_PATH")
    }

    /// Methods offered by this config.
    ///
    /// Read from the `(A|B|...)` alternatives in the `UDL_METHOD` comment;
    /// every known method when the comment carries none.
    pub fn available_methods(&self) -> Vec<UdlMethod> {
        let from_comment = self
            .get("UDL_METHOD")
            .and_then(|e| e.comment.as_deref())
            .and_then(comment_alternatives)
            .map(|alts| {
                alts.iter()
                    .filter_map(|a| a.parse::<UdlMethod>().ok())
                    .collect::<Vec<_>>()
            })
            .filter(|methods| !methods.is_empty());
        from_comment.unwrap_or_else(|| UdlMethod::iter().collect())
    }

    // ------------------------------------------------------------------
    // Serialization and listings
    // ------------------------------------------------------------------

    /// Render the whole config in `config.ini` layout
    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_line());
            out.push('\n');
        }
        out
    }

    /// Write the config; the path must end in `.ini`
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if path.extension().and_then(|e| e.to_str()) != Some("ini") {
            return Err(UdlfError::validation(format!(
                "Config file path must end with '.ini': {}",
                path.display()
            )));
        }
        fs::write(path, self.to_ini_string())?;
        debug!("Config written to {}", path.display());
        Ok(())
    }

    /// Parameter names, one per line
    pub fn list_names(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}\n", e.key))
            .collect()
    }

    /// `name = value` per parameter
    pub fn list_values(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{} = {}\n", e.key, e.value))
            .collect()
    }

    /// `name = value #comment` per parameter
    pub fn list_full(&self) -> String {
        self.entries.iter().map(|e| format!("{}\n", describe(e))).collect()
    }

    /// `name = value #comment` for one parameter
    pub fn param_info(&self, key: &str) -> Result<String> {
        self.get(key)
            .map(describe)
            .ok_or_else(|| UdlfError::config(format!("Parameter {} not found", key)))
    }

    /// Every `PARAM_<METHOD>_*` entry
    pub fn method_params(&self, method: UdlMethod) -> Vec<&ConfigEntry> {
        let prefix = method.param_prefix();
        self.entries
            .iter()
            .filter(|e| e.key.starts_with(&prefix))
            .collect()
    }

    /// Listing of one method's parameters
    pub fn method_info(&self, method: UdlMethod) -> String {
        let mut out = format!("...Listing {} information...\n", method);
        for entry in self.method_params(method) {
            out.push_str(&describe(entry));
            out.push('\n');
        }
        out
    }
}

fn describe(entry: &ConfigEntry) -> String {
    format!(
        "{} = {} #{}",
        entry.key,
        entry.value,
        entry.comment.as_deref().unwrap_or("----")
    )
}

/// `i` of an `INPUT_FILES_FUSION_{i}` key
fn fusion_index(key: &str) -> Option<usize> {
    key.strip_prefix(FUSION_KEY_PREFIX)?.parse().ok()
}

/// `PARAM_[A-Z]*_L`
fn is_ranked_list_size_key(key: &str) -> bool {
    key.strip_prefix("PARAM_")
        .and_then(|rest| rest.strip_suffix("_L"))
        .is_some_and(|middle| middle.chars().all(|c| c.is_ascii_uppercase()))
}

/// Alternatives listed as `(A|B|C)` at the start of a comment
pub(crate) fn comment_alternatives(comment: &str) -> Option<Vec<String>> {
    let head = comment.split(':').next()?.trim();
    let inner = head.strip_prefix('(')?.strip_suffix(')')?;
    Some(
        inner
            .split('|')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}
