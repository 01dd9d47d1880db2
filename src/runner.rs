//! Execution of the UDLF binary
//!
//! [`Runner`] is the one place the binary is started from. Every run:
//!
//! - spawns `<binary> <config.ini>` in a new process group,
//! - registers the child PID for signal-time cleanup,
//! - captures stdout and stderr into `log_out.txt` next to the binary,
//! - scans that capture for problem keywords before trusting the output.
//!
//! The binary exits 0 on most configuration mistakes and only reports them
//! in its output, so the keyword scan is what separates a good run from a
//! bad one.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::assets::Installation;
use crate::config::{InputFiles, UdlfConfig};
use crate::data_io;
use crate::error::{Result, UdlfError};
use crate::evaluation::{self, QueryGain};
use crate::output::UdlfOutput;
#[cfg(unix)]
use crate::process_guard::{CommandProcessGroup, TrackedChild};
use crate::types::{
    InputFileFormat, InputRkFormat, Measure, OutputFileFormat, OutputRkFormat, UdlTask,
};

/// Substrings that mark a line of the binary's output as a problem
pub const PROBLEM_KEYWORDS: [&str; 4] = ["invalid", "error", "warning", "can't"];

/// Knobs for [`Runner::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Parse the log right after the run
    pub get_output: bool,
    /// Compute the per-query Precision gain of the re-ranking
    pub compute_individual_gain: bool,
    /// Depth of the gain; `None` means the number of ranked lists
    pub depth: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            get_output: true,
            compute_individual_gain: false,
            depth: None,
        }
    }
}

/// Something that can execute a config and hand back its output
///
/// Grid search only talks to this trait, so sweeps can be driven without
/// the real binary.
pub trait Executor {
    fn execute(&self, config: &UdlfConfig, options: &RunOptions) -> Result<UdlfOutput>;
}

/// Lines of captured output containing a problem keyword (case-insensitive)
pub fn scan_log(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            PROBLEM_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(|line| line.trim().to_string())
        .collect()
}

/// Reasons the per-query gain cannot be computed for `config`
pub fn gain_blockers(config: &UdlfConfig) -> Vec<String> {
    let mut blockers = Vec::new();
    if config.value("OUTPUT_FILE").ok() != Some("TRUE") {
        blockers.push("OUTPUT_FILE must be TRUE".to_string());
    }
    if config.output_file_format().ok() != Some(OutputFileFormat::Rk) {
        blockers.push("OUTPUT_FILE_FORMAT must be RK".to_string());
    }
    if config.input_file_format().ok() == Some(InputFileFormat::Matrix) {
        blockers.push("INPUT_FILE_FORMAT must not be MATRIX".to_string());
    }
    if config.input_rk_format().ok() != Some(InputRkFormat::Num) {
        blockers.push("INPUT_RK_FORMAT must be NUM".to_string());
    }
    if config.output_rk_format().ok() != Some(OutputRkFormat::Num) {
        blockers.push("OUTPUT_RK_FORMAT must be NUM".to_string());
    }
    if config.task().ok() != Some(UdlTask::Udl) {
        blockers.push("UDL_TASK must be UDL".to_string());
    }
    blockers
}

/// Starts the UDLF binary of one installation
#[derive(Debug, Clone)]
pub struct Runner {
    installation: Installation,
}

impl Runner {
    pub fn new(installation: Installation) -> Self {
        Self { installation }
    }

    pub fn installation(&self) -> &Installation {
        &self.installation
    }

    /// Run the binary on a config file already on disk
    pub fn run_with_config(&self, config_path: &Path, get_output: bool) -> Result<UdlfOutput> {
        self.installation.ensure_installed()?;
        let config = UdlfConfig::load(config_path)?;
        self.execute_file(config_path, &config, get_output)
    }

    /// Write `config` next to the binary, run it, and optionally compute the
    /// per-query gain
    pub fn run(&self, config: &UdlfConfig, options: &RunOptions) -> Result<UdlfOutput> {
        // The generated config lives in the binary's directory, so install first.
        self.installation.ensure_installed()?;
        let config_path = self.installation.generated_config_path();
        config.write_to_file(&config_path)?;

        let mut output = self.execute_file(&config_path, config, options.get_output)?;
        if options.compute_individual_gain {
            let blockers = gain_blockers(config);
            if blockers.is_empty() {
                output.individual_gain = Some(individual_gain(config, &output, options.depth)?);
            } else {
                warn!("Skipping individual gain: {}", blockers.join(", "));
            }
        }
        Ok(output)
    }

    fn execute_file(
        &self,
        config_path: &Path,
        config: &UdlfConfig,
        get_output: bool,
    ) -> Result<UdlfOutput> {
        let capture_path = self.installation.run_log_path();
        let captured = self.spawn_and_wait(config_path, &capture_path)?;

        let mut output = UdlfOutput::from_config(config)?;
        if get_output {
            output.load_log()?;
        }
        debug!(
            "Run finished, log at {} ({} bytes captured)",
            output.log_path.display(),
            captured.len()
        );
        Ok(output)
    }

    /// Spawn the binary, wait for it and return the captured text.
    ///
    /// Fails on a non-zero exit or when any captured line has a problem
    /// keyword.
    fn spawn_and_wait(&self, config_path: &Path, capture_path: &Path) -> Result<String> {
        let binary = self.installation.binary_path();
        let capture = File::create(capture_path)?;

        info!("Running {} {}", binary.display(), config_path.display());
        let mut command = Command::new(binary);
        command
            .arg(config_path)
            .stdin(Stdio::null())
            .stdout(Stdio::from(capture.try_clone()?))
            .stderr(Stdio::from(capture));
        #[cfg(unix)]
        command.in_new_process_group();

        let mut child = command.spawn().map_err(|e| {
            UdlfError::execution(
                format!("Failed to start {}: {}", binary.display(), e),
                Vec::new(),
            )
        })?;

        let status = {
            #[cfg(unix)]
            let _tracked = TrackedChild::register(child.id());
            child.wait()?
        };

        // The binary may print non-UTF-8 bytes; scan them lossily.
        let bytes = std::fs::read(capture_path)?;
        let captured = String::from_utf8_lossy(&bytes).into_owned();
        let flagged = scan_log(&captured);
        if !status.success() {
            return Err(UdlfError::execution(
                format!("UDLF exited with {}", status),
                flagged,
            ));
        }
        if !flagged.is_empty() {
            return Err(UdlfError::execution(
                format!(
                    "UDLF reported {} problem line(s), see {}",
                    flagged.len(),
                    capture_path.display()
                ),
                flagged,
            ));
        }
        Ok(captured)
    }
}

impl Executor for Runner {
    fn execute(&self, config: &UdlfConfig, options: &RunOptions) -> Result<UdlfOutput> {
        self.run(config, options)
    }
}

/// Per-query Precision gain between the input and output ranked lists
fn individual_gain(
    config: &UdlfConfig,
    output: &UdlfOutput,
    depth: Option<usize>,
) -> Result<Vec<QueryGain>> {
    let classes = data_io::read_classes(
        Path::new(config.lists_file()?),
        Path::new(config.classes_file()?),
    )?;
    let input = match config.input_files()? {
        InputFiles::Single(path) => PathBuf::from(path),
        InputFiles::Fusion(_) => {
            return Err(UdlfError::config("Individual gain needs a single input file"));
        }
    };
    let before = data_io::read_ranked_lists_numeric(&input, usize::MAX)?;
    let after = output.numeric_ranked_lists(usize::MAX)?;
    evaluation::compute_gain(&before, &after, &classes, depth, Measure::Precision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_log_is_case_insensitive() {
        let text = "Loading...\nINVALID parameter PARAM_X\nDone\nWarning: size mismatch\nCan't open file\n";
        assert_eq!(
            scan_log(text),
            vec!["INVALID parameter PARAM_X", "Warning: size mismatch", "Can't open file"]
        );
    }

    #[test]
    fn test_scan_log_clean_output() {
        assert!(scan_log("Reading input...\nRunning CPRR...\nTotal time: 1s\n").is_empty());
    }

    #[test]
    fn test_gain_blockers() {
        let ok = UdlfConfig::parse(
            "UDL_TASK = UDL\nOUTPUT_FILE = TRUE\nOUTPUT_FILE_FORMAT = RK\nINPUT_FILE_FORMAT = AUTO\n\
             INPUT_RK_FORMAT = NUM\nOUTPUT_RK_FORMAT = NUM\n",
        );
        assert!(gain_blockers(&ok).is_empty());

        let bad = UdlfConfig::parse(
            "UDL_TASK = FUSION\nOUTPUT_FILE = FALSE\nOUTPUT_FILE_FORMAT = RK\nINPUT_FILE_FORMAT = MATRIX\n\
             INPUT_RK_FORMAT = NUM\nOUTPUT_RK_FORMAT = STR\n",
        );
        let blockers = gain_blockers(&bad);
        assert_eq!(blockers.len(), 4);
        assert!(blockers.contains(&"UDL_TASK must be UDL".to_string()));
    }

    #[test]
    fn test_default_options() {
        let options = RunOptions::default();
        assert!(options.get_output);
        assert!(!options.compute_individual_gain);
        assert_eq!(options.depth, None);
    }
}
