//! Results of one UDLF run
//!
//! The binary writes its results to files named by the config; this type
//! only remembers where they are. Files are read when asked for, except the
//! log, which the runner may read eagerly.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::UdlfConfig;
use crate::data_io;
use crate::error::{Result, UdlfError};
use crate::evaluation::QueryGain;
use crate::execution_log::ExecutionLog;

/// Ranked lists as the binary wrote them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankedLists {
    /// Dataset indices (`OUTPUT_RK_FORMAT = NUM`)
    Numeric(Vec<Vec<usize>>),
    /// Element names (`OUTPUT_RK_FORMAT = STR`)
    Names(Vec<Vec<String>>),
}

impl RankedLists {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(rks) => rks.len(),
            Self::Names(rks) => rks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Locations and parsed pieces of a run's output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UdlfOutput {
    pub rk_path: PathBuf,
    pub matrix_path: PathBuf,
    pub log_path: PathBuf,
    pub log: Option<ExecutionLog>,
    /// Per-query Precision gain, when requested and applicable
    pub individual_gain: Option<Vec<QueryGain>>,
}

impl UdlfOutput {
    /// Output locations named by a config: `OUTPUT_FILE_PATH` plus `.txt` for
    /// ranked lists and matrix, `OUTPUT_LOG_FILE_PATH` for the log
    pub fn from_config(config: &UdlfConfig) -> Result<Self> {
        let base = config.output_file_path()?;
        let data_path = PathBuf::from(format!("{}.txt", base));
        Ok(Self {
            rk_path: data_path.clone(),
            matrix_path: data_path,
            log_path: PathBuf::from(config.output_log_file()?),
            log: None,
            individual_gain: None,
        })
    }

    /// Output matrix
    pub fn matrix(&self) -> Result<Vec<Vec<f64>>> {
        require(&self.matrix_path)?;
        data_io::read_matrix(&self.matrix_path)
    }

    /// Output ranked lists, numeric when every entry is an index
    pub fn ranked_lists(&self, top_k: usize) -> Result<RankedLists> {
        require(&self.rk_path)?;
        let names = data_io::read_ranked_lists_names(&self.rk_path, top_k)?;
        let numeric: Option<Vec<Vec<usize>>> = names
            .iter()
            .map(|rk| {
                rk.iter()
                    .map(|e| e.parse::<usize>().ok())
                    .collect::<Option<Vec<usize>>>()
            })
            .collect();
        Ok(match numeric {
            Some(rks) => RankedLists::Numeric(rks),
            None => RankedLists::Names(names),
        })
    }

    /// Output ranked lists as dataset indices
    pub fn numeric_ranked_lists(&self, top_k: usize) -> Result<Vec<Vec<usize>>> {
        require(&self.rk_path)?;
        data_io::read_ranked_lists_numeric(&self.rk_path, top_k)
    }

    /// Parse the log if that has not happened yet
    pub fn load_log(&mut self) -> Result<&ExecutionLog> {
        if self.log.is_none() {
            require(&self.log_path)?;
            self.log = Some(ExecutionLog::load(&self.log_path)?);
        }
        self.log
            .as_ref()
            .ok_or_else(|| UdlfError::parse("Log could not be loaded"))
    }

    /// The log as `name = value` lines
    pub fn format_log(&mut self) -> Result<String> {
        Ok(self.load_log()?.format())
    }

    pub fn individual_gain(&self) -> Option<&[QueryGain]> {
        self.individual_gain.as_deref()
    }
}

fn require(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(UdlfError::parse(format!(
            "Output file {} does not exist",
            path.display()
        )))
    }
}
