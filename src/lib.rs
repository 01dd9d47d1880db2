//! udlf-runner library
//!
//! Installs the UDLF (Unsupervised Distance Learning Framework) binary,
//! builds and validates its configs, runs it, parses what it writes, and
//! evaluates ranked lists locally.

pub mod assets;
pub mod cli;
pub mod config;
pub mod data_io;
pub mod error;
pub mod evaluation;
pub mod execution_log;
pub mod grid_search;
pub mod output;
#[cfg(unix)]
pub mod process_guard;
pub mod runner;
pub mod settings;
pub mod types;
pub mod validation;
pub mod visualization;

pub use assets::{Installation, Platform};
pub use config::{ConfigEntry, InputFiles, UdlfConfig};
pub use error::{Result, UdlfError};
pub use evaluation::{MetricReport, QueryGain};
pub use execution_log::{ExecutionLog, MeasureValue};
pub use output::{RankedLists, UdlfOutput};
#[cfg(unix)]
pub use process_guard::{CommandProcessGroup, RunRegistry, TrackedChild};
pub use runner::{Executor, RunOptions, Runner};
pub use settings::Settings;
pub use types::{
    InputFileFormat, InputRkFormat, MatrixSorting, MatrixType, Measure, OutputFileFormat,
    OutputRkFormat, UdlMethod, UdlTask,
};
