//! Structured view of the log file written by the UDLF binary
//!
//! The binary reports effectiveness as a Before/After/Relative Gains table
//! for UDL runs and as a single Effectiveness table for FUSION runs:
//!
//! ```text
//!  - Task: UDL
//!  - Total Time of Execution: 0.1542 s
//!  Effectiveness:
//!   Before:
//!    MAP    0.5200
//!   After:
//!    MAP    0.6100
//!   Relative Gains:
//!    MAP    +17.3077%
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UdlfError};

/// One effectiveness measure reported by the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasureValue {
    /// UDL runs report the value before and after re-ranking plus the gain
    Comparison {
        before: String,
        after: String,
        gain: String,
    },
    /// FUSION runs report a single value
    Single(String),
}

impl MeasureValue {
    /// The value after re-ranking (or the only value for fusion)
    pub fn after(&self) -> Option<f64> {
        match self {
            Self::Comparison { after, .. } => parse_number(after),
            Self::Single(value) => parse_number(value),
        }
    }

    /// The value before re-ranking, when reported
    pub fn before(&self) -> Option<f64> {
        match self {
            Self::Comparison { before, .. } => parse_number(before),
            Self::Single(_) => None,
        }
    }

    /// Relative gain in percent, when reported
    pub fn gain(&self) -> Option<f64> {
        match self {
            Self::Comparison { gain, .. } => parse_number(gain),
            Self::Single(_) => None,
        }
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().trim_end_matches('%').trim_start_matches('+').parse().ok()
}

/// Parsed contents of a UDLF log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    /// Task named in the log (`UDL` or `FUSION`)
    pub task: Option<String>,
    /// Total execution time as printed by the binary
    pub time: Option<String>,
    /// Measures in the order the binary printed them
    pub measures: Vec<(String, MeasureValue)>,
}

impl ExecutionLog {
    /// Read and parse a log file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            UdlfError::parse(format!("Failed to read log {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse log text
    pub fn parse(content: &str) -> Result<Self> {
        let lines: Vec<&str> = content.lines().map(str::trim).collect();
        let mut log = ExecutionLog::default();

        for line in &lines {
            if line.contains("Task") {
                if let Some((_, task)) = line.split_once(':') {
                    log.task = Some(task.trim().to_string());
                }
            }
            if line.contains("Time") {
                if let Some((_, time)) = line.split_once(':') {
                    log.time = Some(time.trim().to_string());
                }
            }
        }

        log.measures = if log.is_fusion() {
            parse_fusion_table(&lines)
        } else {
            parse_comparison_table(&lines)?
        };
        Ok(log)
    }

    /// Whether the log came from a FUSION run
    pub fn is_fusion(&self) -> bool {
        self.task.as_deref() == Some("FUSION")
    }

    /// Look up a measure by name (`MAP`, `P@4`, `Recall@10`, ...)
    pub fn measure(&self, name: &str) -> Option<&MeasureValue> {
        self.measures
            .iter()
            .find(|(measure, _)| measure == name)
            .map(|(_, value)| value)
    }

    /// The after-re-ranking value of a measure
    pub fn after(&self, name: &str) -> Option<f64> {
        self.measure(name).and_then(MeasureValue::after)
    }

    /// Render as `name = value` lines, the way the CLI prints it
    pub fn format(&self) -> String {
        let mut out = String::new();
        if let Some(time) = &self.time {
            out.push_str(&format!("{:<10} = {}\n", "Time", time));
        }
        for (name, value) in &self.measures {
            let rendered = match value {
                MeasureValue::Comparison { before, after, gain } => {
                    format!("Before: {}  After: {}  Gain: {}", before, after, gain)
                }
                MeasureValue::Single(v) => v.clone(),
            };
            out.push_str(&format!("{:<10} = {}\n", name, rendered));
        }
        out
    }
}

fn row(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    Some((parts.next()?, parts.next()?))
}

fn parse_fusion_table(lines: &[&str]) -> Vec<(String, MeasureValue)> {
    let Some(start) = lines.iter().position(|l| l.contains("Effectiveness")) else {
        return Vec::new();
    };
    lines[start + 1..]
        .iter()
        .filter(|l| !l.is_empty())
        .take_while(|l| !l.contains('-'))
        .filter_map(|l| row(l))
        .map(|(name, value)| (name.to_string(), MeasureValue::Single(value.to_string())))
        .collect()
}

fn parse_comparison_table(lines: &[&str]) -> Result<Vec<(String, MeasureValue)>> {
    let Some(before_at) = lines.iter().position(|l| l.contains("Before")) else {
        return Ok(Vec::new());
    };

    let mut cursor = before_at + 1;
    let mut before = Vec::new();
    while cursor < lines.len() && !lines[cursor].contains("After") {
        if let Some((name, value)) = row(lines[cursor]) {
            before.push((name, value));
        }
        cursor += 1;
    }

    cursor += 1;
    let mut after = Vec::new();
    while cursor < lines.len() && !lines[cursor].contains("Relative Gains") {
        if let Some((_, value)) = row(lines[cursor]) {
            after.push(value);
        }
        cursor += 1;
    }

    cursor += 1;
    let gains: Vec<&str> = lines
        .iter()
        .skip(cursor)
        .filter_map(|l| row(l))
        .take(before.len())
        .map(|(_, value)| value)
        .collect();

    if after.len() != before.len() || gains.len() != before.len() {
        return Err(UdlfError::parse(format!(
            "Effectiveness table is incomplete: {} before, {} after, {} gain rows",
            before.len(),
            after.len(),
            gains.len()
        )));
    }

    Ok(before
        .into_iter()
        .zip(after)
        .zip(gains)
        .map(|(((name, before), after), gain)| {
            (
                name.to_string(),
                MeasureValue::Comparison {
                    before: before.to_string(),
                    after: after.to_string(),
                    gain: gain.to_string(),
                },
            )
        })
        .collect())
}
