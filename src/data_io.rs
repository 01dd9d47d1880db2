//! Flat-file readers and writers for UDLF data
//!
//! Ranked lists are one query per line with space-separated entries.
//! Matrices are one row per line with space-separated floats. Class files
//! pair an element name with its label as `name:label`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, UdlfError};

/// Default number of entries kept per ranked list
pub const DEFAULT_TOP_K: usize = 1000;

fn read_lines(path: &Path) -> Result<String> {
    debug!("Reading file {}", path.display());
    fs::read_to_string(path).map_err(|e| {
        UdlfError::parse(format!("Failed to read {}: {}", path.display(), e))
    })
}

/// Read a numeric ranked list file, keeping at most `top_k` entries per line
pub fn read_ranked_lists_numeric(path: &Path, top_k: usize) -> Result<Vec<Vec<usize>>> {
    let content = read_lines(path)?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_no, line)| {
            line.split_whitespace()
                .take(top_k)
                .map(|token| {
                    token.parse::<usize>().map_err(|_| {
                        UdlfError::parse(format!(
                            "{}:{}: '{}' is not a dataset index",
                            path.display(),
                            line_no + 1,
                            token
                        ))
                    })
                })
                .collect()
        })
        .collect()
}

/// Read a ranked list file of element names
pub fn read_ranked_lists_names(path: &Path, top_k: usize) -> Result<Vec<Vec<String>>> {
    let content = read_lines(path)?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split_whitespace()
                .take(top_k)
                .map(str::to_string)
                .collect()
        })
        .collect())
}

/// Read a distance or similarity matrix
pub fn read_matrix(path: &Path) -> Result<Vec<Vec<f64>>> {
    let content = read_lines(path)?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_no, line)| {
            line.split_whitespace()
                .map(|token| {
                    token.parse::<f64>().map_err(|_| {
                        UdlfError::parse(format!(
                            "{}:{}: '{}' is not a number",
                            path.display(),
                            line_no + 1,
                            token
                        ))
                    })
                })
                .collect()
        })
        .collect()
}

/// Read the element names of a dataset in order
pub fn read_lists(path: &Path) -> Result<Vec<String>> {
    let content = read_lines(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Every line of a file, trimmed, blank lines included.
///
/// Positions match the file's line numbers, which is what a "line N" or
/// "element N" reference points at.
pub fn read_raw_lines(path: &Path) -> Result<Vec<String>> {
    let content = read_lines(path)?;
    Ok(content.lines().map(|line| line.trim().to_string()).collect())
}

/// `name -> label` pairs of a classes file.
///
/// The file holds `name:label` lines. The key is the text before the first
/// `:` and the label the text after the last one.
pub fn read_class_map(classes_path: &Path) -> Result<HashMap<String, i64>> {
    let content = read_lines(classes_path)?;

    let mut labels = HashMap::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (Some(key), Some(label)) = (line.split(':').next(), line.rsplit(':').next()) else {
            continue;
        };
        let label = label.trim().parse::<i64>().map_err(|_| {
            UdlfError::parse(format!(
                "{}:{}: invalid class label in '{}'",
                classes_path.display(),
                line_no + 1,
                line
            ))
        })?;
        labels.insert(key.trim().to_string(), label);
    }
    Ok(labels)
}

/// Class label of every element, in the order of the lists file
pub fn read_classes(lists_path: &Path, classes_path: &Path) -> Result<Vec<i64>> {
    let names = read_lists(lists_path)?;
    let labels = read_class_map(classes_path)?;

    names
        .iter()
        .map(|name| {
            labels.get(name.as_str()).copied().ok_or_else(|| {
                UdlfError::parse(format!(
                    "Element '{}' has no class in {}",
                    name,
                    classes_path.display()
                ))
            })
        })
        .collect()
}

/// Write ranked lists, one per line
pub fn write_ranked_lists(path: &Path, ranked_lists: &[Vec<usize>]) -> Result<()> {
    let mut content = String::new();
    for rk in ranked_lists {
        let line: Vec<String> = rk.iter().map(|v| v.to_string()).collect();
        content.push_str(&line.join(" "));
        content.push('\n');
    }
    fs::write(path, content)?;
    debug!("Wrote {} ranked lists to {}", ranked_lists.len(), path.display());
    Ok(())
}
