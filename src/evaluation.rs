//! Retrieval effectiveness measures
//!
//! Precision@k, Recall@k and MAP over ranked lists, computed locally from the
//! dataset's class labels. Query `i` is labelled `classes[i]`; an element `e`
//! in a ranked list is relevant when `classes[e]` equals the query's label.
//!
//! # Depth
//!
//! Every measure inspects the top `depth` positions. An unset depth means the
//! number of ranked lists, a larger depth is clamped to it, and zero is
//! rejected. Ranked lists shorter than the depth are scored on what they hold.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;
use tracing::warn;

use crate::error::{Result, UdlfError};
use crate::types::Measure;

/// Mean and per-query values of one measure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    /// Mean over all queries, rounded to four decimal places
    pub mean: f64,
    pub per_query: Vec<f64>,
}

/// Change of a measure for one query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueryGain {
    pub query: usize,
    pub gain: f64,
}

/// Round to four decimal places
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Number of elements per class
pub fn class_sizes<C: Eq + Hash + Clone>(labels: &[C]) -> HashMap<C, usize> {
    let mut sizes = HashMap::new();
    for label in labels {
        *sizes.entry(label.clone()).or_insert(0) += 1;
    }
    sizes
}

fn resolve_depth(depth: Option<usize>, num_lists: usize) -> Result<usize> {
    match depth {
        None => {
            warn!("Depth not set, using the number of ranked lists ({})", num_lists);
            Ok(num_lists)
        }
        Some(0) => Err(UdlfError::evaluation("Depth must be a positive integer")),
        Some(d) if d > num_lists => {
            warn!(
                "Depth {} is larger than the number of ranked lists, using {}",
                d, num_lists
            );
            Ok(num_lists)
        }
        Some(d) => Ok(d),
    }
}

fn label_of<C>(classes: &[C], index: usize) -> Result<&C> {
    classes.get(index).ok_or_else(|| {
        UdlfError::evaluation(format!(
            "Index {} is out of range for {} class labels",
            index,
            classes.len()
        ))
    })
}

/// Relevance flags of the top `depth` entries of one ranked list
fn relevance<C: PartialEq>(
    query: usize,
    ranked_list: &[usize],
    classes: &[C],
    depth: usize,
) -> Result<Vec<bool>> {
    let query_label = label_of(classes, query)?;
    ranked_list
        .iter()
        .take(depth)
        .map(|&element| Ok(label_of(classes, element)? == query_label))
        .collect()
}

fn per_query<C, F>(
    rks: &[Vec<usize>],
    classes: &[C],
    depth: Option<usize>,
    mut score: F,
) -> Result<MetricReport>
where
    C: Eq + Hash + Clone,
    F: FnMut(&[bool], usize, usize) -> f64,
{
    if rks.is_empty() {
        return Err(UdlfError::evaluation("No ranked lists to evaluate"));
    }
    let depth = resolve_depth(depth, rks.len())?;
    let sizes = class_sizes(classes);

    let values = rks
        .iter()
        .enumerate()
        .map(|(query, rk)| {
            let hits = relevance(query, rk, classes, depth)?;
            let class_size = sizes.get(label_of(classes, query)?).copied().unwrap_or(1);
            Ok(score(&hits, depth, class_size))
        })
        .collect::<Result<Vec<f64>>>()?;

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Ok(MetricReport {
        mean: round4(mean),
        per_query: values,
    })
}

/// Precision@depth: relevant entries in the top `depth` divided by `depth`
pub fn precision<C: Eq + Hash + Clone>(
    rks: &[Vec<usize>],
    classes: &[C],
    depth: Option<usize>,
) -> Result<MetricReport> {
    per_query(rks, classes, depth, |hits, depth, _| {
        hits.iter().filter(|&&hit| hit).count() as f64 / depth as f64
    })
}

/// Recall@depth: relevant entries in the top `depth` divided by the class size
pub fn recall<C: Eq + Hash + Clone>(
    rks: &[Vec<usize>],
    classes: &[C],
    depth: Option<usize>,
) -> Result<MetricReport> {
    per_query(rks, classes, depth, |hits, _, class_size| {
        hits.iter().filter(|&&hit| hit).count() as f64 / class_size as f64
    })
}

/// Mean average precision over the top `depth` entries
pub fn mean_average_precision<C: Eq + Hash + Clone>(
    rks: &[Vec<usize>],
    classes: &[C],
    depth: Option<usize>,
) -> Result<MetricReport> {
    per_query(rks, classes, depth, |hits, _, class_size| {
        let mut found = 0usize;
        let mut sum = 0.0;
        for (rank, _) in hits.iter().enumerate().filter(|(_, hit)| **hit) {
            found += 1;
            sum += found as f64 / (rank + 1) as f64;
        }
        sum / class_size as f64
    })
}

/// Compute one measure
pub fn evaluate<C: Eq + Hash + Clone>(
    measure: Measure,
    rks: &[Vec<usize>],
    classes: &[C],
    depth: Option<usize>,
) -> Result<MetricReport> {
    match measure {
        Measure::Map => mean_average_precision(rks, classes, depth),
        Measure::Precision => precision(rks, classes, depth),
        Measure::Recall => recall(rks, classes, depth),
    }
}

/// Per-query change of a measure between two sets of ranked lists
pub fn compute_gain<C: Eq + Hash + Clone>(
    before: &[Vec<usize>],
    after: &[Vec<usize>],
    classes: &[C],
    depth: Option<usize>,
    measure: Measure,
) -> Result<Vec<QueryGain>> {
    if before.len() != after.len() {
        return Err(UdlfError::evaluation(format!(
            "Cannot compare {} ranked lists with {}",
            before.len(),
            after.len()
        )));
    }
    let before = evaluate(measure, before, classes, depth)?;
    let after = evaluate(measure, after, classes, depth)?;
    Ok(before
        .per_query
        .iter()
        .zip(&after.per_query)
        .enumerate()
        .map(|(query, (b, a))| QueryGain {
            query,
            gain: round4(a - b),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> (Vec<Vec<usize>>, Vec<i64>) {
        // Two classes of two elements each.
        let classes = vec![0, 0, 1, 1];
        let rks = vec![
            vec![0, 1, 2, 3],
            vec![1, 2, 0, 3],
            vec![2, 3, 0, 1],
            vec![3, 0, 1, 2],
        ];
        (rks, classes)
    }

    #[test]
    fn test_class_sizes() {
        let sizes = class_sizes(&["a", "b", "a"]);
        assert_eq!(sizes["a"], 2);
        assert_eq!(sizes["b"], 1);
    }

    #[test]
    fn test_precision_at_two() {
        let (rks, classes) = dataset();
        let report = precision(&rks, &classes, Some(2)).unwrap();
        assert_eq!(report.per_query, vec![1.0, 0.5, 1.0, 0.5]);
        assert_eq!(report.mean, 0.75);
    }

    #[test]
    fn test_recall_at_two() {
        let (rks, classes) = dataset();
        let report = recall(&rks, &classes, Some(2)).unwrap();
        assert_eq!(report.per_query, vec![1.0, 0.5, 1.0, 0.5]);
    }

    #[test]
    fn test_map_full_depth() {
        let (rks, classes) = dataset();
        let report = mean_average_precision(&rks, &classes, None).unwrap();
        // Query 1 finds its two relevant items at ranks 1 and 3.
        assert_eq!(report.per_query[0], 1.0);
        assert!((report.per_query[1] - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
        // Query 3 finds them at ranks 1 and 4.
        assert!((report.per_query[3] - (1.0 + 0.5) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_depth_is_clamped_and_zero_rejected() {
        let (rks, classes) = dataset();
        let clamped = precision(&rks, &classes, Some(50)).unwrap();
        let full = precision(&rks, &classes, Some(4)).unwrap();
        assert_eq!(clamped, full);
        assert!(precision(&rks, &classes, Some(0)).is_err());
    }

    #[test]
    fn test_out_of_range_element() {
        let classes = vec![0, 1];
        let rks = vec![vec![0, 7], vec![1, 0]];
        assert!(precision(&rks, &classes, Some(2)).is_err());
    }

    #[test]
    fn test_empty_input_rejected() {
        let classes: Vec<i64> = vec![];
        assert!(recall(&[], &classes, None).is_err());
    }

    #[test]
    fn test_gain_is_after_minus_before() {
        let (after, classes) = dataset();
        let before = vec![
            vec![0, 2, 1, 3],
            vec![1, 2, 0, 3],
            vec![2, 0, 3, 1],
            vec![3, 0, 1, 2],
        ];
        let gains = compute_gain(&before, &after, &classes, Some(2), Measure::Precision).unwrap();
        assert_eq!(gains.len(), 4);
        assert_eq!(gains[0], QueryGain { query: 0, gain: 0.5 });
        assert_eq!(gains[1].gain, 0.0);
        assert_eq!(gains[2].gain, 0.5);
    }

    #[test]
    fn test_gain_requires_matching_lengths() {
        let (rks, classes) = dataset();
        assert!(compute_gain(&rks[..2], &rks, &classes, Some(2), Measure::Map).is_err());
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(1.0), 1.0);
    }
}
