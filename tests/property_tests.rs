//! Property-based tests for udlf-runner
//!
//! These tests verify:
//! - Metric bounds and fixed points over random rankings
//! - Enum string round-trips for config tokens
//! - Validation of unsigned parameters

use proptest::prelude::*;
use std::collections::HashMap;

use udlf_runner::evaluation::{
    class_sizes, compute_gain, mean_average_precision, precision, recall,
};
use udlf_runner::types::{Measure, UdlMethod};
use udlf_runner::validation::validate_param;

/// Random labels plus one random permutation of the dataset per query
fn dataset_strategy() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<u8>)> {
    (2usize..16).prop_flat_map(|n| {
        let permutation = Just((0..n).collect::<Vec<usize>>()).prop_shuffle();
        (
            prop::collection::vec(permutation, n),
            prop::collection::vec(0u8..3, n),
        )
    })
}

/// Relevant elements first, then the rest
fn ideal_rankings(classes: &[u8]) -> Vec<Vec<usize>> {
    (0..classes.len())
        .map(|q| {
            let (mut relevant, rest): (Vec<usize>, Vec<usize>) =
                (0..classes.len()).partition(|&e| classes[e] == classes[q]);
            relevant.extend(rest);
            relevant
        })
        .collect()
}

// =============================================================================
// Metric Property Tests
// =============================================================================

proptest! {
    /// Every measure stays within [0, 1] at every depth
    #[test]
    fn metrics_are_bounded((rks, classes) in dataset_strategy(), depth in 1usize..20) {
        for report in [
            precision(&rks, &classes, Some(depth)).unwrap(),
            recall(&rks, &classes, Some(depth)).unwrap(),
            mean_average_precision(&rks, &classes, Some(depth)).unwrap(),
        ] {
            prop_assert!(report.per_query.iter().all(|v| (0.0..=1.0).contains(v)));
            prop_assert!((0.0..=1.0).contains(&report.mean));
            prop_assert_eq!(report.per_query.len(), rks.len());
        }
    }

    /// A full permutation holds every relevant element
    #[test]
    fn full_depth_recall_is_one((rks, classes) in dataset_strategy()) {
        let report = recall(&rks, &classes, None).unwrap();
        prop_assert!(report.per_query.iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    /// At full depth precision is the class share of the dataset
    #[test]
    fn full_depth_precision_is_class_share((rks, classes) in dataset_strategy()) {
        let sizes: HashMap<u8, usize> = class_sizes(&classes);
        let n = classes.len() as f64;
        let report = precision(&rks, &classes, None).unwrap();
        for (q, value) in report.per_query.iter().enumerate() {
            let expected = sizes[&classes[q]] as f64 / n;
            prop_assert!((value - expected).abs() < 1e-12);
        }
    }

    /// Ranking relevant elements first gives a perfect MAP
    #[test]
    fn ideal_ranking_has_perfect_map(classes in prop::collection::vec(0u8..4, 1..20)) {
        let rks = ideal_rankings(&classes);
        let report = mean_average_precision(&rks, &classes, None).unwrap();
        prop_assert_eq!(report.mean, 1.0);
    }

    /// Comparing rankings with themselves gains nothing
    #[test]
    fn self_gain_is_zero((rks, classes) in dataset_strategy(), depth in 1usize..20) {
        for measure in [Measure::Map, Measure::Precision, Measure::Recall] {
            let gains = compute_gain(&rks, &rks, &classes, Some(depth), measure).unwrap();
            prop_assert!(gains.iter().all(|g| g.gain == 0.0));
        }
    }
}

// =============================================================================
// Config Token Property Tests
// =============================================================================

fn method_strategy() -> impl Strategy<Value = UdlMethod> {
    prop::sample::select(vec![
        UdlMethod::None,
        UdlMethod::Cprr,
        UdlMethod::Rlrecom,
        UdlMethod::Rlsim,
        UdlMethod::Contextrr,
        UdlMethod::Recknngraph,
        UdlMethod::Rkgraph,
        UdlMethod::Corgraph,
        UdlMethod::Lhrr,
        UdlMethod::Bfstree,
        UdlMethod::Rdpac,
        UdlMethod::Rfe,
    ])
}

proptest! {
    /// UdlMethod: to_string -> parse round-trip is identity
    #[test]
    fn method_roundtrip(method in method_strategy()) {
        let parsed: UdlMethod = method.to_string().parse().expect("Should parse");
        prop_assert_eq!(method, parsed);
    }

    /// UdlMethod: lowercase input parses too
    #[test]
    fn method_parse_ignores_case(method in method_strategy()) {
        let parsed: UdlMethod = method.to_string().to_lowercase().parse().expect("Should parse");
        prop_assert_eq!(method, parsed);
    }

    /// Every method validates as a UDL_METHOD value
    #[test]
    fn method_is_valid_config_value(method in method_strategy()) {
        let normalized = validate_param("UDL_METHOD", &method.to_string().into()).unwrap();
        prop_assert_eq!(normalized, method.to_string());
    }

    /// Unsigned parameters accept any u32 and reject negatives
    #[test]
    fn uint_params(value in any::<u32>(), negative in i64::MIN..0) {
        let ok = validate_param("PARAM_CPRR_K", &value.into()).unwrap();
        prop_assert_eq!(ok, value.to_string());
        prop_assert!(validate_param("PARAM_CPRR_K", &negative.into()).is_err());
    }
}
