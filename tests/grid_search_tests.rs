//! Grid search tests against a scripted executor
//!
//! The executor never starts a process. It scores each config from its
//! method and neighborhood size, so the expected rankings are known.

use std::cell::RefCell;
use std::path::PathBuf;

use udlf_runner::grid_search::{self, ScoredRun};
use udlf_runner::validation::ParamValue;
use udlf_runner::{
    Executor, ExecutionLog, MeasureValue, Result, RunOptions, UdlMethod, UdlfConfig, UdlfError,
    UdlfOutput,
};

const CONFIG: &str = "\
UDL_METHOD                            = CPRR            #(NONE|CPRR|RLSIM|LHRR): Method
EFFECTIVENESS_COMPUTE_PRECISIONS      = TRUE
EFFECTIVENESS_PRECISIONS_TO_COMPUTE   = 10
EFFECTIVENESS_COMPUTE_RECALL          = FALSE
EFFECTIVENESS_RECALLS_TO_COMPUTE      = 4
EFFECTIVENESS_COMPUTE_MAP             = TRUE
PARAM_CPRR_L                          = 400
PARAM_CPRR_K                          = 20
PARAM_RLSIM_L                         = 400
PARAM_RLSIM_TOPK                      = 15
PARAM_LHRR_L                          = 400
PARAM_LHRR_K                          = 18
";

/// MAP peaks at k = 20 for every method; P@10 ignores k
struct ScriptedExecutor {
    calls: RefCell<Vec<UdlfConfig>>,
    failing: Vec<UdlMethod>,
}

impl ScriptedExecutor {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            failing: Vec::new(),
        }
    }

    fn failing(methods: &[UdlMethod]) -> Self {
        Self {
            failing: methods.to_vec(),
            ..Self::new()
        }
    }

    fn base_score(method: UdlMethod) -> f64 {
        match method {
            UdlMethod::Lhrr => 0.7,
            UdlMethod::Cprr => 0.6,
            UdlMethod::Rlsim => 0.55,
            _ => 0.3,
        }
    }
}

fn measure(value: f64) -> MeasureValue {
    MeasureValue::Comparison {
        before: "0.4000".to_string(),
        after: format!("{:.4}", value),
        gain: "+0.0000%".to_string(),
    }
}

impl Executor for ScriptedExecutor {
    fn execute(&self, config: &UdlfConfig, _options: &RunOptions) -> Result<UdlfOutput> {
        self.calls.borrow_mut().push(config.clone());
        let method = config.method()?;
        if self.failing.contains(&method) {
            return Err(UdlfError::execution("scripted failure", vec!["Error".to_string()]));
        }

        let k: f64 = config
            .value(&method.neighborhood_key())
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0);
        let base = Self::base_score(method);
        let log = ExecutionLog {
            task: Some("UDL".to_string()),
            time: Some("0.01 s".to_string()),
            measures: vec![
                ("P@10".to_string(), measure(base + 0.1)),
                ("MAP".to_string(), measure(base - (k - 20.0).abs() / 100.0)),
            ],
        };
        Ok(UdlfOutput {
            rk_path: PathBuf::from("out.txt"),
            matrix_path: PathBuf::from("out.txt"),
            log_path: PathBuf::from("log.txt"),
            log: Some(log),
            individual_gain: None,
        })
    }
}

fn candidates<T: Clone>(ranking: &[ScoredRun<T>]) -> Vec<T> {
    ranking.iter().map(|r| r.candidate.clone()).collect()
}

// =============================================================================
// find_best_param
// =============================================================================

#[test]
fn test_best_param_ranks_values() {
    let config = UdlfConfig::parse(CONFIG);
    let executor = ScriptedExecutor::new();
    let values: Vec<ParamValue> = vec![10i64.into(), 20i64.into(), 35i64.into()];

    let rankings = grid_search::find_best_param(
        &config,
        &executor,
        UdlMethod::Cprr,
        "PARAM_CPRR_K",
        &values,
        Some(100),
    )
    .unwrap();

    assert_eq!(candidates(&rankings["MAP"]), vec!["20", "10", "35"]);
    assert_eq!(rankings["MAP"][0].score, Some(0.6));
    assert_eq!(rankings["P@10"].len(), 3);

    let calls = executor.calls.borrow();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|c| c.value("PARAM_CPRR_L").unwrap() == "100"));
    assert_eq!(calls[2].value("PARAM_CPRR_K").unwrap(), "35");

    assert_eq!(config.value("PARAM_CPRR_K").unwrap(), "20");
    assert_eq!(config.value("PARAM_CPRR_L").unwrap(), "400");
}

#[test]
fn test_best_param_switches_method() {
    let config = UdlfConfig::parse(CONFIG);
    let executor = ScriptedExecutor::new();
    let values: Vec<ParamValue> = vec![20i64.into()];
    grid_search::find_best_param(&config, &executor, UdlMethod::Lhrr, "PARAM_LHRR_K", &values, None)
        .unwrap();
    assert_eq!(executor.calls.borrow()[0].method().unwrap(), UdlMethod::Lhrr);
}

#[test]
fn test_best_param_rejects_bad_input() {
    let config = UdlfConfig::parse(CONFIG);
    let executor = ScriptedExecutor::new();
    let good: Vec<ParamValue> = vec![10i64.into()];
    let bad: Vec<ParamValue> = vec![10i64.into(), "many".into()];

    assert!(grid_search::find_best_param(
        &config, &executor, UdlMethod::Cprr, "PARAM_CPRR_X", &good, None
    )
    .is_err());
    assert!(grid_search::find_best_param(
        &config, &executor, UdlMethod::Cprr, "PARAM_LHRR_K", &good, None
    )
    .is_err());
    assert!(grid_search::find_best_param(
        &config, &executor, UdlMethod::Cprr, "PARAM_CPRR_K", &bad, None
    )
    .is_err());
    assert!(executor.calls.borrow().is_empty());
}

// =============================================================================
// find_best_method
// =============================================================================

#[test]
fn test_best_method_skips_none() {
    let config = UdlfConfig::parse(CONFIG);
    let executor = ScriptedExecutor::new();
    let rankings = grid_search::find_best_method(&config, &executor, Some(50)).unwrap();

    // LHRR: 0.7 - 0.02, CPRR: 0.6, RLSIM: 0.55 - 0.05
    assert_eq!(
        candidates(&rankings["MAP"]),
        vec![UdlMethod::Lhrr, UdlMethod::Cprr, UdlMethod::Rlsim]
    );

    let calls = executor.calls.borrow();
    assert_eq!(calls.len(), 3);
    for call in calls.iter() {
        assert_eq!(call.value("PARAM_CPRR_L").unwrap(), "50");
        assert_eq!(call.value("PARAM_LHRR_L").unwrap(), "50");
    }
    assert_eq!(config.value("PARAM_LHRR_L").unwrap(), "400");
}

#[test]
fn test_failed_method_sorts_last() {
    let config = UdlfConfig::parse(CONFIG);
    let executor = ScriptedExecutor::failing(&[UdlMethod::Lhrr]);
    let rankings = grid_search::find_best_method(&config, &executor, None).unwrap();

    let map = &rankings["MAP"];
    assert_eq!(map.len(), 3);
    assert_eq!(map[0].candidate, UdlMethod::Cprr);
    assert_eq!(map[2].candidate, UdlMethod::Lhrr);
    assert_eq!(map[2].score, None);
}

// =============================================================================
// find_best_method_with_best_k
// =============================================================================

#[test]
fn test_best_method_per_k() {
    let config = UdlfConfig::parse(CONFIG);
    let executor = ScriptedExecutor::new();
    let measures = vec!["MAP".to_string(), "Recall@4".to_string(), "P@10".to_string()];

    let best =
        grid_search::find_best_method_with_best_k(&config, &executor, &measures, &[10, 20], None)
            .unwrap();

    assert!(!best.contains_key("Recall@4"));
    let map = &best["MAP"];
    assert_eq!(map.len(), 2);
    assert_eq!(map[0].k, 10);
    assert_eq!(map[0].method, UdlMethod::Lhrr);
    assert!((map[0].score - 0.6).abs() < 1e-9);
    assert_eq!(map[1].k, 20);
    assert!((map[1].score - 0.7).abs() < 1e-9);

    assert!(best["P@10"].iter().all(|b| b.method == UdlMethod::Lhrr));

    // Every method's neighborhood key follows k.
    let calls = executor.calls.borrow();
    assert_eq!(calls.len(), 6);
    let last = &calls[5];
    assert_eq!(last.value("PARAM_RLSIM_TOPK").unwrap(), "20");
    assert_eq!(last.value("PARAM_CPRR_K").unwrap(), "20");
    assert_eq!(last.value("PARAM_LHRR_K").unwrap(), "20");
    assert_eq!(config.value("PARAM_RLSIM_TOPK").unwrap(), "15");
}

#[test]
fn test_best_method_per_k_with_every_run_failing() {
    let config = UdlfConfig::parse(CONFIG);
    let executor =
        ScriptedExecutor::failing(&[UdlMethod::Cprr, UdlMethod::Rlsim, UdlMethod::Lhrr]);
    let best = grid_search::find_best_method_with_best_k(
        &config,
        &executor,
        &["MAP".to_string()],
        &[5],
        None,
    )
    .unwrap();
    assert!(best["MAP"].is_empty());
}

#[test]
fn test_unknown_measures_only() {
    let config = UdlfConfig::parse(CONFIG);
    let executor = ScriptedExecutor::new();
    let best = grid_search::find_best_method_with_best_k(
        &config,
        &executor,
        &["Recall@4".to_string()],
        &[5, 10],
        None,
    )
    .unwrap();
    assert!(best.is_empty());
    assert!(executor.calls.borrow().is_empty());
}
