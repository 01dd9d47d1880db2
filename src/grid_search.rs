//! Parameter and method sweeps
//!
//! Each sweep runs the binary once per candidate and ranks the candidates by
//! every effectiveness measure the config asks the binary to compute. Sweeps
//! work on clones, so the caller's config is left as it was.
//!
//! A run that fails still gets a row in every ranking, with no score. Rows
//! are ordered best first, unscored rows last.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::UdlfConfig;
use crate::error::{Result, UdlfError};
use crate::runner::{Executor, RunOptions};
use crate::types::UdlMethod;
use crate::validation::{validate_param, ParamValue};

/// One candidate and the score it reached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRun<T> {
    /// `None` when the run failed or the log lacked the measure
    pub score: Option<f64>,
    pub candidate: T,
}

/// Candidates ranked per measure name (`MAP`, `P@10`, `Recall@4`, ...)
pub type Rankings<T> = BTreeMap<String, Vec<ScoredRun<T>>>;

/// Best method found for one neighborhood size
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestForK {
    pub score: f64,
    pub method: UdlMethod,
    pub k: u64,
}

/// Measures the binary reports for `config`.
///
/// `P@n` for every n in `EFFECTIVENESS_PRECISIONS_TO_COMPUTE`, then
/// `Recall@n` for `EFFECTIVENESS_RECALLS_TO_COMPUTE`, then `MAP`. Each group
/// only when its `EFFECTIVENESS_COMPUTE_*` flag is `TRUE`.
pub fn effectiveness_measures(config: &UdlfConfig) -> Vec<String> {
    let mut measures = Vec::new();
    let depths = |key: &str| -> Vec<String> {
        config
            .value(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };
    if config.flag("EFFECTIVENESS_COMPUTE_PRECISIONS") {
        measures.extend(
            depths("EFFECTIVENESS_PRECISIONS_TO_COMPUTE")
                .into_iter()
                .map(|d| format!("P@{}", d)),
        );
    }
    if config.flag("EFFECTIVENESS_COMPUTE_RECALL") {
        measures.extend(
            depths("EFFECTIVENESS_RECALLS_TO_COMPUTE")
                .into_iter()
                .map(|d| format!("Recall@{}", d)),
        );
    }
    if config.flag("EFFECTIVENESS_COMPUTE_MAP") {
        measures.push("MAP".to_string());
    }
    measures
}

fn sort_ranking<T>(ranking: &mut [ScoredRun<T>]) {
    ranking.sort_by(|a, b| match (a.score, b.score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Run every prepared config and rank the candidates
fn sweep<E, T>(
    executor: &E,
    measures: &[String],
    runs: Vec<(T, UdlfConfig)>,
) -> Rankings<T>
where
    E: Executor + ?Sized,
    T: Clone + std::fmt::Display,
{
    let mut rankings: Rankings<T> = measures
        .iter()
        .map(|m| (m.clone(), Vec::with_capacity(runs.len())))
        .collect();
    let options = RunOptions::default();

    for (candidate, config) in runs {
        info!("Running candidate {}", candidate);
        let mut output = match executor.execute(&config, &options) {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("Run for {} failed: {}", candidate, e);
                None
            }
        };
        let log = output.as_mut().and_then(|o| match o.load_log() {
            Ok(log) => Some(log.clone()),
            Err(e) => {
                warn!("No log for {}: {}", candidate, e);
                None
            }
        });

        for (measure, ranking) in rankings.iter_mut() {
            ranking.push(ScoredRun {
                score: log.as_ref().and_then(|l| l.after(measure)),
                candidate: candidate.clone(),
            });
        }
    }

    for ranking in rankings.values_mut() {
        sort_ranking(ranking);
    }
    rankings
}

/// Try each value of one method parameter
pub fn find_best_param<E: Executor + ?Sized>(
    config: &UdlfConfig,
    executor: &E,
    method: UdlMethod,
    param: &str,
    values: &[ParamValue],
    ranked_list_size: Option<usize>,
) -> Result<Rankings<String>> {
    if !config.contains(param) {
        return Err(UdlfError::config(format!("Parameter {} does not exist", param)));
    }
    if !param.starts_with(&method.param_prefix()) {
        return Err(UdlfError::config(format!(
            "Parameter {} does not belong to {}",
            param, method
        )));
    }
    let values: Vec<String> = values
        .iter()
        .map(|v| validate_param(param, v))
        .collect::<Result<_>>()?;

    let mut base = config.clone();
    base.set_method(method)?;
    if let Some(size) = ranked_list_size {
        base.set_param(&method.ranked_list_size_key(), size)?;
    }

    let runs = values
        .into_iter()
        .map(|value| {
            let mut run = base.clone();
            run.set_param(param, value.as_str())?;
            Ok((value, run))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(sweep(executor, &effectiveness_measures(&base), runs))
}

/// Try every available re-ranking method
pub fn find_best_method<E: Executor + ?Sized>(
    config: &UdlfConfig,
    executor: &E,
    ranked_list_size: Option<usize>,
) -> Result<Rankings<UdlMethod>> {
    let mut base = config.clone();
    if let Some(size) = ranked_list_size {
        base.set_ranked_lists_size(size)?;
    }

    let runs = base
        .available_methods()
        .into_iter()
        .filter(|m| *m != UdlMethod::None)
        .map(|method| {
            let mut run = base.clone();
            run.set_method(method)?;
            Ok((method, run))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(sweep(executor, &effectiveness_measures(&base), runs))
}

/// For each neighborhood size, the best method per requested measure.
///
/// Every method's neighborhood parameter is set to `k` before the method
/// sweep. Measures the config does not compute are skipped with a warning,
/// and so is a `k` where no method produced a score.
pub fn find_best_method_with_best_k<E: Executor + ?Sized>(
    config: &UdlfConfig,
    executor: &E,
    measures: &[String],
    ks: &[u64],
    ranked_list_size: Option<usize>,
) -> Result<BTreeMap<String, Vec<BestForK>>> {
    let known = effectiveness_measures(config);
    let wanted: Vec<&String> = measures
        .iter()
        .filter(|m| {
            let ok = known.contains(*m);
            if !ok {
                warn!("Measure {} is not computed by this config, skipping it", m);
            }
            ok
        })
        .collect();

    let mut best: BTreeMap<String, Vec<BestForK>> =
        wanted.iter().map(|m| (m.to_string(), Vec::new())).collect();
    if wanted.is_empty() {
        return Ok(best);
    }

    for &k in ks {
        let mut base = config.clone();
        for method in base.available_methods() {
            let key = method.neighborhood_key();
            if method != UdlMethod::None && base.contains(&key) {
                base.set_param(&key, k)?;
            }
        }
        info!("Sweeping methods with k = {}", k);
        let rankings = find_best_method(&base, executor, ranked_list_size)?;

        for measure in &wanted {
            let top = rankings
                .get(measure.as_str())
                .and_then(|ranking| ranking.first())
                .and_then(|run| run.score.map(|score| (score, run.candidate)));
            match top {
                Some((score, method)) => {
                    if let Some(entries) = best.get_mut(measure.as_str()) {
                        entries.push(BestForK { score, method, k });
                    }
                }
                None => warn!("No method produced {} for k = {}", measure, k),
            }
        }
    }
    Ok(best)
}
