//! udlf-runner - command line entry point

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use udlf_runner::cli::{Cli, Commands, GridCommands, ParamsCommands};
use udlf_runner::evaluation;
use udlf_runner::grid_search;
use udlf_runner::validation::ParamValue;
#[cfg(unix)]
use udlf_runner::process_guard;
use udlf_runner::visualization::{self, RenderRequest};
use udlf_runner::{
    data_io, ExecutionLog, Installation, RunOptions, Runner, Settings, UdlfConfig,
    UdlfError,
};

/// Tracing to stderr with file and line; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize result")?
    );
    Ok(())
}

fn load_config(installation: &Installation, path: Option<&Path>) -> Result<UdlfConfig> {
    match path {
        Some(path) => UdlfConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => UdlfConfig::from_installation(installation)
            .context("Failed to load the installed config.ini"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    #[cfg(unix)]
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    let settings = Settings::resolve(cli.settings.as_deref()).context("Invalid settings")?;
    let installation = settings.installation();
    debug!("Using installation {:?}", installation);

    match cli.command {
        Commands::Install => {
            installation
                .ensure_installed()
                .context("Failed to install UDLF")?;
            println!("UDLF binary: {}", installation.binary_path().display());
            println!("Default config: {}", installation.config_path().display());
        }
        Commands::Run {
            config,
            gain,
            depth,
            json,
        } => {
            let runner = Runner::new(installation.clone());
            let config = load_config(&installation, config.as_deref())?;
            let options = RunOptions {
                get_output: true,
                compute_individual_gain: gain,
                depth,
            };
            let mut output = match runner.run(&config, &options) {
                Ok(output) => output,
                Err(UdlfError::Execution { message, flagged }) => {
                    for line in &flagged {
                        eprintln!("  {}", line);
                    }
                    anyhow::bail!("UDLF run failed: {}", message);
                }
                Err(e) => return Err(e).context("UDLF run failed"),
            };
            if json {
                print_json(&output)?;
            } else {
                print!("{}", output.format_log()?);
                if let Some(gains) = output.individual_gain() {
                    println!("Per-query Precision gain:");
                    for g in gains {
                        println!("  {:>6}  {:+.4}", g.query, g.gain);
                    }
                }
            }
        }
        Commands::Params { config, listing } => {
            let config = load_config(&installation, config.as_deref())?;
            let text = match listing {
                ParamsCommands::Names => config.list_names(),
                ParamsCommands::Values => config.list_values(),
                ParamsCommands::Full => config.list_full(),
                ParamsCommands::Info { key } => format!("{}\n", config.param_info(&key)?),
                ParamsCommands::Method { method } => config.method_info(method),
            };
            print!("{}", text);
        }
        Commands::Set {
            config,
            output,
            assignments,
        } => {
            let mut config = load_config(&installation, config.as_deref())?;
            for (key, value) in &assignments {
                config
                    .set_param(key, value)
                    .with_context(|| format!("Cannot set {}", key))?;
            }
            config.write_to_file(&output)?;
            info!("Wrote {} ({} change(s))", output.display(), assignments.len());
        }
        Commands::Evaluate {
            ranked_lists,
            lists,
            classes,
            depth,
            measure,
            json,
        } => {
            let labels = data_io::read_classes(&lists, &classes)?;
            let rks = data_io::read_ranked_lists_numeric(&ranked_lists, usize::MAX)?;
            let report = evaluation::evaluate(measure, &rks, &labels, depth)?;
            if json {
                print_json(&report)?;
            } else {
                println!("{} = {}", measure, report.mean);
            }
        }
        Commands::Gain {
            before,
            after,
            lists,
            classes,
            depth,
            measure,
            json,
        } => {
            let labels = data_io::read_classes(&lists, &classes)?;
            let before = data_io::read_ranked_lists_numeric(&before, usize::MAX)?;
            let after = data_io::read_ranked_lists_numeric(&after, usize::MAX)?;
            let gains = evaluation::compute_gain(&before, &after, &labels, depth, measure)?;
            if json {
                print_json(&gains)?;
            } else {
                for g in &gains {
                    println!("{:>6}  {:+.4}", g.query, g.gain);
                }
            }
        }
        Commands::Log { file, json } => {
            let log = ExecutionLog::load(&file)?;
            if json {
                print_json(&log)?;
            } else {
                print!("{}", log.format());
            }
        }
        Commands::Grid {
            config,
            rl_size,
            json,
            sweep,
        } => {
            let runner = Runner::new(installation.clone());
            let config = load_config(&installation, config.as_deref())?;
            run_grid(&runner, &config, rl_size, json, sweep)?;
        }
        Commands::Render {
            ranked_lists,
            lists,
            classes,
            images,
            line,
            size,
            shape,
            start,
            output,
        } => {
            let mut request = RenderRequest::new(ranked_lists, lists, classes, images, line);
            request.rk_size = size;
            request.shape = shape;
            request.start_element = start;
            let saved: PathBuf = visualization::save_ranked_list(&request, &output)?;
            println!("{}", saved.display());
        }
    }

    Ok(())
}

fn run_grid(
    runner: &Runner,
    config: &UdlfConfig,
    rl_size: Option<usize>,
    json: bool,
    sweep: GridCommands,
) -> Result<()> {
    match sweep {
        GridCommands::Method => {
            let rankings = grid_search::find_best_method(config, runner, rl_size)?;
            if json {
                return print_json(&rankings);
            }
            for (measure, ranking) in &rankings {
                println!("{}:", measure);
                for run in ranking {
                    println!("  {:<12} {}", run.candidate.to_string(), score_text(run.score));
                }
            }
        }
        GridCommands::Param {
            method,
            param,
            values,
        } => {
            let values: Vec<ParamValue> = values.into_iter().map(ParamValue::from).collect();
            let rankings =
                grid_search::find_best_param(config, runner, method, &param, &values, rl_size)?;
            if json {
                return print_json(&rankings);
            }
            for (measure, ranking) in &rankings {
                println!("{}:", measure);
                for run in ranking {
                    println!("  {:<12} {}", run.candidate, score_text(run.score));
                }
            }
        }
        GridCommands::K { measures, ks } => {
            let best = grid_search::find_best_method_with_best_k(
                config, runner, &measures, &ks, rl_size,
            )?;
            if json {
                return print_json(&best);
            }
            for (measure, entries) in &best {
                println!("{}:", measure);
                for entry in entries {
                    println!(
                        "  k={:<5} {:<12} {:.4}",
                        entry.k,
                        entry.method.to_string(),
                        entry.score
                    );
                }
            }
        }
    }
    Ok(())
}

fn score_text(score: Option<f64>) -> String {
    score.map_or_else(|| "failed".to_string(), |s| format!("{:.4}", s))
}
