use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::{Measure, UdlMethod};

/// udlf-runner - drive the UDLF unsupervised distance learning binary
#[derive(Parser)]
#[command(name = "udlf-runner")]
#[command(about = "Install, configure, run and evaluate the UDLF re-ranking binary")]
#[command(version)]
pub struct Cli {
    /// Settings file (JSON); defaults to $UDLF_HOME/settings.json when present
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download and unpack the UDLF binary and its default config
    Install,
    /// Run UDLF on a config file
    Run {
        /// Config to run (defaults to the installed config.ini)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Also compute the per-query Precision gain
        #[arg(long)]
        gain: bool,
        /// Depth of the gain (defaults to the number of ranked lists)
        #[arg(long)]
        depth: Option<usize>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List config parameters
    Params {
        /// Config to inspect (defaults to the installed config.ini)
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(subcommand)]
        listing: ParamsCommands,
    },
    /// Change parameters and write the result to a new config
    Set {
        /// Config to start from (defaults to the installed config.ini)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Where to write the edited config (.ini)
        #[arg(short, long)]
        output: PathBuf,
        /// KEY=VALUE assignments
        #[arg(value_parser = parse_assignment, required = true)]
        assignments: Vec<(String, String)>,
    },
    /// Compute an effectiveness measure for a ranked list file
    Evaluate {
        /// Ranked lists (numeric)
        #[arg(short, long)]
        ranked_lists: PathBuf,
        /// Element names in dataset order
        #[arg(short, long)]
        lists: PathBuf,
        /// name:class file
        #[arg(short, long)]
        classes: PathBuf,
        #[arg(short, long)]
        depth: Option<usize>,
        /// MAP, Precision or Recall
        #[arg(short, long, default_value = "MAP")]
        measure: Measure,
        /// Print per-query values as JSON
        #[arg(long)]
        json: bool,
    },
    /// Per-query gain between two ranked list files
    Gain {
        #[arg(short, long)]
        before: PathBuf,
        #[arg(short, long)]
        after: PathBuf,
        #[arg(short, long)]
        lists: PathBuf,
        #[arg(short, long)]
        classes: PathBuf,
        #[arg(short, long)]
        depth: Option<usize>,
        #[arg(short, long, default_value = "Precision")]
        measure: Measure,
        #[arg(long)]
        json: bool,
    },
    /// Parse and print a UDLF log file
    Log {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Grid search over methods and parameters
    Grid {
        /// Config to sweep from (defaults to the installed config.ini)
        #[arg(short, long, global = true)]
        config: Option<PathBuf>,
        /// Ranked list size applied before the sweep
        #[arg(long, global = true)]
        rl_size: Option<usize>,
        #[arg(long, global = true)]
        json: bool,
        #[command(subcommand)]
        sweep: GridCommands,
    },
    /// Render one ranked list as an image strip
    Render {
        #[arg(short, long)]
        ranked_lists: PathBuf,
        #[arg(short, long)]
        lists: PathBuf,
        #[arg(short, long)]
        classes: PathBuf,
        /// Directory holding the dataset images
        #[arg(short, long)]
        images: PathBuf,
        /// Query line to render
        #[arg(long)]
        line: usize,
        /// Number of images
        #[arg(long, default_value_t = 10)]
        size: usize,
        /// Resize every image to WIDTHxHEIGHT
        #[arg(long, value_parser = parse_shape)]
        shape: Option<(u32, u32)>,
        /// First ranked list position to show
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Output image (png or jpg)
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ParamsCommands {
    /// Parameter names
    Names,
    /// name = value
    Values,
    /// name = value #comment
    Full,
    /// One parameter with its comment
    Info { key: String },
    /// Every parameter of one method
    Method { method: UdlMethod },
}

#[derive(Subcommand)]
pub enum GridCommands {
    /// Run every available method
    Method,
    /// Try several values of one method parameter
    Param {
        #[arg(short, long)]
        method: UdlMethod,
        /// Parameter name, e.g. PARAM_CPRR_K
        #[arg(short, long)]
        param: String,
        /// Values to try
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Best method per measure for each neighborhood size
    K {
        /// Measures to rank by, e.g. MAP,P@10
        #[arg(short, long, value_delimiter = ',', required = true)]
        measures: Vec<String>,
        /// Neighborhood sizes to try
        #[arg(short, long, value_delimiter = ',', required = true)]
        ks: Vec<u64>,
    },
}

/// Parse `KEY=VALUE`
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Parse `WIDTHxHEIGHT`
pub fn parse_shape(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width in '{}'", s))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height in '{}'", s))?;
    if w == 0 || h == 0 {
        return Err("width and height must be positive".to_string());
    }
    Ok((w, h))
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_install() {
        let cli = Cli::try_parse_from(["udlf-runner", "install"]).unwrap();
        assert!(matches!(cli.command, Commands::Install));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_run_with_gain() {
        let cli = Cli::try_parse_from([
            "udlf-runner",
            "--verbose",
            "run",
            "--config",
            "my.ini",
            "--gain",
            "--depth",
            "20",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run { config, gain, depth, json } => {
                assert_eq!(config, Some(PathBuf::from("my.ini")));
                assert!(gain);
                assert_eq!(depth, Some(20));
                assert!(!json);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_params_method() {
        let cli = Cli::try_parse_from(["udlf-runner", "params", "method", "cprr"]).unwrap();
        match cli.command {
            Commands::Params { listing: ParamsCommands::Method { method }, .. } => {
                assert_eq!(method, UdlMethod::Cprr);
            }
            _ => panic!("expected params method"),
        }
        assert!(Cli::try_parse_from(["udlf-runner", "params", "method", "nope"]).is_err());
    }

    #[test]
    fn test_cli_set_assignments() {
        let cli = Cli::try_parse_from([
            "udlf-runner",
            "set",
            "-o",
            "out.ini",
            "UDL_METHOD=LHRR",
            "PARAM_LHRR_K=18",
        ])
        .unwrap();
        match cli.command {
            Commands::Set { assignments, .. } => {
                assert_eq!(assignments[0], ("UDL_METHOD".to_string(), "LHRR".to_string()));
                assert_eq!(assignments.len(), 2);
            }
            _ => panic!("expected set"),
        }
        assert!(Cli::try_parse_from(["udlf-runner", "set", "-o", "out.ini", "BROKEN"]).is_err());
    }

    #[test]
    fn test_cli_evaluate_measure() {
        let cli = Cli::try_parse_from([
            "udlf-runner",
            "evaluate",
            "-r",
            "rks.txt",
            "-l",
            "lists.txt",
            "-c",
            "classes.txt",
            "--measure",
            "recall",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate { measure, depth, .. } => {
                assert_eq!(measure, Measure::Recall);
                assert_eq!(depth, None);
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_cli_grid_k() {
        let cli = Cli::try_parse_from([
            "udlf-runner",
            "grid",
            "--rl-size",
            "100",
            "k",
            "--measures",
            "MAP,P@10",
            "--ks",
            "5,10,15",
        ])
        .unwrap();
        match cli.command {
            Commands::Grid { rl_size, sweep: GridCommands::K { measures, ks }, .. } => {
                assert_eq!(rl_size, Some(100));
                assert_eq!(measures, vec!["MAP", "P@10"]);
                assert_eq!(ks, vec![5, 10, 15]);
            }
            _ => panic!("expected grid k"),
        }
    }

    #[test]
    fn test_parse_shape() {
        assert_eq!(parse_shape("128x96"), Ok((128, 96)));
        assert!(parse_shape("128").is_err());
        assert!(parse_shape("0x10").is_err());
    }
}
