//! Fidelity Check
//!
//! Runs the validation campaign against the reference plant.
//!
//! Usage: `fidelity-check run [--config FILE] [--json]`

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use fidelity_harness::{Campaign, HarnessConfig};
use fidelity_plant::ReferencePlant;
use fidelity_tools::{exit_code, render_catalogue, render_report, FATAL_EXIT_CODE};

#[derive(Parser, Debug)]
#[command(name = "fidelity-check")]
#[command(about = "Deterministic fidelity validation for a plant engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every scenario and print verdicts
    Run {
        /// Harness configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the named checks and their blocking policy
    Checks {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the effective configuration as YAML
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> HarnessConfig {
    let Some(path) = path else {
        return HarnessConfig::default();
    };
    match HarnessConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(FATAL_EXIT_CODE);
        }
    }
}

fn main() {
    fidelity_tools::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, json } => {
            let config = load_config(config.as_ref());
            info!(seed = config.seed, dt_hours = config.dt_hours, "starting campaign");
            let mut plant = ReferencePlant::new();
            let report = match Campaign::new(config).run(&mut plant) {
                Ok(report) => report,
                Err(e) => {
                    error!("fatal: {}", e);
                    process::exit(FATAL_EXIT_CODE);
                }
            };
            if json {
                match report.to_json() {
                    Ok(text) => println!("{text}"),
                    Err(e) => {
                        error!("failed to serialize report: {}", e);
                        process::exit(FATAL_EXIT_CODE);
                    }
                }
            } else {
                print!("{}", render_report(&report));
            }
            process::exit(exit_code(report.recommendation()));
        }
        Commands::Checks { config } => {
            let config = load_config(config.as_ref());
            print!("{}", render_catalogue(&config.policy));
        }
        Commands::Config { config } => {
            let config = load_config(config.as_ref());
            match config.to_yaml() {
                Ok(text) => print!("{text}"),
                Err(e) => {
                    error!("{}", e);
                    process::exit(FATAL_EXIT_CODE);
                }
            }
        }
    }
}
