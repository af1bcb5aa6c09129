//! Buildgate CLI - Bridge interface for admission callers
//!
//! Commands: default, validate, review
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 when a build is rejected

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use buildgate_core::{
    admission::{admit, apply_defaults, AdmissionRequest},
    manifest::load_build,
    validation::{Operation, Validate},
};

#[derive(Parser)]
#[command(name = "buildgate-cli", version)]
#[command(about = "Buildgate CLI - Build configuration defaulting and validation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log filter directive, overrides -v
    #[arg(long, env = "BUILDGATE_LOG", global = true)]
    log: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply defaults and print the result with its patch
    Default {
        /// Build manifest (.json, .yaml, .yml)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Default and validate a build
    Validate {
        /// Build manifest (.json, .yaml, .yml)
        #[arg(short, long)]
        file: PathBuf,

        /// Previously admitted build; validates as an update
        #[arg(short, long)]
        baseline: Option<PathBuf>,
    },

    /// Run an admission request
    Review {
        /// JSON payload (AdmissionRequest)
        #[arg(short, long)]
        payload: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match (&cli.log, cli.verbose) {
        (Some(directive), _) => EnvFilter::new(directive),
        (None, 0) => EnvFilter::new("buildgate=warn"),
        (None, 1) => EnvFilter::new("buildgate=info"),
        (None, _) => EnvFilter::new("buildgate=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Default { file } => {
            let build = match load_build(&file) {
                Ok(b) => b,
                Err(e) => return fail(&e.to_string()),
            };
            match apply_defaults(&build) {
                Ok(defaulted) => emit(
                    &serde_json::json!({
                        "build": defaulted.build,
                        "patch": defaulted.patch,
                    }),
                    ExitCode::SUCCESS,
                ),
                Err(e) => fail(&e.to_string()),
            }
        }

        Commands::Validate { file, baseline } => {
            let build = match load_build(&file) {
                Ok(b) => b,
                Err(e) => return fail(&e.to_string()),
            };
            let baseline = match baseline.as_deref().map(load_build).transpose() {
                Ok(b) => b,
                Err(e) => return fail(&e.to_string()),
            };

            let op = match &baseline {
                Some(baseline) => Operation::Update { baseline },
                None => Operation::Create,
            };
            debug!(update = op.is_update(), file = %file.display(), "validating build");

            let mut build = build;
            build.set_defaults();
            let errors = build.validate(&op);
            let valid = errors.is_empty();
            let output = serde_json::json!({
                "valid": valid,
                "errors": errors,
            });
            emit(&output, if valid { ExitCode::SUCCESS } else { ExitCode::from(2) })
        }

        Commands::Review { payload } => {
            let request: AdmissionRequest = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => return fail(&format!("Invalid payload: {}", e)),
            };

            match admit(&request) {
                Ok(decision) => {
                    let code = if decision.allowed { ExitCode::SUCCESS } else { ExitCode::from(2) };
                    emit(&decision, code)
                }
                Err(e) => fail(&e.to_string()),
            }
        }
    }
}

fn emit<T: Serialize>(value: &T, code: ExitCode) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            code
        }
        Err(e) => fail(&e.to_string()),
    }
}

fn fail(message: &str) -> ExitCode {
    println!("{}", serde_json::json!({ "error": message }));
    ExitCode::FAILURE
}
