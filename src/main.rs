use std::io::{self, Read, Write};

use clap::{Parser, Subcommand};
use floorplanner::io::{ErrorRecord, InputRecord};
use floorplanner::pipeline;
use serde_json::json;

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    Cli::parse().run();
}

#[derive(Parser)]
#[clap(author = clap::crate_authors!(", "))]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "Fixed-outline floorplanner over B*-tree and Sequence-Pair representations")]
#[clap(color = clap::ColorChoice::Auto)]
#[clap(propagate_version = true)]
#[clap(subcommand_required = true)]
#[clap(arg_required_else_help = true)]
pub struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// read a block catalog from stdin and write an initial B*-tree placement to stdout
    BuildBstar,
    /// read a block catalog from stdin and write an initial Sequence-Pair placement to stdout
    BuildSp,
    /// anneal a B*-tree (constructing one first if the input carries none) and write the result to stdout
    SaBstar {
        /// RNG seed; omit for a non-deterministic run seeded from OS entropy
        #[clap(long)]
        seed: Option<u64>,
        /// fitness weight overrides, e.g. '{"AREA_W": 50.0, "ASPECT_MAX": 1.5}'
        #[clap(long, default_value_t = json!({}))]
        fitness_config: serde_json::Value,
        /// cooling schedule overrides, e.g. '{"T0": 2000.0, "alpha": 0.98}'
        #[clap(long, default_value_t = json!({}))]
        sa_config: serde_json::Value,
    },
    /// anneal a Sequence-Pair (constructing one first if the input carries none) and write the result to stdout
    SaSp {
        #[clap(long)]
        seed: Option<u64>,
        #[clap(long, default_value_t = json!({}))]
        fitness_config: serde_json::Value,
        #[clap(long, default_value_t = json!({}))]
        sa_config: serde_json::Value,
    },
}

impl Cli {
    pub fn run(self) {
        let mut raw_input = String::new();
        if io::stdin().read_to_string(&mut raw_input).is_err() {
            eprintln!("failed to read input from stdin");
            std::process::exit(1);
        }

        let input: InputRecord = match serde_json::from_str(&raw_input) {
            Ok(input) => input,
            Err(err) => {
                emit(&ErrorRecord::new(format!("malformed input JSON: {err}")));
                return;
            }
        };

        let result = match self.command {
            Commands::BuildBstar => pipeline::build_bstar(input),
            Commands::BuildSp => pipeline::build_sequence_pair(input),
            Commands::SaBstar { seed, fitness_config, sa_config } => {
                pipeline::anneal_bstar_stage(input, seed, &fitness_config, &sa_config)
            }
            Commands::SaSp { seed, fitness_config, sa_config } => {
                pipeline::anneal_sequence_pair_stage(input, seed, &fitness_config, &sa_config)
            }
        };

        match result {
            Ok(output) => emit(&output),
            Err(err) => {
                tracing::warn!(%err, "pipeline stage failed");
                emit(&ErrorRecord::new(err.to_string()));
            }
        }
    }
}

/// Writes one JSON record to stdout. Failures at this last step (a broken
/// pipe, an encoding bug) are the only ones this binary exits non-zero for;
/// an invalid floorplanning input is reported as a normal `ErrorRecord` and
/// exits cleanly (`spec.md` §6, §7).
fn emit(record: &impl serde::Serialize) {
    match serde_json::to_string(record) {
        Ok(text) => {
            if writeln!(io::stdout(), "{text}").is_err() {
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("failed to encode output: {err}");
            std::process::exit(1);
        }
    }
}
