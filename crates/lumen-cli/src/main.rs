//! Lumen CLI - headless runner for particle scenes

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, simulate};

#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "Particle physics for volumetric LED displays", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scene for a number of frames and report per-frame statistics
    Simulate {
        /// Path to scene TOML file
        config: String,

        /// Number of frames to run
        #[arg(short, long, default_value = "120")]
        frames: u32,

        /// Print every Nth frame only
        #[arg(long, default_value = "1")]
        every: u32,

        /// Dump an ASCII slice of the final grid at this index along the last axis
        #[arg(long)]
        slice: Option<usize>,

        /// Override the seed from the config file
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Validate a scene file and summarize it
    Check {
        /// Path to scene TOML file
        config: String,

        /// Print the fully-defaulted configuration as TOML
        #[arg(long)]
        print: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Simulate {
            config,
            frames,
            every,
            slice,
            seed,
        } => simulate::run(simulate::SimulateArgs {
            config,
            frames,
            every,
            slice,
            seed,
        }),
        Commands::Check { config, print } => check::run(&config, print),
    }
}
