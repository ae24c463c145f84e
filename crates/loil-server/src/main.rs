//! `loil`: run the LOIL lane world as a network server or offline.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{RuleArgs, WorldArgs};

#[derive(Parser)]
#[command(
    name = "loil",
    about = "LOIL: a tile-based multiplayer lane world",
    version,
    propagate_version = true
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the authoritative simulation behind a WebSocket server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,

        #[command(flatten)]
        world: WorldArgs,

        #[command(flatten)]
        rules: RuleArgs,

        /// Save the world here on shutdown
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Run the simulation headless for a number of ticks and report
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value = "600")]
        ticks: u64,

        /// Simulated seconds per tick
        #[arg(long, default_value = "0.016")]
        dt: f64,

        #[command(flatten)]
        world: WorldArgs,

        #[command(flatten)]
        rules: RuleArgs,

        /// Print every logged event
        #[arg(long)]
        verbose_events: bool,

        /// Save the resulting world here
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Validate the type catalogs and the world file
    Check {
        #[command(flatten)]
        world: WorldArgs,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Serve {
            addr,
            world,
            rules,
            save,
        } => commands::serve::run(&addr, &world, &rules, save.as_deref()),
        Commands::Simulate {
            ticks,
            dt,
            world,
            rules,
            verbose_events,
            save,
        } => commands::simulate::run(&world, &rules, ticks, dt, verbose_events, save.as_deref()),
        Commands::Check { world } => commands::check::run(&world),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
