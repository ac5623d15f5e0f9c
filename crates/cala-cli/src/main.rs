//! Cala CLI - run WebAssembly modules against the host bridge.

mod commands;
mod config;
mod console;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "cala")]
#[command(author, version, long_about = None)]
#[command(about = "Cala - run wasm modules against a browser-style host")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default cala.toml
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Load a module and call its entry export
    Run {
        /// Module path or URL (default: loader.module from cala.toml)
        module: Option<String>,

        /// User agent string presented to the module
        #[arg(short, long)]
        user_agent: Option<String>,

        /// Entry export to call
        #[arg(short, long)]
        entry: Option<String>,

        /// Pretend there is no wasm runtime
        #[arg(long)]
        no_wasm: bool,

        /// Buffer the whole module before compiling
        #[arg(long)]
        no_streaming: bool,

        /// Fetch the module relative to this origin
        #[arg(long)]
        origin: Option<String>,
    },

    /// List a module's imports and exports and check them against the bridge
    Inspect {
        /// Module path or URL
        module: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Run {
            module,
            user_agent,
            entry,
            no_wasm,
            no_streaming,
            origin,
        } => {
            let overrides = commands::run::Overrides {
                module,
                user_agent,
                entry,
                no_wasm,
                no_streaming,
                origin,
            };
            commands::run::run(overrides, cli.verbose).await
        }
        Commands::Inspect { module, json } => commands::inspect::run(&module, json).await,
    }
}
