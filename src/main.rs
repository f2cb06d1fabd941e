//! Langfuse Reimport CLI
//!
//! Re-imports exported Langfuse traces through the public ingestion API.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use langfuse_reimport::commands::{
    display_mapping, display_version, execute_import, execute_inspect, validate_args, ImportArgs,
    InspectArgs,
};
use langfuse_reimport::graph::IdPolicy;
use langfuse_reimport::normalize::NormalizeOptions;

/// Langfuse Reimport - re-import exported traces with normalized tool-call fields
#[derive(Parser, Debug)]
#[command(name = "langfuse-reimport")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Import an exported trace into Langfuse
    Import {
        /// Exported trace file (JSON)
        file: PathBuf,

        /// Langfuse host
        #[arg(long, env = "LANGFUSE_HOST")]
        host: Option<String>,

        /// Project public key
        #[arg(long, env = "LANGFUSE_PUBLIC_KEY")]
        public_key: Option<String>,

        /// Project secret key
        #[arg(long, env = "LANGFUSE_SECRET_KEY", hide_env_values = true)]
        secret_key: Option<String>,

        /// TOML config file with a [langfuse] section
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Events per ingestion request
        #[arg(long, default_value = "50")]
        batch_size: usize,

        /// Write the payload to this file instead of submitting it
        #[arg(long, value_name = "PATH")]
        dry_run: Option<PathBuf>,

        #[command(flatten)]
        core: CoreFlags,
    },

    /// Show the planned submission without contacting Langfuse
    Inspect {
        /// Exported trace file (JSON)
        file: PathBuf,

        /// Also write the planned payload to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        core: CoreFlags,
    },

    /// Display the tool-call field mapping
    Mapping,

    /// Display version information
    Version,
}

/// Flags shared by commands that run the import core
#[derive(Args, Debug)]
struct CoreFlags {
    /// Generate new identifiers instead of reusing exported ones
    #[arg(long)]
    fresh_ids: bool,

    /// Decode inputs/outputs stored as JSON-encoded strings
    #[arg(long)]
    decode_json: bool,

    /// Rewrite `{"type": "tool_calls"}` outputs into the chat layout
    #[arg(long)]
    reshape: bool,
}

impl CoreFlags {
    fn id_policy(&self) -> IdPolicy {
        if self.fresh_ids {
            IdPolicy::Fresh
        } else {
            IdPolicy::Reuse
        }
    }

    fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            decode_embedded_json: self.decode_json,
            reshape_tool_call_output: self.reshape,
        }
    }
}

fn main() {
    // Load .env before clap reads the environment
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Run a command and return the process exit code
///
/// **Private** - fatal errors are returned as `Err` and exit with 1
fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Import {
            file,
            host,
            public_key,
            secret_key,
            config,
            batch_size,
            dry_run,
            core,
        } => {
            let args = ImportArgs {
                file,
                host,
                public_key,
                secret_key,
                config,
                id_policy: core.id_policy(),
                batch_size,
                dry_run,
                normalize: core.normalize_options(),
            };

            // Validate args first
            validate_args(&args)?;

            let report = execute_import(args)?;
            println!("\n{}", report.render_summary());

            Ok(report.exit_code())
        }

        Commands::Inspect { file, output, core } => {
            execute_inspect(InspectArgs {
                file,
                output,
                id_policy: core.id_policy(),
                normalize: core.normalize_options(),
            })?;
            Ok(0)
        }

        Commands::Mapping => {
            display_mapping();
            Ok(0)
        }

        Commands::Version => {
            display_version();
            Ok(0)
        }
    }
}
