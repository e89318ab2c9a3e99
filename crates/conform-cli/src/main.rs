use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod catalog;
mod commands;
mod config;
mod reporter;
mod status;

/// Conformance test harness.
///
/// Runs dependency-ordered protocol checks, each at most once, threading
/// context values from the tests that produce them to the tests that need them.
///
/// EXAMPLES:
///     conform run                     Run every enabled area
///     conform run token               Run tests matching 'token' (and their dependencies)
///     conform run --area store -v     Run one area, one line per test
///     conform plan logout             Show what would run, in order
///     conform list --verbose          Show the catalog with dependencies
///
/// ENVIRONMENT VARIABLES:
///     CONFORM_JSON          Set to '1' for JSON output by default
///     CONFORM_LOG           Log filter for stderr (default: warn)
///     CONFORM_AREAS         Comma-separated areas to run
///     CONFORM_FILTER        Comma-separated filters
///     CONFORM_STATUS_FILE   Where to write the status dump
///     NO_COLOR              Set to disable colored output
#[derive(Parser)]
#[command(name = "conform")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that read conform.toml
#[derive(clap::Args, Debug)]
struct SelectOpts {
    /// Case-insensitive substrings matched against group and assertion
    filters: Vec<String>,
    /// Restrict the run to an area (can be repeated)
    #[arg(long = "area", short = 'a')]
    areas: Vec<String>,
    /// Path to the configuration file (skips the conform.toml search)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// Directory to search for conform.toml from
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

impl From<SelectOpts> for commands::Selector {
    fn from(opts: SelectOpts) -> Self {
        Self {
            filters: opts.filters,
            areas: opts.areas,
            config_file: opts.config,
            dir: opts.dir,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run conformance tests
    ///
    /// Selects tests by area and filter, then runs them together with
    /// everything they depend on. Exits with status 1 if any test failed.
    ///
    /// EXAMPLES:
    ///     conform run                          Run everything enabled
    ///     conform run login whoami             Filter by substring
    ///     conform run --json                   One JSON document on stdout
    ///     conform run --status-file out.json   Also write the status dump
    #[command(visible_alias = "r")]
    Run {
        #[command(flatten)]
        select: SelectOpts,
        /// Verbose output (one line per test)
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Write the status dump to this file
        #[arg(long)]
        status_file: Option<PathBuf>,
    },

    /// Show the execution order without running anything
    ///
    /// Expands the selection into the full dependency closure. Tests pulled
    /// in only as dependencies are marked.
    ///
    /// EXAMPLES:
    ///     conform plan                    Plan everything enabled
    ///     conform plan deleted            Plan one check and its dependencies
    #[command(visible_alias = "p")]
    Plan {
        #[command(flatten)]
        select: SelectOpts,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the built-in catalog
    ///
    /// EXAMPLES:
    ///     conform list                    Areas and assertions
    ///     conform list --verbose          Include dependencies and context keys
    #[command(visible_alias = "ls")]
    List {
        /// Show dependencies and context keys
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     conform completions bash > ~/.bash_completions/conform.bash
    ///     conform completions zsh > ~/.zfunc/_conform
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    /// Whether the command line asked for plain output
    fn no_color(&self) -> bool {
        match self {
            Commands::Run { no_color, .. }
            | Commands::Plan { no_color, .. }
            | Commands::List { no_color, .. } => *no_color,
            Commands::Completions { .. } => false,
        }
    }
}

/// Log to stderr so stdout stays clean for reports and JSON
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();
    init_tracing(&cli_config.log_filter);

    // Command-line flags override environment variables. The override is
    // process-wide and lasts until exit.
    if cli.command.no_color() || cli_config.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Run {
            select,
            verbose,
            json,
            status_file,
            ..
        } => {
            let args = commands::run::RunArgs {
                selector: select.into(),
                verbose,
                json: json || cli_config.default_json,
                status_file,
            };
            let dump = commands::run::run(args)?;
            if dump.has_failures() {
                std::process::exit(1);
            }
        }
        Commands::Plan { select, json, .. } => {
            commands::plan::run(commands::plan::PlanArgs {
                selector: select.into(),
                json: json || cli_config.default_json,
            })?;
        }
        Commands::List { verbose, json, .. } => {
            commands::list::run(commands::list::ListArgs {
                verbose,
                json: json || cli_config.default_json,
            })?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}
