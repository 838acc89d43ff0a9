use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use covharvest::cli::{self, CollectRequest, Mode};
use covharvest::config::{Config, DEFAULT_RESULTS_FILE};
use covharvest::fetch::HttpFetcher;
use covharvest::runner::SystemRunner;

/// covharvest: measure test coverage across popular GitHub repositories.
#[derive(Parser)]
#[command(name = "covharvest", version, about)]
struct Cli {
    /// Log pipeline internals (commands, pattern matches, fetches).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover repositories and record their coverage.
    Collect {
        /// Number of repositories to process.
        #[arg(default_value_t = 5)]
        count: usize,

        /// Explicit count; overrides the positional value.
        #[arg(long = "count")]
        count_flag: Option<usize>,

        /// Process a single repository ("owner/name") without discovery.
        #[arg(long)]
        repo: Option<String>,

        /// Where coverage comes from.
        #[arg(long, value_enum, default_value = "test-run")]
        source: Mode,

        /// Minimum star count for discovered repositories.
        #[arg(long, default_value_t = 1000)]
        min_stars: u64,

        /// Results file.
        #[arg(long, default_value = DEFAULT_RESULTS_FILE)]
        results: PathBuf,

        /// Parent directory for scratch checkouts (default: system temp).
        #[arg(long)]
        workdir: Option<PathBuf>,
    },

    /// Show the detected test command for a local checkout.
    Detect {
        /// Checkout directory.
        dir: PathBuf,
    },

    /// Extract a coverage percentage from a text file.
    Parse {
        /// File holding tool output or a report.
        file: PathBuf,

        /// Coverage dialect (jest/nyc, pytest-cov, coverage.py, jacoco,
        /// go-cover, simplecov, tarpaulin). Generic patterns only if omitted.
        #[arg(long)]
        dialect: Option<String>,
    },

    /// Summarize a results file.
    Summary {
        /// Results file.
        #[arg(long, default_value = DEFAULT_RESULTS_FILE)]
        results: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "covharvest=debug" } else { "covharvest=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let out = match cli.command {
        Commands::Collect {
            count,
            count_flag,
            repo,
            source,
            min_stars,
            results,
            workdir,
        } => {
            let config = Config {
                results_path: results,
                workdir,
                ..Config::from_env()
            };
            let request = CollectRequest {
                count: count_flag.unwrap_or(count),
                repo,
                mode: source,
                min_stars,
            };
            cli::cmd_collect(&request, &config, &SystemRunner, &HttpFetcher)?
        }
        Commands::Detect { dir } => cli::cmd_detect(&dir)?,
        Commands::Parse { file, dialect } => cli::cmd_parse(&file, dialect.as_deref())?,
        Commands::Summary { results } => cli::cmd_summary(&results)?,
    };
    print!("{out}");
    Ok(())
}
