// Copyright 2026 Rankscope Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use rankscope::CheckStatus;
use rankscope_runtime::cli;
use rankscope_runtime::config::RuntimeConfig;
use rankscope_runtime::store::{Priority, ResultQuery};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rankscope",
    about = "Rankscope: estimate domain authority and track it over time",
    version,
    after_help = "Run 'rankscope <command> --help' for details on each command."
)]
struct Cli {
    /// Data directory holding domains.db (default: $RANKSCOPE_DATA_DIR or ~/.rankscope)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and the automation scheduler
    Serve {
        /// Port to listen on (default: $PORT or 3000)
        #[arg(long)]
        port: Option<u16>,
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Check one or more domains and save the results
    Check {
        /// Domains or URLs (e.g. "example.com", "https://www.example.com/")
        #[arg(required = true)]
        domains: Vec<String>,
    },
    /// Check every domain listed in a CSV file
    Bulk {
        /// CSV file with a domain, url or website column
        file: PathBuf,
        /// Also write the results to this CSV file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List stored results, newest first
    Results {
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "50")]
        limit: u32,
        #[arg(long)]
        min_rating: Option<i64>,
        #[arg(long)]
        min_backlinks: Option<i64>,
        #[arg(long)]
        min_ref_domains: Option<i64>,
        /// Only "success" or "error" results
        #[arg(long, value_parser = parse_status)]
        status: Option<CheckStatus>,
        /// "high" (rating >= 50 or backlinks >= 1000) or "low"
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        /// Delete all stored results instead of listing them
        #[arg(long, conflicts_with_all = ["min_rating", "min_backlinks", "min_ref_domains", "status", "priority"])]
        clear: bool,
    },
    /// Export all stored results to a CSV file
    Export {
        /// Output path
        file: PathBuf,
    },
    /// Manage domains re-checked on the automation schedule
    Track {
        #[command(subcommand)]
        action: TrackAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum TrackAction {
    /// Start tracking a domain
    Add { domain: String },
    /// List tracked domains
    List,
    /// Stop tracking a domain
    Remove { domain: String },
}

fn parse_status(s: &str) -> Result<CheckStatus, String> {
    CheckStatus::parse(s).ok_or_else(|| format!("unknown status '{s}' (success|error)"))
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::parse(s).ok_or_else(|| format!("unknown priority '{s}' (high|low)"))
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    cli::output::init(cli.json, cli.quiet, cli.no_color);
    init_tracing(&cli.log_level, cli.log_format);

    let data_dir = cli.data_dir;
    let result = match cli.command {
        Commands::Serve { port, bind } => {
            cli::serve::run(RuntimeConfig::resolve(data_dir, port, bind)).await
        }
        Commands::Check { domains } => {
            let config = RuntimeConfig::resolve(data_dir, None, None);
            match cli::open_context(&config) {
                Ok(ctx) => cli::check_cmd::run(&ctx, &domains).await,
                Err(e) => Err(e),
            }
        }
        Commands::Bulk { file, out } => {
            let config = RuntimeConfig::resolve(data_dir, None, None);
            match cli::open_context(&config) {
                Ok(ctx) => cli::bulk_cmd::run(&ctx, &file, out.as_deref()).await,
                Err(e) => Err(e),
            }
        }
        Commands::Results {
            page,
            limit,
            min_rating,
            min_backlinks,
            min_ref_domains,
            status,
            priority,
            clear,
        } => {
            let config = RuntimeConfig::resolve(data_dir, None, None);
            cli::open_store(&config).and_then(|store| {
                if clear {
                    return cli::results_cmd::clear(&store);
                }
                let query = ResultQuery {
                    page: Some(page),
                    limit: Some(limit),
                    min_rating,
                    min_backlinks,
                    min_ref_domains,
                    status,
                    priority,
                };
                cli::results_cmd::run(&store, &query)
            })
        }
        Commands::Export { file } => {
            let config = RuntimeConfig::resolve(data_dir, None, None);
            cli::open_store(&config).and_then(|store| cli::export_cmd::run(&store, &file))
        }
        Commands::Track { action } => {
            let config = RuntimeConfig::resolve(data_dir, None, None);
            cli::open_store(&config).and_then(|store| match action {
                TrackAction::Add { domain } => cli::track_cmd::add(&store, &domain),
                TrackAction::List => cli::track_cmd::list(&store),
                TrackAction::Remove { domain } => cli::track_cmd::remove(&store, &domain),
            })
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "rankscope", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli::output::is_quiet() && !cli::output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
