mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::plan::PlanArgs;
use commands::product::CompareArgs;
use commands::projection::ProjectArgs;

/// Unit-linked savings plan projections
#[derive(Parser)]
#[command(
    name = "spp",
    version,
    about = "Unit-linked savings plan projections",
    long_about = "A CLI for projecting periodic-contribution savings and insurance \
                  accounts month by month with decimal precision. Supports indexed \
                  contribution plans, upfront and ongoing fees, bonuses, withdrawals, \
                  tax credits and side-by-side product comparison."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine diagnostics to stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full month-by-month projection
    Project(ProjectArgs),
    /// Expand a base contribution into yearly contribution/withdrawal plans
    Plan(PlanArgs),
    /// Compare several products on the same customer inputs
    Compare(CompareArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// RUST_LOG wins when set; otherwise `-v` flags raise the default of `warn`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("savings_plan_core={level},spp={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::projection::run_project(args),
        Commands::Plan(args) => commands::plan::run_plan(args),
        Commands::Compare(args) => commands::product::run_compare(args),
        Commands::Version => {
            println!("spp {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
