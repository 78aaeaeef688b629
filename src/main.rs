use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use judge_payout::config::PayoutConfig;
use judge_payout::pipeline::{self, PayoutPaths};
use judge_payout::{Result, ToolError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose)?;
    let mut config = PayoutConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Compute(args) => execute_compute(args, &mut config),
        Command::Verify(args) => execute_verify(args, &mut config),
        Command::Slots(args) => execute_slots(args, &config),
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn execute_compute(args: ComputeArgs, config: &mut PayoutConfig) -> Result<()> {
    args.output.apply(config);
    let mut paths = args.tables.resolve(&args.input);
    paths.workbook = args.xlsx;

    let outcome = pipeline::compute(&args.input, &paths, config)?;
    eprintln!(
        "processed {} rows from '{}' ({} skipped for non-numeric rates)",
        outcome.rows_read,
        outcome.sheet,
        outcome.skipped_rows.len()
    );
    if config.output.detail {
        eprintln!(
            "detail: {} records -> {}",
            outcome.detail_count,
            paths.detail.display()
        );
    }
    if config.output.summary {
        eprintln!(
            "summary: {} reviewers -> {}",
            outcome.summary_count,
            paths.summary.display()
        );
    }
    if let Some(workbook) = &paths.workbook {
        eprintln!("workbook: {}", workbook.display());
    }
    eprintln!("total amount: {:.2}", outcome.totals.total());
    Ok(())
}

fn execute_verify(args: VerifyArgs, config: &mut PayoutConfig) -> Result<()> {
    args.output.apply(config);
    let paths = args.tables.resolve(&args.input);

    let report = pipeline::verify(&args.input, &paths, config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprint!("{report}");
    }
    Ok(())
}

fn execute_slots(args: SlotsArgs, config: &PayoutConfig) -> Result<()> {
    let expected = args.expected.unwrap_or(config.audit.expected_reviewers);
    let audit = pipeline::audit(&args.input, expected, config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&audit)?);
    } else {
        eprint!("{audit}");
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Compute and reconcile reviewer payouts from a judge sheet."
)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug events unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute payouts and write the detail and summary tables.
    Compute(ComputeArgs),
    /// Re-derive payouts and compare them with previously written tables.
    Verify(VerifyArgs),
    /// Check how many reviewers each problem lists.
    Slots(SlotsArgs),
}

#[derive(clap::Args)]
struct ComputeArgs {
    /// Judge workbook.
    #[arg(long)]
    input: PathBuf,

    #[command(flatten)]
    tables: TableArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Also write the payout tables to this workbook.
    #[arg(long)]
    xlsx: Option<PathBuf>,
}

#[derive(clap::Args)]
struct VerifyArgs {
    /// Judge workbook.
    #[arg(long)]
    input: PathBuf,

    #[command(flatten)]
    tables: TableArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Print the report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct SlotsArgs {
    /// Judge workbook.
    #[arg(long)]
    input: PathBuf,

    /// Reviewers expected per problem.
    #[arg(long)]
    expected: Option<usize>,

    /// Print the audit as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct TableArgs {
    /// Detail table path, defaults to salary_detail.csv next to the input.
    #[arg(long)]
    detail: Option<PathBuf>,

    /// Summary table path, defaults to salary_summary.csv next to the input.
    #[arg(long)]
    summary: Option<PathBuf>,
}

impl TableArgs {
    fn resolve(self, input: &Path) -> PayoutPaths {
        let defaults = PayoutPaths::beside(input);
        PayoutPaths {
            detail: self.detail.unwrap_or(defaults.detail),
            summary: self.summary.unwrap_or(defaults.summary),
            workbook: None,
        }
    }
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Skip the per-slot detail table.
    #[arg(long)]
    no_detail: bool,

    /// Skip the per-reviewer summary table.
    #[arg(long)]
    no_summary: bool,

    /// Leave the count columns out of the summary table.
    #[arg(long)]
    no_counts: bool,
}

impl OutputArgs {
    fn apply(&self, config: &mut PayoutConfig) {
        if self.no_detail {
            config.output.detail = false;
        }
        if self.no_summary {
            config.output.summary = false;
        }
        if self.no_counts {
            config.output.counts = false;
        }
    }
}
