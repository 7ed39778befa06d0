use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use ecb_core::{BoundaryMode, ConfigFile, YearTable, load_config};
use ecb_parsing::{ParsingConfig, ParsingConfigBuilder, VolumeExtractor};
use ecb_reporting::OutputLayout;

mod batch;
mod output;
mod selection;

use batch::BatchPlan;
use output::ColorMode;

/// English Catalogue entry extractor - cut OCR'd catalogue volumes into bibliographic entries
#[derive(Parser, Debug)]
#[command(name = "ecb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Year table to use (default: ./.ecb.toml over ./catalogue.toml over the platform config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract entries from a range of catalogue volumes
    Extract {
        /// Directory holding the OCR text files
        #[arg(long)]
        input_dir: PathBuf,

        /// Directory to write entry buckets and reports into
        #[arg(long, required_unless_present = "dry_run")]
        output_dir: Option<PathBuf>,

        /// Years to process, e.g. "02-22" or "08,09" (default: every configured year)
        #[arg(long)]
        years: Option<String>,

        /// Override the configured boundary strategy for every year
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Number of volumes to process in parallel
        #[arg(long, default_value_t = 1)]
        jobs: usize,

        /// Print metrics only, write no files
        #[arg(long)]
        dry_run: bool,
    },

    /// Load and validate the year table
    CheckConfig,

    /// Extract one volume and print its metrics and sample entries
    Summary {
        /// Two-digit year, e.g. 08
        #[arg(long)]
        year: String,

        /// Directory holding the OCR text files
        #[arg(long)]
        input_dir: PathBuf,

        /// Override the configured boundary strategy
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Entries to show per bucket
        #[arg(long, default_value_t = 3)]
        show: usize,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Exact,
    Fuzzy,
}

impl From<StrategyArg> for BoundaryMode {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Exact => BoundaryMode::Exact,
            StrategyArg::Fuzzy => BoundaryMode::Fuzzy,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_file.as_deref())?;
    let color = ColorMode(!cli.no_color && std::io::stdout().is_terminal());

    let config = load_config(cli.config.as_deref()).context("failed to load year table")?;

    match cli.command {
        Command::Extract {
            input_dir,
            output_dir,
            years,
            strategy,
            jobs,
            dry_run,
        } => {
            let layout = if dry_run {
                None
            } else {
                output_dir.map(OutputLayout::new)
            };
            extract(
                &config,
                input_dir,
                layout,
                years.as_deref(),
                strategy,
                jobs,
                color,
            )
        }
        Command::CheckConfig => check_config(&config, color),
        Command::Summary {
            year,
            input_dir,
            strategy,
            show,
        } => summary(&config, &year, &input_dir, strategy, show, color),
    }
}

/// Install the global subscriber. The returned guard flushes the log file on drop.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            builder.with_writer(writer).with_ansi(false).init();
            Ok(Some(guard))
        }
        None => {
            builder.with_writer(std::io::stderr).init();
            Ok(None)
        }
    }
}

fn parsing_config(config: &ConfigFile, strategy: Option<StrategyArg>) -> anyhow::Result<ParsingConfig> {
    let mut builder = ParsingConfigBuilder::from_config_file(config);
    if let Some(strategy) = strategy {
        builder = builder.strategy(strategy.into());
    }
    builder.build().context("invalid parser settings")
}

fn extract(
    config: &ConfigFile,
    input_dir: PathBuf,
    layout: Option<OutputLayout>,
    years: Option<&str>,
    strategy: Option<StrategyArg>,
    jobs: usize,
    color: ColorMode,
) -> anyhow::Result<()> {
    if !input_dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", input_dir.display());
    }

    let table = YearTable::from_config(config)?;
    let years = selection::select_years(&table, years)?;
    if years.is_empty() {
        anyhow::bail!("No years to process. Add [years.\"NN\"] records to the year table.");
    }

    let extractor = VolumeExtractor::with_config(parsing_config(config, strategy)?);
    let dry_run = layout.is_none();
    let plan = BatchPlan {
        table: &table,
        years,
        input_dir,
        layout,
        jobs: jobs.max(1),
    };
    let outcomes = batch::run(&plan, &extractor)?;

    let mut writer = std::io::stdout();
    output::print_batch_summary(&mut writer, &outcomes, dry_run, color)?;
    output::print_failures(&mut writer, &outcomes, color)?;
    writer.flush()?;

    let failed = outcomes.iter().filter(|o| o.failed()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} volumes failed", failed, outcomes.len());
    }
    Ok(())
}

fn check_config(config: &ConfigFile, color: ColorMode) -> anyhow::Result<()> {
    let table = YearTable::from_config(config)?;
    let parser_error = ParsingConfigBuilder::from_config_file(config).build().err();

    let mut writer = std::io::stdout();
    let invalid = output::print_config_check(&mut writer, &table, parser_error.as_ref(), color)?;
    writer.flush()?;

    if invalid > 0 {
        anyhow::bail!("{} problems in the year table", invalid);
    }
    Ok(())
}

fn summary(
    config: &ConfigFile,
    year: &str,
    input_dir: &Path,
    strategy: Option<StrategyArg>,
    show: usize,
    color: ColorMode,
) -> anyhow::Result<()> {
    let table = YearTable::from_config(config)?;
    let record = table.record(year)?;
    let path = batch::input_path(input_dir, &record.file);
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let extractor = VolumeExtractor::with_config(parsing_config(config, strategy)?);
    let result = extractor.extract_file(&path, &record)?;

    let mut writer = std::io::stdout();
    output::print_volume(&mut writer, &result, show, color)?;
    writer.flush()?;
    Ok(())
}
