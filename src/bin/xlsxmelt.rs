use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::Level;

use xlsxmelt::{
    discover_workbooks, BoldRowPolicy, MetadataStrategy, OutputFormat, PeriodColumnPolicy,
    PipelineBuilder, PipelineConfig, RunSummary, SheetSelector, SubHeaderDirection,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Jsonl,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Direction {
    /// Inherit the nearest bold row at or below each row.
    Below,
    /// Inherit the nearest bold row at or above each row.
    Above,
}

#[derive(Parser)]
#[command(
    version,
    about = "Flatten bold-structured Excel financial statements into one long-format table."
)]
struct Args {
    /// Workbooks, directories (scanned for *.xlsx/*.xlsm) or glob patterns.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output file (`-` for stdout).
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// JSON configuration file; flags given on the command line take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of rows above the header row.
    #[arg(long)]
    header_skip: Option<usize>,

    /// Names of the metadata fields read from the leading rows of column A (comma separated).
    #[arg(long, value_delimiter = ',')]
    meta_fields: Vec<String>,

    /// Only process sheets with this exact name (repeatable).
    #[arg(long = "sheet", conflicts_with_all = ["sheet_index", "sheet_contains"])]
    sheets: Vec<String>,

    /// Only process the sheet at this 0-based index.
    #[arg(long, conflicts_with = "sheet_contains")]
    sheet_index: Option<usize>,

    /// Only process sheets whose name contains this text.
    #[arg(long)]
    sheet_contains: Option<String>,

    /// Drop bold (sub-header) rows from the metric stream.
    #[arg(long)]
    drop_bold_rows: bool,

    /// Drop columns whose header is not a recognizable period.
    #[arg(long)]
    drop_unparsed_periods: bool,

    /// Direction in which rows inherit their sub-header.
    #[arg(long, value_enum)]
    sub_header: Option<Direction>,

    /// Transform sheets in parallel.
    #[arg(long)]
    parallel: bool,

    /// Output format.
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Prefix CSV output with a UTF-8 byte order mark.
    #[arg(long)]
    bom: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    fn builder(&self) -> Result<PipelineBuilder> {
        let mut builder = PipelineBuilder::new();

        if let Some(path) = &self.config {
            let file = File::open(path)
                .with_context(|| format!("failed to open config {}", path.display()))?;
            let config = PipelineConfig::from_json_reader(file)
                .with_context(|| format!("failed to parse config {}", path.display()))?;
            builder = builder.with_config(config);
        }

        if let Some(rows) = self.header_skip {
            builder = builder.with_header_skip(rows);
        }
        if !self.meta_fields.is_empty() {
            builder = builder
                .with_metadata_strategy(MetadataStrategy::leading_rows(self.meta_fields.clone()));
        }
        if !self.sheets.is_empty() {
            builder = builder.with_sheet_selector(SheetSelector::Names(self.sheets.clone()));
        } else if let Some(index) = self.sheet_index {
            builder = builder.with_sheet_selector(SheetSelector::Index(index));
        } else if let Some(needle) = &self.sheet_contains {
            builder = builder.with_sheet_selector(SheetSelector::Contains(needle.clone()));
        }
        if self.drop_bold_rows {
            builder = builder.with_bold_rows(BoldRowPolicy::Drop);
        }
        if self.drop_unparsed_periods {
            builder = builder.with_period_columns(PeriodColumnPolicy::Drop);
        }
        if let Some(direction) = self.sub_header {
            builder = builder.with_sub_header_direction(match direction {
                Direction::Below => SubHeaderDirection::Below,
                Direction::Above => SubHeaderDirection::Above,
            });
        }
        if self.parallel {
            builder = builder.with_parallel(true);
        }
        if let Some(format) = self.format {
            builder = builder.with_output_format(match format {
                Format::Csv => OutputFormat::Csv,
                Format::Jsonl => OutputFormat::JsonLines,
            });
        }
        if self.bom {
            builder = builder.with_bom(true);
        }

        Ok(builder)
    }
}

fn open_output(path: &PathBuf) -> Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdout().lock()));
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create output {}", path.display()))?;
    Ok(Box::new(file))
}

fn run(args: &Args) -> Result<RunSummary> {
    let pipeline = args.builder()?.build().context("invalid configuration")?;

    // 入力の解決に失敗した場合は出力ファイルを作成しない
    let paths = discover_workbooks(&args.inputs)?;
    let output = open_output(&args.output)?;
    Ok(pipeline.run_paths(&paths, output)?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(args.log_level())
        .with_target(false)
        .init();

    let summary = run(&args)?;

    tracing::info!(
        workbooks = summary.workbooks,
        sheets_processed = summary.sheets_processed,
        sheets_skipped = summary.sheets_skipped,
        records_before_dedup = summary.records_before_dedup,
        records_written = summary.records_written,
        "done"
    );
    Ok(())
}
