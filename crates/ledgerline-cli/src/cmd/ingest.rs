//! `ledgerline ingest` - page through transfers into a warehouse table

use std::fs::File;
use std::io::{BufWriter, Write};
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use ledgerline_bigquery::{BigQueryConfig, BigQuerySink};
use ledgerline_core::{
    BatchAccumulator, IngestError, IngestStats, Paginator, PaginatorConfig, ParquetSink,
    RecordSource, RetryPolicy, Retrying, SharedProgress, Sink, StopReason, StopSignal,
    TransferFilter, TransferRecord, fmt_num,
};
use ledgerline_subscan::SubscanSource;

use crate::config::Config;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Streaming inserts into a BigQuery table
    Bigquery,
    /// Zstd Parquet part files in a local directory
    Parquet,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Subscan network (e.g. polkadot, kusama, nodle)
    #[arg(long)]
    pub network: Option<String>,

    /// Full transfers endpoint URL, overrides --network
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Records per page request
    #[arg(long)]
    pub page_size: Option<u32>,

    /// First page index to request (resume an interrupted run)
    #[arg(long, default_value_t = 0)]
    pub start_page: u32,

    /// Stop after this many page requests
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Stop after this many records
    #[arg(long)]
    pub max_rows: Option<usize>,

    /// Records per sink flush
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Only transfers involving this account
    #[arg(long)]
    pub address: Option<String>,

    /// Only the transfer with this extrinsic index
    #[arg(long)]
    pub extrinsic_index: Option<String>,

    #[arg(long)]
    pub from_block: Option<u64>,

    #[arg(long)]
    pub to_block: Option<u64>,

    /// Direction relative to --address
    #[arg(long, value_parser = ["all", "sent", "received"])]
    pub direction: Option<String>,

    #[arg(long)]
    pub asset_symbol: Option<String>,

    /// Ask the API for the total match count (logged once)
    #[arg(long)]
    pub include_total: bool,

    #[arg(long, value_enum, default_value_t = SinkKind::Bigquery)]
    pub sink: SinkKind,

    /// Destination table name (defaults to [bigquery].table)
    #[arg(long)]
    pub table: Option<String>,

    /// Output directory for the parquet sink
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Zstd compression level (1-22)
    #[arg(short, long)]
    pub zstd_level: Option<i32>,

    /// Stop gracefully after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Write unflushed records here as JSONL when the run fails
    #[arg(long)]
    pub spill_dir: Option<PathBuf>,
}

impl IngestArgs {
    fn filter(&self) -> Result<TransferFilter> {
        if let (Some(from), Some(to)) = (self.from_block, self.to_block) {
            if from > to {
                bail!("--from-block {from} is after --to-block {to}");
            }
        }
        if self.direction.is_some() && self.address.is_none() {
            bail!("--direction requires --address");
        }
        Ok(TransferFilter {
            address: self.address.clone(),
            extrinsic_index: self.extrinsic_index.clone(),
            from_block: self.from_block,
            to_block: self.to_block,
            direction: self.direction.clone(),
            include_total: self.include_total.then_some(true),
            asset_symbol: self.asset_symbol.clone(),
        })
    }
}

/// Everything resolved from args and config before the first request
struct Plan {
    endpoint: String,
    api_key: String,
    paginator: PaginatorConfig,
    batch_size: NonZeroUsize,
    sink: Box<dyn Sink>,
    sink_label: String,
    deadline: Option<Duration>,
    spill_dir: Option<PathBuf>,
}

impl Plan {
    fn build(args: IngestArgs, config: &Config) -> Result<Self> {
        let endpoint = match (&args.endpoint, &args.network) {
            (Some(url), _) => url.clone(),
            (None, Some(network)) => ledgerline_subscan::transfers_endpoint(network),
            (None, None) => config.subscan.transfers_url(),
        };
        let api_key = config
            .subscan
            .api_key
            .clone()
            .context("Subscan API key not set (SUBSCAN_API_KEY or [subscan].api_key)")?;

        let page_size = args.page_size.unwrap_or(config.ingest.page_size);
        let page_size = NonZeroU32::new(page_size).context("page size must be at least 1")?;
        if page_size.get() > 100 {
            log::warn!("page size {page_size} exceeds Subscan's limit of 100 rows");
        }
        let batch_size = args.batch_size.unwrap_or(config.ingest.batch_size);
        let batch_size = NonZeroUsize::new(batch_size).context("batch size must be at least 1")?;

        let mut paginator = PaginatorConfig::new(page_size);
        paginator.filter = args.filter()?;
        paginator.start_page = args.start_page;
        paginator.max_pages = args.max_pages;
        paginator.max_rows = args.max_rows;

        let table = args
            .table
            .clone()
            .unwrap_or_else(|| config.bigquery.table.clone());
        let (sink, sink_label): (Box<dyn Sink>, String) = match args.sink {
            SinkKind::Bigquery => {
                let bq = &config.bigquery;
                let project_id = bq
                    .project_id
                    .clone()
                    .context("[bigquery].project_id not set")?;
                let dataset = bq.dataset.clone().context("[bigquery].dataset not set")?;
                let token = bq.access_token.clone().context(
                    "BigQuery access token not set (BIGQUERY_ACCESS_TOKEN or [bigquery].access_token)",
                )?;
                let mut cfg = BigQueryConfig::new(project_id, dataset, table, token);
                if let Some(endpoint) = &bq.endpoint {
                    cfg.endpoint = endpoint.clone();
                }
                let label = format!("bigquery {}", cfg.table_ref());
                (Box::new(BigQuerySink::new(cfg)), label)
            }
            SinkKind::Parquet => {
                let dir = args
                    .output
                    .clone()
                    .unwrap_or_else(|| config.output.default_dir.clone());
                let level = args.zstd_level.unwrap_or(config.output.compression_level);
                let sink = ParquetSink::new(&table, &dir, level).with_context(|| {
                    format!("Failed to prepare output directory {}", dir.display())
                })?;
                (Box::new(sink), format!("parquet {}/{table}_*.parquet", dir.display()))
            }
        };

        Ok(Self {
            endpoint,
            api_key,
            paginator,
            batch_size,
            sink,
            sink_label,
            deadline: args.deadline_secs.map(Duration::from_secs),
            spill_dir: args.spill_dir,
        })
    }
}

pub fn run(args: IngestArgs, config: &Config, progress: &SharedProgress) -> ExitCode {
    let plan = match Plan::build(args, config) {
        Ok(plan) => plan,
        Err(e) => {
            log::error!("{e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if let Err(e) = crate::signal::install_handlers() {
        log::error!("{e:#}");
        return ExitCode::from(EXIT_FAILURE);
    }
    execute(plan, progress)
}

fn execute(plan: Plan, progress: &SharedProgress) -> ExitCode {
    log::info!("Ingesting transfers");
    log::info!("  Source: {}", plan.endpoint);
    log::info!("  Sink: {}", plan.sink_label);
    log::info!(
        "  Page size: {}, batch size: {}",
        plan.paginator.page_size,
        plan.batch_size
    );

    let mut stop = StopSignal::from_shutdown_flag();
    if let Some(deadline) = plan.deadline {
        stop = stop.with_timeout(deadline);
    }

    let policy = RetryPolicy::from_http_config();
    let source: Box<dyn RecordSource> = Box::new(SubscanSource::new(plan.endpoint, plan.api_key));
    let source = Retrying::new(source, policy).with_stop(stop.clone());
    let sink = Retrying::new(plan.sink, policy).with_stop(stop.clone());
    let mut pages = Paginator::new(source, plan.paginator);
    let mut acc = BatchAccumulator::new(sink, plan.batch_size);

    let pb = progress.ingest_line("transfers");
    let result = ledgerline_core::run_ingest(&mut pages, &mut acc, &stop, &pb);
    pb.finish_and_clear();

    match result {
        Ok(stats) => {
            stats.log();
            print_summary(&stats, &plan.sink_label);
            if stats.stop == StopReason::Cancelled {
                log::warn!("Interrupted; resume with --start-page {}", pages.cursor());
                ExitCode::from(EXIT_INTERRUPTED)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            report_failure(&e);
            let first_pending = acc.first_pending_page();
            let pending = acc.take_pending();
            let spilled = match (&plan.spill_dir, pending.is_empty()) {
                (_, true) => false,
                (Some(dir), false) => match spill(dir, &pending) {
                    Ok(path) => {
                        log::warn!(
                            "{} unflushed rows written to {}",
                            fmt_num(pending.len()),
                            path.display()
                        );
                        true
                    }
                    Err(e) => {
                        log::error!("{e:#}");
                        false
                    }
                },
                (None, false) => {
                    log::warn!(
                        "{} unflushed rows not written (pass --spill-dir to keep them)",
                        fmt_num(pending.len())
                    );
                    false
                }
            };
            log::error!(
                "{} rows flushed in {} batches before the failure; resume with --start-page {}",
                fmt_num(acc.rows_flushed()),
                fmt_num(acc.batches_flushed()),
                resume_page(&e, pages.cursor(), first_pending, spilled)
            );
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn report_failure(e: &IngestError) {
    match e {
        IngestError::Fetch { page, source } => log::error!(
            "Fatal: page {page} fetch failed (status {}): {source}",
            source
                .status()
                .map_or_else(|| "none".to_string(), |s| s.to_string())
        ),
        IngestError::Flush { .. } => log::error!("Fatal: {e}"),
    }
}

/// Page to restart from.
///
/// Unless the pending records were spilled, the restart has to cover the
/// oldest page they came from.
fn resume_page(e: &IngestError, cursor: u32, first_pending: Option<u32>, spilled: bool) -> u32 {
    let next = match e {
        IngestError::Fetch { page, .. } => *page,
        IngestError::Flush { .. } => cursor,
    };
    match first_pending {
        Some(first) if !spilled => first.min(next),
        _ => next,
    }
}

/// Dump records as JSON lines into `dir`
fn spill(dir: &Path, records: &[TransferRecord]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create spill directory {}", dir.display()))?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let path = dir.join(format!("ledgerline-spill-{stamp}.jsonl"));

    let file = File::create(&path)
        .with_context(|| format!("Failed to create spill file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(path)
}

/// Print a key-value summary table on stderr
fn print_summary(stats: &IngestStats, sink_label: &str) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Ingest").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    let rows = [
        ("Sink", sink_label.to_string()),
        ("Stopped", stats.stop.to_string()),
        ("Pages", fmt_num(stats.pages as usize)),
        ("Rows fetched", fmt_num(stats.rows_fetched)),
        ("Rows flushed", fmt_num(stats.rows_flushed)),
        ("Batches", fmt_num(stats.batches)),
        ("Elapsed", format!("{:.1}s", stats.elapsed.as_secs_f64())),
        ("Throughput", format!("{:.0} rows/s", stats.rows_per_sec())),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}
