//! Command-line interface for indicator snapshots

use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};
use snapshot_engine::{
    BatchOptions, BatchResult, Snapshot, SnapshotConfig, SnapshotOrchestrator, YahooMarketData,
};
use snapshot_utils::{LogFormat, LoggingConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "snapshot")]
#[command(about = "Indicator snapshots for one or more symbols", long_about = None)]
struct Args {
    /// Ticker symbols, e.g. AAPL MSFT
    #[arg(required = true)]
    symbols: Vec<String>,

    /// Maximum symbols computed concurrently
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Daily bars requested per symbol
    #[arg(long, default_value_t = 200)]
    lookback: usize,

    /// Per-category deadline in milliseconds
    #[arg(long)]
    category_timeout_ms: Option<u64>,

    /// Market data requests per minute
    #[arg(long, default_value_t = 60)]
    rate_limit: u32,

    /// Skip cache reads
    #[arg(long)]
    no_cache: bool,

    /// Print the full batch result as JSON
    #[arg(long)]
    json: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log output format: pretty, compact or json
    #[arg(long, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

fn cell(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.decimals$}"))
}

fn summary_row(snapshot: &Snapshot) -> Vec<String> {
    vec![
        snapshot.symbol.clone(),
        cell(snapshot.market.last_price, 2),
        cell(snapshot.market.change_pct, 2),
        cell(snapshot.price.rsi_14, 1),
        cell(snapshot.price.sma_50, 2),
        cell(snapshot.price.atr_14, 2),
        cell(snapshot.liquidity.relative_volume, 2),
        cell(snapshot.value.pe_ratio, 1),
        snapshot.metadata.data_quality.to_string(),
        snapshot.metadata.missing_fields.len().to_string(),
    ]
}

fn print_table(result: &BatchResult) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Symbol", "Last", "Chg %", "RSI 14", "SMA 50", "ATR 14", "Rel Vol", "P/E", "Quality",
        "Missing",
    ]);

    let mut symbols: Vec<&String> = result.snapshots.keys().collect();
    symbols.sort();
    for symbol in symbols {
        table.add_row(summary_row(&result.snapshots[symbol]));
    }
    println!("{table}");

    let mut errors: Vec<_> = result.errors.iter().collect();
    errors.sort();
    for (symbol, error) in errors {
        println!("{symbol}: {error}");
    }

    let meta = &result.metadata;
    println!(
        "{} symbols, {} ok, {} cached, {} failed in {}ms",
        meta.total, meta.successful, meta.cached, meta.failed, meta.execution_time_ms
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    snapshot_utils::init_tracing_with(&LoggingConfig::new(&args.log_level, args.log_format))?;

    let mut config = SnapshotConfig::builder()
        .bars_lookback(args.lookback)
        .bypass_cache(args.no_cache);
    if let Some(concurrency) = args.concurrency {
        config = config.batch_concurrency(concurrency);
    }
    if let Some(millis) = args.category_timeout_ms {
        config = config.category_timeout(Duration::from_millis(millis));
    }

    let orchestrator =
        SnapshotOrchestrator::builder(Arc::new(YahooMarketData::with_rate_limit(args.rate_limit)))
            .config(config.build()?)
            .build()?;

    info!(symbols = args.symbols.len(), "Starting snapshot batch");

    let options = BatchOptions::new().on_progress(|progress| {
        info!(
            completed = progress.completed,
            total = progress.total,
            failed = progress.failed,
            current = progress.current.as_deref().unwrap_or("-"),
            "Batch progress"
        );
    });
    let result = orchestrator
        .get_snapshots_batch(&args.symbols, options)
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_table(&result);
    }

    if result.metadata.total > 0 && result.metadata.failed == result.metadata.total {
        anyhow::bail!("no snapshot could be produced");
    }
    Ok(())
}
