//! Trendwatch CLI: Supertrend signal monitor.
//!
//! Commands:
//! - `run`: check on a fixed interval until stopped (or `--cycles` reached)
//! - `check`: run a single check cycle and print the report
//! - `scan`: offline per-bar trend flags and signals for a candle CSV
//! - `state`: show the persisted last alerted signal
//! - `init-config`: write a default TOML config

mod logging;
mod scan;

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use trendwatch_core::alerts::{JsonStateStore, StateStore};
use trendwatch_core::config::MonitorConfig;
use trendwatch_core::data::{CandleProvider, DeltaProvider, SyntheticProvider};
use trendwatch_core::engine::{CheckCycle, CycleReport, Scheduler};
use trendwatch_core::notify::{CsvJournal, Notifier, TelegramSink, TerminalBell};
use trendwatch_core::signals::SignalMode;

#[derive(Parser)]
#[command(
    name = "trendwatch",
    version,
    about = "Dual Supertrend signal monitor with volume alerts"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check on a fixed interval: one cycle now, then every interval.
    Run {
        #[command(flatten)]
        monitor: MonitorArgs,

        /// Stop after this many cycles.
        #[arg(long)]
        cycles: Option<usize>,
    },
    /// Run a single check cycle and print the report.
    Check {
        #[command(flatten)]
        monitor: MonitorArgs,
    },
    /// Compute both Supertrends over a candle CSV and print per-bar results.
    Scan {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Candle file with timestamp,open,high,low,close,volume columns.
        #[arg(long)]
        csv: PathBuf,

        /// Signal mode override: state or crossover.
        #[arg(long)]
        mode: Option<SignalMode>,
    },
    /// Show the persisted last alerted signal.
    State {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a default config file.
    InitConfig {
        /// Destination path.
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Args)]
struct MonitorArgs {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the offline random-walk feed instead of the exchange.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Instrument symbol override (e.g., BTCUSD).
    #[arg(long)]
    symbol: Option<String>,

    /// Check interval override, in seconds.
    #[arg(long)]
    interval: Option<u64>,

    /// Signal mode override: state or crossover.
    #[arg(long)]
    mode: Option<SignalMode>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.json);

    match cli.command {
        Commands::Run { monitor, cycles } => cmd_run(&monitor, cycles),
        Commands::Check { monitor } => cmd_check(&monitor, cli.json),
        Commands::Scan { config, csv, mode } => cmd_scan(config.as_deref(), &csv, mode),
        Commands::State { config } => cmd_state(config.as_deref()),
        Commands::InitConfig { path, force } => cmd_init_config(&path, force),
    }
}

// ── Config and wiring ────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    match path {
        Some(path) => MonitorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(MonitorConfig::default()),
    }
}

fn monitor_config(args: &MonitorArgs) -> Result<MonitorConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(symbol) = &args.symbol {
        config.symbol = symbol.clone();
    }
    if let Some(interval) = args.interval {
        if interval == 0 {
            bail!("--interval must be at least 1 second");
        }
        config.check_interval_seconds = interval;
    }
    if let Some(mode) = args.mode {
        config.indicator.signal_mode = mode;
    }
    config.validate()?;
    Ok(config)
}

fn build_cycle(config: MonitorConfig, synthetic: bool) -> Result<CheckCycle<JsonStateStore>> {
    let provider: Box<dyn CandleProvider> = if synthetic {
        Box::new(SyntheticProvider::default())
    } else {
        Box::new(DeltaProvider::new(&config.feed.base_url, config.feed.timeout())?)
    };

    let mut notifier = Notifier::new();
    if config.telegram.enabled {
        let (Some(token), Some(chat_id)) =
            (config.telegram.resolve_token(), config.telegram.chat_id.clone())
        else {
            bail!("telegram is enabled but the bot token or chat id is missing");
        };
        notifier.push(Box::new(TelegramSink::new(token, chat_id, config.feed.timeout())?));
    }
    if config.beep {
        notifier.push(Box::new(TerminalBell::new()));
    }

    let store = JsonStateStore::new(&config.storage.state_file);
    let journal = CsvJournal::new(&config.storage.journal_file);

    info!(
        symbol = %config.symbol,
        resolution = %config.resolution,
        mode = %config.indicator.signal_mode,
        provider = provider.name(),
        sinks = ?notifier.sink_names(),
        "monitor configured"
    );

    Ok(CheckCycle::new(config, provider, store)
        .with_notifier(notifier)
        .with_journal(journal))
}

// ── Commands ─────────────────────────────────────────────────────────

fn cmd_run(args: &MonitorArgs, cycles: Option<usize>) -> Result<()> {
    if cycles == Some(0) {
        bail!("--cycles must be at least 1");
    }
    let config = monitor_config(args)?;
    let interval = config.check_interval();
    let mut cycle = build_cycle(config, args.synthetic)?;

    let mut scheduler = Scheduler::new(interval);
    if let Some(n) = cycles {
        scheduler = scheduler.max_cycles(n);
    }
    info!(interval_secs = interval.as_secs(), "monitor started");
    let summary = scheduler.run(|now| cycle.run(now));
    info!(
        cycles = summary.cycles,
        emitted = summary.emitted,
        failed = summary.failed,
        "monitor stopped"
    );
    Ok(())
}

fn cmd_check(args: &MonitorArgs, json: bool) -> Result<()> {
    let config = monitor_config(args)?;
    let mut cycle = build_cycle(config, args.synthetic)?;
    let report = cycle.run(Utc::now())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!("Candle:   {}", report.candle_time.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Close:    {:.2}", report.close);
    println!("Signal:   {}", report.trade.signal);
    if let Some(levels) = report.trade.levels {
        println!("Entry:    {:.2}", levels.entry);
        println!("Stop:     {:.2}", levels.stop_loss);
        println!("Target 1: {:.2}", levels.target1);
        println!("Target 2: {:.2}", levels.target2);
    }
    println!(
        "Volume:   {:.2} (avg {:.2}, {:?})",
        report.volume.volume, report.volume.average, report.volume.condition
    );
    if report.low_volume {
        println!("          signal dropped: volume below minimum ratio");
    }
    println!("Decision: {:?}", report.decision);
    if report.sink_failures > 0 {
        println!("          {} sink(s) failed, see log", report.sink_failures);
    }
}

fn cmd_scan(config: Option<&Path>, csv_path: &Path, mode: Option<SignalMode>) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(mode) = mode {
        config.indicator.signal_mode = mode;
    }
    let file = File::open(csv_path)
        .with_context(|| format!("opening candle file {}", csv_path.display()))?;
    let series = scan::read_candles(file)?;
    let rows = scan::scan(&config, &series, std::io::stdout().lock())?;
    info!(rows, "scan complete");
    Ok(())
}

fn cmd_state(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let store = JsonStateStore::new(&config.storage.state_file);
    let state = store.load()?;
    match state.last_signal {
        Some(signal) => println!("Last alerted signal: {signal}"),
        None => println!("No signal alerted yet"),
    }
    println!("State file: {}", store.path().display());
    Ok(())
}

fn cmd_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let text = MonitorConfig::default().to_toml()?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
