//! SwingLab CLI — run, parity and sweep commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config and write its run directory
//! - `parity`: check that standalone and in-simulation scans agree
//! - `sweep`: run the config's `[sweep]` grid in parallel
//!
//! Logging goes to stderr and is filtered by `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use swinglab_core::parity::ParityError;
use swinglab_runner::{
    execute, parity_report_path, sweep, verify_parity, verify_parity_range, BacktestConfig,
    RunError, RunResult, SweepEntry,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "swinglab", about = "SwingLab CLI — daily swing-trading backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Override `backtest.output_dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Write the per-day candidate tables.
        #[arg(long, default_value_t = false)]
        debug_candidates: bool,

        /// Print the summary record as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Compare standalone and in-simulation candidate scans.
    Parity {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// As-of date (YYYY-MM-DD). Without it every trading day of the
        /// configured range is checked.
        #[arg(long)]
        date: Option<String>,
    },
    /// Run the `[sweep]` grid of a config file in parallel.
    Sweep {
        /// Path to a TOML config file with a `[sweep]` section.
        #[arg(long)]
        config: PathBuf,

        /// Override `backtest.output_dir` (the sweep root).
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            debug_candidates,
            json,
        } => run_cmd(&config, output_dir, debug_candidates, json),
        Commands::Parity { config, date } => parity_cmd(&config, date.as_deref()),
        Commands::Sweep { config, output_dir } => sweep_cmd(&config, output_dir),
    }
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    BacktestConfig::from_file(path)
        .with_context(|| format!("loading config {}", path.display()))
}

fn run_cmd(
    config_path: &Path,
    output_dir: Option<PathBuf>,
    debug_candidates: bool,
    json: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = output_dir {
        config.backtest.output_dir = dir;
    }
    config.backtest.debug_candidates |= debug_candidates;

    let result = execute(&config).context("backtest failed")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result.summary)?);
    } else {
        print_summary(&result);
    }
    println!("Run written to: {}", config.backtest.output_dir.display());
    Ok(())
}

fn parity_cmd(config_path: &Path, date: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;

    let outcome = match date {
        Some(s) => {
            let as_of = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("invalid --date '{s}'"))?;
            verify_parity(&config, as_of).map(|r| vec![r])
        }
        None => verify_parity_range(&config),
    };

    match outcome {
        Ok(results) => {
            let rows: usize = results.iter().map(|r| r.rows).sum();
            println!(
                "Parity OK: {} day(s), {} candidate row(s)",
                results.len(),
                rows
            );
            Ok(())
        }
        Err(RunError::Parity(ParityError::Mismatch(report))) => {
            let path = parity_report_path(&config.backtest.output_dir, report.as_of);
            bail!("{report}; diff report at {}", path.display())
        }
        Err(err) => Err(err).context("parity check failed"),
    }
}

fn sweep_cmd(config_path: &Path, output_dir: Option<PathBuf>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = output_dir {
        config.backtest.output_dir = dir;
    }
    let Some(grid) = config.sweep.clone() else {
        bail!("{} has no [sweep] section", config_path.display());
    };

    let entries = sweep(&config, &grid).context("sweep failed")?;
    print_sweep(&entries);
    println!("Sweep written to: {}", config.backtest.output_dir.display());
    Ok(())
}

fn print_summary(result: &RunResult) {
    let s = &result.summary;
    let m = &s.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Run ID:         {}", s.provenance.run_id);
    println!("Period:         {} to {}", s.start_date, s.end_date);
    println!("Trading days:   {}", m.trading_days);
    println!("Universe:       {} symbol(s)", s.universe_size);
    println!("Scanner:        {}", s.scanner);
    println!();
    println!("--- Activity ---");
    println!("Entries:        {}", m.entries);
    println!("Trims:          {}", m.trims);
    println!("Exits:          {}", m.exits);
    for (reason, count) in &m.fills_by_reason {
        println!("  {reason:<14}{count}");
    }
    println!("Open at end:    {}", m.open_positions_at_end);
    println!("Unfilled:       {}", m.unfilled_entries);
    println!();
    println!("--- Performance ---");
    println!("Final Equity:   {:.2}", m.final_equity);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Realized PnL:   {:.2}", m.realized_pnl);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    if s.history_rows_dropped > 0 {
        println!();
        println!(
            "WARNING: {} history row(s) dropped during load",
            s.history_rows_dropped
        );
    }
}

fn print_sweep(entries: &[SweepEntry]) {
    println!();
    println!(
        "{:<16} {:<11} {:>5} {:>8} {:>6} {:>10} {:>8}",
        "run_id", "entry", "hold", "risk", "fills", "return", "sharpe"
    );
    for e in entries {
        println!(
            "{:<16} {:<11} {:>5} {:>8.4} {:>6} {:>9.2}% {:>8.3}",
            &e.run_id[..16.min(e.run_id.len())],
            e.entry_model.as_str(),
            e.max_hold_days,
            e.risk_per_trade_pct,
            e.fills,
            e.total_return * 100.0,
            e.sharpe
        );
    }
}
