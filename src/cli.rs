//! CLI definition and dispatch.
//!
//! The binary is a thin collaborator: it reads an INI config, loads CSV price
//! files, runs the core and writes JSON reports. Progress goes to stderr so
//! stdout stays clean for the report.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{
    benchmark_comparison, compare_strategies, run_backtests, BacktestResult, BenchmarkComparison,
};
use crate::domain::config::{BacktestJob, OptimizeJob};
use crate::domain::covariance::AssetUniverse;
use crate::domain::error::MarketsenseError;
use crate::domain::frontier::efficient_frontier;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::optimizer::{optimize_portfolio, Objective};
use crate::domain::strategy::{StrategyConfig, STRATEGY_NAMES};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::report_port::{BacktestReport, OptimizationReport, ReportPort};

#[derive(Parser, Debug)]
#[command(
    name = "marketsense",
    about = "Strategy backtester and mean-variance portfolio optimizer"
)]
pub struct Cli {
    /// trace, debug, info, warn or error
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest a strategy over one or more tickers
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the configured ticker list (comma separated)
        #[arg(long)]
        ticker: Option<String>,
        /// Override the configured strategy with its default parameters
        #[arg(short, long)]
        strategy: Option<String>,
        /// Run every registered strategy over the first ticker
        #[arg(long)]
        compare: bool,
        #[arg(long)]
        benchmark: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Optimize portfolio weights across a basket of tickers
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the configured tickers (comma separated)
        #[arg(long)]
        tickers: Option<String>,
        #[arg(long)]
        objective: Option<Objective>,
        /// Append the efficient frontier to the report
        #[arg(long)]
        frontier: bool,
        #[arg(long)]
        frontier_points: Option<usize>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List tickers with price files in a data directory
    ListTickers {
        #[arg(long)]
        data_dir: PathBuf,
    },
    /// List registered strategies
    Strategies,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            ticker,
            strategy,
            compare,
            benchmark,
            data_dir,
            output,
        } => run_backtest(BacktestArgs {
            config,
            ticker,
            strategy,
            compare,
            benchmark,
            data_dir,
            output,
        }),
        Command::Optimize {
            config,
            tickers,
            objective,
            frontier,
            frontier_points,
            data_dir,
            output,
        } => run_optimize(OptimizeArgs {
            config,
            tickers,
            objective,
            frontier,
            frontier_points,
            data_dir,
            output,
        }),
        Command::Validate { config } => run_validate(&config),
        Command::ListTickers { data_dir } => run_list_tickers(data_dir),
        Command::Strategies => {
            for name in STRATEGY_NAMES {
                println!("{}", name);
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

struct BacktestArgs {
    config: PathBuf,
    ticker: Option<String>,
    strategy: Option<String>,
    compare: bool,
    benchmark: Option<String>,
    data_dir: Option<PathBuf>,
    output: Option<PathBuf>,
}

struct OptimizeArgs {
    config: PathBuf,
    tickers: Option<String>,
    objective: Option<Objective>,
    frontier: bool,
    frontier_points: Option<usize>,
    data_dir: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn run_backtest(args: BacktestArgs) -> Result<(), MarketsenseError> {
    // Stage 1: config
    eprintln!("Loading config from {}", args.config.display());
    let adapter = FileConfigAdapter::from_file(&args.config)?;
    let mut job = BacktestJob::from_config(&adapter)?;
    if let Some(tickers) = args.ticker.as_deref() {
        job.tickers = split_list(tickers);
    }
    if let Some(name) = args.strategy.as_deref() {
        job.strategy = StrategyConfig::with_defaults(name)?;
    }
    if args.benchmark.is_some() {
        job.benchmark = args.benchmark;
    }
    let data_dir = resolve_data_dir(args.data_dir, job.data_dir.clone(), "backtest")?;

    // Stage 2: data
    let data = CsvAdapter::new(data_dir);
    let report = JsonReportAdapter::new(args.output);

    if args.compare {
        return run_comparison(&data, &report, &job);
    }

    let series = load_series(&data, &job)?;
    let benchmark = match job.benchmark.as_deref() {
        Some(ticker) => Some(data.fetch_series(ticker, job.start_date, job.end_date)?),
        None => None,
    };

    // Stage 3: run
    eprintln!(
        "Running {} over {} ticker(s)...",
        job.strategy,
        series.len()
    );
    let mut results: Vec<BacktestResult> = Vec::new();
    let mut first_error = None;
    for (s, outcome) in series
        .iter()
        .zip(run_backtests(&series, &job.strategy, &job.config))
    {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!(ticker = %s.ticker, error = %e, "skipping ticker");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    if results.is_empty() {
        return Err(first_error.unwrap_or_else(|| MarketsenseError::DataSource {
            reason: "no tickers to backtest".to_string(),
        }));
    }

    let comparisons: Vec<Option<BenchmarkComparison>> = results
        .iter()
        .map(|r| match &benchmark {
            Some(b) => benchmark_comparison(&r.report, b).map(Some),
            None => Ok(None),
        })
        .collect::<Result<_, _>>()?;

    for (r, cmp) in results.iter().zip(&comparisons) {
        print_summary(r, cmp.as_ref());
    }

    // Stage 4: report
    let reports: Vec<BacktestReport<'_>> = results
        .iter()
        .zip(&comparisons)
        .map(|(result, benchmark)| BacktestReport {
            result,
            benchmark: benchmark.as_ref(),
        })
        .collect();
    report.write_backtests(&reports)
}

fn run_comparison(
    data: &dyn PriceDataPort,
    report: &dyn ReportPort,
    job: &BacktestJob,
) -> Result<(), MarketsenseError> {
    let Some(ticker) = job.tickers.first() else {
        return Err(MarketsenseError::config_missing("backtest", "ticker"));
    };
    if job.tickers.len() > 1 {
        warn!(ticker = %ticker, "--compare uses the first ticker only");
    }
    let series = data.fetch_series(ticker, job.start_date, job.end_date)?;

    // The configured strategy keeps its parameters; the rest use defaults.
    let strategies: Vec<StrategyConfig> = STRATEGY_NAMES
        .iter()
        .map(|name| {
            if *name == job.strategy.key() {
                Ok(job.strategy.clone())
            } else {
                StrategyConfig::with_defaults(name)
            }
        })
        .collect::<Result<_, _>>()?;

    eprintln!("Comparing {} strategies on {}...", strategies.len(), ticker);
    let outcomes = compare_strategies(&series, &strategies, &job.config);
    for (rank, outcome) in outcomes.iter().enumerate() {
        match &outcome.result {
            Ok(r) => eprintln!(
                "  {:>2}. {:<28} return {:>8.2}%  sharpe {:>6.2}  trades {}",
                rank + 1,
                outcome.strategy.to_string(),
                r.report.total_return * 100.0,
                r.report.sharpe_ratio,
                r.report.trade_count
            ),
            Err(e) => eprintln!("   -. {:<28} {}", outcome.strategy.to_string(), e),
        }
    }
    report.write_comparison(&outcomes)
}

fn run_optimize(args: OptimizeArgs) -> Result<(), MarketsenseError> {
    eprintln!("Loading config from {}", args.config.display());
    let adapter = FileConfigAdapter::from_file(&args.config)?;
    let mut job = OptimizeJob::from_config(&adapter)?;
    if let Some(tickers) = args.tickers.as_deref() {
        job.tickers = split_list(tickers);
    }
    if let Some(objective) = args.objective {
        job.objective = objective;
    }
    if let Some(points) = args.frontier_points {
        job.frontier_points = points;
    }
    let data_dir = resolve_data_dir(args.data_dir, job.data_dir.clone(), "optimizer")?;

    let data = CsvAdapter::new(data_dir);
    let universe = AssetUniverse::new(
        job.tickers
            .iter()
            .map(|t| data.fetch_series(t, job.start_date, job.end_date))
            .collect::<Result<Vec<_>, _>>()?,
    );

    eprintln!(
        "Optimizing {} over {} tickers ({} day lookback)...",
        job.objective,
        universe.len(),
        job.lookback_days
    );
    let result = optimize_portfolio(
        &universe,
        job.objective,
        &job.bounds,
        job.lookback_days,
        &job.config,
    )?;
    let frontier = if args.frontier {
        Some(efficient_frontier(
            &universe,
            job.frontier_points,
            &job.bounds,
            job.lookback_days,
            &job.config,
        )?)
    } else {
        None
    };

    for (ticker, weight) in result.weights.iter() {
        eprintln!("  {:<12} {:>7.2}%", ticker, weight * 100.0);
    }
    eprintln!(
        "  expected return {:.2}%  volatility {:.2}%  sharpe {:.3}",
        result.expected_return * 100.0,
        result.volatility * 100.0,
        result.sharpe_ratio
    );

    JsonReportAdapter::new(args.output).write_optimization(&OptimizationReport {
        tickers: &job.tickers,
        lookback_days: job.lookback_days,
        risk_free_rate: job.config.risk_free_rate,
        result: &result,
        frontier: frontier.as_ref(),
    })
}

fn run_validate(config_path: &Path) -> Result<(), MarketsenseError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = FileConfigAdapter::from_file(config_path)?;

    let has_backtest = adapter.get_string("strategy", "name").is_some();
    let has_optimizer = !adapter.get_list("optimizer", "tickers").is_empty()
        || !adapter.get_list("optimizer", "ticker").is_empty();
    if !has_backtest && !has_optimizer {
        return Err(MarketsenseError::config_missing("strategy", "name"));
    }

    if has_backtest {
        let job = BacktestJob::from_config(&adapter)?;
        eprintln!("\nBacktest:");
        eprintln!("  Tickers:  {}", job.tickers.join(", "));
        eprintln!("  Strategy: {} (needs {} bars)", job.strategy, job.strategy.min_lookback());
        eprintln!("  Capital:  {:.2}", job.config.initial_capital);
    }
    if has_optimizer {
        let job = OptimizeJob::from_config(&adapter)?;
        eprintln!("\nOptimizer:");
        eprintln!("  Tickers:   {}", job.tickers.join(", "));
        eprintln!("  Objective: {}", job.objective);
        eprintln!(
            "  Bounds:    [{}, {}]",
            job.bounds.min_weight, job.bounds.max_weight
        );
        job.bounds.check_feasible(job.tickers.len())?;
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_tickers(data_dir: PathBuf) -> Result<(), MarketsenseError> {
    let tickers = CsvAdapter::new(data_dir).list_tickers()?;
    if tickers.is_empty() {
        eprintln!("No price files found");
    }
    for ticker in &tickers {
        println!("{}", ticker);
    }
    Ok(())
}

/// Fetch each ticker, skipping ones whose files cannot be read.
fn load_series(
    data: &dyn PriceDataPort,
    job: &BacktestJob,
) -> Result<Vec<PriceSeries>, MarketsenseError> {
    let mut series = Vec::with_capacity(job.tickers.len());
    let mut first_error = None;
    for ticker in &job.tickers {
        match data.fetch_series(ticker, job.start_date, job.end_date) {
            Ok(s) => series.push(s),
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "skipping ticker");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    match (series.is_empty(), first_error) {
        (true, Some(e)) => Err(e),
        _ => Ok(series),
    }
}

fn resolve_data_dir(
    flag: Option<PathBuf>,
    configured: Option<PathBuf>,
    section: &str,
) -> Result<PathBuf, MarketsenseError> {
    flag.or(configured)
        .ok_or_else(|| MarketsenseError::config_missing(section, "data_dir"))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn print_summary(result: &BacktestResult, benchmark: Option<&BenchmarkComparison>) {
    let r = &result.report;
    info!(ticker = %result.ticker, strategy = %result.strategy, "summary");
    eprintln!("\n{} / {}", result.ticker, result.strategy);
    eprintln!("  Total return:      {:>8.2}%", r.total_return * 100.0);
    eprintln!("  Annualized return: {:>8.2}%", r.annualized_return * 100.0);
    eprintln!("  Volatility:        {:>8.2}%", r.volatility * 100.0);
    eprintln!("  Sharpe ratio:      {:>8.3}", r.sharpe_ratio);
    eprintln!("  Max drawdown:      {:>8.2}%", r.max_drawdown * 100.0);
    eprintln!("  Win rate:          {:>8.2}%", r.win_rate * 100.0);
    eprintln!("  Trades:            {:>8}", r.trade_count);
    if let Some(b) = benchmark {
        eprintln!(
            "  vs {}: {:>8.2}% (alpha {:+.2}%)",
            b.benchmark,
            b.benchmark_return * 100.0,
            b.alpha * 100.0
        );
    }
}
