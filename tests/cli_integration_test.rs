//! CLI integration tests: INI config and CSV price files on disk, JSON
//! reports read back from the output path.

mod common;

use clap::Parser;
use common::*;
use marketsense::cli::{run, Cli};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

fn write_prices(dir: &Path, series: &PriceSeries) {
    let mut body = String::from("date,open,high,low,close,volume\n");
    for b in &series.bars {
        body.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    fs::write(dir.join(format!("{}.csv", series.ticker)), body).unwrap();
}

fn workspace(ini: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    write_prices(dir.path(), &wave_series("AAA", 200, 0.0006, 0.012, 0.0));
    write_prices(dir.path(), &wave_series("BBB", 200, 0.0003, 0.008, 1.7));
    write_prices(dir.path(), &wave_series("CCC", 200, 0.0009, 0.020, 3.1));
    write_prices(dir.path(), &series_from_closes("KOSPI", &[2500.0, 2600.0, 2750.0]));
    let ini = ini.replace("{DATA}", &dir.path().display().to_string());
    let config = dir.path().join("run.ini");
    fs::write(&config, ini).unwrap();
    (dir, config)
}

fn exec(args: &[&str]) -> ExitCode {
    let mut argv = vec!["marketsense"];
    argv.extend_from_slice(args);
    run(Cli::try_parse_from(argv).unwrap())
}

fn same_code(a: ExitCode, b: ExitCode) -> bool {
    format!("{:?}", a) == format!("{:?}", b)
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

const BACKTEST_INI: &str = r#"
[backtest]
data_dir = {DATA}
ticker = AAA
initial_capital = 1000000

[strategy]
name = sma_crossover
short = 5
long = 20
"#;

const OPTIMIZE_INI: &str = r#"
[optimizer]
data_dir = {DATA}
tickers = AAA, BBB, CCC
objective = min_variance
max_weight = 0.6
lookback_days = 150
frontier_points = 8
"#;

mod backtest_command {
    use super::*;

    #[test]
    fn writes_single_result_object() {
        let (dir, config) = workspace(BACKTEST_INI);
        let out = dir.path().join("bt.json");
        let code = exec(&[
            "backtest",
            "-c",
            config.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ]);
        assert!(same_code(code, ExitCode::SUCCESS));

        let json = read_json(&out);
        assert_eq!(json["ticker"], "AAA");
        assert_eq!(json["strategy"], "SMACrossover(5,20)");
        assert_eq!(json["equity_curve"].as_array().unwrap().len(), 200);
        assert!(json["trades"].is_array());
        for key in [
            "total_return",
            "annualized_return",
            "volatility",
            "sharpe_ratio",
            "max_drawdown",
            "win_rate",
            "trade_count",
        ] {
            assert!(json["report"].get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn ticker_override_and_benchmark() {
        let (dir, config) = workspace(BACKTEST_INI);
        let out = dir.path().join("bt.json");
        let code = exec(&[
            "backtest",
            "-c",
            config.to_str().unwrap(),
            "--ticker",
            "AAA,CCC",
            "--strategy",
            "buy_and_hold",
            "--benchmark",
            "KOSPI",
            "-o",
            out.to_str().unwrap(),
        ]);
        assert!(same_code(code, ExitCode::SUCCESS));

        let json = read_json(&out);
        let runs = json.as_array().unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1]["ticker"], "CCC");
        assert_eq!(runs[0]["benchmark"]["benchmark"], "KOSPI");
        assert!((runs[0]["benchmark"]["benchmark_return"].as_f64().unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn compare_lists_every_strategy() {
        let (dir, config) = workspace(BACKTEST_INI);
        let out = dir.path().join("cmp.json");
        let code = exec(&[
            "backtest",
            "-c",
            config.to_str().unwrap(),
            "--compare",
            "-o",
            out.to_str().unwrap(),
        ]);
        assert!(same_code(code, ExitCode::SUCCESS));

        let json = read_json(&out);
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 7);
        // configured parameters survive into the comparison
        assert!(entries.iter().any(|e| e["label"] == "SMACrossover(5,20)"));
    }

    #[test]
    fn missing_price_file_exits_with_data_code() {
        let (_dir, config) = workspace(BACKTEST_INI);
        let code = exec(&["backtest", "-c", config.to_str().unwrap(), "--ticker", "ZZZ"]);
        assert!(same_code(code, ExitCode::from(3)));
    }

    #[test]
    fn unknown_strategy_exits_with_config_code() {
        let (_dir, config) = workspace(BACKTEST_INI);
        let code = exec(&["backtest", "-c", config.to_str().unwrap(), "-s", "martingale"]);
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn too_short_history_exits_with_backtest_code() {
        let (_dir, config) = workspace(BACKTEST_INI);
        let code = exec(&["backtest", "-c", config.to_str().unwrap(), "--ticker", "KOSPI"]);
        assert!(same_code(code, ExitCode::from(4)));
    }
}

mod optimize_command {
    use super::*;

    #[test]
    fn writes_weights_keyed_by_ticker() {
        let (dir, config) = workspace(OPTIMIZE_INI);
        let out = dir.path().join("opt.json");
        let code = exec(&[
            "optimize",
            "-c",
            config.to_str().unwrap(),
            "--frontier",
            "-o",
            out.to_str().unwrap(),
        ]);
        assert!(same_code(code, ExitCode::SUCCESS));

        let json = read_json(&out);
        assert_eq!(json["objective"], "min_variance");
        assert_eq!(json["lookback_days"], 150);
        let weights = json["weights"].as_object().unwrap();
        assert_eq!(weights.len(), 3);
        let total: f64 = weights.values().map(|w| w.as_f64().unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(weights.values().all(|w| w.as_f64().unwrap() <= 0.6 + 1e-6));
        assert!(!json["frontier"]["points"].as_array().unwrap().is_empty());
    }

    #[test]
    fn infeasible_floor_exits_with_optimizer_code() {
        let (_dir, config) = workspace(&OPTIMIZE_INI.replace("max_weight = 0.6", "min_weight = 0.4"));
        let code = exec(&["optimize", "-c", config.to_str().unwrap()]);
        assert!(same_code(code, ExitCode::from(5)));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_configs_pass() {
        let (_dir, config) = workspace(BACKTEST_INI);
        assert!(same_code(
            exec(&["validate", "-c", config.to_str().unwrap()]),
            ExitCode::SUCCESS
        ));
        let (_dir, config) = workspace(OPTIMIZE_INI);
        assert!(same_code(
            exec(&["validate", "-c", config.to_str().unwrap()]),
            ExitCode::SUCCESS
        ));
    }

    #[test]
    fn bad_value_fails() {
        let (_dir, config) = workspace(&BACKTEST_INI.replace("long = 20", "long = 3"));
        assert!(same_code(
            exec(&["validate", "-c", config.to_str().unwrap()]),
            ExitCode::from(2)
        ));
    }

    #[test]
    fn missing_file_fails() {
        assert!(same_code(
            exec(&["validate", "-c", "/nonexistent/run.ini"]),
            ExitCode::from(2)
        ));
    }
}
