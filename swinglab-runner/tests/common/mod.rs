//! Shared fixtures: a small price file with periodic breakouts and a config
//! pointing at it.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use swinglab_runner::BacktestConfig;

pub const SYMBOLS: [&str; 3] = ["AAA", "BBB", "CCC"];
pub const DAYS: i64 = 60;

pub fn day(i: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i)
}

/// Eight-day cycle per symbol: six sessions of slow drift down, a breakout
/// close three points above base, then a partial giveback. With a 5-bar
/// lookback the breakout session emits a long setup with its stop at the
/// cycle low. Each symbol runs one session behind the previous one.
pub fn close_for(symbol_index: usize, i: i64) -> f64 {
    let base = 50.0 + 10.0 * symbol_index as f64;
    let phase = (i - symbol_index as i64).rem_euclid(8);
    match phase {
        6 => base + 3.0,
        7 => base + 2.0,
        j => base - 0.2 * j as f64,
    }
}

/// First breakout session of `AAA`.
pub fn first_breakout() -> NaiveDate {
    day(6)
}

pub fn prices_csv() -> String {
    let mut out = String::from("symbol,date,open,high,low,close,volume\n");
    for i in 0..DAYS {
        for (k, symbol) in SYMBOLS.iter().enumerate() {
            let c = close_for(k, i);
            writeln!(
                out,
                "{symbol},{},{c:.2},{:.2},{:.2},{c:.2},{}",
                day(i),
                c + 1.0,
                c - 1.0,
                1000 + 10 * i
            )
            .unwrap();
        }
    }
    out
}

/// Write `prices.csv` (once) and `<name>.toml` into `dir`, then load the
/// config. `extra` is appended verbatim as further TOML sections.
pub fn config_in(dir: &Path, name: &str, output_dir: &str, extra: &str) -> BacktestConfig {
    let prices = dir.join("prices.csv");
    if !prices.exists() {
        std::fs::write(&prices, prices_csv()).unwrap();
    }
    let text = format!(
        r#"
[data]
path = "prices.csv"
universe = ["AAA", "BBB", "CCC"]

[backtest]
start_date = "{start}"
end_date = "{end}"
output_dir = "{output_dir}"
code_revision = "test-revision"

[scanner]
type = "pivot_breakout"
params = {{ lookback = 5 }}

{extra}
"#,
        start = day(0),
        end = day(DAYS - 1),
    );
    let path: PathBuf = dir.join(format!("{name}.toml"));
    std::fs::write(&path, text).unwrap();
    BacktestConfig::from_file(&path).unwrap()
}

/// Every file under `dir`, as sorted relative paths.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                out.push(path.strip_prefix(root).unwrap().to_path_buf());
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
