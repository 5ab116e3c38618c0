//! Result export: CSV, JSON and a fixed-width terminal table.
//!
//! Persisted JSON carries `schema_version`; newer versions are rejected on load.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::result::{BacktestResult, ResultSet, SCHEMA_VERSION};

const CSV_HEADER: [&str; 14] = [
    "ticker",
    "strategy",
    "windows",
    "start_date",
    "end_date",
    "total_return_pct",
    "annualized_return_pct",
    "buy_and_hold_return_pct",
    "annualized_buy_and_hold_pct",
    "total_to_bh_ratio",
    "annualized_to_bh_ratio",
    "irr_pct",
    "trade_count",
    "win_rate",
];

// ─── CSV ────────────────────────────────────────────────────────────

/// One row per result. NaN ratios are written as `NaN`, a missing IRR as an
/// empty field.
pub fn export_csv(results: &ResultSet) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;
    for r in results.results() {
        wtr.write_record(&csv_row(r))?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn csv_row(r: &BacktestResult) -> [String; 14] {
    [
        r.ticker.clone(),
        r.strategy.clone(),
        r.windows_label(),
        r.start_date.to_string(),
        r.end_date.to_string(),
        format!("{:.6}", r.total_return_pct),
        format!("{:.6}", r.annualized_return_pct),
        format!("{:.6}", r.buy_and_hold_return_pct),
        format!("{:.6}", r.annualized_buy_and_hold_pct),
        format!("{:.6}", r.total_to_bh_ratio),
        format!("{:.6}", r.annualized_to_bh_ratio),
        r.irr_pct.map(|v| format!("{v:.6}")).unwrap_or_default(),
        r.trade_count.to_string(),
        format!("{:.4}", r.win_rate),
    ]
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(results: &ResultSet) -> Result<String> {
    serde_json::to_string_pretty(results.results()).context("failed to serialize results to JSON")
}

/// Parse results written by [`export_json`], rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ResultSet> {
    let results: Vec<BacktestResult> =
        serde_json::from_str(json).context("failed to deserialize results from JSON")?;
    if let Some(r) = results.iter().find(|r| r.schema_version > SCHEMA_VERSION) {
        bail!(
            "unsupported schema version {} (max supported: {})",
            r.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(results.into_iter().collect())
}

// ─── Files ──────────────────────────────────────────────────────────

/// Output format picked from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(ExportFormat::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ExportFormat::Json),
            _ => bail!(
                "cannot infer export format from '{}' (expected .csv or .json)",
                path.display()
            ),
        }
    }
}

/// Write results to `path`, creating parent directories as needed.
pub fn save_results(results: &ResultSet, path: &Path) -> Result<()> {
    let body = match ExportFormat::from_path(path)? {
        ExportFormat::Csv => export_csv(results)?,
        ExportFormat::Json => export_json(results)?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Terminal table ─────────────────────────────────────────────────

/// Fixed-width table for terminal output.
pub fn render_table(results: &ResultSet) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<17} {:>11} {:>9} {:>9} {:>9} {:>9} {:>8} {:>8} {:>6}",
        "Ticker", "Strategy", "Windows", "Total%", "Ann%", "B&H%", "AnnB&H%", "Ratio", "IRR%", "Trades"
    );
    let _ = writeln!(out, "{}", "-".repeat(103));
    for r in results.results() {
        let _ = writeln!(
            out,
            "{:<8} {:<17} {:>11} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>8} {:>8} {:>6}",
            r.ticker,
            r.strategy,
            r.windows_label(),
            r.total_return_pct,
            r.annualized_return_pct,
            r.buy_and_hold_return_pct,
            r.annualized_buy_and_hold_pct,
            fmt_opt(Some(r.annualized_to_bh_ratio).filter(|v| !v.is_nan())),
            fmt_opt(r.irr_pct),
            r.trade_count,
        );
    }
    out
}

fn fmt_opt(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "n/a".to_string())
}
