//! Ranking and text rendering of benchmark results.

use std::fmt::Write as _;

use super::runner::BenchmarkRun;
use super::stats::Summary;

const RULE_WIDTH: usize = 50;

/// One row of the final comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct RankEntry {
    /// 1-based
    pub rank: usize,
    pub name: String,
    pub mean_ms: f64,
    /// `None` for the fastest binding
    pub slower_percent: Option<f64>,
}

/// Order bindings by mean latency, fastest first.
///
/// Runs without a single successful call are left out.
pub fn rank(runs: &[BenchmarkRun]) -> Vec<RankEntry> {
    let mut means: Vec<(&str, f64)> = runs
        .iter()
        .filter_map(|run| run.summary().map(|s| (run.name.as_str(), s.mean_ms)))
        .collect();
    means.sort_by(|a, b| a.1.total_cmp(&b.1));

    let Some(&(_, fastest)) = means.first() else {
        return Vec::new();
    };

    means
        .into_iter()
        .enumerate()
        .map(|(i, (name, mean_ms))| RankEntry {
            rank: i + 1,
            name: name.to_string(),
            mean_ms,
            slower_percent: (i > 0).then(|| slower_percent(mean_ms, fastest)),
        })
        .collect()
}

fn slower_percent(mean_ms: f64, fastest_ms: f64) -> f64 {
    if fastest_ms > 0.0 {
        (mean_ms / fastest_ms - 1.0) * 100.0
    } else {
        0.0
    }
}

pub fn banner(title: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!("\n{rule}\n{title}\n{rule}")
}

/// Per-binding statistics block.
pub fn format_summary(name: &str, summary: Option<&Summary>, errors: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{name} Results:");
    match summary {
        Some(s) => {
            let _ = writeln!(out, "  Average response time: {:.2}ms", s.mean_ms);
            let _ = writeln!(out, "  Min: {:.2}ms", s.min_ms);
            let _ = writeln!(out, "  Max: {:.2}ms", s.max_ms);
            let _ = writeln!(out, "  Standard deviation: {:.2}ms", s.stdev_ms);
            let _ = writeln!(out, "  Successful calls: {}", s.successes);
        }
        None => {
            let _ = writeln!(out, "  No successful calls");
        }
    }
    let _ = write!(out, "  Errors: {errors}");
    out
}

/// Final comparison table.
pub fn format_ranking(entries: &[RankEntry]) -> String {
    let mut out = banner("Performance Comparison Summary");
    out.push('\n');

    if entries.is_empty() {
        out.push_str("No valid test results to compare");
        return out;
    }

    let _ = writeln!(out, "\nRanking (by average response time):");
    out.push_str(&"-".repeat(40));
    for entry in entries {
        let _ = write!(
            out,
            "\n{}. {:<10} {:>8.2}ms ",
            entry.rank, entry.name, entry.mean_ms
        );
        match entry.slower_percent {
            None => out.push_str("(fastest)"),
            Some(p) => {
                let _ = write!(out, "({p:.0}% slower)");
            }
        }
    }
    out
}
