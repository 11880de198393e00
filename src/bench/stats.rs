//! Latency samples and descriptive statistics.

use std::time::Duration;

/// One measured round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySample {
    /// Zero-based position in the run
    pub index: usize,
    pub elapsed: Duration,
    /// Set when the round trip failed
    pub error: Option<String>,
}

impl LatencySample {
    pub fn success(index: usize, elapsed: Duration) -> Self {
        Self {
            index,
            elapsed,
            error: None,
        }
    }

    pub fn failure(index: usize, elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            index,
            elapsed,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn millis(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Statistics over the successful samples of one run, in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub successes: usize,
    pub errors: usize,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Sample standard deviation (n - 1); 0 below two successes
    pub stdev_ms: f64,
}

/// Summarize a run. `None` when no call succeeded.
pub fn summarize(samples: &[LatencySample]) -> Option<Summary> {
    let times: Vec<f64> = samples
        .iter()
        .filter(|s| s.is_success())
        .map(LatencySample::millis)
        .collect();
    let errors = samples.len() - times.len();

    if times.is_empty() {
        return None;
    }

    let n = times.len() as f64;
    let mean = times.iter().sum::<f64>() / n;
    let min = times.iter().copied().fold(f64::INFINITY, f64::min);
    let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let stdev = if times.len() > 1 {
        let variance = times.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    } else {
        0.0
    };

    Some(Summary {
        successes: times.len(),
        errors,
        mean_ms: mean,
        min_ms: min,
        max_ms: max,
        stdev_ms: stdev,
    })
}
