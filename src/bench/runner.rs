//! Sequential measurement of each binding.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use tracing::debug;

use super::probe::Probe;
use super::report;
use super::stats::{summarize, LatencySample, Summary};

/// All samples collected for one binding.
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub name: String,
    pub samples: Vec<LatencySample>,
}

impl BenchmarkRun {
    pub fn summary(&self) -> Option<Summary> {
        summarize(&self.samples)
    }

    pub fn errors(&self) -> usize {
        self.samples.iter().filter(|s| !s.is_success()).count()
    }
}

/// How many calls to make per binding and how long to rest in between.
#[derive(Debug, Clone)]
pub struct BenchmarkPlan {
    pub iterations: usize,
    pub pause: Duration,
    /// A progress line is printed every this many calls
    pub progress_every: usize,
}

impl Default for BenchmarkPlan {
    fn default() -> Self {
        Self {
            iterations: 50,
            pause: Duration::from_secs(1),
            progress_every: 10,
        }
    }
}

impl BenchmarkPlan {
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations,
            ..Self::default()
        }
    }

    /// Measure one binding. Calls never overlap and failures never abort
    /// the run.
    pub async fn measure<W: Write>(
        &self,
        probe: &mut dyn Probe,
        out: &mut W,
    ) -> io::Result<BenchmarkRun> {
        let name = probe.name().to_string();
        writeln!(
            out,
            "{}",
            report::banner(&format!(
                "{name} Performance Test ({} iterations)",
                self.iterations
            ))
        )?;

        let mut samples = Vec::with_capacity(self.iterations);
        let mut errors = 0;

        for index in 0..self.iterations {
            let start = Instant::now();
            let result = probe.call().await;
            let elapsed = start.elapsed();

            match result {
                Ok(()) => {
                    samples.push(LatencySample::success(index, elapsed));
                    if self.progress_every > 0 && (index + 1) % self.progress_every == 0 {
                        writeln!(out, "Completed: {}/{}", index + 1, self.iterations)?;
                    }
                }
                Err(e) => {
                    errors += 1;
                    debug!(binding = %name, call = index, error = %e, "Round trip failed");
                    writeln!(out, "Error #{errors}: {e}")?;
                    samples.push(LatencySample::failure(index, elapsed, e.to_string()));
                }
            }
        }

        let run = BenchmarkRun { name, samples };
        writeln!(
            out,
            "{}",
            report::format_summary(&run.name, run.summary().as_ref(), errors)
        )?;
        Ok(run)
    }

    /// Measure every probe in order, then print the ranking.
    pub async fn run<W: Write>(
        &self,
        probes: &mut [Box<dyn Probe>],
        out: &mut W,
    ) -> io::Result<Vec<BenchmarkRun>> {
        let mut runs = Vec::with_capacity(probes.len());

        for (i, probe) in probes.iter_mut().enumerate() {
            if i > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            runs.push(self.measure(probe.as_mut(), out).await?);
        }

        writeln!(out, "{}", report::format_ranking(&report::rank(&runs)))?;
        Ok(runs)
    }
}
