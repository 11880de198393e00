//! Latency benchmark harness.
//!
//! Each binding is driven through N sequential round trips by a [`Probe`].
//! Failed calls are counted and skipped; statistics cover successful calls
//! only, and bindings with no successes are left out of the ranking.

mod probe;
mod report;
mod runner;
mod stats;

pub use probe::{HttpProbe, Probe, ProbeError, RpcProbe, SocketProbe, SOCKET_PAYLOAD};
pub use report::{format_ranking, format_summary, rank, RankEntry};
pub use runner::{BenchmarkPlan, BenchmarkRun};
pub use stats::{summarize, LatencySample, Summary};
