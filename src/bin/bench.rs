//! commbench: measures round-trip latency of the three bindings.

use clap::Parser;
use commbench::bench::{BenchmarkPlan, HttpProbe, Probe, RpcProbe, SocketProbe};
use commbench::logging;

#[derive(Parser, Debug)]
#[command(name = "commbench")]
#[command(version)]
#[command(about = "Compare round-trip latency of the socket, HTTP and RPC bindings", long_about = None)]
struct Args {
    /// Round trips per binding
    #[arg(short = 'n', long, default_value_t = 50)]
    iterations: usize,
}

const SOCKET_TARGET: &str = "127.0.0.1:8080";
const HTTP_TARGET: &str = "http://127.0.0.1:5000";
const RPC_TARGET: &str = "127.0.0.1:50051";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init("warn");

    println!("Synchronous Communication Patterns - Performance Benchmark");
    println!("{}", "=".repeat(60));
    println!("\nTargets:");
    println!("  Socket: {SOCKET_TARGET}");
    println!("  HTTP:   {HTTP_TARGET}");
    println!("  RPC:    {RPC_TARGET}");

    let mut probes: Vec<Box<dyn Probe>> = vec![
        Box::new(SocketProbe::new(SOCKET_TARGET)),
        Box::new(HttpProbe::new(HTTP_TARGET)),
        Box::new(RpcProbe::new(RPC_TARGET)),
    ];

    let plan = BenchmarkPlan::new(args.iterations);
    let mut stdout = std::io::stdout().lock();
    plan.run(&mut probes, &mut stdout).await?;

    Ok(())
}
