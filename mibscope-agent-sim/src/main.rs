//! Mibscope simulated agent
//!
//! Serves one service's enterprise OIDs over the pass-through line protocol:
//! requests on stdin, one reply per line on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use mibscope_agent_sim::protocol::{handle_line, read_metric};
use mibscope_agent_sim::{ServiceKind, SimulatedAgent};
use std::io::{self, BufRead, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mibscope-agent-sim", about = "Simulated enterprise SNMP agent")]
struct Cli {
    /// Service this agent impersonates
    #[arg(long, value_enum, default_value_t = ServiceKind::WebServer)]
    service: ServiceKind,

    /// Print one metric by name (e.g. cpuUsage) and exit
    #[arg(long)]
    metric: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut agent = SimulatedAgent::new(cli.service);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(name) = cli.metric {
        writeln!(out, "{}", read_metric(&mut agent, &name)).context("Failed to write reply")?;
        return Ok(());
    }

    info!(service = %cli.service, "agent ready on stdin");
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read request")?;
        if let Some(reply) = handle_line(&mut agent, &line) {
            writeln!(out, "{reply}").context("Failed to write reply")?;
            out.flush().context("Failed to flush stdout")?;
        }
    }
    Ok(())
}
