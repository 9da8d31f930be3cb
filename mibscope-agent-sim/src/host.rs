//! Host load readings the simulated agents build on.

use serde::Serialize;
use sysinfo::{Networks, System};
use tracing::debug;

/// One snapshot of host load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HostSample {
    pub cpu_percent: f64,
    pub used_memory_mb: f64,
    pub received_kb: i64,
    pub transmitted_kb: i64,
}

pub trait HostProbe: Send {
    fn sample(&mut self) -> HostSample;
}

/// Live readings from the machine running the agent.
pub struct SysinfoProbe {
    sys: System,
    networks: Networks,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let mut sys = System::new();
        // CPU usage is a delta between two refreshes; prime the first one.
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        Self {
            sys,
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SysinfoProbe {
    fn sample(&mut self) -> HostSample {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.networks.refresh();

        let (received, transmitted) = self
            .networks
            .iter()
            .fold((0u64, 0u64), |(rx, tx), (_, data)| {
                (rx + data.total_received(), tx + data.total_transmitted())
            });

        let sample = HostSample {
            cpu_percent: f64::from(self.sys.global_cpu_info().cpu_usage()),
            used_memory_mb: self.sys.used_memory() as f64 / (1024.0 * 1024.0),
            received_kb: (received / 1024) as i64,
            transmitted_kb: (transmitted / 1024) as i64,
        };
        debug!(cpu = sample.cpu_percent, mem_mb = sample.used_memory_mb, "host sampled");
        sample
    }
}

/// Constant readings, for deterministic agents.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedProbe(pub HostSample);

impl HostProbe for FixedProbe {
    fn sample(&mut self) -> HostSample {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysinfo_probe_reports_plausible_values() {
        let mut probe = SysinfoProbe::new();
        let sample = probe.sample();
        assert!(sample.cpu_percent >= 0.0);
        assert!(sample.used_memory_mb >= 0.0);
        assert!(sample.received_kb >= 0);
    }

    #[test]
    fn test_fixed_probe() {
        let reading = HostSample {
            cpu_percent: 12.5,
            used_memory_mb: 1024.0,
            received_kb: 10,
            transmitted_kb: 20,
        };
        let mut probe = FixedProbe(reading);
        assert_eq!(probe.sample(), reading);
        assert_eq!(probe.sample(), reading);
    }
}
