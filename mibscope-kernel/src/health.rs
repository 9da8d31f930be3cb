use mibscope_core::ApplyOutcome;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize, Deserialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub agents_tracked: u32,
    pub sessions_active: u32,
    pub fetches_applied: u64,
    pub fetches_stale: u64,
    pub fetches_ignored: u64,
    pub fetches_failed: u64,
    pub memory_usage_mb: f32,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    applied: Arc<AtomicU64>,
    stale: Arc<AtomicU64>,
    ignored: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            applied: Arc::new(AtomicU64::new(0)),
            stale: Arc::new(AtomicU64::new(0)),
            ignored: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record(&self, outcome: &ApplyOutcome) {
        let counter = match outcome {
            ApplyOutcome::Applied => &self.applied,
            ApplyOutcome::Stale => &self.stale,
            ApplyOutcome::Ignored => &self.ignored,
            ApplyOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_health(&self, agents_tracked: usize, sessions_active: usize) -> KernelHealth {
        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            agents_tracked: agents_tracked as u32,
            sessions_active: sessions_active as u32,
            fetches_applied: self.applied.load(Ordering::Relaxed),
            fetches_stale: self.stale.load(Ordering::Relaxed),
            fetches_ignored: self.ignored.load(Ordering::Relaxed),
            fetches_failed: self.failed.load(Ordering::Relaxed),
            memory_usage_mb: get_memory_usage_mb(),
        }
    }
}

/// Resident set size from procfs; 0 where it is unavailable.
fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").unwrap_or_default();
        let rss_kb = status
            .lines()
            .find_map(|line| line.strip_prefix("VmRSS:"))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kb| kb.parse::<u64>().ok());
        if let Some(kb) = rss_kb {
            return kb as f32 / 1024.0;
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use mibscope_core::{AgentAddress, GatewayError};

    #[test]
    fn test_counters() {
        let tracker = HealthTracker::new();
        tracker.record(&ApplyOutcome::Applied);
        tracker.record(&ApplyOutcome::Applied);
        tracker.record(&ApplyOutcome::Stale);
        tracker.record(&ApplyOutcome::Ignored);
        tracker.record(&ApplyOutcome::Failed(GatewayError::Unreachable {
            agent: AgentAddress::from("192.168.1.12"),
            reason: "agent is down".into(),
        }));

        let health = tracker.clone().get_health(5, 2);
        assert_eq!(health.fetches_applied, 2);
        assert_eq!(health.fetches_stale, 1);
        assert_eq!(health.fetches_ignored, 1);
        assert_eq!(health.fetches_failed, 1);
        assert_eq!(health.agents_tracked, 5);
        assert_eq!(health.sessions_active, 2);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_memory_reading_on_linux() {
        assert!(get_memory_usage_mb() > 0.0);
    }
}
