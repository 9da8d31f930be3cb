//! A simulated agent answering the enterprise OIDs for one service.

use crate::host::{HostProbe, HostSample, SysinfoProbe};
use crate::profile::{ActiveServices, RequestCounter, ServiceKind, ServiceProfile};
use mibscope_core::{Oid, ScalarValue};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Arcs of the private enterprise subtree every agent serves.
pub const ENTERPRISE_ARCS: [u32; 7] = [1, 3, 6, 1, 4, 1, 9999];

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SimError {
    #[error("no such instance: {0}")]
    NoSuchInstance(Oid),
    #[error("OID {0} is read-only")]
    ReadOnly(Oid),
    #[error("invalid value '{value}' for OID {oid}")]
    InvalidValue { oid: Oid, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnterpriseObject {
    SysName,
    SysStatus,
    CpuUsage,
    MemoryUsage,
    AvgLatency,
    TotalErrors,
    LogLevel,
    Uptime,
    RequestsProcessed,
    NetworkInBytes,
    NetworkOutBytes,
    IfNumber,
    ServiceCount,
    ActiveServices,
}

impl EnterpriseObject {
    pub const ALL: [EnterpriseObject; 14] = [
        EnterpriseObject::SysName,
        EnterpriseObject::SysStatus,
        EnterpriseObject::CpuUsage,
        EnterpriseObject::MemoryUsage,
        EnterpriseObject::AvgLatency,
        EnterpriseObject::TotalErrors,
        EnterpriseObject::LogLevel,
        EnterpriseObject::Uptime,
        EnterpriseObject::RequestsProcessed,
        EnterpriseObject::NetworkInBytes,
        EnterpriseObject::NetworkOutBytes,
        EnterpriseObject::IfNumber,
        EnterpriseObject::ServiceCount,
        EnterpriseObject::ActiveServices,
    ];

    fn suffix(self) -> [u32; 3] {
        match self {
            EnterpriseObject::SysName => [1, 1, 0],
            EnterpriseObject::SysStatus => [1, 2, 0],
            EnterpriseObject::CpuUsage => [1, 3, 0],
            EnterpriseObject::MemoryUsage => [1, 4, 0],
            EnterpriseObject::AvgLatency => [1, 5, 0],
            EnterpriseObject::TotalErrors => [1, 6, 0],
            EnterpriseObject::LogLevel => [1, 7, 0],
            EnterpriseObject::Uptime => [1, 8, 0],
            EnterpriseObject::RequestsProcessed => [1, 9, 0],
            EnterpriseObject::NetworkInBytes => [1, 10, 0],
            EnterpriseObject::NetworkOutBytes => [1, 11, 0],
            EnterpriseObject::IfNumber => [2, 1, 0],
            EnterpriseObject::ServiceCount => [3, 1, 0],
            EnterpriseObject::ActiveServices => [3, 2, 0],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EnterpriseObject::SysName => "sysName",
            EnterpriseObject::SysStatus => "sysStatus",
            EnterpriseObject::CpuUsage => "cpuUsage",
            EnterpriseObject::MemoryUsage => "memoryUsage",
            EnterpriseObject::AvgLatency => "avgLatency",
            EnterpriseObject::TotalErrors => "totalErrors",
            EnterpriseObject::LogLevel => "logLevel",
            EnterpriseObject::Uptime => "uptime",
            EnterpriseObject::RequestsProcessed => "requestsProcessed",
            EnterpriseObject::NetworkInBytes => "networkInBytes",
            EnterpriseObject::NetworkOutBytes => "networkOutBytes",
            EnterpriseObject::IfNumber => "ifNumber",
            EnterpriseObject::ServiceCount => "serviceCount",
            EnterpriseObject::ActiveServices => "activeServices",
        }
    }

    pub fn oid(self) -> Oid {
        let mut arcs = ENTERPRISE_ARCS.to_vec();
        arcs.extend_from_slice(&self.suffix());
        Oid::new(arcs)
    }

    pub fn from_oid(oid: &Oid) -> Option<Self> {
        let suffix = oid.arcs().strip_prefix(&ENTERPRISE_ARCS[..])?;
        Self::ALL.into_iter().find(|obj| obj.suffix() == suffix)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|obj| obj.name() == name)
    }

    pub fn is_writable(self) -> bool {
        self == EnterpriseObject::LogLevel
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(()),
        }
    }
}

/// `"{days}d {hours}h {minutes}m"`.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    format!("{days}d {hours}h {minutes}m")
}

fn initial_active(kind: ServiceKind) -> i64 {
    match kind.profile().active_services {
        ActiveServices::Backends { initial, .. } => initial,
        ActiveServices::Fixed(n) => n,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub struct SimulatedAgent {
    kind: ServiceKind,
    started: Instant,
    request_count: u64,
    error_count: u64,
    log_level: LogLevel,
    requests_processed: u64,
    cache_hits: u64,
    cache_misses: u64,
    active_backends: i64,
    probe: Box<dyn HostProbe>,
    rng: StdRng,
}

impl fmt::Debug for SimulatedAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedAgent")
            .field("kind", &self.kind)
            .field("request_count", &self.request_count)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

impl SimulatedAgent {
    /// Agent backed by live host readings.
    pub fn new(kind: ServiceKind) -> Self {
        Self::build(kind, Box::new(SysinfoProbe::new()), StdRng::from_entropy())
    }

    /// Agent with a given probe and a seeded random source.
    pub fn with_probe(kind: ServiceKind, probe: impl HostProbe + 'static, seed: u64) -> Self {
        Self::build(kind, Box::new(probe), StdRng::seed_from_u64(seed))
    }

    fn build(kind: ServiceKind, probe: Box<dyn HostProbe>, rng: StdRng) -> Self {
        let active_backends = initial_active(kind);
        info!(service = %kind, "simulated agent started");
        Self {
            kind,
            started: Instant::now(),
            request_count: 0,
            error_count: 0,
            log_level: LogLevel::default(),
            requests_processed: 0,
            cache_hits: 0,
            cache_misses: 0,
            active_backends,
            probe,
            rng,
        }
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    fn profile(&self) -> &'static ServiceProfile {
        self.kind.profile()
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn uptime(&self) -> String {
        format_uptime(self.started.elapsed())
    }

    /// Cache hit ratio in percent, one decimal.
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            return 0.0;
        }
        round1(self.cache_hits as f64 / total as f64 * 100.0)
    }

    /// Restart: counters and start time go back to zero, log level to INFO.
    pub fn reset(&mut self) {
        info!(service = %self.kind, "simulated agent restarted");
        self.started = Instant::now();
        self.request_count = 0;
        self.error_count = 0;
        self.log_level = LogLevel::default();
        self.requests_processed = 0;
        self.cache_hits = 0;
        self.cache_misses = 0;
        self.active_backends = initial_active(self.kind);
    }

    pub fn get(&mut self, oid: &Oid) -> Result<ScalarValue, SimError> {
        self.request_count += 1;
        let Some(object) = EnterpriseObject::from_oid(oid) else {
            self.error_count += 1;
            return Err(SimError::NoSuchInstance(oid.clone()));
        };
        let value = self.read(object);
        debug!(service = %self.kind, %oid, %value, "get");
        Ok(value)
    }

    /// Rejected requests count towards `totalErrors`.
    pub fn set(&mut self, oid: &Oid, value: &ScalarValue) -> Result<(), SimError> {
        self.request_count += 1;
        let result = self.write(oid, value);
        if result.is_err() {
            self.error_count += 1;
        }
        result
    }

    fn write(&mut self, oid: &Oid, value: &ScalarValue) -> Result<(), SimError> {
        let object =
            EnterpriseObject::from_oid(oid).ok_or_else(|| SimError::NoSuchInstance(oid.clone()))?;
        if !object.is_writable() {
            return Err(SimError::ReadOnly(oid.clone()));
        }
        let level = value
            .as_str()
            .and_then(|text| text.parse::<LogLevel>().ok())
            .ok_or_else(|| SimError::InvalidValue {
                oid: oid.clone(),
                value: value.to_string(),
            })?;
        self.log_level = level;
        info!(service = %self.kind, level = %level, "log level changed");
        Ok(())
    }

    fn read(&mut self, object: EnterpriseObject) -> ScalarValue {
        let profile = self.profile();
        match object {
            EnterpriseObject::SysName => profile.display_name.into(),
            EnterpriseObject::SysStatus => "UP".into(),
            EnterpriseObject::CpuUsage => {
                let host = self.probe.sample();
                let extra = self.sample_f64(profile.cpu_load.clone());
                ScalarValue::Float(round1((host.cpu_percent + extra).min(100.0)))
            }
            EnterpriseObject::MemoryUsage => {
                let host = self.probe.sample();
                let extra = self.sample_f64(profile.memory_mb.clone());
                ScalarValue::Float(round1(host.used_memory_mb + extra))
            }
            EnterpriseObject::AvgLatency => {
                let jitter = self.rng.gen_range(profile.latency_jitter_ms.clone());
                ScalarValue::Float(round1(profile.base_latency_ms + jitter))
            }
            EnterpriseObject::TotalErrors => ScalarValue::Integer(self.error_count as i64),
            EnterpriseObject::LogLevel => self.log_level.as_str().into(),
            EnterpriseObject::Uptime => self.uptime().into(),
            EnterpriseObject::RequestsProcessed => self.advance_requests(),
            EnterpriseObject::NetworkInBytes => {
                let HostSample { received_kb, .. } = self.probe.sample();
                ScalarValue::Integer(received_kb + self.sample_i64(profile.network_in_kb.clone()))
            }
            EnterpriseObject::NetworkOutBytes => {
                let HostSample { transmitted_kb, .. } = self.probe.sample();
                ScalarValue::Integer(
                    transmitted_kb + self.sample_i64(profile.network_out_kb.clone()),
                )
            }
            EnterpriseObject::IfNumber => ScalarValue::Integer(profile.if_number),
            EnterpriseObject::ServiceCount => ScalarValue::Integer(profile.service_count),
            EnterpriseObject::ActiveServices => ScalarValue::Integer(self.active_services()),
        }
    }

    fn sample_f64(&mut self, range: Option<std::ops::RangeInclusive<f64>>) -> f64 {
        range.map_or(0.0, |r| self.rng.gen_range(r))
    }

    fn sample_i64(&mut self, range: Option<std::ops::RangeInclusive<i64>>) -> i64 {
        range.map_or(0, |r| self.rng.gen_range(r))
    }

    fn advance_requests(&mut self) -> ScalarValue {
        match self.profile().requests.clone() {
            RequestCounter::Step(step) => {
                self.requests_processed += self.rng.gen_range(step);
                ScalarValue::Integer(self.requests_processed as i64)
            }
            RequestCounter::Requests => ScalarValue::Integer(self.request_count as i64),
            RequestCounter::CacheOps => {
                if self.rng.gen_bool(0.8) {
                    self.cache_hits += 1;
                } else {
                    self.cache_misses += 1;
                }
                ScalarValue::Integer((self.cache_hits + self.cache_misses) as i64)
            }
        }
    }

    fn active_services(&mut self) -> i64 {
        if let ActiveServices::Backends { pool, .. } = self.profile().active_services {
            if self.rng.gen_bool(0.05) {
                self.active_backends = (self.active_backends - 1).max(1);
            } else if self.rng.gen_bool(0.02) {
                self.active_backends = (self.active_backends + 1).min(pool);
            }
        }
        self.active_backends
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FixedProbe;

    fn host() -> FixedProbe {
        FixedProbe(HostSample {
            cpu_percent: 95.0,
            used_memory_mb: 1000.0,
            received_kb: 100,
            transmitted_kb: 200,
        })
    }

    fn agent(kind: ServiceKind) -> SimulatedAgent {
        SimulatedAgent::with_probe(kind, host(), 7)
    }

    fn get(agent: &mut SimulatedAgent, object: EnterpriseObject) -> ScalarValue {
        agent.get(&object.oid()).unwrap()
    }

    #[test]
    fn test_object_oids_round_trip() {
        for object in EnterpriseObject::ALL {
            assert_eq!(EnterpriseObject::from_oid(&object.oid()), Some(object));
            assert_eq!(EnterpriseObject::from_name(object.name()), Some(object));
        }
        assert_eq!(
            EnterpriseObject::CpuUsage.oid().to_text(),
            "1.3.6.1.4.1.9999.1.3.0"
        );
        assert_eq!(EnterpriseObject::from_oid(&Oid::parse("1.3.6.1.4.1.9999.1").unwrap()), None);
        assert_eq!(EnterpriseObject::from_oid(&Oid::parse("1.3.6.1.4.1.8888.1.3.0").unwrap()), None);
    }

    #[test]
    fn test_static_values() {
        let mut web = agent(ServiceKind::WebServer);
        assert_eq!(get(&mut web, EnterpriseObject::SysName), ScalarValue::from("Web Server"));
        assert_eq!(get(&mut web, EnterpriseObject::SysStatus), ScalarValue::from("UP"));
        assert_eq!(get(&mut web, EnterpriseObject::IfNumber), ScalarValue::Integer(2));
        assert_eq!(get(&mut web, EnterpriseObject::ServiceCount), ScalarValue::Integer(5));
        assert_eq!(get(&mut web, EnterpriseObject::ActiveServices), ScalarValue::Integer(4));
        assert_eq!(get(&mut web, EnterpriseObject::LogLevel), ScalarValue::from("INFO"));

        let mut db = agent(ServiceKind::DbService);
        assert_eq!(get(&mut db, EnterpriseObject::IfNumber), ScalarValue::Integer(3));
        assert_eq!(get(&mut db, EnterpriseObject::ServiceCount), ScalarValue::Integer(4));
    }

    #[test]
    fn test_cpu_is_capped_and_rounded() {
        let mut web = agent(ServiceKind::WebServer);
        for _ in 0..50 {
            let cpu = get(&mut web, EnterpriseObject::CpuUsage).as_f64().unwrap();
            assert!((95.0..=100.0).contains(&cpu), "cpu {cpu}");
            assert_eq!(round1(cpu), cpu);
        }
    }

    #[test]
    fn test_auth_service_reports_plain_host_load() {
        let mut auth = agent(ServiceKind::AuthService);
        assert_eq!(get(&mut auth, EnterpriseObject::CpuUsage), ScalarValue::Float(95.0));
        assert_eq!(get(&mut auth, EnterpriseObject::MemoryUsage), ScalarValue::Float(1000.0));
        assert_eq!(get(&mut auth, EnterpriseObject::NetworkInBytes), ScalarValue::Integer(100));
    }

    #[test]
    fn test_latency_within_profile() {
        let mut db = agent(ServiceKind::DbService);
        for _ in 0..50 {
            let latency = get(&mut db, EnterpriseObject::AvgLatency).as_f64().unwrap();
            assert!((12.0..=25.0).contains(&latency), "latency {latency}");
        }
    }

    #[test]
    fn test_requests_processed_is_monotonic() {
        for kind in ServiceKind::ALL {
            let mut sim = agent(kind);
            let mut last = 0;
            for _ in 0..20 {
                let ScalarValue::Integer(n) = get(&mut sim, EnterpriseObject::RequestsProcessed)
                else {
                    panic!("requestsProcessed must be an integer");
                };
                assert!(n > last, "{kind}: {n} after {last}");
                last = n;
            }
        }
    }

    #[test]
    fn test_load_balancer_backends_stay_in_pool() {
        let mut lb = agent(ServiceKind::LoadBalancer);
        for _ in 0..500 {
            let ScalarValue::Integer(n) = get(&mut lb, EnterpriseObject::ActiveServices) else {
                panic!("activeServices must be an integer");
            };
            assert!((1..=3).contains(&n));
        }
    }

    #[test]
    fn test_cache_hit_rate() {
        let mut cache = agent(ServiceKind::CacheService);
        assert_eq!(cache.cache_hit_rate(), 0.0);
        for _ in 0..200 {
            get(&mut cache, EnterpriseObject::RequestsProcessed);
        }
        let rate = cache.cache_hit_rate();
        assert!(rate > 50.0 && rate <= 100.0, "rate {rate}");
    }

    #[test]
    fn test_unknown_oid() {
        let mut web = agent(ServiceKind::WebServer);
        let oid = Oid::parse("9.9.9.9").unwrap();
        assert_eq!(web.get(&oid), Err(SimError::NoSuchInstance(oid)));
    }

    #[test]
    fn test_set_log_level() {
        let mut web = agent(ServiceKind::WebServer);
        let oid = EnterpriseObject::LogLevel.oid();
        web.set(&oid, &ScalarValue::from("DEBUG")).unwrap();
        assert_eq!(web.log_level(), LogLevel::Debug);
        assert_eq!(web.get(&oid).unwrap(), ScalarValue::from("DEBUG"));
    }

    #[test]
    fn test_set_rejections() {
        let mut web = agent(ServiceKind::WebServer);
        let level = EnterpriseObject::LogLevel.oid();
        assert_eq!(
            web.set(&level, &ScalarValue::from("TRACE")),
            Err(SimError::InvalidValue { oid: level.clone(), value: "TRACE".into() })
        );
        assert!(matches!(
            web.set(&level, &ScalarValue::Integer(1)),
            Err(SimError::InvalidValue { .. })
        ));

        let cpu = EnterpriseObject::CpuUsage.oid();
        assert_eq!(web.set(&cpu, &ScalarValue::Integer(5)), Err(SimError::ReadOnly(cpu)));
        assert_eq!(web.log_level(), LogLevel::Info);
        assert_eq!(get(&mut web, EnterpriseObject::TotalErrors), ScalarValue::Integer(3));
    }

    #[test]
    fn test_reset_clears_counters() {
        let mut auth = agent(ServiceKind::AuthService);
        auth.set(&EnterpriseObject::LogLevel.oid(), &ScalarValue::from("ERROR")).unwrap();
        get(&mut auth, EnterpriseObject::SysName);
        assert_eq!(auth.request_count(), 2);

        auth.reset();
        assert_eq!(auth.request_count(), 0);
        assert_eq!(auth.log_level(), LogLevel::Info);
        assert_eq!(auth.uptime(), "0d 0h 0m");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 0h 0m");
        assert_eq!(format_uptime(Duration::from_secs(59)), "0d 0h 0m");
        assert_eq!(format_uptime(Duration::from_secs(3_660)), "0d 1h 1m");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86_400 + 5 * 3_600 + 7 * 60 + 30)),
            "2d 5h 7m"
        );
    }
}
