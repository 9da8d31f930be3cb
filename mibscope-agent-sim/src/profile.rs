//! Per-service load profiles.
//!
//! Every simulated agent answers the same enterprise OIDs; what differs is
//! how much synthetic load it adds on top of the host readings and how its
//! request counter grows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    WebServer,
    DbService,
    AuthService,
    LoadBalancer,
    CacheService,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::WebServer,
        ServiceKind::DbService,
        ServiceKind::AuthService,
        ServiceKind::LoadBalancer,
        ServiceKind::CacheService,
    ];

    pub fn profile(self) -> &'static ServiceProfile {
        match self {
            ServiceKind::WebServer => &WEB_SERVER,
            ServiceKind::DbService => &DB_SERVICE,
            ServiceKind::AuthService => &AUTH_SERVICE,
            ServiceKind::LoadBalancer => &LOAD_BALANCER,
            ServiceKind::CacheService => &CACHE_SERVICE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::WebServer => "web-server",
            ServiceKind::DbService => "db-service",
            ServiceKind::AuthService => "auth-service",
            ServiceKind::LoadBalancer => "load-balancer",
            ServiceKind::CacheService => "cache-service",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How `requestsProcessed` advances on each read.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestCounter {
    /// Random step per read.
    Step(RangeInclusive<u64>),
    /// Mirrors the number of protocol requests served.
    Requests,
    /// One cache operation per read.
    CacheOps,
}

/// Value of `activeServices`.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveServices {
    Fixed(i64),
    /// Backend pool that occasionally loses or recovers a member.
    Backends { pool: i64, initial: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceProfile {
    pub display_name: &'static str,
    pub cpu_load: Option<RangeInclusive<f64>>,
    pub memory_mb: Option<RangeInclusive<f64>>,
    pub network_in_kb: Option<RangeInclusive<i64>>,
    pub network_out_kb: Option<RangeInclusive<i64>>,
    pub base_latency_ms: f64,
    pub latency_jitter_ms: RangeInclusive<f64>,
    pub requests: RequestCounter,
    pub if_number: i64,
    pub service_count: i64,
    pub active_services: ActiveServices,
}

static WEB_SERVER: ServiceProfile = ServiceProfile {
    display_name: "Web Server",
    cpu_load: Some(0.0..=20.0),
    memory_mb: Some(200.0..=800.0),
    network_in_kb: Some(50..=200),
    network_out_kb: Some(100..=400),
    base_latency_ms: 5.0,
    latency_jitter_ms: -1.0..=3.0,
    requests: RequestCounter::Step(1..=5),
    if_number: 2,
    service_count: 5,
    active_services: ActiveServices::Fixed(4),
};

static DB_SERVICE: ServiceProfile = ServiceProfile {
    display_name: "Database Service",
    cpu_load: Some(5.0..=15.0),
    memory_mb: Some(500.0..=1500.0),
    network_in_kb: Some(100..=500),
    network_out_kb: Some(50..=300),
    base_latency_ms: 15.0,
    latency_jitter_ms: -3.0..=10.0,
    requests: RequestCounter::Step(1..=10),
    if_number: 3,
    service_count: 4,
    active_services: ActiveServices::Fixed(3),
};

static AUTH_SERVICE: ServiceProfile = ServiceProfile {
    display_name: "Authentication Service",
    cpu_load: None,
    memory_mb: None,
    network_in_kb: None,
    network_out_kb: None,
    base_latency_ms: 8.0,
    latency_jitter_ms: -2.0..=5.0,
    requests: RequestCounter::Requests,
    if_number: 2,
    service_count: 3,
    active_services: ActiveServices::Fixed(2),
};

static LOAD_BALANCER: ServiceProfile = ServiceProfile {
    display_name: "Load Balancer",
    cpu_load: Some(2.0..=8.0),
    memory_mb: Some(100.0..=300.0),
    network_in_kb: Some(200..=600),
    network_out_kb: Some(150..=500),
    base_latency_ms: 3.0,
    latency_jitter_ms: -0.5..=2.0,
    requests: RequestCounter::Step(1..=8),
    if_number: 4,
    service_count: 5,
    active_services: ActiveServices::Backends { pool: 3, initial: 2 },
};

static CACHE_SERVICE: ServiceProfile = ServiceProfile {
    display_name: "Cache Service",
    cpu_load: Some(0.0..=5.0),
    memory_mb: Some(800.0..=2000.0),
    network_in_kb: Some(300..=800),
    network_out_kb: Some(200..=600),
    base_latency_ms: 1.0,
    latency_jitter_ms: -0.2..=0.5,
    requests: RequestCounter::CacheOps,
    if_number: 2,
    service_count: 5,
    active_services: ActiveServices::Fixed(5),
};
