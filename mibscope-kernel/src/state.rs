use crate::agents::SharedAgentRegistry;
use crate::config::KernelConfig;
use crate::health::HealthTracker;
use crate::sessions::SessionManager;
use crate::traps::TrapLog;
use mibscope_core::MibTree;
use parking_lot::Mutex;
use std::sync::Arc;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Everything the HTTP handlers reach.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<KernelConfig>,
    pub registry: SharedAgentRegistry,
    pub sessions: SessionManager,
    pub traps: Shared<TrapLog>,
    pub health: HealthTracker,
}

impl AppState {
    pub fn new(
        cfg: KernelConfig,
        registry: SharedAgentRegistry,
        definition: MibTree,
        traps: TrapLog,
    ) -> Self {
        let health = HealthTracker::new();
        let sessions = SessionManager::new(
            registry.clone(),
            definition,
            cfg.refresh_interval(),
            cfg.chart_window,
            cfg.session_idle_ttl(),
            health.clone(),
        );
        Self {
            cfg: Arc::new(cfg),
            registry,
            sessions,
            traps: new_state(traps),
            health,
        }
    }
}
