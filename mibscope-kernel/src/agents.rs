//! Mock agent registry.
//!
//! Holds the managed agents with their UP/DOWN state and answers gateway
//! requests through each agent's simulated service. A DOWN or unknown agent
//! is unreachable.

use crate::config::{AgentConf, AgentStatus, KernelConfig, LatencyConf};
use crate::models::{AgentView, ControlAction};
use async_trait::async_trait;
use mibscope_agent_sim::{SimError, SimulatedAgent};
use mibscope_core::{AgentAddress, GatewayError, MetricGateway, Oid, ScalarValue};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ControlError {
    #[error("unknown agent {0}")]
    UnknownAgent(AgentAddress),
}

pub struct AgentEntry {
    pub name: String,
    pub status: AgentStatus,
    sim: Arc<Mutex<SimulatedAgent>>,
}

pub type AgentsMap = BTreeMap<AgentAddress, AgentEntry>;

pub struct AgentRegistry {
    agents: RwLock<AgentsMap>,
    latency: LatencyConf,
    control_delay: Duration,
}

pub type SharedAgentRegistry = Arc<AgentRegistry>;

impl AgentRegistry {
    pub fn new(latency: LatencyConf, control_delay: Duration) -> Self {
        Self {
            agents: RwLock::new(BTreeMap::new()),
            latency,
            control_delay,
        }
    }

    /// Registry populated from the configured agents, each backed by a
    /// simulated service reading live host load.
    pub fn from_config(cfg: &KernelConfig) -> Self {
        let agents = cfg
            .agents
            .iter()
            .map(|conf| {
                let sim = SimulatedAgent::new(conf.service);
                (conf.address.clone(), AgentEntry::from_conf(conf, sim))
            })
            .collect();
        Self {
            agents: RwLock::new(agents),
            latency: cfg.latency.clone(),
            control_delay: cfg.control_delay(),
        }
    }

    pub async fn insert(&self, conf: &AgentConf, sim: SimulatedAgent) {
        self.agents
            .write()
            .await
            .insert(conf.address.clone(), AgentEntry::from_conf(conf, sim));
    }

    pub async fn list_agents(&self) -> Vec<AgentView> {
        self.agents
            .read()
            .await
            .iter()
            .map(|(address, entry)| AgentView {
                name: entry.name.clone(),
                address: address.clone(),
                status: entry.status,
            })
            .collect()
    }

    pub async fn contains(&self, agent: &AgentAddress) -> bool {
        self.agents.read().await.contains_key(agent)
    }

    pub async fn status(&self, agent: &AgentAddress) -> Option<AgentStatus> {
        self.agents.read().await.get(agent).map(|e| e.status)
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Start, stop or restart the service behind `agent` after the
    /// configured control delay.
    pub async fn control(
        &self,
        agent: &AgentAddress,
        action: ControlAction,
    ) -> Result<AgentStatus, ControlError> {
        if !self.contains(agent).await {
            return Err(ControlError::UnknownAgent(agent.clone()));
        }
        tokio::time::sleep(self.control_delay).await;

        let mut agents = self.agents.write().await;
        let entry = agents
            .get_mut(agent)
            .ok_or_else(|| ControlError::UnknownAgent(agent.clone()))?;
        entry.status = match action {
            ControlAction::Stop => AgentStatus::Down,
            ControlAction::Start => AgentStatus::Up,
            ControlAction::Restart => {
                entry.sim.lock().reset();
                AgentStatus::Up
            }
        };
        info!(%agent, action = action.as_str(), status = ?entry.status, "service control applied");
        Ok(entry.status)
    }

    /// Simulated service of a reachable agent.
    async fn reachable(&self, agent: &AgentAddress) -> Result<Arc<Mutex<SimulatedAgent>>, GatewayError> {
        let agents = self.agents.read().await;
        match agents.get(agent) {
            Some(entry) if entry.status == AgentStatus::Up => Ok(Arc::clone(&entry.sim)),
            Some(_) => Err(GatewayError::Unreachable {
                agent: agent.clone(),
                reason: "agent is down".into(),
            }),
            None => Err(GatewayError::Unreachable {
                agent: agent.clone(),
                reason: "unknown agent".into(),
            }),
        }
    }
}

impl AgentEntry {
    fn from_conf(conf: &AgentConf, sim: SimulatedAgent) -> Self {
        Self {
            name: conf.name.clone(),
            status: conf.status,
            sim: Arc::new(Mutex::new(sim)),
        }
    }
}

fn gateway_error(agent: &AgentAddress, err: SimError, value: Option<&ScalarValue>) -> GatewayError {
    match err {
        SimError::NoSuchInstance(oid) => GatewayError::NotFound {
            agent: agent.clone(),
            oid,
        },
        SimError::ReadOnly(oid) => GatewayError::ReadOnly { oid },
        SimError::InvalidValue { oid, value: raw } => GatewayError::InvalidValue {
            oid,
            value: value.cloned().unwrap_or(ScalarValue::Text(raw)),
        },
    }
}

#[async_trait]
impl MetricGateway for AgentRegistry {
    async fn fetch(&self, agent: &AgentAddress, oid: &Oid) -> Result<ScalarValue, GatewayError> {
        tokio::time::sleep(Duration::from_millis(self.latency.get_ms)).await;
        let sim = self.reachable(agent).await?;
        let result = sim.lock().get(oid);
        debug!(%agent, %oid, ok = result.is_ok(), "fetch");
        result.map_err(|e| gateway_error(agent, e, None))
    }

    async fn set(
        &self,
        agent: &AgentAddress,
        oid: &Oid,
        value: ScalarValue,
    ) -> Result<(), GatewayError> {
        tokio::time::sleep(Duration::from_millis(self.latency.set_ms)).await;
        let sim = self.reachable(agent).await?;
        let result = sim.lock().set(oid, &value);
        debug!(%agent, %oid, %value, ok = result.is_ok(), "set");
        result.map_err(|e| gateway_error(agent, e, Some(&value)))
    }
}
