use crate::config::AgentStatus;
use mibscope_core::{AgentAddress, ScalarValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AgentView {
    pub name: String,
    pub address: AgentAddress,
    pub status: AgentStatus,
}

#[derive(Debug, Deserialize)]
pub struct MetricQuery {
    #[serde(alias = "agentIp")]
    pub agent: Option<String>,
    pub oid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricReply {
    pub oid: String,
    pub value: ScalarValue,
    #[serde(rename = "type")]
    pub kind: String,
    pub agent: AgentAddress,
}

#[derive(Debug, Deserialize)]
pub struct SetRequest {
    #[serde(alias = "agentIp")]
    pub agent: Option<String>,
    pub oid: Option<String>,
    pub value: Option<ScalarValue>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetReply {
    pub status: String,
    pub message: String,
    pub oid: String,
    pub value: ScalarValue,
    pub agent: AgentAddress,
}

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    #[serde(alias = "agentIp")]
    pub agent: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Start,
    Stop,
    Restart,
}

impl ControlAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "start" => Some(ControlAction::Start),
            "stop" => Some(ControlAction::Stop),
            "restart" => Some(ControlAction::Restart),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::Stop => "stop",
            ControlAction::Restart => "restart",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ControlReply {
    pub status: String,
    pub message: String,
    pub agent: AgentAddress,
    pub action: ControlAction,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrapView {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    pub timestamp: String,
    pub agent: AgentAddress,
    pub oid: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServiceEntry {
    pub name: String,
    pub ip: String,
    pub status: AgentStatus,
    pub uptime: String,
    pub port: u16,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentSelection {
    #[serde(alias = "agentIp")]
    pub agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MibSearch {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionView {
    pub id: uuid::Uuid,
    pub agent: AgentAddress,
    pub epoch: u64,
}

/// Dashboard cards, read from the session's cached tree.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub cpu_usage: Option<ScalarValue>,
    pub memory_usage: Option<ScalarValue>,
    pub latency: Option<ScalarValue>,
    pub total_errors: Option<ScalarValue>,
    pub log_level: Option<ScalarValue>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub time: String,
    pub cpu_usage: f64,
    pub latency: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FetchReply {
    pub oid: String,
    pub outcome: String,
    pub value: Option<ScalarValue>,
}
