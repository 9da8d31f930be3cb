//! Agent/metric gateway contract.
//!
//! The core never sees the transport behind an agent: it only asks a
//! [`MetricGateway`] for the value of one OID on one agent, and merges
//! successful answers into the tree.

use crate::oid::Oid;
use crate::value::ScalarValue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a managed agent (an IP in the mocked deployment).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentAddress(String);

impl AgentAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentAddress {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("OID {oid} not found on agent {agent}")]
    NotFound { agent: AgentAddress, oid: Oid },
    #[error("agent {agent} unreachable: {reason}")]
    Unreachable { agent: AgentAddress, reason: String },
    #[error("OID {oid} is read-only")]
    ReadOnly { oid: Oid },
    #[error("value '{value}' rejected for OID {oid}")]
    InvalidValue { oid: Oid, value: ScalarValue },
}

#[async_trait]
pub trait MetricGateway: Send + Sync {
    async fn fetch(&self, agent: &AgentAddress, oid: &Oid) -> Result<ScalarValue, GatewayError>;

    async fn set(
        &self,
        agent: &AgentAddress,
        oid: &Oid,
        value: ScalarValue,
    ) -> Result<(), GatewayError>;
}
