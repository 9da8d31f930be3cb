/*!
Scripted metric gateway

Stands in for real agents in tests. Answers are queued per (agent, OID) and
served in order, each after its own delay; once a queue is empty the gateway
falls back to a per-OID default, then to `NotFound`. Every call is recorded.
*/

use async_trait::async_trait;
use mibscope_core::{AgentAddress, GatewayError, MetricGateway, Oid, ScalarValue};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Fetch { agent: AgentAddress, oid: Oid },
    Set { agent: AgentAddress, oid: Oid, value: ScalarValue },
}

#[derive(Debug)]
struct Reply {
    delay: Duration,
    result: Result<ScalarValue, GatewayError>,
}

#[derive(Default)]
struct Script {
    queued: HashMap<(AgentAddress, Oid), VecDeque<Reply>>,
    defaults: HashMap<Oid, ScalarValue>,
    calls: Vec<GatewayCall>,
}

#[derive(Clone, Default)]
pub struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
}

fn parse(oid: &str) -> Oid {
    crate::fixtures::oid(oid)
}

impl ScriptedGateway {
    pub fn new() -> Self {
        crate::init_logging();
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Value served for `oid` on any agent once its queue is empty.
    pub fn with_default(self, oid: &str, value: impl Into<ScalarValue>) -> Self {
        self.script().defaults.insert(parse(oid), value.into());
        self
    }

    /// Queue an immediate answer.
    pub fn respond(&self, agent: &str, oid: &str, result: Result<ScalarValue, GatewayError>) {
        self.respond_after(agent, oid, Duration::ZERO, result);
    }

    /// Queue an answer delivered after `delay`.
    pub fn respond_after(
        &self,
        agent: &str,
        oid: &str,
        delay: Duration,
        result: Result<ScalarValue, GatewayError>,
    ) {
        self.script()
            .queued
            .entry((AgentAddress::from(agent), parse(oid)))
            .or_default()
            .push_back(Reply { delay, result });
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.script().calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|c| matches!(c, GatewayCall::Fetch { .. }))
            .count()
    }

    /// Wait until at least `count` calls were made, or `timeout` elapses.
    pub async fn wait_for_calls(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            while self.script().calls.len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    fn next_reply(&self, agent: &AgentAddress, oid: &Oid) -> Reply {
        let mut script = self.script();
        let key = (agent.clone(), oid.clone());
        if let Some(reply) = script.queued.get_mut(&key).and_then(VecDeque::pop_front) {
            return reply;
        }
        let result = script
            .defaults
            .get(oid)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                agent: agent.clone(),
                oid: oid.clone(),
            });
        Reply {
            delay: Duration::ZERO,
            result,
        }
    }
}

async fn deliver(reply: Reply) -> Result<ScalarValue, GatewayError> {
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    reply.result
}

#[async_trait]
impl MetricGateway for ScriptedGateway {
    async fn fetch(&self, agent: &AgentAddress, oid: &Oid) -> Result<ScalarValue, GatewayError> {
        self.script().calls.push(GatewayCall::Fetch {
            agent: agent.clone(),
            oid: oid.clone(),
        });
        let reply = self.next_reply(agent, oid);
        log::info!("scripted fetch {oid} on {agent} (delay {:?})", reply.delay);
        deliver(reply).await
    }

    /// A queued answer decides the outcome; otherwise the write succeeds and
    /// becomes the OID's default.
    async fn set(
        &self,
        agent: &AgentAddress,
        oid: &Oid,
        value: ScalarValue,
    ) -> Result<(), GatewayError> {
        let queued = {
            let mut script = self.script();
            script.calls.push(GatewayCall::Set {
                agent: agent.clone(),
                oid: oid.clone(),
                value: value.clone(),
            });
            script
                .queued
                .get_mut(&(agent.clone(), oid.clone()))
                .and_then(VecDeque::pop_front)
        };
        log::info!("scripted set {oid} = {value} on {agent}");
        match queued {
            Some(reply) => deliver(reply).await.map(|_| ()),
            None => {
                self.script().defaults.insert(oid.clone(), value);
                Ok(())
            }
        }
    }
}
