//! Trap log: alerts raised by agents, served from a trailing time window.

use crate::models::{Severity, TrapView};
use mibscope_core::{AgentAddress, Oid};
use std::collections::VecDeque;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use tracing::info;

const MAX_TRAPS: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct Trap {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    pub raised_at: OffsetDateTime,
    pub agent: AgentAddress,
    pub oid: Oid,
}

impl Trap {
    pub fn to_view(&self) -> TrapView {
        TrapView {
            id: self.id.clone(),
            message: self.message.clone(),
            severity: self.severity,
            timestamp: self.raised_at.format(&Rfc3339).unwrap_or_default(),
            agent: self.agent.clone(),
            oid: self.oid.to_text(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TrapLog {
    traps: VecDeque<Trap>,
    next_id: u64,
}

impl TrapLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log seeded with the alerts a freshly started deployment shows.
    pub fn seeded(now: OffsetDateTime) -> Self {
        let mut log = Self::new();
        let seeds = [
            (10, "Cache Service connection lost", Severity::High, "192.168.1.14", "1.3.6.1.4.1.9999.1.2.0"),
            (5, "Memory usage approaching threshold on Database Service (90%)", Severity::Medium, "192.168.1.11", "1.3.6.1.4.1.9999.1.4.0"),
            (2, "High CPU usage detected on Web Server (85%)", Severity::High, "192.168.1.12", "1.3.6.1.4.1.9999.1.3.0"),
        ];
        for (minutes_ago, message, severity, agent, oid) in seeds {
            if let Ok(oid) = Oid::parse(oid) {
                log.record(
                    now - Duration::minutes(minutes_ago),
                    message,
                    severity,
                    AgentAddress::from(agent),
                    oid,
                );
            }
        }
        log
    }

    pub fn record(
        &mut self,
        raised_at: OffsetDateTime,
        message: impl Into<String>,
        severity: Severity,
        agent: AgentAddress,
        oid: Oid,
    ) -> &Trap {
        self.next_id += 1;
        let trap = Trap {
            id: format!("trap-{:03}", self.next_id),
            message: message.into(),
            severity,
            raised_at,
            agent,
            oid,
        };
        info!(id = %trap.id, agent = %trap.agent, severity = ?trap.severity, "{}", trap.message);
        if self.traps.len() == MAX_TRAPS {
            self.traps.pop_front();
        }
        self.traps.push_back(trap);
        &self.traps[self.traps.len() - 1]
    }

    /// Traps younger than `window`, newest first.
    pub fn recent(&self, now: OffsetDateTime, window: Duration) -> Vec<&Trap> {
        self.traps
            .iter()
            .rev()
            .filter(|t| now - t.raised_at < window)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.traps.len()
    }
}
