//! One view session over one agent's MIB tree.
//!
//! Fetches are asynchronous and may complete in any order. Every fetch is
//! issued with a [`FetchTicket`]; when its result comes back it is applied
//! only if the ticket still belongs to the live session, names the current
//! agent, and is the most recent request for that OID. Anything else is a
//! stale result and is dropped without touching the tree.

use crate::gateway::{AgentAddress, GatewayError};
use crate::mib::MibTree;
use crate::oid::Oid;
use crate::value::ScalarValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag handed to the session's background tasks.
#[derive(Debug, Clone, Default)]
pub struct SessionToken {
    cancelled: Arc<AtomicBool>,
}

impl SessionToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub epoch: u64,
    pub agent: AgentAddress,
    pub oid: Oid,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The value was merged into the tree.
    Applied,
    /// The gateway answered for an OID the tree does not hold; nothing merged.
    Ignored,
    /// Superseded or issued for a torn-down session; dropped.
    Stale,
    /// The gateway failed; the cached value is kept.
    Failed(GatewayError),
}

#[derive(Debug)]
pub struct MibSession {
    epoch: u64,
    agent: AgentAddress,
    definition: MibTree,
    tree: MibTree,
    token: SessionToken,
    next_seq: u64,
    latest_requested: HashMap<Oid, u64>,
}

impl MibSession {
    /// Open a session on `agent`, starting from a fresh copy of `definition`.
    pub fn new(agent: AgentAddress, definition: MibTree) -> Self {
        Self {
            epoch: 0,
            agent,
            tree: definition.clone(),
            definition,
            token: SessionToken::new(),
            next_seq: 0,
            latest_requested: HashMap::new(),
        }
    }

    pub fn agent(&self) -> &AgentAddress {
        &self.agent
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn tree(&self) -> &MibTree {
        &self.tree
    }

    pub fn token(&self) -> SessionToken {
        self.token.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn filtered(&self, term: &str) -> MibTree {
        self.tree.filter(term)
    }

    pub fn toggle_expanded(&mut self, oid: &Oid) {
        self.tree = self.tree.toggle_expanded(oid);
    }

    /// Record a new request for `oid`; any older request still in flight
    /// for the same OID is superseded. Only OIDs with a request in flight
    /// are tracked.
    pub fn begin_fetch(&mut self, oid: Oid) -> FetchTicket {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.latest_requested.insert(oid.clone(), seq);
        FetchTicket {
            epoch: self.epoch,
            agent: self.agent.clone(),
            oid,
            seq,
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        !self.token.is_cancelled()
            && ticket.epoch == self.epoch
            && ticket.agent == self.agent
            && self.latest_requested.get(&ticket.oid) == Some(&ticket.seq)
    }

    /// Merge a completed fetch. A current ticket retires its OID's entry, so
    /// any older ticket for that OID arriving later is stale. OIDs absent
    /// from the local tree are left alone and reported as `Ignored`.
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<ScalarValue, GatewayError>,
    ) -> ApplyOutcome {
        if !self.is_current(ticket) {
            tracing::debug!(oid = %ticket.oid, seq = ticket.seq, agent = %ticket.agent, "stale fetch result dropped");
            return ApplyOutcome::Stale;
        }
        self.latest_requested.remove(&ticket.oid);
        match result {
            Ok(_) if !self.tree.contains(&ticket.oid) => {
                tracing::debug!(oid = %ticket.oid, "fetched OID not in tree, ignored");
                ApplyOutcome::Ignored
            }
            Ok(value) => {
                self.tree = self.tree.set_value(&ticket.oid, value);
                ApplyOutcome::Applied
            }
            Err(err) => ApplyOutcome::Failed(err),
        }
    }

    /// Tear down the current view and start over on `agent`: the old token
    /// is cancelled, outstanding tickets become stale and the tree is
    /// rebuilt from the definition.
    pub fn switch_agent(&mut self, agent: AgentAddress) -> SessionToken {
        self.token.cancel();
        self.token = SessionToken::new();
        self.epoch += 1;
        self.agent = agent;
        self.tree = self.definition.clone();
        self.latest_requested.clear();
        self.token.clone()
    }

    pub fn close(&mut self) {
        self.token.cancel();
    }

    /// Number of OIDs with a request in flight.
    pub fn in_flight(&self) -> usize {
        self.latest_requested.len()
    }
}
