//! Core model of the MIB browser: object identifiers, the persistent MIB
//! tree, the agent gateway contract and per-view sessions.

pub mod gateway;
pub mod mib;
pub mod oid;
pub mod session;
pub mod value;

pub use gateway::{AgentAddress, GatewayError, MetricGateway};
pub use mib::{enterprise_tree, MibError, MibNode, MibTree, NodeDef, NodeKind};
pub use oid::{Oid, OidError};
pub use session::{ApplyOutcome, FetchTicket, MibSession, SessionToken};
pub use value::ScalarValue;
