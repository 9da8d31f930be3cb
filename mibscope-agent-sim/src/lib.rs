//! Simulated enterprise agents: one per service kind, each answering the
//! `1.3.6.1.4.1.9999` subtree with host readings plus per-service noise.

pub mod agent;
pub mod host;
pub mod profile;
pub mod protocol;

pub use agent::{EnterpriseObject, LogLevel, SimError, SimulatedAgent};
pub use host::{FixedProbe, HostProbe, HostSample, SysinfoProbe};
pub use profile::ServiceKind;
