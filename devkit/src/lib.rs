/*!
# Mibscope DevKit

Test support for code that talks to agents through a
[`MetricGateway`](mibscope_core::MetricGateway):
- a scripted gateway with per-call delays and answers, recording every call
- small MIB trees and OID helpers for fixtures
*/

pub mod fixtures;
pub mod scripted_gateway;

pub use scripted_gateway::{GatewayCall, ScriptedGateway};

/// Route `log` output to the test harness; safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
