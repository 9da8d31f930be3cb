//! Line protocol spoken by the agent binary on stdin/stdout.
//!
//! ```text
//! GET 1.3.6.1.4.1.9999.1.1.0          -> 1.3.6.1.4.1.9999.1.1.0 = Web Server
//! SET 1.3.6.1.4.1.9999.1.7.0 DEBUG    -> 1.3.6.1.4.1.9999.1.7.0 = DEBUG
//! ```

use crate::agent::{EnterpriseObject, SimulatedAgent};
use mibscope_core::{Oid, ScalarValue};

pub const NO_SUCH_INSTANCE: &str = "No Such Instance";
pub const SET_REJECTED: &str = "Error: OID is read-only or invalid value";
pub const INVALID_REQUEST: &str = "Error: Invalid request";
pub const UNKNOWN_METRIC: &str = "Unknown metric";

/// Answer one request line. Blank lines and lines without an OID get no
/// reply.
pub fn handle_line(agent: &mut SimulatedAgent, line: &str) -> Option<String> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?;
    let raw_oid = parts.next()?;
    let value = parts.next();

    let reply = match (command, value) {
        ("GET", _) => {
            let value = Oid::parse(raw_oid)
                .ok()
                .and_then(|oid| agent.get(&oid).ok())
                .map_or_else(|| NO_SUCH_INSTANCE.to_string(), |v| v.to_string());
            format!("{raw_oid} = {value}")
        }
        ("SET", Some(value)) => {
            let accepted = Oid::parse(raw_oid)
                .ok()
                .is_some_and(|oid| agent.set(&oid, &ScalarValue::from_text(value)).is_ok());
            if accepted {
                format!("{raw_oid} = {value}")
            } else {
                SET_REJECTED.to_string()
            }
        }
        _ => INVALID_REQUEST.to_string(),
    };
    Some(reply)
}

/// One-shot lookup by object name, e.g. `cpuUsage`.
pub fn read_metric(agent: &mut SimulatedAgent, name: &str) -> String {
    EnterpriseObject::from_name(name)
        .and_then(|object| agent.get(&object.oid()).ok())
        .map_or_else(|| UNKNOWN_METRIC.to_string(), |value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FixedProbe, HostSample};
    use crate::profile::ServiceKind;

    fn agent() -> SimulatedAgent {
        SimulatedAgent::with_probe(ServiceKind::WebServer, FixedProbe(HostSample::default()), 1)
    }

    #[test]
    fn test_get_line() {
        let mut web = agent();
        assert_eq!(
            handle_line(&mut web, "GET 1.3.6.1.4.1.9999.1.1.0").as_deref(),
            Some("1.3.6.1.4.1.9999.1.1.0 = Web Server")
        );
        assert_eq!(
            handle_line(&mut web, "  GET 1.3.6.1.4.1.9999.2.1.0  ").as_deref(),
            Some("1.3.6.1.4.1.9999.2.1.0 = 2")
        );
    }

    #[test]
    fn test_get_unknown_and_malformed() {
        let mut web = agent();
        assert_eq!(
            handle_line(&mut web, "GET 9.9.9.9").as_deref(),
            Some("9.9.9.9 = No Such Instance")
        );
        assert_eq!(
            handle_line(&mut web, "GET not.an.oid").as_deref(),
            Some("not.an.oid = No Such Instance")
        );
    }

    #[test]
    fn test_set_line() {
        let mut web = agent();
        assert_eq!(
            handle_line(&mut web, "SET 1.3.6.1.4.1.9999.1.7.0 ERROR").as_deref(),
            Some("1.3.6.1.4.1.9999.1.7.0 = ERROR")
        );
        assert_eq!(
            handle_line(&mut web, "GET 1.3.6.1.4.1.9999.1.7.0").as_deref(),
            Some("1.3.6.1.4.1.9999.1.7.0 = ERROR")
        );
        assert_eq!(
            handle_line(&mut web, "SET 1.3.6.1.4.1.9999.1.7.0 VERBOSE").as_deref(),
            Some(SET_REJECTED)
        );
        assert_eq!(
            handle_line(&mut web, "SET 1.3.6.1.4.1.9999.1.3.0 10").as_deref(),
            Some(SET_REJECTED)
        );
    }

    #[test]
    fn test_malformed_requests() {
        let mut web = agent();
        assert_eq!(handle_line(&mut web, ""), None);
        assert_eq!(handle_line(&mut web, "GET"), None);
        assert_eq!(
            handle_line(&mut web, "SET 1.3.6.1.4.1.9999.1.7.0").as_deref(),
            Some(INVALID_REQUEST)
        );
        assert_eq!(
            handle_line(&mut web, "WALK 1.3.6").as_deref(),
            Some(INVALID_REQUEST)
        );
    }

    #[test]
    fn test_read_metric() {
        let mut web = agent();
        assert_eq!(read_metric(&mut web, "sysName"), "Web Server");
        assert_eq!(read_metric(&mut web, "logLevel"), "INFO");
        assert_eq!(read_metric(&mut web, "bogus"), UNKNOWN_METRIC);
    }
}
