/*!
Fixtures: OIDs, small trees and a gateway answering the dashboard OIDs with
the values the demo dashboard shows.
*/

use crate::ScriptedGateway;
use mibscope_core::{MibTree, Oid, ScalarValue};

/// Parse a dotted OID, panicking on a malformed fixture.
pub fn oid(text: &str) -> Oid {
    Oid::parse(text).unwrap_or_else(|e| panic!("invalid fixture OID '{text}': {e}"))
}

pub const SMALL_TREE_YAML: &str = r#"
- oid: "1.3.6.1.4.1.9999"
  name: enterprise
  description: Enterprise MIB root
  type: branch
  expanded: true
  children:
    - oid: "1.3.6.1.4.1.9999.1"
      name: system
      description: System information and metrics
      type: branch
      children:
        - oid: "1.3.6.1.4.1.9999.1.1.0"
          name: sysName
          description: System name identifier
          type: leaf
        - oid: "1.3.6.1.4.1.9999.1.3.0"
          name: cpuUsage
          description: Current CPU utilization percentage
          type: leaf
"#;

/// Two-level tree with one branch and two leaves.
pub fn small_tree() -> MibTree {
    MibTree::from_yaml(SMALL_TREE_YAML)
        .unwrap_or_else(|e| panic!("invalid fixture tree: {e}"))
}

/// Gateway serving the five dashboard OIDs on every agent.
pub fn dashboard_gateway() -> ScriptedGateway {
    ScriptedGateway::new()
        .with_default("1.3.6.1.4.1.9999.1.3.0", ScalarValue::Float(45.2))
        .with_default("1.3.6.1.4.1.9999.1.4.0", ScalarValue::Integer(2048))
        .with_default("1.3.6.1.4.1.9999.1.5.0", ScalarValue::Float(12.5))
        .with_default("1.3.6.1.4.1.9999.1.6.0", ScalarValue::Integer(3))
        .with_default("1.3.6.1.4.1.9999.1.7.0", ScalarValue::from("INFO"))
}
