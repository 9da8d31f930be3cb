use super::{MibError, MibTree, NodeKind};
use crate::oid::Oid;
use crate::value::ScalarValue;
use serde::{Deserialize, Serialize};

/// Enterprise subtree (`1.3.6.1.4.1.9999`) answered by every Mibscope agent.
pub const ENTERPRISE_MIB_YAML: &str = include_str!("../../mibs/enterprise.yaml");

/// Static description of one node, as written in a YAML tree definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    pub oid: Oid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ScalarValue>,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDef>,
}

pub fn enterprise_tree() -> Result<MibTree, MibError> {
    MibTree::from_yaml(ENTERPRISE_MIB_YAML)
}
