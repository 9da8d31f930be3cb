//! MIB tree model.
//!
//! The tree is persistent: children are held behind `Arc`, so a point update
//! copies only the nodes on the root-to-target path and every other subtree
//! stays shared with the previous version. An index from OID to child
//! positions keeps lookups proportional to the node's depth.

mod definition;
mod mutation;
mod query;

pub use definition::{enterprise_tree, NodeDef, ENTERPRISE_MIB_YAML};

use crate::oid::Oid;
use crate::value::ScalarValue;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum MibError {
    #[error("duplicate OID {0} in tree definition")]
    DuplicateOid(Oid),
    #[error("child OID {child} does not extend parent OID {parent}")]
    OidOutsideParent { parent: Oid, child: Oid },
    #[error("leaf {0} cannot have children")]
    LeafWithChildren(Oid),
    #[error("branch {0} cannot carry a value")]
    BranchWithValue(Oid),
    #[error("invalid tree definition: {0}")]
    Definition(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Branch,
    Leaf,
}

/// One entry of the management tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MibNode {
    oid: Oid,
    name: String,
    description: String,
    #[serde(rename = "type")]
    kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<ScalarValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<Arc<MibNode>>,
    expanded: bool,
}

impl MibNode {
    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    /// Cached value; `None` until the agent has been asked for it.
    pub fn value(&self) -> Option<&ScalarValue> {
        self.value.as_ref()
    }

    pub fn children(&self) -> &[Arc<MibNode>] {
        &self.children
    }

    pub fn expanded(&self) -> bool {
        self.expanded
    }

    /// A branch only expands when it has something to show.
    pub fn is_expandable(&self) -> bool {
        self.kind == NodeKind::Branch && !self.children.is_empty()
    }
}

/// Index path of a node: position in `roots`, then position in each
/// successive `children` list.
type NodePath = Vec<usize>;

#[derive(Debug, Clone)]
pub struct MibTree {
    roots: Vec<Arc<MibNode>>,
    index: Arc<HashMap<Oid, NodePath>>,
}

impl PartialEq for MibTree {
    fn eq(&self, other: &Self) -> bool {
        self.roots == other.roots
    }
}

impl MibTree {
    /// Build and validate a tree from its definition.
    pub fn build(defs: Vec<NodeDef>) -> Result<Self, MibError> {
        let mut seen = HashSet::new();
        let roots = defs
            .into_iter()
            .map(|def| build_node(def, None, &mut seen).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_roots(roots))
    }

    pub fn from_yaml(text: &str) -> Result<Self, MibError> {
        let defs: Vec<NodeDef> = serde_yaml::from_str(text)?;
        Self::build(defs)
    }

    /// Re-index an already valid set of roots.
    pub(crate) fn from_roots(roots: Vec<Arc<MibNode>>) -> Self {
        let mut index = HashMap::new();
        let mut path = Vec::new();
        for (i, root) in roots.iter().enumerate() {
            path.push(i);
            index_node(root, &mut path, &mut index);
            path.pop();
        }
        Self {
            roots,
            index: Arc::new(index),
        }
    }

    pub fn roots(&self) -> &[Arc<MibNode>] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, oid: &Oid) -> bool {
        self.index.contains_key(oid)
    }

    pub fn get(&self, oid: &Oid) -> Option<&MibNode> {
        let path = self.index.get(oid)?;
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get(*first)?;
        for &i in rest {
            node = node.children.get(i)?;
        }
        Some(node)
    }

    pub(crate) fn path_of(&self, oid: &Oid) -> Option<&[usize]> {
        self.index.get(oid).map(Vec::as_slice)
    }

    /// Depth-first, display-order walk over every node.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: self.roots.iter().rev().map(Arc::as_ref).collect(),
        }
    }

    /// OIDs of all leaves, in display order.
    pub fn leaf_oids(&self) -> Vec<Oid> {
        self.iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.oid.clone())
            .collect()
    }
}

pub struct Iter<'a> {
    stack: Vec<&'a MibNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a MibNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(Arc::as_ref));
        Some(node)
    }
}

fn build_node(
    def: NodeDef,
    parent: Option<&Oid>,
    seen: &mut HashSet<Oid>,
) -> Result<MibNode, MibError> {
    if let Some(parent) = parent {
        if !parent.is_prefix_of(&def.oid) {
            return Err(MibError::OidOutsideParent {
                parent: parent.clone(),
                child: def.oid,
            });
        }
    }
    if !seen.insert(def.oid.clone()) {
        return Err(MibError::DuplicateOid(def.oid));
    }

    match def.kind {
        NodeKind::Leaf if !def.children.is_empty() => {
            return Err(MibError::LeafWithChildren(def.oid));
        }
        NodeKind::Branch if def.value.is_some() => {
            return Err(MibError::BranchWithValue(def.oid));
        }
        _ => {}
    }

    let children = def
        .children
        .into_iter()
        .map(|child| build_node(child, Some(&def.oid), seen).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MibNode {
        oid: def.oid,
        name: def.name,
        description: def.description,
        kind: def.kind,
        value: def.value,
        children,
        expanded: def.expanded,
    })
}

fn index_node(node: &MibNode, path: &mut NodePath, index: &mut HashMap<Oid, NodePath>) {
    index.insert(node.oid.clone(), path.clone());
    for (i, child) in node.children.iter().enumerate() {
        path.push(i);
        index_node(child, path, index);
        path.pop();
    }
}
