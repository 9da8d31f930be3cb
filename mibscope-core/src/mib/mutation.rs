//! Point updates addressed by exact OID.
//!
//! Both operations are total: a miss or a node of the wrong kind returns a
//! tree sharing every node with the input.

use super::{MibNode, MibTree, NodeKind};
use crate::oid::Oid;
use crate::value::ScalarValue;
use std::sync::Arc;

impl MibTree {
    /// Cache `value` on the leaf at `oid`.
    pub fn set_value(&self, oid: &Oid, value: ScalarValue) -> MibTree {
        self.update_node(oid, NodeKind::Leaf, |node| node.value = Some(value))
    }

    /// Flip the expansion flag of the branch at `oid`.
    pub fn toggle_expanded(&self, oid: &Oid) -> MibTree {
        self.update_node(oid, NodeKind::Branch, |node| node.expanded = !node.expanded)
    }

    fn update_node<F>(&self, oid: &Oid, kind: NodeKind, update: F) -> MibTree
    where
        F: FnOnce(&mut MibNode),
    {
        let Some(path) = self.path_of(oid) else {
            tracing::debug!(%oid, "update for OID outside the local tree dropped");
            return self.clone();
        };
        if self.get(oid).map(MibNode::kind) != Some(kind) {
            return self.clone();
        }
        let Some((first, rest)) = path.split_first() else {
            return self.clone();
        };

        // make_mut copies each node on the path (it is shared with `self`);
        // the copied children vectors still point at the untouched siblings.
        let mut roots = self.roots.clone();
        let mut node = Arc::make_mut(&mut roots[*first]);
        for &i in rest {
            node = Arc::make_mut(&mut node.children[i]);
        }
        update(node);

        MibTree {
            roots,
            index: Arc::clone(&self.index),
        }
    }
}
