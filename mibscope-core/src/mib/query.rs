use super::{MibNode, MibTree};
use std::sync::Arc;

impl MibNode {
    /// Case-insensitive substring test; `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.oid.to_text().contains(needle)
    }
}

impl MibTree {
    /// Search the tree by name, description or OID text.
    ///
    /// An empty term returns the tree itself. Otherwise the result keeps
    /// every matching node together with its ancestors; branches keep only
    /// the children that survived filtering, in their original order.
    /// Subtrees that survive whole are shared with `self`.
    pub fn filter(&self, term: &str) -> MibTree {
        if term.is_empty() {
            return self.clone();
        }
        let needle = term.to_lowercase();
        MibTree::from_roots(filter_nodes(&self.roots, &needle))
    }
}

fn filter_nodes(nodes: &[Arc<MibNode>], needle: &str) -> Vec<Arc<MibNode>> {
    nodes
        .iter()
        .filter_map(|node| filter_node(node, needle))
        .collect()
}

fn filter_node(node: &Arc<MibNode>, needle: &str) -> Option<Arc<MibNode>> {
    let children = filter_nodes(&node.children, needle);
    if children.is_empty() && !node.matches(needle) {
        return None;
    }

    let unchanged = children.len() == node.children.len()
        && children
            .iter()
            .zip(&node.children)
            .all(|(kept, original)| Arc::ptr_eq(kept, original));
    if unchanged {
        return Some(Arc::clone(node));
    }

    Some(Arc::new(MibNode {
        oid: node.oid.clone(),
        name: node.name.clone(),
        description: node.description.clone(),
        kind: node.kind,
        value: node.value.clone(),
        children,
        expanded: node.expanded,
    }))
}
