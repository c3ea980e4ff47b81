//! User-controlled visibility state for one view.

use asmgraph_error::Result;
use serde::{Deserialize, Serialize};

use crate::collections::TypedSet;
use crate::id::NodeId;
use crate::tree::Tree;

/// Which leaves are shown and which groups are expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphFilter {
    pub leaf_visible: TypedSet,
    pub group_expanded: TypedSet,
    /// When set, edges may terminate on an expanded group.
    pub is_check_model_all: bool,
}

impl GraphFilter {
    /// Every leaf visible, every group collapsed.
    pub fn all_visible(tree: &Tree) -> Self {
        Self {
            leaf_visible: tree.leaves().map(|(_, node)| node.id().clone()).collect(),
            group_expanded: TypedSet::new(),
            is_check_model_all: false,
        }
    }

    pub fn has_parent_edges(&self) -> bool {
        self.is_check_model_all
    }

    pub fn is_leaf_visible(&self, id: &NodeId) -> bool {
        self.leaf_visible.contains(id)
    }

    pub fn is_group_expanded(&self, id: &NodeId) -> bool {
        self.group_expanded.contains(id)
    }

    /// Returns the new visibility.
    pub fn toggle_leaf(&mut self, id: &NodeId) -> bool {
        let visible = !self.leaf_visible.contains(id);
        self.set_leaf_visible(id.clone(), visible);
        visible
    }

    pub fn set_leaf_visible(&mut self, id: NodeId, visible: bool) {
        if visible {
            self.leaf_visible.add(id);
        } else {
            self.leaf_visible.remove(&id);
        }
    }

    pub fn set_group_expanded(&mut self, id: NodeId, expanded: bool) {
        if expanded {
            self.group_expanded.add(id);
        } else {
            self.group_expanded.remove(&id);
        }
    }
}

/// Persisted form of a [`TypedSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeIdList {
    pub node_ids: Vec<String>,
}

impl From<&TypedSet> for NodeIdList {
    fn from(set: &TypedSet) -> Self {
        Self {
            node_ids: set.iter().map(NodeId::encode).collect(),
        }
    }
}

impl NodeIdList {
    pub fn to_set(&self) -> Result<TypedSet> {
        self.node_ids
            .iter()
            .map(|text| NodeId::decode(text).map_err(|e| e.with_operation("filter::load")))
            .collect()
    }
}
