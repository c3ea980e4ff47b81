//! Arena-backed node tree.
//!
//! Nodes live in one `Vec` owned by the [`Tree`]; children and the parent
//! back-reference are plain [`NodeIndex`] handles into it. The parent handle
//! is only used for navigation.

use asmgraph_error::{Error, Result};

use crate::collections::TypedMap;
use crate::id::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(u32);

impl NodeIndex {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Leaf,
    Parent {
        children: Vec<NodeIndex>,
        /// Children's labels are expected to start with this node's label.
        shorten_children: bool,
    },
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    id: NodeId,
    label: String,
    parent: Option<NodeIndex>,
    kind: NodeKind,
}

impl TreeNode {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf)
    }

    pub fn children(&self) -> &[NodeIndex] {
        match &self.kind {
            NodeKind::Leaf => &[],
            NodeKind::Parent { children, .. } => children,
        }
    }

    pub fn shortens_children(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Parent {
                shorten_children: true,
                ..
            }
        )
    }
}

/// A rooted tree of groups and leaves with globally unique ids.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    index: TypedMap<NodeIndex>,
}

impl Tree {
    const ROOT: NodeIndex = NodeIndex(0);

    pub fn new(root_id: NodeId, root_label: impl Into<String>) -> Self {
        let mut index = TypedMap::new();
        index.set(root_id.clone(), Self::ROOT);
        Self {
            nodes: vec![TreeNode {
                id: root_id,
                label: root_label.into(),
                parent: None,
                kind: NodeKind::Parent {
                    children: Vec::new(),
                    shorten_children: false,
                },
            }],
            index,
        }
    }

    pub fn root(&self) -> NodeIndex {
        Self::ROOT
    }

    pub fn node(&self, idx: NodeIndex) -> &TreeNode {
        &self.nodes[idx.as_usize()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn find(&self, id: &NodeId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Resolve an id, failing with `NotFound` when the tree lacks it.
    pub fn lookup(&self, id: &NodeId) -> Result<NodeIndex> {
        self.index
            .get_required(id)
            .copied()
            .map_err(|e| e.with_operation("tree::lookup"))
    }

    pub fn add_leaf(
        &mut self,
        parent: NodeIndex,
        id: NodeId,
        label: impl Into<String>,
    ) -> Result<NodeIndex> {
        self.push(parent, id, label.into(), NodeKind::Leaf)
    }

    pub fn add_group(
        &mut self,
        parent: NodeIndex,
        id: NodeId,
        label: impl Into<String>,
        shorten_children: bool,
    ) -> Result<NodeIndex> {
        let kind = NodeKind::Parent {
            children: Vec::new(),
            shorten_children,
        };
        self.push(parent, id, label.into(), kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &TreeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i as u32), node))
    }

    pub fn leaves(&self) -> impl Iterator<Item = (NodeIndex, &TreeNode)> {
        self.iter().filter(|(_, node)| node.is_leaf())
    }

    /// Depth-first pre-order, children visited in order.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.node(idx).children().iter().rev().copied());
        }
        order
    }

    /// Labels from the root's child down to `idx`, e.g. for tooltips.
    pub fn label_path(&self, idx: NodeIndex) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = Some(idx);
        while let Some(at) = current {
            if at == Self::ROOT {
                break;
            }
            let node = self.node(at);
            path.push(node.label());
            current = node.parent();
        }
        path.reverse();
        path
    }

    fn push(
        &mut self,
        parent: NodeIndex,
        id: NodeId,
        label: String,
        kind: NodeKind,
    ) -> Result<NodeIndex> {
        if self.index.contains(&id) {
            return Err(Error::structural(format!("node id '{id}' is already in the tree"))
                .with_operation("tree::push")
                .with_context("id", id.encode()));
        }
        let idx = NodeIndex(self.nodes.len() as u32);
        match self.nodes.get_mut(parent.as_usize()).map(|node| &mut node.kind) {
            Some(NodeKind::Parent { children, .. }) => children.push(idx),
            _ => {
                return Err(Error::structural(format!(
                    "cannot attach '{id}' below a leaf or missing node"
                ))
                .with_operation("tree::push"));
            }
        }
        self.index.set(id.clone(), idx);
        self.nodes.push(TreeNode {
            id,
            label,
            parent: Some(parent),
            kind,
        });
        Ok(idx)
    }

    #[cfg(test)]
    pub(crate) fn corrupt_parent(&mut self, idx: NodeIndex, parent: Option<NodeIndex>) {
        self.nodes[idx.as_usize()].parent = parent;
    }

    #[cfg(test)]
    pub(crate) fn corrupt_append_child(&mut self, parent: NodeIndex, child: NodeIndex) {
        if let NodeKind::Parent { children, .. } = &mut self.nodes[parent.as_usize()].kind {
            children.push(child);
        }
    }
}
