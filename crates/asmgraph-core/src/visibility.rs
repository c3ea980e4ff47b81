//! Visibility and collapse engine.
//!
//! Given a built [`Tree`], every edge of the loaded data and a
//! [`GraphFilter`], derive the reduced graph that is actually drawn:
//!
//! 1. check the tree's structural invariants,
//! 2. map every node hidden inside a collapsed group to that group,
//! 3. re-route edges onto the collapsed groups and merge them per pair,
//! 4. keep only nodes that take part in a surfaced edge.

use std::collections::HashSet;

use asmgraph_error::{Error, Result};
use tracing::{debug, trace};

use crate::collections::{Edges, TypedMap, TypedSet};
use crate::filter::GraphFilter;
use crate::id::{EdgeId, NodeId};
use crate::tree::{NodeIndex, Tree};

/// Where a hidden node surfaces: the collapsed group `parent`, entered
/// through its direct child `child`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedBy {
    pub parent: NodeId,
    pub child: NodeId,
}

/// Reject trees with repeated ids or parent links that disagree with the
/// child lists.
pub fn assert_structure(tree: &Tree) -> Result<()> {
    let mut seen = HashSet::with_capacity(tree.len());
    let mut stack = vec![(tree.root(), None)];
    while let Some((idx, expected_parent)) = stack.pop() {
        let node = tree.node(idx);
        if !seen.insert(node.id().encode()) {
            return Err(Error::structural(format!("node id '{}' occurs twice", node.id()))
                .with_operation("visibility::assert_structure")
                .with_context("id", node.id().encode()));
        }
        if node.parent() != expected_parent {
            return Err(Error::structural(format!(
                "node '{}' does not point back to its parent",
                node.id()
            ))
            .with_operation("visibility::assert_structure")
            .with_context("id", node.id().encode()));
        }
        stack.extend(node.children().iter().rev().map(|&child| (child, Some(idx))));
    }
    Ok(())
}

/// Map every node below a collapsed group to that group.
///
/// The outermost collapsed group on a path wins: its whole subtree surfaces
/// at it, even where nested groups are collapsed too. The root never closes.
pub fn closure_map(tree: &Tree, filter: &GraphFilter) -> TypedMap<ClosedBy> {
    let mut closed = TypedMap::new();
    let mut stack: Vec<(NodeIndex, Option<ClosedBy>)> = vec![(tree.root(), None)];
    while let Some((idx, inherited)) = stack.pop() {
        let node = tree.node(idx);
        let closes = idx != tree.root()
            && !node.is_leaf()
            && inherited.is_none()
            && !filter.is_group_expanded(node.id());
        for &child in node.children() {
            let child_id = tree.node(child).id();
            let boundary = match &inherited {
                Some(outer) => Some(outer.clone()),
                None if closes => Some(ClosedBy {
                    parent: node.id().clone(),
                    child: child_id.clone(),
                }),
                None => None,
            };
            if let Some(by) = &boundary {
                closed.set(child_id.clone(), by.clone());
            }
            stack.push((child, boundary));
        }
    }
    closed
}

/// Re-route edges onto collapsed groups.
///
/// Returns the merged edges and every node that took part in one of them,
/// both as originally named and as remapped.
pub fn remap_edges(
    tree: &Tree,
    edges: &Edges,
    filter: &GraphFilter,
    closed: &TypedMap<ClosedBy>,
) -> Result<(Edges, TypedSet)> {
    let mut remapped = Edges::new();
    let mut edge_leafs = TypedSet::new();

    for edge in edges.values() {
        if !filter.is_leaf_visible(&edge.client_id) || !filter.is_leaf_visible(&edge.server_id) {
            continue;
        }
        tree.lookup(&edge.client_id)
            .map_err(|e| e.with_context("edge", edge.edge_id.as_str()))?;
        tree.lookup(&edge.server_id)
            .map_err(|e| e.with_context("edge", edge.edge_id.as_str()))?;

        let client = closed
            .get(&edge.client_id)
            .map_or(&edge.client_id, |by| &by.parent);
        let (server, labels) = match closed.get(&edge.server_id) {
            Some(by) => {
                let entry = tree.node(tree.lookup(&by.child)?).label().to_string();
                (&by.parent, vec![entry])
            }
            None => (&edge.server_id, edge.labels.clone()),
        };

        if client == server {
            trace!(edge = %edge.edge_id, "edge folded into one group");
            continue;
        }

        let client_idx = tree.lookup(client)?;
        let server_idx = tree.lookup(server)?;
        if !filter.has_parent_edges() {
            for (id, idx) in [(client, client_idx), (server, server_idx)] {
                if !tree.node(idx).is_leaf() && filter.is_group_expanded(id) {
                    return Err(Error::unexpected_cluster_edge(
                        EdgeId::new(client, server).as_str(),
                        id.encode(),
                    )
                    .with_operation("visibility::remap_edges"));
                }
            }
        }

        for id in [&edge.client_id, &edge.server_id, client, server] {
            edge_leafs.add(id.clone());
        }
        let is_server_leaf = tree.node(server_idx).is_leaf();
        remapped.add_or_update(client.clone(), server.clone(), labels, is_server_leaf);
    }

    debug!(
        input = edges.len(),
        surfaced = remapped.len(),
        participants = edge_leafs.len(),
        "edges remapped"
    );
    Ok((remapped, edge_leafs))
}

/// Per-node visibility, indexed by [`NodeIndex`].
///
/// A leaf shows when it is checked and takes part in an edge; a group shows
/// when a child shows or when it is itself an edge endpoint. The root always
/// shows.
pub fn node_visibility(tree: &Tree, filter: &GraphFilter, edge_leafs: &TypedSet) -> Vec<bool> {
    let mut visible = vec![false; tree.len()];
    for idx in tree.preorder().into_iter().rev() {
        let node = tree.node(idx);
        visible[idx.as_usize()] = if node.is_leaf() {
            filter.is_leaf_visible(node.id()) && edge_leafs.contains(node.id())
        } else {
            edge_leafs.contains(node.id())
                || node.children().iter().any(|c| visible[c.as_usize()])
        };
    }
    visible[tree.root().as_usize()] = true;
    visible
}

/// The reduced graph handed to the projector.
#[derive(Debug)]
pub struct VisibleGraph<'t> {
    tree: &'t Tree,
    visible: Vec<bool>,
    expanded: Vec<bool>,
    edges: Edges,
    closed_by: TypedMap<ClosedBy>,
    edge_leafs: TypedSet,
    has_parent_edges: bool,
}

impl<'t> VisibleGraph<'t> {
    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    pub fn is_visible(&self, idx: NodeIndex) -> bool {
        self.visible[idx.as_usize()]
    }

    /// Expanded groups are drawn as containers; the root always is one.
    pub fn is_expanded(&self, idx: NodeIndex) -> bool {
        self.expanded[idx.as_usize()]
    }

    pub fn edges(&self) -> &Edges {
        &self.edges
    }

    pub fn closed_by(&self) -> &TypedMap<ClosedBy> {
        &self.closed_by
    }

    pub fn edge_leafs(&self) -> &TypedSet {
        &self.edge_leafs
    }

    pub fn has_parent_edges(&self) -> bool {
        self.has_parent_edges
    }

    /// Nodes that will be drawn, the root excluded.
    pub fn visible_count(&self) -> usize {
        self.tree
            .iter()
            .filter(|(idx, node)| {
                *idx != self.tree.root()
                    && self.is_visible(*idx)
                    && !self.closed_by.contains(node.id())
            })
            .count()
    }
}

/// Run all passes.
pub fn apply_filter<'t>(
    tree: &'t Tree,
    edges: &Edges,
    filter: &GraphFilter,
) -> Result<VisibleGraph<'t>> {
    assert_structure(tree)?;
    let closed_by = closure_map(tree, filter);
    let (edges, edge_leafs) = remap_edges(tree, edges, filter, &closed_by)?;
    let visible = node_visibility(tree, filter, &edge_leafs);
    let expanded = tree
        .iter()
        .map(|(idx, node)| {
            idx == tree.root() || (!node.is_leaf() && filter.is_group_expanded(node.id()))
        })
        .collect();

    let graph = VisibleGraph {
        tree,
        visible,
        expanded,
        edges,
        closed_by,
        edge_leafs,
        has_parent_edges: filter.has_parent_edges(),
    };
    debug!(
        nodes = graph.visible_count(),
        edges = graph.edges.len(),
        closed = graph.closed_by.len(),
        "filter applied"
    );
    Ok(graph)
}
