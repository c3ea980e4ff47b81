//! Containers keyed by [`NodeId`] and the edge accumulator.
//!
//! Keys are stored by their encoded text so that two equal ids always land on
//! the same slot. All containers iterate in insertion order.

use asmgraph_error::{Error, Result};
use indexmap::IndexMap;

use crate::id::{EdgeId, NodeId};

/// Ordered map keyed by node id.
#[derive(Debug, Clone)]
pub struct TypedMap<V> {
    entries: IndexMap<String, (NodeId, V)>,
}

impl<V> Default for TypedMap<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V> TypedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, returning the previous value.
    pub fn set(&mut self, id: NodeId, value: V) -> Option<V> {
        self.entries
            .insert(id.encode(), (id, value))
            .map(|(_, previous)| previous)
    }

    pub fn get(&self, id: &NodeId) -> Option<&V> {
        self.entries.get(&id.encode()).map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut V> {
        self.entries.get_mut(&id.encode()).map(|(_, value)| value)
    }

    /// Like [`get`](Self::get) but a missing key is a `NotFound` error.
    pub fn get_required(&self, id: &NodeId) -> Result<&V> {
        self.get(id).ok_or_else(|| {
            Error::not_found(format!("{id:?}"))
                .with_operation("collections::get_required")
                .with_context("id", id.encode())
        })
    }

    pub fn get_or_insert_with(&mut self, id: NodeId, make: impl FnOnce() -> V) -> &mut V {
        let key = id.encode();
        &mut self.entries.entry(key).or_insert_with(move || (id, make())).1
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.entries.contains_key(&id.encode())
    }

    pub fn keys(&self) -> impl Iterator<Item = &NodeId> {
        self.entries.values().map(|(id, _)| id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&NodeId, &V)> {
        self.entries.values().map(|(id, value)| (id, value))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// New map holding both sources. On a key collision `other` wins.
    pub fn combine(&self, other: &Self) -> Self
    where
        V: Clone,
    {
        let mut combined = self.clone();
        for (id, value) in other.entries() {
            combined.set(id.clone(), value.clone());
        }
        combined
    }
}

/// Ordered set of node ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedSet {
    ids: IndexMap<String, NodeId>,
}

impl TypedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the id was already present.
    pub fn add(&mut self, id: NodeId) -> bool {
        let key = id.encode();
        if self.ids.contains_key(&key) {
            return false;
        }
        self.ids.insert(key, id);
        true
    }

    pub fn remove(&mut self, id: &NodeId) -> bool {
        self.ids.shift_remove(&id.encode()).is_some()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.contains_key(&id.encode())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.ids.values()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<NodeId> for TypedSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        let mut set = TypedSet::new();
        for id in iter {
            set.add(id);
        }
        set
    }
}

/// A directed edge with the labels accumulated for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub edge_id: EdgeId,
    pub client_id: NodeId,
    pub server_id: NodeId,
    pub labels: Vec<String>,
    pub is_server_leaf: bool,
}

/// Edge accumulator: one edge per ordered (client, server) pair.
#[derive(Debug, Clone, Default)]
pub struct Edges {
    edges: IndexMap<EdgeId, Edge>,
}

impl Edges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the edge, or append `labels` to the existing edge for the pair.
    ///
    /// Labels keep insertion order and are not deduplicated here.
    pub fn add_or_update<I, S>(
        &mut self,
        client_id: NodeId,
        server_id: NodeId,
        labels: I,
        is_server_leaf: bool,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let edge_id = EdgeId::new(&client_id, &server_id);
        let labels = labels.into_iter().map(Into::into);
        match self.edges.get_mut(&edge_id) {
            Some(existing) => existing.labels.extend(labels),
            None => {
                let edge = Edge {
                    edge_id: edge_id.clone(),
                    client_id,
                    server_id,
                    labels: labels.collect(),
                    is_server_leaf,
                };
                self.edges.insert(edge_id, edge);
            }
        }
    }

    pub fn get(&self, edge_id: &EdgeId) -> Option<&Edge> {
        self.edges.get(edge_id)
    }

    pub fn values(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
