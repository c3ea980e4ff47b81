use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::hierarchy::HierarchyOptions;

/// Which diagram is being built.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ViewType {
    References,
    Methods,
    Apis,
    Custom,
}

impl ViewType {
    pub const ALL: [ViewType; 4] = [
        ViewType::References,
        ViewType::Methods,
        ViewType::Apis,
        ViewType::Custom,
    ];

    /// Views built from reflection data; their label invariants are enforced strictly.
    pub fn is_primary(&self) -> bool {
        !matches!(self, ViewType::Custom)
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Whether an edge joins two leaves or touches a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    Leaf,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeLabelOptions {
    pub leafs: bool,
    pub groups: bool,
}

impl Default for EdgeLabelOptions {
    fn default() -> Self {
        Self {
            leafs: true,
            groups: false,
        }
    }
}

impl EdgeLabelOptions {
    pub fn shows(&self, kind: EdgeKind) -> bool {
        match kind {
            EdgeKind::Leaf => self.leafs,
            EdgeKind::Group => self.groups,
        }
    }
}

/// Options for one view, persisted per view type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewOptions {
    pub view_type: ViewType,
    pub nested: bool,
    pub ungroup_single: bool,
    pub short_labels: bool,
    pub edge_labels: EdgeLabelOptions,
    pub vertical_align: bool,
    /// Beyond this many visible nodes the view is replaced by a message.
    pub max_nodes: usize,
    /// Beyond this many visible edges the view is replaced by a message.
    pub max_edges: usize,
    /// Initial `is_check_model_all` for filters created from these options.
    pub has_parent_edges: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self::new(ViewType::References)
    }
}

impl ViewOptions {
    pub fn new(view_type: ViewType) -> Self {
        Self {
            view_type,
            nested: true,
            ungroup_single: true,
            short_labels: true,
            edge_labels: EdgeLabelOptions::default(),
            vertical_align: false,
            max_nodes: 1000,
            max_edges: 2000,
            has_parent_edges: false,
        }
    }

    /// Key under which filters for these options are persisted.
    ///
    /// Two option sets with the same key produce the same tree shape.
    pub fn cluster_by(&self) -> String {
        let mut parts = vec![if self.nested { "nested" } else { "flat" }];
        if self.ungroup_single {
            parts.push("ungroup");
        }
        parts.join("+")
    }

    pub fn hierarchy(&self) -> HierarchyOptions {
        HierarchyOptions {
            nested: self.nested,
            ungroup_single: self.ungroup_single,
        }
    }

    pub fn with_nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }

    pub fn with_ungroup_single(mut self, ungroup_single: bool) -> Self {
        self.ungroup_single = ungroup_single;
        self
    }

    pub fn with_short_labels(mut self, short_labels: bool) -> Self {
        self.short_labels = short_labels;
        self
    }

    pub fn with_edge_labels(mut self, edge_labels: EdgeLabelOptions) -> Self {
        self.edge_labels = edge_labels;
        self
    }

    pub fn with_vertical_align(mut self, vertical_align: bool) -> Self {
        self.vertical_align = vertical_align;
        self
    }

    pub fn with_parent_edges(mut self, has_parent_edges: bool) -> Self {
        self.has_parent_edges = has_parent_edges;
        self
    }

    pub fn with_limits(mut self, max_nodes: usize, max_edges: usize) -> Self {
        self.max_nodes = max_nodes;
        self.max_edges = max_edges;
        self
    }
}
