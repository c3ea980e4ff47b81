//! Command-line options shared by the `asmgraph` binary and its tests.

use asmgraph_core::{EdgeLabelOptions, GraphFilter, NodeId, ViewOptions, ViewType};
use asmgraph_error::Result;
use clap::Args;

/// How the diagram is grouped and drawn.
#[derive(Args, Debug, Clone)]
pub struct DisplayOptions {
    /// Group by successive name prefixes instead of one level only.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub nested: bool,

    /// Dissolve groups that hold a single item.
    #[arg(long = "ungroup-single", default_value_t = true, action = clap::ArgAction::Set)]
    pub ungroup_single: bool,

    /// Drop the group's prefix from member labels.
    #[arg(long = "short-labels", default_value_t = true, action = clap::ArgAction::Set)]
    pub short_labels: bool,

    /// Draw labels on edges between two leaves.
    #[arg(long = "show-leaf-labels", default_value_t = true, action = clap::ArgAction::Set)]
    pub show_leaf_labels: bool,

    /// Draw labels on edges that touch a group.
    #[arg(long = "show-group-labels")]
    pub show_group_labels: bool,

    /// Lay out top to bottom and keep siblings in order.
    #[arg(long = "vertical-align")]
    pub vertical_align: bool,

    /// Show a message instead of a diagram above this many nodes.
    #[arg(long = "max-nodes", default_value_t = 1000)]
    pub max_nodes: usize,

    /// Show a message instead of a diagram above this many edges.
    #[arg(long = "max-edges", default_value_t = 2000)]
    pub max_edges: usize,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self::from_view_options(&ViewOptions::default())
    }
}

impl DisplayOptions {
    pub fn from_view_options(options: &ViewOptions) -> Self {
        Self {
            nested: options.nested,
            ungroup_single: options.ungroup_single,
            short_labels: options.short_labels,
            show_leaf_labels: options.edge_labels.leafs,
            show_group_labels: options.edge_labels.groups,
            vertical_align: options.vertical_align,
            max_nodes: options.max_nodes,
            max_edges: options.max_edges,
        }
    }

    pub fn to_view_options(&self, view_type: ViewType, has_parent_edges: bool) -> ViewOptions {
        ViewOptions::new(view_type)
            .with_nested(self.nested)
            .with_ungroup_single(self.ungroup_single)
            .with_short_labels(self.short_labels)
            .with_edge_labels(EdgeLabelOptions {
                leafs: self.show_leaf_labels,
                groups: self.show_group_labels,
            })
            .with_vertical_align(self.vertical_align)
            .with_limits(self.max_nodes, self.max_edges)
            .with_parent_edges(has_parent_edges)
    }
}

/// Changes applied on top of the everything-visible filter.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterOptions {
    /// Expand a group, given by its encoded id (repeatable).
    #[arg(long = "expand", value_name = "ID", action = clap::ArgAction::Append)]
    pub expand: Vec<String>,

    /// Hide a leaf, given by its encoded id (repeatable).
    #[arg(long = "hide", value_name = "ID", action = clap::ArgAction::Append)]
    pub hide: Vec<String>,

    /// Allow edges to end on an expanded group.
    #[arg(long = "parent-edges")]
    pub parent_edges: bool,
}

impl FilterOptions {
    pub fn apply(&self, filter: &mut GraphFilter) -> Result<()> {
        for text in &self.expand {
            filter.set_group_expanded(NodeId::decode(text)?, true);
        }
        for text in &self.hide {
            filter.set_leaf_visible(NodeId::decode(text)?, false);
        }
        filter.is_check_model_all = self.parent_edges;
        Ok(())
    }
}

pub fn parse_view_type(text: &str) -> std::result::Result<ViewType, String> {
    text.parse::<ViewType>().map_err(|_| {
        let names: Vec<&str> = ViewType::ALL.iter().map(ViewType::as_str).collect();
        format!("unknown view '{text}', expected one of: {}", names.join(", "))
    })
}
