//! Projection of a filtered graph into a renderer-neutral image description.

use std::collections::BTreeSet;

use asmgraph_core::{
    EdgeId, EdgeKind, NodeId, NodeIndex, NodeTag, TypedMap, ViewOptions, VisibleGraph,
};
use asmgraph_error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, info, warn};

/// Marker in front of a label that had its parent's prefix removed.
pub const SHORT_LABEL_MARKER: char = '*';

pub const CLASS_LEAF: &str = "leaf";
pub const CLASS_CLOSED: &str = "closed";
pub const CLASS_EXPANDED: &str = "expanded";
pub const CLASS_LEAF_EDGE: &str = "leaf-edge";
pub const CLASS_GROUP_EDGE: &str = "group-edge";
pub const CLASS_EDGE_LABEL: &str = "edge-label";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Shape {
    Box,
    Box3d,
    Component,
    Ellipse,
    Folder,
    Note,
    Tab,
}

/// Shape of a box when no override applies.
pub fn default_shape(id: &NodeId, is_leaf: bool) -> Shape {
    if !is_leaf {
        return match id.tag() {
            NodeTag::Type => Shape::Box3d,
            _ => Shape::Folder,
        };
    }
    match id.tag() {
        NodeTag::Assembly => Shape::Component,
        NodeTag::Namespace | NodeTag::CustomFolder => Shape::Tab,
        NodeTag::Method => Shape::Ellipse,
        NodeTag::Exception | NodeTag::MemberException => Shape::Note,
        _ => Shape::Box,
    }
}

/// Per-node shape overrides supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct StyleOverrides {
    shapes: TypedMap<Shape>,
}

impl StyleOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_shape(&mut self, id: NodeId, shape: Shape) {
        self.shapes.set(id, shape);
    }

    pub fn shape(&self, id: &NodeId, is_leaf: bool) -> Shape {
        self.shapes
            .get(id)
            .copied()
            .unwrap_or_else(|| default_shape(id, is_leaf))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBox {
    pub id: NodeId,
    pub label: String,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSubgraph {
    pub id: NodeId,
    pub label: String,
    pub children: Vec<ImageNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImageNode {
    /// A leaf.
    Node(ImageBox),
    /// A collapsed group, drawn as one box.
    Group(ImageBox),
    /// An expanded group, drawn as a cluster around its children.
    Subgraph(ImageSubgraph),
}

impl ImageNode {
    pub fn id(&self) -> &NodeId {
        match self {
            ImageNode::Node(b) | ImageNode::Group(b) => &b.id,
            ImageNode::Subgraph(s) => &s.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ImageNode::Node(b) | ImageNode::Group(b) => &b.label,
            ImageNode::Subgraph(s) => &s.label,
        }
    }

    /// This node and everything below it, depth-first.
    pub fn flatten(&self) -> Vec<&ImageNode> {
        let mut out = vec![self];
        if let ImageNode::Subgraph(s) = self {
            for child in &s.children {
                out.extend(child.flatten());
            }
        }
        out
    }

    /// First box inside a subgraph, used to anchor edges on the cluster.
    pub fn anchor(&self) -> Option<&NodeId> {
        match self {
            ImageNode::Node(b) | ImageNode::Group(b) => Some(&b.id),
            ImageNode::Subgraph(s) => s.children.iter().find_map(ImageNode::anchor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEdge {
    pub edge_id: EdgeId,
    pub client_id: NodeId,
    pub server_id: NodeId,
    /// Text drawn on the edge, when labels are shown for its kind.
    pub label: Option<String>,
    pub tooltip: String,
    pub kind: EdgeKind,
    /// Set when the client is an expanded group.
    pub ltail: Option<NodeId>,
    /// Set when the server is an expanded group.
    pub lhead: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub nodes: Vec<ImageNode>,
    pub edges: Vec<ImageEdge>,
    pub edge_details: bool,
    pub has_parent_edges: bool,
}

impl ImageData {
    pub fn all_nodes(&self) -> Vec<&ImageNode> {
        self.nodes.iter().flat_map(ImageNode::flatten).collect()
    }

    pub fn find(&self, id: &NodeId) -> Option<&ImageNode> {
        self.all_nodes().into_iter().find(|node| node.id() == id)
    }
}

/// What the display surface needs to style one diagram element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementAttributes {
    pub class_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

/// Diagram element id to its attributes, for every element in the diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SideTable(IndexMap<String, ElementAttributes>);

impl SideTable {
    pub fn insert(
        &mut self,
        element_id: impl Into<String>,
        class_name: &str,
        tooltip: Option<String>,
    ) {
        self.0.insert(
            element_id.into(),
            ElementAttributes {
                class_name: class_name.to_string(),
                tooltip,
            },
        );
    }

    pub fn get(&self, element_id: &str) -> Option<&ElementAttributes> {
        self.0.get(element_id)
    }

    pub fn contains(&self, element_id: &str) -> bool {
        self.0.contains_key(element_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ElementAttributes)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of a projection. An oversized graph is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Image {
        image: ImageData,
        side_table: SideTable,
    },
    TooLarge(String),
}

/// Project the filtered graph into an [`ImageData`] and its side table.
pub fn project(
    graph: &VisibleGraph<'_>,
    options: &ViewOptions,
    styles: &StyleOverrides,
) -> Result<Projection> {
    let node_count = graph.visible_count();
    let edge_count = graph.edges().len();
    if node_count > options.max_nodes || edge_count > options.max_edges {
        info!(node_count, edge_count, "graph too large to draw");
        return Ok(Projection::TooLarge(format!(
            "This graph has {node_count} nodes and {edge_count} edges, more than the \
             {} nodes and {} edges that can be drawn. Hide some items or collapse groups.",
            options.max_nodes, options.max_edges
        )));
    }

    let mut projector = Projector {
        graph,
        options,
        styles,
        side_table: SideTable::default(),
    };
    let nodes = projector.children(graph.tree().root())?;
    let edges = projector.edges()?;
    let image = ImageData {
        nodes,
        edges,
        edge_details: options.edge_labels.leafs || options.edge_labels.groups,
        has_parent_edges: graph.has_parent_edges(),
    };
    debug!(
        nodes = node_count,
        edges = image.edges.len(),
        elements = projector.side_table.len(),
        "image projected"
    );
    Ok(Projection::Image {
        image,
        side_table: projector.side_table,
    })
}

struct Projector<'a, 't> {
    graph: &'a VisibleGraph<'t>,
    options: &'a ViewOptions,
    styles: &'a StyleOverrides,
    side_table: SideTable,
}

impl Projector<'_, '_> {
    fn children(&mut self, parent: NodeIndex) -> Result<Vec<ImageNode>> {
        let tree = self.graph.tree();
        let mut out = Vec::new();
        for &idx in tree.node(parent).children() {
            if !self.graph.is_visible(idx) {
                continue;
            }
            let node = tree.node(idx);
            let id = node.id().clone();
            let label = self.display_label(parent, idx)?;
            let tooltip = Some(node.label().to_string());

            let image_node = if node.is_leaf() {
                self.side_table.insert(id.encode(), CLASS_LEAF, tooltip);
                ImageNode::Node(ImageBox {
                    shape: self.styles.shape(&id, true),
                    id,
                    label,
                })
            } else if self.graph.is_expanded(idx) {
                self.side_table.insert(id.encode(), CLASS_EXPANDED, tooltip);
                ImageNode::Subgraph(ImageSubgraph {
                    id,
                    label,
                    children: self.children(idx)?,
                })
            } else {
                self.side_table.insert(id.encode(), CLASS_CLOSED, tooltip);
                ImageNode::Group(ImageBox {
                    shape: self.styles.shape(&id, false),
                    id,
                    label,
                })
            };
            out.push(image_node);
        }
        Ok(out)
    }

    /// The label drawn for `child`, shortened against its parent when enabled.
    fn display_label(&self, parent: NodeIndex, child: NodeIndex) -> Result<String> {
        let tree = self.graph.tree();
        let label = tree.node(child).label();
        let parent_node = tree.node(parent);
        if !self.options.short_labels || parent == tree.root() || !parent_node.shortens_children()
        {
            return Ok(label.to_string());
        }

        let suffix = label
            .strip_prefix(parent_node.label())
            .and_then(|rest| rest.strip_prefix('.'))
            .filter(|rest| !rest.is_empty());
        match suffix {
            Some(rest) => Ok(format!("{SHORT_LABEL_MARKER}{rest}")),
            None if self.options.view_type.is_primary() => Err(Error::invariant_violation(format!(
                "label '{label}' does not start with its group's label '{}'",
                parent_node.label()
            ))
            .with_operation("image::display_label")
            .with_context("group", parent_node.id().encode())
            .with_context("node", tree.node(child).id().encode())),
            None => {
                warn!(label, group = parent_node.label(), "label not shortened");
                Ok(label.to_string())
            }
        }
    }

    fn edges(&mut self) -> Result<Vec<ImageEdge>> {
        let tree = self.graph.tree();
        let mut out = Vec::with_capacity(self.graph.edges().len());
        for edge in self.graph.edges().values() {
            let client = tree.lookup(&edge.client_id)?;
            let server = tree.lookup(&edge.server_id)?;
            let client_node = tree.node(client);
            let server_node = tree.node(server);

            let kind = if client_node.is_leaf() && server_node.is_leaf() {
                EdgeKind::Leaf
            } else {
                EdgeKind::Group
            };
            let labels: BTreeSet<&str> = edge.labels.iter().map(String::as_str).collect();
            let joined = labels.iter().copied().collect::<Vec<_>>().join("\n");

            let mut tooltip = format!("{} -> {}", client_node.label(), server_node.label());
            if !joined.is_empty() {
                tooltip.push('\n');
                tooltip.push_str(&joined);
            }
            let label = (!joined.is_empty() && self.options.edge_labels.shows(kind)).then_some(joined);

            let class_name = match kind {
                EdgeKind::Leaf => CLASS_LEAF_EDGE,
                EdgeKind::Group => CLASS_GROUP_EDGE,
            };
            self.side_table
                .insert(edge.edge_id.as_str(), class_name, Some(tooltip.clone()));
            if label.is_some() {
                self.side_table
                    .insert(edge.edge_id.label_id(), CLASS_EDGE_LABEL, Some(tooltip.clone()));
            }

            let bridges = |idx: NodeIndex, id: &NodeId| {
                (!tree.node(idx).is_leaf() && self.graph.is_expanded(idx)).then(|| id.clone())
            };
            out.push(ImageEdge {
                edge_id: edge.edge_id.clone(),
                client_id: edge.client_id.clone(),
                server_id: edge.server_id.clone(),
                label,
                tooltip,
                kind,
                ltail: bridges(client, &edge.client_id),
                lhead: bridges(server, &edge.server_id),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asmgraph_core::{
        ArtificialIdFactory, Edges, GraphFilter, HierarchyOptions, LeafKind, PrefixClustering,
        Tree, ViewType, apply_filter, build_tree,
    };
    use asmgraph_error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn ns(name: &str) -> NodeId {
        NodeId::namespace(name).unwrap()
    }

    fn tree_of(names: &[&str]) -> Tree {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        build_tree(
            &names,
            &[],
            LeafKind::Namespace,
            HierarchyOptions::default(),
            &PrefixClustering::default(),
            &mut ArtificialIdFactory::new(),
        )
        .unwrap()
        .tree
    }

    fn image(projection: Projection) -> (ImageData, SideTable) {
        match projection {
            Projection::Image { image, side_table } => (image, side_table),
            Projection::TooLarge(msg) => panic!("unexpected: {msg}"),
        }
    }

    #[test]
    fn test_collapsed_group_becomes_box() {
        let tree = tree_of(&["Core.A", "Core.B", "App"]);
        let mut edges = Edges::new();
        edges.add_or_update(ns("App"), ns("Core.A"), ["Run", "Init", "Run"], true);
        let filter = GraphFilter::all_visible(&tree);
        let graph = apply_filter(&tree, &edges, &filter).unwrap();

        let (image, side) =
            image(project(&graph, &ViewOptions::new(ViewType::Methods), &StyleOverrides::new()).unwrap());
        assert_eq!(image.nodes.len(), 2);
        match &image.nodes[0] {
            ImageNode::Group(b) => {
                assert_eq!(b.label, "Core");
                assert_eq!(b.shape, Shape::Folder);
            }
            other => panic!("expected a group, got {other:?}"),
        }
        let edge = &image.edges[0];
        assert_eq!(edge.kind, EdgeKind::Group);
        // remapped server edges carry the entry child's label, and group labels are hidden
        assert_eq!(edge.label, None);
        assert_eq!(edge.tooltip, "App -> Core\nCore.A");

        let group_id = image.nodes[0].id().encode();
        assert_eq!(side.get(&group_id).unwrap().class_name, CLASS_CLOSED);
        assert_eq!(side.get(edge.edge_id.as_str()).unwrap().class_name, CLASS_GROUP_EDGE);
        assert_eq!(side.get("namespace|App").unwrap().class_name, CLASS_LEAF);
    }

    #[test]
    fn test_expanded_group_and_short_labels() {
        let tree = tree_of(&["Core.A", "Core.B", "App"]);
        let mut edges = Edges::new();
        edges.add_or_update(ns("App"), ns("Core.A"), ["Run", "Init", "Run"], true);
        let mut filter = GraphFilter::all_visible(&tree);
        let core = tree.node(tree.node(tree.root()).children()[0]).id().clone();
        filter.set_group_expanded(core.clone(), true);
        let graph = apply_filter(&tree, &edges, &filter).unwrap();

        let (image, side) =
            image(project(&graph, &ViewOptions::new(ViewType::Methods), &StyleOverrides::new()).unwrap());
        let ImageNode::Subgraph(sub) = &image.nodes[0] else {
            panic!("expected a subgraph");
        };
        assert_eq!(sub.children.len(), 1);
        assert_eq!(sub.children[0].label(), "*A");
        assert_eq!(side.get(&core.encode()).unwrap().class_name, CLASS_EXPANDED);
        assert_eq!(side.get("namespace|Core.A").unwrap().tooltip.as_deref(), Some("Core.A"));

        let edge = &image.edges[0];
        assert_eq!(edge.kind, EdgeKind::Leaf);
        assert_eq!(edge.label.as_deref(), Some("Init\nRun"));
        assert!(side.contains(&edge.edge_id.label_id()));
        assert_eq!(edge.lhead, None);
    }

    #[test]
    fn test_unconnected_leaf_is_not_projected() {
        let tree = tree_of(&["A", "B", "C"]);
        let mut edges = Edges::new();
        edges.add_or_update(ns("A"), ns("B"), Vec::<String>::new(), true);
        let graph = apply_filter(&tree, &edges, &GraphFilter::all_visible(&tree)).unwrap();
        let (image, side) = image(
            project(&graph, &ViewOptions::new(ViewType::References), &StyleOverrides::new()).unwrap(),
        );
        let labels: Vec<&str> = image.nodes.iter().map(ImageNode::label).collect();
        assert_eq!(labels, vec!["A", "B"]);
        assert!(!side.contains("namespace|C"));
    }

    #[test]
    fn test_size_guard() {
        let tree = tree_of(&["A", "B", "C"]);
        let mut edges = Edges::new();
        edges.add_or_update(ns("A"), ns("B"), ["x"], true);
        edges.add_or_update(ns("B"), ns("C"), ["y"], true);
        let graph = apply_filter(&tree, &edges, &GraphFilter::all_visible(&tree)).unwrap();

        let options = ViewOptions::new(ViewType::References).with_limits(1000, 1);
        match project(&graph, &options, &StyleOverrides::new()).unwrap() {
            Projection::TooLarge(msg) => assert!(msg.contains("2 edges")),
            Projection::Image { .. } => panic!("expected the size guard"),
        }
    }

    #[test]
    fn test_size_guard_on_nodes_alone() {
        let tree = tree_of(&["A", "B", "C"]);
        let mut edges = Edges::new();
        edges.add_or_update(ns("A"), ns("B"), ["x"], true);
        edges.add_or_update(ns("B"), ns("C"), ["y"], true);
        let graph = apply_filter(&tree, &edges, &GraphFilter::all_visible(&tree)).unwrap();
        let styles = StyleOverrides::new();

        let options = ViewOptions::new(ViewType::References).with_limits(2, 1000);
        match project(&graph, &options, &styles).unwrap() {
            Projection::TooLarge(msg) => {
                assert!(msg.contains("3 nodes"));
                assert!(msg.contains("the 2 nodes"));
            }
            Projection::Image { .. } => panic!("expected the size guard"),
        }

        // limits are inclusive
        let options = ViewOptions::new(ViewType::References).with_limits(3, 1000);
        let (image, _) = image(project(&graph, &options, &styles).unwrap());
        assert_eq!(image.all_nodes().len(), 3);
    }

    #[test]
    fn test_style_override() {
        let tree = tree_of(&["A", "B"]);
        let mut edges = Edges::new();
        edges.add_or_update(ns("A"), ns("B"), ["x"], true);
        let graph = apply_filter(&tree, &edges, &GraphFilter::all_visible(&tree)).unwrap();
        let mut styles = StyleOverrides::new();
        styles.set_shape(ns("B"), Shape::Note);
        let (image, _) = image(project(&graph, &ViewOptions::new(ViewType::Custom), &styles).unwrap());
        let shapes: Vec<Shape> = image
            .nodes
            .iter()
            .map(|n| match n {
                ImageNode::Node(b) => b.shape,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(shapes, vec![Shape::Tab, Shape::Note]);
    }

    fn mismatched_tree() -> Tree {
        let mut tree = Tree::new(NodeId::custom_folder("root").unwrap(), "");
        let g = tree
            .add_group(tree.root(), NodeId::custom_folder("g").unwrap(), "Core", true)
            .unwrap();
        tree.add_leaf(g, ns("Other.Thing"), "Other.Thing").unwrap();
        tree.add_leaf(g, ns("Core.X"), "Core.X").unwrap();
        tree
    }

    #[test]
    fn test_prefix_mismatch() {
        let tree = mismatched_tree();
        let mut edges = Edges::new();
        edges.add_or_update(ns("Other.Thing"), ns("Core.X"), ["x"], true);
        let mut filter = GraphFilter::all_visible(&tree);
        filter.set_group_expanded(NodeId::custom_folder("g").unwrap(), true);
        let graph = apply_filter(&tree, &edges, &filter).unwrap();

        let err = project(&graph, &ViewOptions::new(ViewType::Apis), &StyleOverrides::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        assert_eq!(err.context_value("node"), Some("namespace|Other.Thing"));

        let (image, _) = image(
            project(&graph, &ViewOptions::new(ViewType::Custom), &StyleOverrides::new()).unwrap(),
        );
        let ImageNode::Subgraph(sub) = &image.nodes[0] else {
            panic!("expected a subgraph");
        };
        let labels: Vec<&str> = sub.children.iter().map(ImageNode::label).collect();
        assert_eq!(labels, vec!["Other.Thing", "*X"]);
    }

    #[test]
    fn test_image_data_serializes_tagged_nodes() {
        let tree = tree_of(&["A", "B"]);
        let mut edges = Edges::new();
        edges.add_or_update(ns("A"), ns("B"), Vec::<String>::new(), true);
        let graph = apply_filter(&tree, &edges, &GraphFilter::all_visible(&tree)).unwrap();
        let (image, _) = image(
            project(&graph, &ViewOptions::new(ViewType::References), &StyleOverrides::new()).unwrap(),
        );
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["nodes"][0]["type"], "node");
        assert_eq!(json["nodes"][0]["id"], "namespace|A");
        assert_eq!(json["edges"][0]["edgeId"], "namespace|A~namespace|B");
        assert_eq!(json["hasParentEdges"], false);
    }
}
