//! DOT text for an [`ImageData`].

use std::fmt::Write;

use asmgraph_core::{NodeId, ViewOptions};

use crate::image::{ImageData, ImageEdge, ImageNode};

/// Placeholder href; areas are wired up by element id after rendering.
pub const HREF_PLACEHOLDER: &str = "#";

/// Escape special characters for quoted DOT strings.
pub fn escape_label(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Quote an arbitrary string as a DOT id.
pub fn quote(input: &str) -> String {
    format!("\"{}\"", escape_label(input))
}

/// Name of the cluster subgraph drawn for an expanded group.
pub fn cluster_name(id: &NodeId) -> String {
    format!("cluster_{}", id.encode())
}

/// Write indentation to output.
pub fn write_indent(output: &mut String, level: usize) {
    for _ in 0..level {
        output.push_str("  ");
    }
}

fn write_attrs(output: &mut String, attrs: &[(&str, &str)]) {
    output.push('[');
    for (i, (key, value)) in attrs.iter().enumerate() {
        if i > 0 {
            output.push_str(", ");
        }
        let _ = write!(output, "{}={}", key, quote(value));
    }
    output.push(']');
}

/// A DOT graph builder for constructing valid DOT output.
pub struct DotBuilder {
    output: String,
    indent: usize,
}

impl DotBuilder {
    /// Create a new DOT graph with the given name.
    pub fn new(name: &str) -> Self {
        let mut output = String::with_capacity(4096);
        let _ = writeln!(output, "digraph {} {{", quote(name));
        Self { output, indent: 1 }
    }

    /// Add a graph attribute.
    pub fn attr(&mut self, key: &str, value: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "{}={};", key, quote(value));
        self
    }

    /// Add a default for every node.
    pub fn node_style(&mut self, attrs: &[(&str, &str)]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        self.output.push_str("node ");
        write_attrs(&mut self.output, attrs);
        self.output.push_str(";\n");
        self
    }

    /// Add a node with attributes.
    pub fn node(&mut self, id: &str, attrs: &[(&str, &str)]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = write!(self.output, "{} ", quote(id));
        write_attrs(&mut self.output, attrs);
        self.output.push_str(";\n");
        self
    }

    /// Add an edge with attributes.
    pub fn edge(&mut self, from: &str, to: &str, attrs: &[(&str, &str)]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = write!(self.output, "{} -> {} ", quote(from), quote(to));
        write_attrs(&mut self.output, attrs);
        self.output.push_str(";\n");
        self
    }

    /// Start a subgraph cluster.
    pub fn start_cluster(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "subgraph {} {{", quote(name));
        self.indent += 1;
        for (key, value) in attrs {
            write_indent(&mut self.output, self.indent);
            let _ = writeln!(self.output, "{}={};", key, quote(value));
        }
        self
    }

    /// End the current subgraph cluster.
    pub fn end_cluster(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        write_indent(&mut self.output, self.indent);
        self.output.push_str("}\n");
        self
    }

    /// Add a blank line for readability.
    pub fn blank(&mut self) -> &mut Self {
        self.output.push('\n');
        self
    }

    /// Finish building and return the DOT string.
    pub fn build(mut self) -> String {
        self.output.push_str("}\n");
        self.output
    }
}

/// Render an image description as DOT text.
pub fn write_dot(image: &ImageData, options: &ViewOptions) -> String {
    let mut dot = DotBuilder::new(options.view_type.as_str());
    if image.has_parent_edges {
        dot.attr("compound", "true");
    }
    dot.attr("rankdir", if options.vertical_align { "TB" } else { "LR" });
    dot.node_style(&[("fontname", "Helvetica"), ("fontsize", "10")]);
    dot.blank();

    write_level(&mut dot, &image.nodes, options.vertical_align);
    dot.blank();

    for edge in &image.edges {
        write_edge(&mut dot, image, edge);
    }
    dot.build()
}

fn write_level(dot: &mut DotBuilder, nodes: &[ImageNode], vertical_align: bool) {
    for node in nodes {
        match node {
            ImageNode::Node(b) | ImageNode::Group(b) => {
                let id = b.id.encode();
                let shape = b.shape.to_string();
                dot.node(
                    &id,
                    &[
                        ("shape", shape.as_str()),
                        ("id", id.as_str()),
                        ("label", b.label.as_str()),
                        ("href", HREF_PLACEHOLDER),
                    ],
                );
            }
            ImageNode::Subgraph(sub) => {
                let id = sub.id.encode();
                dot.start_cluster(
                    &cluster_name(&sub.id),
                    &[
                        ("id", id.as_str()),
                        ("label", sub.label.as_str()),
                        ("href", HREF_PLACEHOLDER),
                    ],
                );
                if sub.children.is_empty() {
                    // keeps the cluster drawable when it is only an edge endpoint
                    dot.node(&anchor_name(&sub.id), &[("shape", "point"), ("style", "invis")]);
                }
                write_level(dot, &sub.children, vertical_align);
                dot.end_cluster();
            }
        }
    }

    if vertical_align {
        let boxes: Vec<String> = nodes
            .iter()
            .filter(|n| !matches!(n, ImageNode::Subgraph(_)))
            .map(|n| n.id().encode())
            .collect();
        for pair in boxes.windows(2) {
            dot.edge(&pair[0], &pair[1], &[("style", "invis")]);
        }
    }
}

fn anchor_name(id: &NodeId) -> String {
    format!("{}~anchor", id.encode())
}

/// The DOT node an edge endpoint attaches to.
fn endpoint(image: &ImageData, id: &NodeId) -> String {
    match image.find(id) {
        Some(node) if matches!(node, ImageNode::Subgraph(_)) => node
            .anchor()
            .map(NodeId::encode)
            .unwrap_or_else(|| anchor_name(id)),
        _ => id.encode(),
    }
}

fn write_edge(dot: &mut DotBuilder, image: &ImageData, edge: &ImageEdge) {
    let from = endpoint(image, &edge.client_id);
    let to = endpoint(image, &edge.server_id);
    let ltail = edge.ltail.as_ref().map(cluster_name);
    let lhead = edge.lhead.as_ref().map(cluster_name);

    let mut attrs: Vec<(&str, &str)> = vec![
        ("id", edge.edge_id.as_str()),
        ("tooltip", edge.tooltip.as_str()),
        ("href", HREF_PLACEHOLDER),
    ];
    if let Some(label) = &edge.label {
        attrs.push(("label", label.as_str()));
    }
    if let Some(ltail) = &ltail {
        attrs.push(("ltail", ltail.as_str()));
    }
    if let Some(lhead) = &lhead {
        attrs.push(("lhead", lhead.as_str()));
    }
    dot.edge(&from, &to, &attrs);
}
