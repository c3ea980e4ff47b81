//! Graph model for assembly diagrams: typed ids, collections, the node tree,
//! hierarchy building and the visibility/collapse engine.

pub mod collections;
pub mod filter;
pub mod hierarchy;
pub mod id;
pub mod options;
pub mod tree;
pub mod visibility;

pub use collections::{Edge, Edges, TypedMap, TypedSet};
pub use filter::{GraphFilter, NodeIdList};
pub use hierarchy::{
    AssemblyClustering, BuiltTree, Clustering, GroupSegment, HierarchyOptions, LayerClustering,
    LeafKind, LeafSpec, MetaBucket, PrefixClustering, build_hierarchy, build_tree,
};
pub use id::{
    ArtificialIdFactory, ArtificialKey, EDGE_LABEL_SUFFIX, EDGE_SEP, EdgeId, ElementId, IdName, MetadataId,
    NODE_SEP, NodeId, NodeTag, encode_edge, is_edge_id_text,
};
pub use options::{EdgeKind, EdgeLabelOptions, ViewOptions, ViewType};
pub use tree::{NodeIndex, NodeKind, Tree, TreeNode};
pub use visibility::{ClosedBy, VisibleGraph, apply_filter};

pub use asmgraph_error::{Error, ErrorKind, Result};
