//! Turns a filtered graph into something a renderer can draw.
//!
//! # Module Structure
//!
//! - [`image`]: projection of a [`VisibleGraph`](asmgraph_core::VisibleGraph) into [`ImageData`] and its side table
//! - [`dot`]: DOT text for an [`ImageData`]
//! - [`imagemap`]: clickable areas parsed back from the renderer's map output

pub mod dot;
pub mod image;
pub mod imagemap;

pub use dot::{DotBuilder, write_dot};
pub use image::{
    ElementAttributes, ImageBox, ImageData, ImageEdge, ImageNode, ImageSubgraph, Projection, Shape,
    SideTable, StyleOverrides, default_shape, project,
};
pub use imagemap::{Area, parse_image_map};
