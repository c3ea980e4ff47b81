//! Clickable areas from the renderer's client-side image map.

use std::sync::LazyLock;

use asmgraph_core::ElementId;
use asmgraph_error::{Error, Result};
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::{debug, warn};

use crate::image::{CLASS_EDGE_LABEL, SideTable};

static AREA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<area\b([^>]*?)/?>").expect("valid area regex"));
static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)="([^"]*)""#).expect("valid attribute regex"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|amp|lt|gt|quot|apos);").expect("valid entity regex")
});

/// One clickable region of the rendered image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: String,
    pub shape: String,
    pub coords: Vec<i32>,
    pub class_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl Area {
    /// The node, edge or edge label this area stands for.
    ///
    /// Label ids are only recognized through the side-table class, since a
    /// name may itself end in the label suffix.
    pub fn target(&self) -> Result<ElementId> {
        if self.class_name == CLASS_EDGE_LABEL {
            ElementId::decode_edge_label(&self.id)
        } else {
            ElementId::decode(&self.id)
        }
    }
}

/// Decode the HTML entities the renderer writes into attribute values.
pub fn unescape(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => {
                    let code = match entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => entity[1..].parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Parse `<area .../>` elements and join them with the side table.
///
/// Areas without an id, or whose id the side table does not know, are skipped.
pub fn parse_image_map(map: &str, side_table: &SideTable) -> Result<Vec<Area>> {
    let mut areas = Vec::new();
    for area in AREA_RE.captures_iter(map) {
        let mut id = None;
        let mut shape = String::from("rect");
        let mut coords = Vec::new();
        let mut title = None;
        for attr in ATTR_RE.captures_iter(&area[1]) {
            let value = unescape(&attr[2]);
            match &attr[1] {
                "id" => id = Some(value),
                "shape" => shape = value,
                "coords" => coords = parse_coords(&value)?,
                "title" => title = Some(value),
                _ => {}
            }
        }

        let Some(id) = id else {
            continue;
        };
        let Some(attributes) = side_table.get(&id) else {
            warn!(id = %id, "image map area has no side table entry");
            continue;
        };
        areas.push(Area {
            class_name: attributes.class_name.clone(),
            tooltip: attributes.tooltip.clone().or(title),
            id,
            shape,
            coords,
        });
    }
    debug!(areas = areas.len(), "image map parsed");
    Ok(areas)
}

fn parse_coords(text: &str) -> Result<Vec<i32>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>().map_err(|e| {
                Error::deserialization_failed(format!("bad area coordinate '{part}'"))
                    .with_operation("imagemap::parse")
                    .set_source(e)
            })
        })
        .collect()
}
