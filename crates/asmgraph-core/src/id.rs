//! Typed node and edge identifiers and their flat string form.
//!
//! A node id encodes as `tag|field|field`, an edge id as `client~server`.
//! Names may contain neither separator, so both forms decode without
//! ambiguity and `decode(encode(x)) == x` holds for every variant.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use asmgraph_error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Separator between the tag and the fields of a node id.
pub const NODE_SEP: char = '|';
/// Separator between the two node ids of an edge id.
pub const EDGE_SEP: char = '~';

/// Appended by the renderer to an edge's id for the area of its label.
pub const EDGE_LABEL_SUFFIX: &str = "-label";

/// Discriminant of [`NodeId`], also the first field of its encoded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum NodeTag {
    Namespace,
    Assembly,
    Group,
    CustomLeaf,
    CustomFolder,
    Method,
    Type,
    Field,
    Event,
    Property,
    MemberException,
    CustomGroup,
    Attribute,
    Exception,
}

impl NodeTag {
    /// Number of fields following the tag in the encoded form.
    fn arity(self) -> usize {
        match self {
            NodeTag::Namespace
            | NodeTag::Assembly
            | NodeTag::CustomLeaf
            | NodeTag::CustomFolder
            | NodeTag::Group
            | NodeTag::MemberException => 1,
            NodeTag::Method
            | NodeTag::Type
            | NodeTag::Field
            | NodeTag::Event
            | NodeTag::Property
            | NodeTag::Attribute
            | NodeTag::Exception
            | NodeTag::CustomGroup => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}

/// A validated name field: non-empty and free of both separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdName(String);

impl IdName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_node_id(name, "name is empty"));
        }
        if name.contains(NODE_SEP) || name.contains(EDGE_SEP) {
            return Err(Error::invalid_node_id(
                name,
                format!("name contains a reserved separator ('{NODE_SEP}' or '{EDGE_SEP}')"),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a member or type inside a reflected assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetadataId {
    pub assembly_name: IdName,
    /// Zero is reserved by the metadata format and never identifies anything.
    pub metadata_token: NonZeroU32,
}

impl MetadataId {
    pub fn new(assembly_name: impl Into<String>, metadata_token: u32) -> Result<Self> {
        let assembly_name = IdName::new(assembly_name)?;
        let metadata_token = NonZeroU32::new(metadata_token).ok_or_else(|| {
            Error::invalid_node_id(
                format!("{assembly_name}{NODE_SEP}0"),
                "metadata token must be non-zero",
            )
        })?;
        Ok(Self {
            assembly_name,
            metadata_token,
        })
    }
}

/// Process-local key of an artificial node. Not stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtificialKey(NonZeroU32);

impl ArtificialKey {
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Typed identifier of every graph element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Namespace(IdName),
    Assembly(IdName),
    CustomLeaf(IdName),
    CustomFolder(IdName),
    Method(MetadataId),
    Type(MetadataId),
    Field(MetadataId),
    Event(MetadataId),
    Property(MetadataId),
    Attribute(MetadataId),
    Exception(MetadataId),
    CustomGroup { group_by: IdName, group_label: IdName },
    Group(ArtificialKey),
    MemberException(ArtificialKey),
}

impl NodeId {
    pub fn namespace(name: impl Into<String>) -> Result<Self> {
        Ok(NodeId::Namespace(IdName::new(name)?))
    }

    pub fn assembly(name: impl Into<String>) -> Result<Self> {
        Ok(NodeId::Assembly(IdName::new(name)?))
    }

    pub fn custom_leaf(name: impl Into<String>) -> Result<Self> {
        Ok(NodeId::CustomLeaf(IdName::new(name)?))
    }

    pub fn custom_folder(name: impl Into<String>) -> Result<Self> {
        Ok(NodeId::CustomFolder(IdName::new(name)?))
    }

    pub fn method(assembly_name: impl Into<String>, metadata_token: u32) -> Result<Self> {
        Ok(NodeId::Method(MetadataId::new(assembly_name, metadata_token)?))
    }

    pub fn type_(assembly_name: impl Into<String>, metadata_token: u32) -> Result<Self> {
        Ok(NodeId::Type(MetadataId::new(assembly_name, metadata_token)?))
    }

    pub fn custom_group(group_by: impl Into<String>, group_label: impl Into<String>) -> Result<Self> {
        Ok(NodeId::CustomGroup {
            group_by: IdName::new(group_by)?,
            group_label: IdName::new(group_label)?,
        })
    }

    pub fn tag(&self) -> NodeTag {
        match self {
            NodeId::Namespace(_) => NodeTag::Namespace,
            NodeId::Assembly(_) => NodeTag::Assembly,
            NodeId::CustomLeaf(_) => NodeTag::CustomLeaf,
            NodeId::CustomFolder(_) => NodeTag::CustomFolder,
            NodeId::Method(_) => NodeTag::Method,
            NodeId::Type(_) => NodeTag::Type,
            NodeId::Field(_) => NodeTag::Field,
            NodeId::Event(_) => NodeTag::Event,
            NodeId::Property(_) => NodeTag::Property,
            NodeId::Attribute(_) => NodeTag::Attribute,
            NodeId::Exception(_) => NodeTag::Exception,
            NodeId::CustomGroup { .. } => NodeTag::CustomGroup,
            NodeId::Group(_) => NodeTag::Group,
            NodeId::MemberException(_) => NodeTag::MemberException,
        }
    }

    /// True for ids minted by an [`ArtificialIdFactory`].
    pub fn is_artificial(&self) -> bool {
        matches!(self, NodeId::Group(_) | NodeId::MemberException(_))
    }

    pub fn encode(&self) -> String {
        let tag = self.tag().as_str();
        match self {
            NodeId::Namespace(name)
            | NodeId::Assembly(name)
            | NodeId::CustomLeaf(name)
            | NodeId::CustomFolder(name) => format!("{tag}{NODE_SEP}{name}"),
            NodeId::Method(meta)
            | NodeId::Type(meta)
            | NodeId::Field(meta)
            | NodeId::Event(meta)
            | NodeId::Property(meta)
            | NodeId::Attribute(meta)
            | NodeId::Exception(meta) => format!(
                "{tag}{NODE_SEP}{}{NODE_SEP}{}",
                meta.assembly_name, meta.metadata_token
            ),
            NodeId::CustomGroup {
                group_by,
                group_label,
            } => format!("{tag}{NODE_SEP}{group_by}{NODE_SEP}{group_label}"),
            NodeId::Group(key) | NodeId::MemberException(key) => {
                format!("{tag}{NODE_SEP}{}", key.get())
            }
        }
    }

    pub fn decode(text: &str) -> Result<Self> {
        let mut parts = text.split(NODE_SEP);
        let tag_text = parts.next().unwrap_or_default();
        let tag = NodeTag::from_str(tag_text)
            .map_err(|_| Error::invalid_node_id(text, format!("unrecognized tag '{tag_text}'")))?;
        let fields: Vec<&str> = parts.collect();
        if fields.len() != tag.arity() {
            return Err(Error::invalid_node_id(
                text,
                format!("tag '{tag}' expects {} field(s), found {}", tag.arity(), fields.len()),
            ));
        }

        let id = match tag {
            NodeTag::Namespace => NodeId::Namespace(IdName::new(fields[0])?),
            NodeTag::Assembly => NodeId::Assembly(IdName::new(fields[0])?),
            NodeTag::CustomLeaf => NodeId::CustomLeaf(IdName::new(fields[0])?),
            NodeTag::CustomFolder => NodeId::CustomFolder(IdName::new(fields[0])?),
            NodeTag::Method => NodeId::Method(decode_metadata(text, &fields)?),
            NodeTag::Type => NodeId::Type(decode_metadata(text, &fields)?),
            NodeTag::Field => NodeId::Field(decode_metadata(text, &fields)?),
            NodeTag::Event => NodeId::Event(decode_metadata(text, &fields)?),
            NodeTag::Property => NodeId::Property(decode_metadata(text, &fields)?),
            NodeTag::Attribute => NodeId::Attribute(decode_metadata(text, &fields)?),
            NodeTag::Exception => NodeId::Exception(decode_metadata(text, &fields)?),
            NodeTag::CustomGroup => NodeId::CustomGroup {
                group_by: IdName::new(fields[0])?,
                group_label: IdName::new(fields[1])?,
            },
            NodeTag::Group => NodeId::Group(decode_artificial(text, fields[0])?),
            NodeTag::MemberException => NodeId::MemberException(decode_artificial(text, fields[0])?),
        };
        Ok(id)
    }
}

fn decode_metadata(text: &str, fields: &[&str]) -> Result<MetadataId> {
    let token: u32 = fields[1]
        .parse()
        .map_err(|_| Error::invalid_node_id(text, format!("bad metadata token '{}'", fields[1])))?;
    MetadataId::new(fields[0], token)
}

fn decode_artificial(text: &str, field: &str) -> Result<ArtificialKey> {
    field
        .parse::<NonZeroU32>()
        .map(ArtificialKey)
        .map_err(|_| Error::invalid_node_id(text, format!("bad artificial key '{field}'")))
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NodeId::decode(s)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        NodeId::decode(&text).map_err(serde::de::Error::custom)
    }
}

/// Mints artificial ids for one graph-build session.
///
/// Keys start at 1. A factory is never shared between builds, so two builds
/// over the same input produce the same ids.
#[derive(Debug)]
pub struct ArtificialIdFactory {
    next: NonZeroU32,
}

impl Default for ArtificialIdFactory {
    fn default() -> Self {
        Self {
            next: NonZeroU32::MIN,
        }
    }
}

impl ArtificialIdFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(&mut self) -> NodeId {
        NodeId::Group(self.next_key())
    }

    pub fn member_exception(&mut self) -> NodeId {
        NodeId::MemberException(self.next_key())
    }

    /// Number of keys handed out so far.
    pub fn issued(&self) -> u32 {
        self.next.get() - 1
    }

    fn next_key(&mut self) -> ArtificialKey {
        let key = ArtificialKey(self.next);
        self.next = self.next.saturating_add(1);
        key
    }
}

/// Direction-sensitive identity of an edge from `client` to `server`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn new(client: &NodeId, server: &NodeId) -> Self {
        Self(encode_edge(client, server))
    }

    /// Validate `text` as an edge id.
    pub fn parse(text: &str) -> Result<Self> {
        split_edge(text)?;
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn endpoints(&self) -> Result<(NodeId, NodeId)> {
        split_edge(&self.0)
    }

    /// Diagram element id of the edge's label glyph, as the renderer
    /// derives it from the edge's `id` attribute.
    pub fn label_id(&self) -> String {
        format!("{}{EDGE_LABEL_SUFFIX}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for EdgeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

pub fn encode_edge(client: &NodeId, server: &NodeId) -> String {
    format!("{client}{EDGE_SEP}{server}")
}

/// True when `text` is an edge id (or an edge label id) rather than a node id.
pub fn is_edge_id_text(text: &str) -> bool {
    text.contains(EDGE_SEP)
}

fn split_edge(text: &str) -> Result<(NodeId, NodeId)> {
    let Some((client, server)) = text.split_once(EDGE_SEP) else {
        return Err(Error::invalid_node_id(text, "edge id lacks the edge separator"));
    };
    Ok((NodeId::decode(client)?, NodeId::decode(server)?))
}

/// Any id that can appear on a rendered diagram element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementId {
    Node(NodeId),
    Edge(EdgeId),
    EdgeLabel(EdgeId),
}

impl ElementId {
    /// Decode a node or edge id.
    ///
    /// Names may end in `-label`, so a label id cannot be told apart from an
    /// edge id by its text alone; use [`decode_edge_label`](Self::decode_edge_label)
    /// for elements known to be labels.
    pub fn decode(text: &str) -> Result<Self> {
        if is_edge_id_text(text) {
            Ok(ElementId::Edge(EdgeId::parse(text)?))
        } else {
            Ok(ElementId::Node(NodeId::decode(text)?))
        }
    }

    pub fn decode_edge_label(text: &str) -> Result<Self> {
        let edge = text
            .strip_suffix(EDGE_LABEL_SUFFIX)
            .ok_or_else(|| Error::invalid_node_id(text, "edge label id lacks the label suffix"))?;
        Ok(ElementId::EdgeLabel(EdgeId::parse(edge)?))
    }
}
