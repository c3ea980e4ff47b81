//! Input documents: reflection output and custom layer graphs.

use std::collections::BTreeMap;

use asmgraph_error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Version of the reflection document this build understands.
pub const DATA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    pub metadata_token: u32,
}

impl TypeInfo {
    pub fn full_name(&self) -> String {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => format!("{ns}.{}", self.name),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssemblyInfo {
    pub referenced_assemblies: Vec<String>,
    pub types: Vec<TypeInfo>,
}

impl AssemblyInfo {
    pub fn type_by_token(&self, token: u32) -> Option<&TypeInfo> {
        self.types.iter().find(|t| t.metadata_token == token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodRef {
    pub assembly_name: String,
    pub metadata_token: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodInfo {
    /// Name including the parameter list, e.g. `Parse(String)`.
    pub name: String,
    /// Metadata token of the declaring type.
    pub declaring_type: u32,
    #[serde(default)]
    pub calls: Vec<MethodRef>,
}

/// The reflection backend's document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Reflected {
    pub version: u32,
    pub exes: Vec<String>,
    pub assemblies: BTreeMap<String, AssemblyInfo>,
    pub assembly_methods: BTreeMap<String, BTreeMap<u32, MethodInfo>>,
}

/// Outcome of reading a possibly cached document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Current(Reflected),
    /// Written by another version; must be derived again.
    Stale { found: u32 },
}

#[derive(Deserialize)]
struct VersionHeader {
    #[serde(default)]
    version: u32,
}

impl Reflected {
    pub fn new() -> Self {
        Self {
            version: DATA_VERSION,
            ..Self::default()
        }
    }

    pub fn parse(text: &str) -> Result<Parsed> {
        let header: VersionHeader = serde_json::from_str(text).map_err(|e| {
            Error::deserialization_failed("reflection document is not valid JSON")
                .with_operation("model::parse")
                .set_source(e)
        })?;
        if header.version != DATA_VERSION {
            return Ok(Parsed::Stale {
                found: header.version,
            });
        }
        let reflected = serde_json::from_str(text).map_err(|e| {
            Error::deserialization_failed(format!("reflection document does not match: {e}"))
                .with_operation("model::parse")
                .set_source(e)
        })?;
        Ok(Parsed::Current(reflected))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            Error::serialization_failed("cannot write reflection document")
                .with_operation("model::to_json")
                .set_source(e)
        })
    }

    pub fn method(&self, assembly_name: &str, token: u32) -> Option<&MethodInfo> {
        self.assembly_methods.get(assembly_name)?.get(&token)
    }
}

/// A node of a caller-defined layer graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Slash-separated layer path, e.g. `domain/orders`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl CustomNode {
    pub fn layer_tags(&self) -> Vec<String> {
        self.layer
            .as_deref()
            .map(|layer| {
                layer
                    .split('/')
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Everything the views are built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewData {
    pub reflected: Reflected,
    pub custom: Vec<CustomNode>,
}
