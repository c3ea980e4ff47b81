//! Per-view extraction of leaves, group paths and edges from the loaded data.

use std::collections::{BTreeSet, HashMap, HashSet};

use asmgraph_core::{
    ArtificialIdFactory, AssemblyClustering, BuiltTree, Clustering, Edges, GroupSegment,
    HierarchyOptions, LayerClustering, LeafKind, LeafSpec, NodeId, PrefixClustering, ViewType,
    build_hierarchy, build_tree,
};
use asmgraph_error::{Error, Result};
use tracing::{debug, trace};

use crate::model::{MethodInfo, Reflected, ViewData};

/// Group-by key for the layer groups of the custom view.
pub const LAYER_GROUP_BY: &str = "layer";

/// A built tree and every edge of the underlying data, before filtering.
#[derive(Debug, Clone)]
pub struct GraphSource {
    pub built: BuiltTree,
    pub edges: Edges,
}

/// Build the tree and edges for one view type.
///
/// Each call uses a fresh id factory, so identical input yields identical
/// group ids.
pub fn build_source(
    view_type: ViewType,
    data: &ViewData,
    options: HierarchyOptions,
) -> Result<GraphSource> {
    let mut ids = ArtificialIdFactory::new();
    let source = match view_type {
        ViewType::References => references(&data.reflected, options, &mut ids)?,
        ViewType::Methods => methods(&data.reflected, false, options, &mut ids)?,
        ViewType::Apis => methods(&data.reflected, true, options, &mut ids)?,
        ViewType::Custom => custom(data, options, &mut ids)?,
    };
    debug!(
        view = view_type.as_str(),
        leaves = source.built.leafs.len(),
        edges = source.edges.len(),
        "graph source built"
    );
    Ok(source)
}

fn references(
    reflected: &Reflected,
    options: HierarchyOptions,
    ids: &mut ArtificialIdFactory,
) -> Result<GraphSource> {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    names.extend(reflected.exes.iter().map(String::as_str));
    for (name, info) in &reflected.assemblies {
        names.insert(name.as_str());
        names.extend(info.referenced_assemblies.iter().map(String::as_str));
    }
    let names: Vec<String> = names.into_iter().map(str::to_string).collect();

    let clustering = AssemblyClustering::new(reflected.assemblies.keys().cloned());
    let built = build_tree(
        &names,
        &reflected.exes,
        LeafKind::Assembly,
        options,
        &clustering,
        ids,
    )?;

    let mut edges = Edges::new();
    for (name, info) in &reflected.assemblies {
        let client = NodeId::assembly(name.as_str())?;
        for reference in &info.referenced_assemblies {
            edges.add_or_update(
                client.clone(),
                NodeId::assembly(reference.as_str())?,
                Vec::<String>::new(),
                true,
            );
        }
    }
    Ok(GraphSource { built, edges })
}

/// Method call graph. With `apis_only`, only calls that cross an assembly
/// boundary are kept, and only methods taking part in them.
fn methods(
    reflected: &Reflected,
    apis_only: bool,
    options: HierarchyOptions,
    ids: &mut ArtificialIdFactory,
) -> Result<GraphSource> {
    let mut edges = Edges::new();
    let mut participants: HashSet<(&str, u32)> = HashSet::new();
    for (assembly, methods) in &reflected.assembly_methods {
        for (&token, method) in methods {
            for call in &method.calls {
                if apis_only && call.assembly_name == *assembly {
                    continue;
                }
                let Some(callee) = reflected.method(&call.assembly_name, call.metadata_token) else {
                    trace!(
                        assembly = call.assembly_name.as_str(),
                        token = call.metadata_token,
                        "call to a method that is not loaded"
                    );
                    continue;
                };
                edges.add_or_update(
                    NodeId::method(assembly.as_str(), token)?,
                    NodeId::method(call.assembly_name.as_str(), call.metadata_token)?,
                    [callee.name.as_str()],
                    true,
                );
                participants.insert((assembly.as_str(), token));
                participants.insert((call.assembly_name.as_str(), call.metadata_token));
            }
        }
    }

    let prefix = PrefixClustering::default();
    let mut leaves = Vec::new();
    for (assembly, methods) in &reflected.assembly_methods {
        for (&token, method) in methods {
            if apis_only && !participants.contains(&(assembly.as_str(), token)) {
                continue;
            }
            leaves.push(method_leaf(reflected, &prefix, assembly, token, method)?);
        }
    }

    let built = build_hierarchy(leaves, options, ids)?;
    Ok(GraphSource { built, edges })
}

/// A method leaf grouped as assembly, then namespace prefixes, then type.
///
/// The same type and method may be declared by several assemblies, so the
/// leaf's unique name carries the assembly while its label does not.
fn method_leaf(
    reflected: &Reflected,
    prefix: &PrefixClustering,
    assembly: &str,
    token: u32,
    method: &MethodInfo,
) -> Result<LeafSpec> {
    let declaring = reflected
        .assemblies
        .get(assembly)
        .and_then(|info| info.type_by_token(method.declaring_type))
        .ok_or_else(|| {
            Error::not_found(format!("type {assembly}|{}", method.declaring_type))
                .with_operation("views::method_leaf")
                .with_context("method", method.name.as_str())
        })?;
    let type_name = declaring.full_name();

    let mut path = vec![GroupSegment::bucket(assembly).with_id(NodeId::assembly(assembly)?)];
    if let Some(namespace) = declaring.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        path.extend(prefix.cluster_path(&format!("{namespace}.{}", declaring.name))?);
    }
    path.push(
        GroupSegment::prefix(type_name.as_str())
            .with_id(NodeId::type_(assembly, declaring.metadata_token)?),
    );

    let label = format!("{type_name}.{}", method.name);
    Ok(LeafSpec {
        id: NodeId::method(assembly, token)?,
        name: format!("{assembly}/{label}"),
        label,
        path,
    })
}

fn custom(
    data: &ViewData,
    options: HierarchyOptions,
    ids: &mut ArtificialIdFactory,
) -> Result<GraphSource> {
    let layers: HashMap<String, Vec<String>> = data
        .custom
        .iter()
        .map(|node| (node.id.clone(), node.layer_tags()))
        .filter(|(_, tags)| !tags.is_empty())
        .collect();
    let clustering = LayerClustering::new(LAYER_GROUP_BY, layers);

    let mut leaves = Vec::with_capacity(data.custom.len());
    let known: HashSet<&str> = data.custom.iter().map(|node| node.id.as_str()).collect();
    let mut edges = Edges::new();
    for node in &data.custom {
        let id = NodeId::custom_leaf(node.id.as_str())?;
        for dependency in &node.dependencies {
            if !known.contains(dependency.as_str()) {
                return Err(Error::not_found(dependency.as_str())
                    .with_operation("views::custom")
                    .with_context("node", node.id.as_str()));
            }
            edges.add_or_update(
                id.clone(),
                NodeId::custom_leaf(dependency.as_str())?,
                Vec::<String>::new(),
                true,
            );
        }
        leaves.push(LeafSpec {
            id,
            name: node.id.clone(),
            label: node.label.clone().unwrap_or_else(|| node.id.clone()),
            path: clustering.cluster_path(&node.id)?,
        });
    }

    let built = build_hierarchy(leaves, options, ids)?;
    Ok(GraphSource { built, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssemblyInfo, CustomNode, MethodRef, TypeInfo};
    use asmgraph_error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn method(name: &str, declaring_type: u32, calls: &[(&str, u32)]) -> MethodInfo {
        MethodInfo {
            name: name.to_string(),
            declaring_type,
            calls: calls
                .iter()
                .map(|&(assembly_name, metadata_token)| MethodRef {
                    assembly_name: assembly_name.to_string(),
                    metadata_token,
                })
                .collect(),
        }
    }

    fn two_assemblies() -> Reflected {
        let mut reflected = Reflected::new();
        reflected.assemblies.insert(
            "App".to_string(),
            AssemblyInfo {
                referenced_assemblies: vec!["Core".to_string()],
                types: vec![TypeInfo {
                    namespace: Some("App.Ui".to_string()),
                    name: "Main".to_string(),
                    metadata_token: 10,
                }],
            },
        );
        reflected.assemblies.insert(
            "Core".to_string(),
            AssemblyInfo {
                referenced_assemblies: vec!["System.Runtime".to_string()],
                types: vec![TypeInfo {
                    namespace: Some("Core".to_string()),
                    name: "Parser".to_string(),
                    metadata_token: 20,
                }],
            },
        );
        let app = reflected.assembly_methods.entry("App".to_string()).or_default();
        app.insert(1, method("Run()", 10, &[("Core", 5), ("App", 2), ("Missing", 9)]));
        app.insert(2, method("Draw()", 10, &[]));
        let core = reflected.assembly_methods.entry("Core".to_string()).or_default();
        core.insert(5, method("Parse(String)", 20, &[("Core", 6)]));
        core.insert(6, method("Next()", 20, &[]));
        reflected
    }

    fn data(reflected: Reflected) -> ViewData {
        ViewData {
            reflected,
            custom: Vec::new(),
        }
    }

    #[test]
    fn test_references_view() {
        let source =
            build_source(ViewType::References, &data(two_assemblies()), HierarchyOptions::default())
                .unwrap();
        let mut labels: Vec<&String> = source.built.leafs.keys().collect();
        labels.sort();
        assert_eq!(labels, vec!["App", "Core", "System.Runtime"]);
        assert_eq!(source.edges.len(), 2);
        assert!(source.edges.values().all(|e| e.labels.is_empty() && e.is_server_leaf));
    }

    #[test]
    fn test_methods_view_groups_by_type() {
        let source =
            build_source(ViewType::Methods, &data(two_assemblies()), HierarchyOptions::default())
                .unwrap();
        assert_eq!(source.built.leafs.len(), 4);
        assert!(source.built.leaf("Core/Core.Parser.Parse(String)").is_some());

        let run = NodeId::method("App", 1).unwrap();
        let parse = NodeId::method("Core", 5).unwrap();
        let edge = source
            .edges
            .values()
            .find(|e| e.client_id == run && e.server_id == parse)
            .unwrap();
        assert_eq!(edge.labels, vec!["Parse(String)"]);
        // the call into the unloaded assembly is dropped
        assert_eq!(source.edges.len(), 3);

        let tree = &source.built.tree;
        let leaf = source.built.leaf("App/App.Ui.Main.Run()").unwrap();
        let parent = tree.node(leaf).parent().unwrap();
        assert_eq!(tree.node(parent).id(), &NodeId::type_("App", 10).unwrap());
    }

    #[test]
    fn test_apis_view_keeps_cross_assembly_calls() {
        let source =
            build_source(ViewType::Apis, &data(two_assemblies()), HierarchyOptions::default())
                .unwrap();
        let mut labels: Vec<&String> = source.built.leafs.keys().collect();
        labels.sort();
        assert_eq!(labels, vec!["App/App.Ui.Main.Run()", "Core/Core.Parser.Parse(String)"]);
        assert_eq!(source.edges.len(), 1);
    }

    #[test]
    fn test_same_method_in_two_assemblies() {
        let attribute = "System.Runtime.CompilerServices";
        let mut reflected = Reflected::new();
        for assembly in ["Alpha", "Beta"] {
            reflected.assemblies.insert(
                assembly.to_string(),
                AssemblyInfo {
                    referenced_assemblies: Vec::new(),
                    types: vec![TypeInfo {
                        namespace: Some(attribute.to_string()),
                        name: "NullableAttribute".to_string(),
                        metadata_token: 30,
                    }],
                },
            );
            reflected
                .assembly_methods
                .entry(assembly.to_string())
                .or_default()
                .insert(4, method(".ctor(Byte)", 30, &[]));
        }

        let source =
            build_source(ViewType::Methods, &data(reflected), HierarchyOptions::default()).unwrap();
        let label = "System.Runtime.CompilerServices.NullableAttribute..ctor(Byte)";
        let tree = &source.built.tree;
        let alpha = source.built.leaf(&format!("Alpha/{label}")).unwrap();
        let beta = source.built.leaf(&format!("Beta/{label}")).unwrap();
        assert_eq!(tree.node(alpha).label(), label);
        assert_eq!(tree.node(beta).label(), label);
        assert_eq!(tree.node(alpha).id(), &NodeId::method("Alpha", 4).unwrap());
        assert_eq!(tree.node(beta).id(), &NodeId::method("Beta", 4).unwrap());
    }

    #[test]
    fn test_unknown_declaring_type() {
        let mut reflected = two_assemblies();
        reflected
            .assembly_methods
            .get_mut("Core")
            .unwrap()
            .insert(7, method("Lost()", 99, &[]));
        let err = build_source(ViewType::Methods, &data(reflected), HierarchyOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.context_value("method"), Some("Lost()"));
    }

    fn custom_node(id: &str, layer: Option<&str>, dependencies: &[&str]) -> CustomNode {
        CustomNode {
            id: id.to_string(),
            label: None,
            layer: layer.map(str::to_string),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_custom_view() {
        let data = ViewData {
            reflected: Reflected::new(),
            custom: vec![
                custom_node("cli", None, &["orders"]),
                custom_node("orders", Some("domain"), &["store"]),
                custom_node("invoices", Some("domain"), &["store"]),
                custom_node("store", Some("infra"), &[]),
            ],
        };
        let options = HierarchyOptions {
            nested: true,
            ungroup_single: false,
        };
        let source = build_source(ViewType::Custom, &data, options).unwrap();
        assert_eq!(source.edges.len(), 3);
        let tree = &source.built.tree;
        let orders = source.built.leaf("orders").unwrap();
        let group = tree.node(orders).parent().unwrap();
        assert_eq!(
            tree.node(group).id(),
            &NodeId::custom_group(LAYER_GROUP_BY, "domain").unwrap()
        );
    }

    #[test]
    fn test_custom_view_unknown_dependency() {
        let data = ViewData {
            reflected: Reflected::new(),
            custom: vec![custom_node("cli", None, &["ghost"])],
        };
        let err = build_source(ViewType::Custom, &data, HierarchyOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.context_value("key"), Some("ghost"));
    }
}
