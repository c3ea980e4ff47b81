//! Hierarchy builder: turns a flat list of qualified names into a tree of
//! groups and leaves.
//!
//! Each leaf carries a path of [`GroupSegment`]s chosen by a [`Clustering`]
//! policy. Paths are merged into a draft tree, optionally truncated to one
//! level, single-leaf groups are optionally dissolved, and only then are ids
//! minted and the [`Tree`] materialized.

use std::collections::{BTreeMap, HashMap, HashSet};

use asmgraph_error::{Error, Result};
use tracing::debug;

use crate::id::{ArtificialIdFactory, NodeId};
use crate::tree::{NodeIndex, Tree};

/// One level of grouping on the way from the root to a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSegment {
    pub label: String,
    /// Explicit id for the group; an artificial group id is minted otherwise.
    pub id: Option<NodeId>,
    /// Labels below this group are expected to extend this group's label.
    pub shorten_children: bool,
}

impl GroupSegment {
    /// A group whose label is a qualifying prefix of its members.
    pub fn prefix(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: None,
            shorten_children: true,
        }
    }

    /// A group whose label is unrelated to its members' labels.
    pub fn bucket(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: None,
            shorten_children: false,
        }
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Chooses the group path for a leaf name. An empty path means "child of the root".
pub trait Clustering {
    fn cluster_path(&self, name: &str) -> Result<Vec<GroupSegment>>;
}

/// Groups by successive qualifying prefixes: `A.B.C` lands in `A` then `A.B`.
#[derive(Debug, Clone, Copy)]
pub struct PrefixClustering {
    separator: char,
}

impl Default for PrefixClustering {
    fn default() -> Self {
        Self { separator: '.' }
    }
}

impl PrefixClustering {
    pub fn new(separator: char) -> Self {
        Self { separator }
    }

    pub fn separator(&self) -> char {
        self.separator
    }
}

impl Clustering for PrefixClustering {
    fn cluster_path(&self, name: &str) -> Result<Vec<GroupSegment>> {
        let path = name
            .match_indices(self.separator)
            .map(|(at, _)| &name[..at])
            .filter(|prefix| !prefix.is_empty() && !prefix.ends_with(self.separator))
            .map(GroupSegment::prefix)
            .collect();
        Ok(path)
    }
}

/// Meta-bucket for assemblies that were referenced but not reflected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaBucket {
    DotNet,
    ThirdParty,
}

impl MetaBucket {
    pub fn of(assembly_name: &str) -> Self {
        let is_framework = matches!(assembly_name, "mscorlib" | "netstandard")
            || assembly_name == "System"
            || assembly_name.starts_with("System.")
            || assembly_name == "Microsoft"
            || assembly_name.starts_with("Microsoft.");
        if is_framework {
            MetaBucket::DotNet
        } else {
            MetaBucket::ThirdParty
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetaBucket::DotNet => ".NET",
            MetaBucket::ThirdParty => "3rd-party",
        }
    }
}

/// Assembly names with reflection data group by prefix; the rest go to a
/// meta-bucket.
#[derive(Debug, Clone, Default)]
pub struct AssemblyClustering {
    known: HashSet<String>,
    prefix: PrefixClustering,
}

impl AssemblyClustering {
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: known.into_iter().map(Into::into).collect(),
            prefix: PrefixClustering::default(),
        }
    }
}

impl Clustering for AssemblyClustering {
    fn cluster_path(&self, name: &str) -> Result<Vec<GroupSegment>> {
        if self.known.contains(name) {
            self.prefix.cluster_path(name)
        } else {
            Ok(vec![GroupSegment::bucket(MetaBucket::of(name).label())])
        }
    }
}

/// Groups by caller-supplied layer tags; names without tags stay at the root.
#[derive(Debug, Clone)]
pub struct LayerClustering {
    group_by: String,
    layers: HashMap<String, Vec<String>>,
}

impl LayerClustering {
    pub fn new(group_by: impl Into<String>, layers: HashMap<String, Vec<String>>) -> Self {
        Self {
            group_by: group_by.into(),
            layers,
        }
    }
}

impl Clustering for LayerClustering {
    fn cluster_path(&self, name: &str) -> Result<Vec<GroupSegment>> {
        let Some(tags) = self.layers.get(name) else {
            return Ok(Vec::new());
        };
        let mut path = Vec::with_capacity(tags.len());
        for depth in 0..tags.len() {
            let qualified = tags[..=depth].join("/");
            let id = NodeId::custom_group(self.group_by.as_str(), qualified)?;
            path.push(GroupSegment::bucket(tags[depth].as_str()).with_id(id));
        }
        Ok(path)
    }
}

/// Name-based leaf id types the builder can mint from a plain name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Namespace,
    Assembly,
    CustomLeaf,
    CustomFolder,
}

impl LeafKind {
    pub fn node_id(&self, name: &str) -> Result<NodeId> {
        match self {
            LeafKind::Namespace => NodeId::namespace(name),
            LeafKind::Assembly => NodeId::assembly(name),
            LeafKind::CustomLeaf => NodeId::custom_leaf(name),
            LeafKind::CustomFolder => NodeId::custom_folder(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyOptions {
    /// Allow multi-level grouping; otherwise paths are cut to one level.
    pub nested: bool,
    /// Dissolve groups that hold exactly one leaf.
    pub ungroup_single: bool,
}

impl Default for HierarchyOptions {
    fn default() -> Self {
        Self {
            nested: true,
            ungroup_single: true,
        }
    }
}

/// A leaf to place in the hierarchy.
#[derive(Debug, Clone)]
pub struct LeafSpec {
    pub id: NodeId,
    /// Unique among the leaves of one build.
    pub name: String,
    /// Display text; may repeat across leaves.
    pub label: String,
    pub path: Vec<GroupSegment>,
}

/// Result of a build: the tree plus leaf lookup by unique name.
#[derive(Debug, Clone)]
pub struct BuiltTree {
    pub tree: Tree,
    pub leafs: HashMap<String, NodeIndex>,
}

impl BuiltTree {
    /// The root's direct children.
    pub fn groups(&self) -> &[NodeIndex] {
        self.tree.node(self.tree.root()).children()
    }

    pub fn leaf(&self, name: &str) -> Option<NodeIndex> {
        self.leafs.get(name).copied()
    }
}

/// Build a tree from plain names.
///
/// Names listed in `known_executables` stay at the root; every other name is
/// placed according to `clustering`.
pub fn build_tree(
    names: &[String],
    known_executables: &[String],
    leaf_kind: LeafKind,
    options: HierarchyOptions,
    clustering: &dyn Clustering,
    ids: &mut ArtificialIdFactory,
) -> Result<BuiltTree> {
    let exes: HashSet<&str> = known_executables.iter().map(String::as_str).collect();
    let mut leaves = Vec::with_capacity(names.len());
    for name in names {
        let path = if exes.contains(name.as_str()) {
            Vec::new()
        } else {
            clustering.cluster_path(name)?
        };
        leaves.push(LeafSpec {
            id: leaf_kind.node_id(name)?,
            name: name.clone(),
            label: name.clone(),
            path,
        });
    }
    build_hierarchy(leaves, options, ids)
}

/// Build a tree from fully specified leaves.
pub fn build_hierarchy(
    leaves: Vec<LeafSpec>,
    options: HierarchyOptions,
    ids: &mut ArtificialIdFactory,
) -> Result<BuiltTree> {
    let mut seen = HashSet::with_capacity(leaves.len());
    for leaf in &leaves {
        if !seen.insert(leaf.name.as_str()) {
            return Err(Error::duplicate_leaf_name(leaf.name.as_str())
                .with_operation("hierarchy::build"));
        }
    }

    let mut draft = Draft::default();
    for (i, leaf) in leaves.iter().enumerate() {
        let depth = if options.nested { leaf.path.len() } else { leaf.path.len().min(1) };
        let mut level = &mut draft;
        for segment in &leaf.path[..depth] {
            level = &mut level
                .groups
                .entry(segment.label.clone())
                .or_insert_with(|| DraftGroup {
                    id: segment.id.clone(),
                    shorten_children: segment.shorten_children,
                    body: Draft::default(),
                })
                .body;
        }
        level.leaves.push(i);
    }

    if options.ungroup_single {
        draft.ungroup_single();
    }

    let mut tree = Tree::new(ids.group(), "");
    let mut leafs = HashMap::with_capacity(leaves.len());
    let root = tree.root();
    materialize(&mut tree, root, draft, &leaves, ids, &mut leafs)?;

    debug!(
        leaves = leafs.len(),
        nodes = tree.len(),
        artificial = ids.issued(),
        "hierarchy built"
    );
    Ok(BuiltTree { tree, leafs })
}

#[derive(Debug, Default)]
struct Draft {
    groups: BTreeMap<String, DraftGroup>,
    /// Indices into the leaf list, kept in input order.
    leaves: Vec<usize>,
}

#[derive(Debug)]
struct DraftGroup {
    id: Option<NodeId>,
    shorten_children: bool,
    body: Draft,
}

impl Draft {
    fn ungroup_single(&mut self) {
        let mut promoted = Vec::new();
        self.groups.retain(|_, group| {
            group.body.ungroup_single();
            if group.body.groups.is_empty() && group.body.leaves.len() == 1 {
                promoted.push(group.body.leaves[0]);
                false
            } else {
                true
            }
        });
        if !promoted.is_empty() {
            self.leaves.extend(promoted);
            self.leaves.sort_unstable();
        }
    }
}

fn materialize(
    tree: &mut Tree,
    parent: NodeIndex,
    draft: Draft,
    leaves: &[LeafSpec],
    ids: &mut ArtificialIdFactory,
    leafs: &mut HashMap<String, NodeIndex>,
) -> Result<()> {
    for (label, group) in draft.groups {
        let id = group.id.unwrap_or_else(|| ids.group());
        let idx = tree.add_group(parent, id, label, group.shorten_children)?;
        materialize(tree, idx, group.body, leaves, ids, leafs)?;
    }
    for i in draft.leaves {
        let leaf = &leaves[i];
        let idx = tree.add_leaf(parent, leaf.id.clone(), leaf.label.as_str())?;
        leafs.insert(leaf.name.clone(), idx);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asmgraph_error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn labels_below(built: &BuiltTree, idx: NodeIndex) -> Vec<String> {
        built
            .tree
            .node(idx)
            .children()
            .iter()
            .map(|&c| built.tree.node(c).label().to_string())
            .collect()
    }

    fn build(list: &[&str], options: HierarchyOptions) -> BuiltTree {
        build_tree(
            &names(list),
            &[],
            LeafKind::Namespace,
            options,
            &PrefixClustering::default(),
            &mut ArtificialIdFactory::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_prefix_paths() {
        let clustering = PrefixClustering::default();
        let path: Vec<String> = clustering
            .cluster_path("A.B.C")
            .unwrap()
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(path, vec!["A", "A.B"]);
        assert!(clustering.cluster_path("Single").unwrap().is_empty());
    }

    #[test]
    fn test_nested_grouping() {
        let options = HierarchyOptions {
            nested: true,
            ungroup_single: false,
        };
        let built = build(&["A.B.C", "A.B.D", "A.E", "Z"], options);
        let root = built.tree.root();
        assert_eq!(labels_below(&built, root), vec!["A", "Z"]);

        let a = built.groups()[0];
        assert_eq!(labels_below(&built, a), vec!["A.B", "A.E"]);
        let ab = built.tree.node(a).children()[0];
        assert_eq!(labels_below(&built, ab), vec!["A.B.C", "A.B.D"]);
        assert_eq!(built.leafs.len(), 4);
    }

    #[test]
    fn test_flat_grouping_is_one_level() {
        let options = HierarchyOptions {
            nested: false,
            ungroup_single: false,
        };
        let built = build(&["A.B.C", "A.B.D", "A.E"], options);
        let a = built.groups()[0];
        assert_eq!(labels_below(&built, a), vec!["A.B.C", "A.B.D", "A.E"]);
    }

    #[test]
    fn test_ungroup_single_promotes_leaf() {
        let options = HierarchyOptions {
            nested: true,
            ungroup_single: true,
        };
        let built = build(&["A.B.C", "A.D", "A.E", "X.Y"], options);
        let root = built.tree.root();
        // X holds only X.Y, and A.B holds only A.B.C
        assert_eq!(labels_below(&built, root), vec!["A", "X.Y"]);
        let a = built.groups()[0];
        assert_eq!(labels_below(&built, a), vec!["A.B.C", "A.D", "A.E"]);
        let leaf = built.leaf("A.B.C").unwrap();
        assert_eq!(built.tree.node(leaf).parent(), Some(a));
    }

    #[test]
    fn test_duplicate_leaf_name() {
        let err = build_tree(
            &names(&["A", "B", "A"]),
            &[],
            LeafKind::Assembly,
            HierarchyOptions::default(),
            &PrefixClustering::default(),
            &mut ArtificialIdFactory::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateLeafName);
        assert_eq!(err.context_value("name"), Some("A"));
    }

    #[test]
    fn test_repeated_labels_with_distinct_names() {
        let leaf = |asm: &str| LeafSpec {
            id: NodeId::method(asm, 6).unwrap(),
            name: format!("{asm}/Shared.Run()"),
            label: "Shared.Run()".to_string(),
            path: vec![GroupSegment::bucket(asm).with_id(NodeId::assembly(asm).unwrap())],
        };
        let built = build_hierarchy(
            vec![leaf("Alpha"), leaf("Beta")],
            HierarchyOptions {
                nested: true,
                ungroup_single: false,
            },
            &mut ArtificialIdFactory::new(),
        )
        .unwrap();

        let alpha = built.leaf("Alpha/Shared.Run()").unwrap();
        let beta = built.leaf("Beta/Shared.Run()").unwrap();
        assert_ne!(alpha, beta);
        assert_eq!(built.tree.node(alpha).label(), "Shared.Run()");
        assert_eq!(built.tree.node(beta).label(), "Shared.Run()");
    }

    #[test]
    fn test_unique_names_give_unique_ids() {
        let built = build(
            &["A.B.C", "A.B.D", "A.E.F", "A.E.G", "H"],
            HierarchyOptions::default(),
        );
        let mut seen = HashSet::new();
        for (_, node) in built.tree.iter() {
            assert!(seen.insert(node.id().encode()), "duplicate {}", node.id());
        }
    }

    #[test]
    fn test_assembly_buckets_and_executables() {
        let clustering = AssemblyClustering::new(["App", "Core.Data", "Core.Web"]);
        let built = build_tree(
            &names(&["App", "Core.Data", "Core.Web", "System.Xml", "Newtonsoft.Json", "mscorlib"]),
            &names(&["App"]),
            LeafKind::Assembly,
            HierarchyOptions::default(),
            &clustering,
            &mut ArtificialIdFactory::new(),
        )
        .unwrap();

        let root = built.tree.root();
        assert_eq!(labels_below(&built, root), vec![".NET", "Core", "App", "Newtonsoft.Json"]);
        let dotnet = built.groups()[0];
        assert_eq!(labels_below(&built, dotnet), vec!["System.Xml", "mscorlib"]);
        assert!(!built.tree.node(dotnet).shortens_children());
    }

    #[test]
    fn test_layer_clustering_uses_custom_group_ids() {
        let mut layers = HashMap::new();
        layers.insert("orders".to_string(), vec!["domain".to_string()]);
        layers.insert("invoices".to_string(), vec!["domain".to_string()]);
        let built = build_tree(
            &names(&["orders", "invoices", "cli"]),
            &[],
            LeafKind::CustomLeaf,
            HierarchyOptions::default(),
            &LayerClustering::new("layer", layers),
            &mut ArtificialIdFactory::new(),
        )
        .unwrap();

        let domain = built.groups()[0];
        assert_eq!(
            built.tree.node(domain).id(),
            &NodeId::custom_group("layer", "domain").unwrap()
        );
        assert_eq!(labels_below(&built, domain), vec!["orders", "invoices"]);
    }

    #[test]
    fn test_builds_are_deterministic() {
        let first = build(&["A.B", "A.C", "D.E", "D.F"], HierarchyOptions::default());
        let second = build(&["A.B", "A.C", "D.E", "D.F"], HierarchyOptions::default());
        let ids = |b: &BuiltTree| b.tree.iter().map(|(_, n)| n.id().encode()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }
}
