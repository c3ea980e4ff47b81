//! Table store, cached reflection data and persisted filters.

use std::collections::HashMap;

use asmgraph_core::{GraphFilter, NodeIdList, TypedSet, ViewOptions, ViewType};
use asmgraph_error::{Error, Result};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::model::{Parsed, Reflected};

pub const TABLE_REFLECTED: &str = "reflected";
pub const TABLE_LEAF_VISIBLE: &str = "leafVisible";
pub const TABLE_GROUP_EXPANDED: &str = "groupExpanded";
pub const TABLE_VIEW_OPTIONS: &str = "viewOptions";

/// Key/value tables owned by the host application.
pub trait TableStore: Send + Sync {
    fn get(&self, table: &str, key: &str) -> Option<String>;
    fn put(&self, table: &str, key: &str, value: String);
}

/// In-process [`TableStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryStore {
    fn get(&self, table: &str, key: &str) -> Option<String> {
        self.tables.read().get(table)?.get(key).cloned()
    }

    fn put(&self, table: &str, key: &str, value: String) {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}

impl<T: TableStore + ?Sized> TableStore for &T {
    fn get(&self, table: &str, key: &str) -> Option<String> {
        (**self).get(table, key)
    }

    fn put(&self, table: &str, key: &str, value: String) {
        (**self).put(table, key, value)
    }
}

/// Produces a fresh reflection document when the cache cannot be used.
pub trait ReflectionBackend {
    fn reflect(&self) -> Result<String>;
}

impl<F> ReflectionBackend for F
where
    F: Fn() -> Result<String>,
{
    fn reflect(&self) -> Result<String> {
        self()
    }
}

/// Reads reflection data from the store, deriving it again when it is
/// missing or was written by another version.
#[derive(Debug, Clone)]
pub struct DataLoader {
    key: String,
}

impl DataLoader {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn load(&self, store: &dyn TableStore, backend: &dyn ReflectionBackend) -> Result<Reflected> {
        match store.get(TABLE_REFLECTED, &self.key) {
            Some(text) => match Reflected::parse(&text)? {
                Parsed::Current(reflected) => {
                    debug!(key = self.key.as_str(), "reflection cache hit");
                    return Ok(reflected);
                }
                Parsed::Stale { found } => {
                    info!(key = self.key.as_str(), found, "reflection cache is stale");
                }
            },
            None => debug!(key = self.key.as_str(), "reflection cache miss"),
        }

        let text = backend
            .reflect()
            .map_err(|e| e.with_operation("loader::reflect"))?;
        let reflected = match Reflected::parse(&text)? {
            Parsed::Current(reflected) => reflected,
            Parsed::Stale { found } => {
                return Err(Error::deserialization_failed(format!(
                    "backend produced version {found}, expected {}",
                    crate::model::DATA_VERSION
                ))
                .with_operation("loader::load")
                .with_context("key", self.key.as_str()));
            }
        };
        store.put(TABLE_REFLECTED, &self.key, text);
        Ok(reflected)
    }
}

/// Filters and options persisted per view.
pub struct FilterRepository<'s> {
    store: &'s dyn TableStore,
}

impl<'s> FilterRepository<'s> {
    pub fn new(store: &'s dyn TableStore) -> Self {
        Self { store }
    }

    fn filter_key(view_type: ViewType, cluster_by: &str) -> String {
        format!("{view_type}/{cluster_by}")
    }

    /// The stored filter, or `None` when the view was never filtered.
    pub fn load_filter(&self, options: &ViewOptions) -> Result<Option<GraphFilter>> {
        let key = Self::filter_key(options.view_type, &options.cluster_by());
        let leaf_visible = self.load_set(TABLE_LEAF_VISIBLE, &key)?;
        let group_expanded = self.load_set(TABLE_GROUP_EXPANDED, &key)?;
        Ok(leaf_visible.map(|leaf_visible| GraphFilter {
            leaf_visible,
            group_expanded: group_expanded.unwrap_or_default(),
            is_check_model_all: options.has_parent_edges,
        }))
    }

    pub fn save_filter(&self, options: &ViewOptions, filter: &GraphFilter) -> Result<()> {
        let key = Self::filter_key(options.view_type, &options.cluster_by());
        self.save(TABLE_LEAF_VISIBLE, &key, &NodeIdList::from(&filter.leaf_visible))?;
        self.save(TABLE_GROUP_EXPANDED, &key, &NodeIdList::from(&filter.group_expanded))
    }

    pub fn load_options(&self, view_type: ViewType) -> Result<ViewOptions> {
        let stored: Option<ViewOptions> = self.load(TABLE_VIEW_OPTIONS, view_type.as_str())?;
        Ok(stored.unwrap_or_else(|| ViewOptions::new(view_type)))
    }

    pub fn save_options(&self, options: &ViewOptions) -> Result<()> {
        self.save(TABLE_VIEW_OPTIONS, options.view_type.as_str(), options)
    }

    fn load_set(&self, table: &str, key: &str) -> Result<Option<TypedSet>> {
        let list: Option<NodeIdList> = self.load(table, key)?;
        list.map(|list| list.to_set()).transpose()
    }

    fn load<T: DeserializeOwned>(&self, table: &str, key: &str) -> Result<Option<T>> {
        let Some(text) = self.store.get(table, key) else {
            return Ok(None);
        };
        serde_json::from_str(&text).map(Some).map_err(|e| {
            Error::deserialization_failed(format!("cannot read {table} entry"))
                .with_operation("filters::load")
                .with_context("key", key)
                .set_source(e)
        })
    }

    fn save<T: Serialize>(&self, table: &str, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value).map_err(|e| {
            Error::serialization_failed(format!("cannot write {table} entry"))
                .with_operation("filters::save")
                .with_context("key", key)
                .set_source(e)
        })?;
        self.store.put(table, key, text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DATA_VERSION;
    use asmgraph_core::NodeId;
    use asmgraph_error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    struct CountingBackend {
        calls: Cell<u32>,
        text: String,
    }

    impl ReflectionBackend for CountingBackend {
        fn reflect(&self) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.text.clone())
        }
    }

    fn current_text() -> String {
        let mut reflected = Reflected::new();
        reflected.exes.push("App".to_string());
        reflected.to_json().unwrap()
    }

    #[test]
    fn test_loader_caches_and_rederives() {
        let store = MemoryStore::new();
        let backend = CountingBackend {
            calls: Cell::new(0),
            text: current_text(),
        };
        let loader = DataLoader::new("solution");

        let first = loader.load(&store, &backend).unwrap();
        assert_eq!(first.exes, vec!["App"]);
        assert_eq!(backend.calls.get(), 1);

        loader.load(&store, &backend).unwrap();
        assert_eq!(backend.calls.get(), 1);

        store.put(TABLE_REFLECTED, "solution", r#"{"version": 0}"#.to_string());
        loader.load(&store, &backend).unwrap();
        assert_eq!(backend.calls.get(), 2);
        assert_eq!(
            store.get(TABLE_REFLECTED, "solution"),
            Some(current_text())
        );
    }

    #[test]
    fn test_loader_rejects_stale_backend_output() {
        let store = MemoryStore::new();
        let stale = || -> Result<String> { Ok(format!(r#"{{"version": {}}}"#, DATA_VERSION + 1)) };
        let err = DataLoader::new("x").load(&store, &stale).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeserializationFailed);
        assert!(store.get(TABLE_REFLECTED, "x").is_none());
    }

    #[test]
    fn test_filter_round_trip() {
        let store = MemoryStore::new();
        let repo = FilterRepository::new(&store);
        let options = ViewOptions::new(ViewType::References).with_parent_edges(true);
        assert_eq!(repo.load_filter(&options).unwrap(), None);

        let mut filter = GraphFilter::default();
        filter.set_leaf_visible(NodeId::assembly("A").unwrap(), true);
        filter.set_group_expanded(NodeId::assembly("G").unwrap(), true);
        repo.save_filter(&options, &filter).unwrap();

        assert_eq!(
            store.get(TABLE_LEAF_VISIBLE, "references/nested+ungroup"),
            Some(r#"{"nodeIds":["assembly|A"]}"#.to_string())
        );
        let loaded = repo.load_filter(&options).unwrap().unwrap();
        assert_eq!(loaded.leaf_visible, filter.leaf_visible);
        assert_eq!(loaded.group_expanded, filter.group_expanded);
        assert!(loaded.is_check_model_all);

        // another grouping keeps its own filter
        let flat = options.clone().with_nested(false);
        assert_eq!(repo.load_filter(&flat).unwrap(), None);
    }

    #[test]
    fn test_options_round_trip() {
        let store = MemoryStore::new();
        let repo = FilterRepository::new(&store);
        assert_eq!(repo.load_options(ViewType::Apis).unwrap(), ViewOptions::new(ViewType::Apis));

        let options = ViewOptions::new(ViewType::Apis).with_short_labels(false);
        repo.save_options(&options).unwrap();
        assert_eq!(repo.load_options(ViewType::Apis).unwrap(), options);

        store.put(TABLE_VIEW_OPTIONS, "apis", "{".to_string());
        let err = repo.load_options(ViewType::Apis).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeserializationFailed);
    }
}
