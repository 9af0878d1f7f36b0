//! Process-wide sharing of stores.

use crate::config::Config;
use crate::model::Model;
use crate::store::Store;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tabula_codec::FormatKind;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StoreKey {
    root: PathBuf,
    namespace: String,
    format: FormatKind,
}

/// Hands out one [`Store`] per root directory, namespace and format.
///
/// Handles opened over the same files share a store, and with it the
/// store's lock and its in-memory tables. The model and the remaining
/// configuration of the first caller win.
#[derive(Debug, Default)]
pub struct StoreCache {
    stores: Mutex<HashMap<StoreKey, Arc<Store>>>,
}

impl StoreCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide cache.
    pub fn global() -> &'static StoreCache {
        static GLOBAL: OnceLock<StoreCache> = OnceLock::new();
        GLOBAL.get_or_init(StoreCache::new)
    }

    /// Returns the store for `config`'s location, creating it over `model`
    /// if there is none yet.
    pub fn get_store(&self, model: &Arc<Model>, config: &Config) -> Arc<Store> {
        let key = StoreKey {
            root: config.root_dir().to_path_buf(),
            namespace: config.namespace.clone(),
            format: config.format,
        };
        let mut stores = self.stores.lock();
        let store = stores.entry(key).or_insert_with_key(|key| {
            debug!(root = %key.root.display(), namespace = %key.namespace, format = %key.format, "store opened");
            Arc::new(Store::new(Arc::clone(model), config.clone()))
        });
        Arc::clone(store)
    }

    /// Returns the number of cached stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.lock().len()
    }

    /// Returns whether no store is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.lock().is_empty()
    }

    /// Drops every cached store. Handles already given out keep working.
    pub fn clear(&self) {
        self.stores.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityKind, Property};
    use tabula_codec::ValueType;

    fn model() -> Arc<Model> {
        Arc::new(
            Model::builder()
                .entity(
                    EntityKind::builder("A")
                        .property(Property::new("Id", ValueType::Int32))
                        .key(["Id"]),
                )
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn same_location_shares_a_store() {
        let cache = StoreCache::new();
        let model = model();
        let config = Config::new().location("/tmp/tabula-cache").namespace("a");

        let first = cache.get_store(&model, &config);
        let second = cache.get_store(&model, &config.clone().sensitive_logging(true));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!second.config().sensitive_logging);

        let other_namespace = cache.get_store(&model, &config.clone().namespace("b"));
        let other_format = cache.get_store(&model, &config.clone().format(FormatKind::Csv));
        assert!(!Arc::ptr_eq(&first, &other_namespace));
        assert!(!Arc::ptr_eq(&first, &other_format));
        assert_eq!(cache.len(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }
}
