//! data lookups
//!
//! `data "<provider>" "<name>" { ... }` blocks describe external resources. The first reference to
//! `data.<provider>.<name>` calls the registered provider with the fully resolved block properties. The result
//! is kept in a [LookupCache] for the remainder of the parse.
use crate::value::{Map, Value};
use std::sync::Arc;

/// A data lookup provider: receives the resolved properties and returns the resource attributes
pub type DataLookup = Arc<dyn Fn(&Map) -> anyhow::Result<Map> + Send + Sync>;

#[derive(Clone, Default)]
pub struct DataLookupRegistry {
    providers: indexmap::IndexMap<String, DataLookup>,
}

impl DataLookupRegistry {
    pub fn register<F>(&mut self, name: impl Into<String>, lookup: F)
    where
        F: Fn(&Map) -> anyhow::Result<Map> + Send + Sync + 'static,
    {
        self.providers.insert(name.into(), Arc::new(lookup));
    }

    pub fn get(&self, name: &str) -> Option<&DataLookup> {
        self.providers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for DataLookupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Lookup results of one parse, keyed by provider and instance name
#[derive(Debug, Default)]
pub struct LookupCache {
    providers: indexmap::IndexMap<String, Map>,
}

impl LookupCache {
    pub fn get(&self, provider: &str, name: &str) -> Option<&Value> {
        self.providers.get(provider)?.get(name)
    }

    pub fn insert(&mut self, provider: &str, name: &str, value: Value) {
        self.providers
            .entry(provider.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    pub fn provider(&self, provider: &str) -> Option<&Map> {
        self.providers.get(provider)
    }

    /// All cached results as `provider -> name -> result`
    pub fn to_value(&self) -> Value {
        self.providers
            .iter()
            .map(|(provider, results)| (provider, Value::Map(results.clone())))
            .collect()
    }
}
