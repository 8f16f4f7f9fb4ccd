//! Per-instance dirty tracking.
//!
//! The cache holds decoded values only. A stored string is decoded once on
//! load; assignments are coerced to the attribute kind before they reach
//! the cache. Every comparison is therefore between two decoded values.

use crate::schema::{AttributeDefinition, AttributeSchema};
use kvattr_codec::Value;
use std::collections::BTreeMap;

/// State of one scalar attribute in one owner instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// Not read from the store yet.
    Unloaded,
    /// Read from the store, or known to be absent there.
    Loaded {
        /// The value as last assigned. `Null` means absent.
        current: Value,
        /// The value last known to match the store. `Null` means absent.
        baseline: Value,
    },
}

impl CacheEntry {
    /// An entry whose store value is known.
    pub fn loaded(value: Value) -> Self {
        CacheEntry::Loaded {
            current: value.clone(),
            baseline: value,
        }
    }

    /// Returns true unless the entry is [`CacheEntry::Unloaded`].
    pub fn is_loaded(&self) -> bool {
        matches!(self, CacheEntry::Loaded { .. })
    }
}

/// Current and baseline values of every scalar attribute of one owner.
///
/// An attribute is dirty when its current value, with the default
/// substituted for `Null`, differs from its baseline treated the same way.
/// Assigning a value back to what the baseline holds makes it clean again.
///
/// The cache does no I/O; [`crate::RemoteAttributes`] loads and persists
/// around it.
#[derive(Debug, Clone, Default)]
pub struct AttributeCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl AttributeCache {
    /// Entries for every scalar attribute, all known absent from the store.
    pub fn absent(schema: &AttributeSchema) -> Self {
        Self::filled(schema, || CacheEntry::loaded(Value::Null))
    }

    /// Entries for every scalar attribute, none read yet.
    pub fn unloaded(schema: &AttributeSchema) -> Self {
        Self::filled(schema, || CacheEntry::Unloaded)
    }

    fn filled(schema: &AttributeSchema, entry: impl Fn() -> CacheEntry) -> Self {
        Self {
            entries: schema
                .scalar_names()
                .map(|name| (name.to_string(), entry()))
                .collect(),
        }
    }

    /// Returns the entry for `name`.
    pub fn entry(&self, name: &str) -> Option<&CacheEntry> {
        self.entries.get(name)
    }

    /// Returns true if `name` has been loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(CacheEntry::is_loaded)
    }

    /// Records a freshly read store value as both current and baseline.
    ///
    /// Any pending assignment is discarded.
    pub fn load(&mut self, name: &str, stored: Value) {
        self.entries.insert(name.to_string(), CacheEntry::loaded(stored));
    }

    /// Forgets every value; the next read goes to the store.
    pub fn unload_all(&mut self) {
        for entry in self.entries.values_mut() {
            *entry = CacheEntry::Unloaded;
        }
    }

    /// Marks every attribute as absent from the store.
    pub fn reset_absent(&mut self) {
        for entry in self.entries.values_mut() {
            *entry = CacheEntry::loaded(Value::Null);
        }
    }

    /// The value to report for `def`, `None` if not loaded.
    pub fn value(&self, def: &AttributeDefinition) -> Option<Value> {
        match self.entries.get(def.name())? {
            CacheEntry::Loaded { current, .. } => Some(def.or_default(current)),
            CacheEntry::Unloaded => None,
        }
    }

    /// The raw current value of `def`, `Null` when absent or not loaded.
    pub fn current(&self, def: &AttributeDefinition) -> Value {
        match self.entries.get(def.name()) {
            Some(CacheEntry::Loaded { current, .. }) => current.clone(),
            _ => Value::Null,
        }
    }

    /// The baseline of `def` with the default substituted, `None` if not
    /// loaded.
    pub fn was(&self, def: &AttributeDefinition) -> Option<Value> {
        match self.entries.get(def.name())? {
            CacheEntry::Loaded { baseline, .. } => Some(def.or_default(baseline)),
            CacheEntry::Unloaded => None,
        }
    }

    /// Returns true if `def` has an assignment that differs from its
    /// baseline. Unloaded attributes are never dirty.
    pub fn is_dirty(&self, def: &AttributeDefinition) -> bool {
        match self.entries.get(def.name()) {
            Some(CacheEntry::Loaded { current, baseline }) => {
                def.or_default(current) != def.or_default(baseline)
            }
            _ => false,
        }
    }

    /// Stores an already coerced value as the current one.
    ///
    /// Returns whether the attribute is dirty afterwards. The entry must be
    /// loaded; an unloaded entry is loaded as absent first.
    pub fn assign(&mut self, def: &AttributeDefinition, value: Value) -> bool {
        let entry = self
            .entries
            .entry(def.name().to_string())
            .or_insert(CacheEntry::Unloaded);
        match entry {
            CacheEntry::Loaded { current, .. } => *current = value,
            unloaded @ CacheEntry::Unloaded => {
                *unloaded = CacheEntry::Loaded {
                    current: value,
                    baseline: Value::Null,
                }
            }
        }
        self.is_dirty(def)
    }

    /// Drops a pending assignment of `def`.
    pub fn restore(&mut self, def: &AttributeDefinition) {
        if let Some(CacheEntry::Loaded { current, baseline }) = self.entries.get_mut(def.name()) {
            *current = baseline.clone();
        }
    }

    /// Records that `name` now matches the store.
    pub fn mark_persisted(&mut self, name: &str) {
        if let Some(CacheEntry::Loaded { current, baseline }) = self.entries.get_mut(name) {
            *baseline = current.clone();
        }
    }

    /// Names of the dirty attributes, ordered.
    pub fn dirty_names<'a>(&self, schema: &'a AttributeSchema) -> Vec<&'a str> {
        schema
            .attributes()
            .filter(|def| def.is_scalar() && self.is_dirty(def))
            .map(AttributeDefinition::name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvattr_codec::AttrKind;

    fn schema() -> AttributeSchema {
        AttributeSchema::builder("Post")
            .attribute(AttributeDefinition::new("content", AttrKind::String).default(""))
            .attribute(AttributeDefinition::new("count", AttrKind::Integer))
            .attribute(AttributeDefinition::new("ranks", AttrKind::SortedSet))
            .build()
            .unwrap()
    }

    #[test]
    fn sorted_sets_have_no_entry() {
        let cache = AttributeCache::unloaded(&schema());
        assert!(cache.entry("content").is_some());
        assert!(cache.entry("ranks").is_none());
    }

    #[test]
    fn absent_entries_report_defaults() {
        let schema = schema();
        let cache = AttributeCache::absent(&schema);
        let content = schema.get("content").unwrap();
        assert_eq!(cache.value(content), Some(Value::from("")));
        assert_eq!(cache.value(schema.get("count").unwrap()), Some(Value::Null));
        assert!(!cache.is_dirty(content));
    }

    #[test]
    fn unloaded_entries_have_no_value() {
        let schema = schema();
        let cache = AttributeCache::unloaded(&schema);
        let count = schema.get("count").unwrap();
        assert_eq!(cache.value(count), None);
        assert!(!cache.is_dirty(count));
        assert!(!cache.is_loaded("count"));
    }

    #[test]
    fn assign_tracks_dirty_against_baseline() {
        let schema = schema();
        let count = schema.get("count").unwrap();
        let mut cache = AttributeCache::unloaded(&schema);
        cache.load("count", Value::Integer(1));

        assert!(cache.assign(count, Value::Integer(5)));
        assert!(cache.assign(count, Value::Integer(5)));
        assert_eq!(cache.was(count), Some(Value::Integer(1)));
        assert_eq!(cache.dirty_names(&schema), vec!["count"]);

        assert!(!cache.assign(count, Value::Integer(1)));
        assert!(cache.dirty_names(&schema).is_empty());
    }

    #[test]
    fn assigning_the_default_to_an_absent_value_is_clean() {
        let schema = schema();
        let content = schema.get("content").unwrap();
        let mut cache = AttributeCache::absent(&schema);
        assert!(!cache.assign(content, Value::from("")));
        assert!(cache.assign(content, Value::from("x")));
    }

    #[test]
    fn restore_and_persist() {
        let schema = schema();
        let count = schema.get("count").unwrap();
        let mut cache = AttributeCache::absent(&schema);

        cache.assign(count, Value::Integer(3));
        cache.restore(count);
        assert!(!cache.is_dirty(count));
        assert_eq!(cache.value(count), Some(Value::Null));

        cache.assign(count, Value::Integer(3));
        cache.mark_persisted("count");
        assert!(!cache.is_dirty(count));
        assert_eq!(cache.was(count), Some(Value::Integer(3)));
    }

    #[test]
    fn unload_and_reset() {
        let schema = schema();
        let count = schema.get("count").unwrap();
        let mut cache = AttributeCache::absent(&schema);
        cache.assign(count, Value::Integer(9));

        cache.unload_all();
        assert!(!cache.is_loaded("count"));
        assert!(!cache.is_dirty(count));

        cache.reset_absent();
        assert_eq!(cache.value(count), Some(Value::Null));
    }
}
