//! Remote attribute values of one owner instance and their store
//! synchronization.

use crate::cache::AttributeCache;
use crate::error::{CoreError, CoreResult};
use crate::schema::{AttributeDefinition, AttributeSchema};
use crate::sorted_set::SortedSet;
use kvattr_codec::{coerce, decode, encode, Value};
use kvattr_store::{Pool, PoolRegistry};
use std::sync::Arc;
use tracing::debug;

/// The remote attributes of one owner instance.
///
/// Reads go through a per-instance cache; writes stay in the cache until
/// [`RemoteAttributes::persist`] sends every dirty attribute in one batch.
/// The owner's identity is passed to each call that touches the store,
/// since a new owner may only get one when its primary record is saved.
///
/// The four lifecycle operations map onto owner events:
///
/// | event   | operation                          |
/// |---------|------------------------------------|
/// | create  | [`RemoteAttributes::init_all`]     |
/// | commit  | [`RemoteAttributes::persist`]      |
/// | destroy | [`RemoteAttributes::clear_all`]    |
/// | reload  | [`RemoteAttributes::refresh`]      |
///
/// Not synchronized: concurrent use of one instance must be serialized by
/// the caller.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use kvattr_codec::{AttrKind, Value};
/// use kvattr_core::{AttributeDefinition, AttributeSchema, RemoteAttributes};
/// use kvattr_store::{MemoryStore, PoolOptions, PoolRegistry};
///
/// let store = MemoryStore::new();
/// let registry = PoolRegistry::with_connector(PoolOptions::default(), store.clone());
/// let schema = Arc::new(
///     AttributeSchema::builder("Post")
///         .attribute(AttributeDefinition::new("views", AttrKind::Integer).default(0))
///         .build()
///         .unwrap(),
/// );
///
/// let mut attrs = RemoteAttributes::existing(schema, &registry).unwrap();
/// attrs.set("1", "views", 10).unwrap();
/// assert!(attrs.is_dirty("views").unwrap());
///
/// attrs.persist("1").unwrap();
/// assert_eq!(store.peek("posts:1:views").as_deref(), Some("10"));
/// assert_eq!(attrs.get("1", "views").unwrap(), Value::Integer(10));
/// ```
#[derive(Debug, Clone)]
pub struct RemoteAttributes {
    schema: Arc<AttributeSchema>,
    pool: Pool,
    cache: AttributeCache,
}

impl RemoteAttributes {
    /// Attributes of an owner that has never been saved.
    ///
    /// Nothing is read from the store: every attribute starts at its
    /// default until assigned.
    ///
    /// # Errors
    ///
    /// Fails if the schema names a pool the registry does not have.
    pub fn new_record(schema: Arc<AttributeSchema>, registry: &PoolRegistry) -> CoreResult<Self> {
        let pool = registry.resolve(schema.pool())?;
        Ok(Self::with_pool(schema, pool, true))
    }

    /// Attributes of an owner that already exists.
    ///
    /// Each attribute is read from the store on first access.
    ///
    /// # Errors
    ///
    /// Fails if the schema names a pool the registry does not have.
    pub fn existing(schema: Arc<AttributeSchema>, registry: &PoolRegistry) -> CoreResult<Self> {
        let pool = registry.resolve(schema.pool())?;
        Ok(Self::with_pool(schema, pool, false))
    }

    /// Attributes bound to an explicit pool. `new_record` selects the
    /// never-saved state of [`RemoteAttributes::new_record`].
    pub fn with_pool(schema: Arc<AttributeSchema>, pool: Pool, new_record: bool) -> Self {
        let cache = if new_record {
            AttributeCache::absent(&schema)
        } else {
            AttributeCache::unloaded(&schema)
        };
        Self {
            schema,
            pool,
            cache,
        }
    }

    /// The owner type's schema.
    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    /// The pool every store call goes through.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// The underlying cache.
    pub fn cache(&self) -> &AttributeCache {
        &self.cache
    }

    /// Reads attribute `name`, loading it from the store if needed.
    ///
    /// An absent value reads as the declared default, or `Null` without
    /// one.
    ///
    /// # Errors
    ///
    /// Fails for unknown or sorted-set attributes, and when the store
    /// cannot be reached.
    pub fn get(&mut self, identity: &str, name: &str) -> CoreResult<Value> {
        let schema = Arc::clone(&self.schema);
        let def = scalar(&schema, name)?;
        self.ensure_loaded(identity, &[def])?;
        Ok(self.cache.value(def).unwrap_or_else(|| def.default_value().clone()))
    }

    /// Assigns attribute `name`. Nothing is written until
    /// [`RemoteAttributes::persist`].
    ///
    /// The value is coerced to the attribute kind first; a `json` value
    /// that is not an array or object becomes `Null` and will be removed
    /// from the store. An unloaded attribute is read first so the change
    /// can be compared against the stored value.
    ///
    /// # Errors
    ///
    /// Fails for unknown or sorted-set attributes, and when the store
    /// cannot be reached while loading.
    pub fn set(&mut self, identity: &str, name: &str, value: impl Into<Value>) -> CoreResult<()> {
        let schema = Arc::clone(&self.schema);
        let def = scalar(&schema, name)?;
        let value = coerce(value.into(), def.kind())?;
        self.ensure_loaded(identity, &[def])?;
        self.cache.assign(def, value);
        Ok(())
    }

    /// Returns true if `name` has an unsaved change.
    ///
    /// # Errors
    ///
    /// Fails for unknown or sorted-set attributes.
    pub fn is_dirty(&self, name: &str) -> CoreResult<bool> {
        let def = scalar(&self.schema, name)?;
        Ok(self.cache.is_dirty(def))
    }

    /// The value `name` had before its unsaved change.
    ///
    /// # Errors
    ///
    /// Fails for unknown or sorted-set attributes, and when the store
    /// cannot be reached while loading.
    pub fn was(&mut self, identity: &str, name: &str) -> CoreResult<Value> {
        let schema = Arc::clone(&self.schema);
        let def = scalar(&schema, name)?;
        self.ensure_loaded(identity, &[def])?;
        Ok(self.cache.was(def).unwrap_or_else(|| def.default_value().clone()))
    }

    /// Drops the unsaved change of `name`.
    ///
    /// # Errors
    ///
    /// Fails for unknown or sorted-set attributes.
    pub fn restore(&mut self, name: &str) -> CoreResult<()> {
        let schema = Arc::clone(&self.schema);
        let def = scalar(&schema, name)?;
        self.cache.restore(def);
        Ok(())
    }

    /// Names of the attributes with unsaved changes, ordered.
    pub fn changed_names(&self) -> Vec<String> {
        self.cache
            .dirty_names(&self.schema)
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Returns true if any attribute has an unsaved change.
    pub fn has_changes(&self) -> bool {
        !self.cache.dirty_names(&self.schema).is_empty()
    }

    /// Assigns several attributes and writes them at once.
    ///
    /// Names that are not declared are skipped. Unloaded attributes among
    /// the assigned ones are read in a single batch first. Only the assigned
    /// attributes that changed are written; other pending changes stay
    /// pending. Returns the names that were written.
    ///
    /// # Errors
    ///
    /// Fails if a sorted-set attribute is assigned, and when the store
    /// cannot be reached. Nothing is assigned when loading fails.
    pub fn update<I, K, V>(&mut self, identity: &str, pairs: I) -> CoreResult<Vec<String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let schema = Arc::clone(&self.schema);
        let mut assignments = Vec::new();
        for (name, value) in pairs {
            let name = name.as_ref();
            let Some(def) = schema.get(name) else {
                debug!(owner = %schema.type_name(), attribute = name, "skipping undeclared attribute");
                continue;
            };
            if !def.is_scalar() {
                return Err(CoreError::not_scalar(name));
            }
            assignments.push((def, coerce(value.into(), def.kind())?));
        }

        let defs: Vec<&AttributeDefinition> = assignments.iter().map(|(def, _)| *def).collect();
        self.ensure_loaded(identity, &defs)?;
        for (def, value) in assignments {
            self.cache.assign(def, value);
        }

        let mut names: Vec<&str> = defs
            .iter()
            .copied()
            .filter(|def| self.cache.is_dirty(def))
            .map(|def| def.name())
            .collect();
        names.sort_unstable();
        names.dedup();
        self.write_attributes(identity, &names)
    }

    /// A handle on the sorted-set attribute `name`.
    ///
    /// # Errors
    ///
    /// Fails for unknown or scalar attributes.
    pub fn sorted_set(&self, identity: &str, name: &str) -> CoreResult<SortedSet> {
        let def = definition(&self.schema, name)?;
        if def.is_scalar() {
            return Err(CoreError::NotSortedSet {
                name: name.to_string(),
                kind: def.kind(),
            });
        }
        Ok(SortedSet::new(self.schema.key(identity, name), self.pool.clone()))
    }

    /// Writes every scalar attribute, changed or not, when the owner is
    /// created.
    ///
    /// Attributes that hold no value and have no default are deleted
    /// instead. Sorted sets start empty and are not written. Uses one
    /// connection, one `multi_set` and at most one `delete`.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be reached. Attributes stay dirty then.
    pub fn init_all(&mut self, identity: &str) -> CoreResult<()> {
        let schema = Arc::clone(&self.schema);
        let mut sets = Vec::new();
        let mut deletes = Vec::new();
        let mut written = Vec::new();

        for def in schema.attributes().filter(|def| def.is_scalar()) {
            let value = def.or_default(&self.cache.current(def));
            let key = schema.key(identity, def.name());
            match encode(&value, def.kind())? {
                Some(raw) => sets.push((key, raw)),
                None => deletes.push(key),
            }
            written.push((def.name(), value));
        }

        self.write_batch(&sets, &deletes)?;
        for (name, value) in written {
            self.cache.load(name, value);
        }
        debug!(
            owner = %schema.type_name(),
            identity,
            sets = sets.len(),
            deletes = deletes.len(),
            "initialized remote attributes"
        );
        Ok(())
    }

    /// Writes the dirty attributes on commit.
    ///
    /// Every dirty attribute goes into one `multi_set`, or one `delete` when
    /// its value is `Null`; both run on the same connection. Clean and
    /// unloaded attributes are not sent. Attributes become clean only once
    /// the store has accepted the batch.
    ///
    /// Returns the names that were written.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be reached; every attribute that was
    /// dirty stays dirty.
    pub fn persist(&mut self, identity: &str) -> CoreResult<Vec<String>> {
        let schema = Arc::clone(&self.schema);
        let dirty = self.cache.dirty_names(&schema);
        self.write_attributes(identity, &dirty)
    }

    /// Removes every attribute from the store when the owner is destroyed.
    ///
    /// Scalar keys go in one `delete`; each sorted set is cleared on the
    /// same connection. Not atomic across keys. Afterwards every attribute
    /// reads as its default without a round trip.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be reached.
    pub fn clear_all(&mut self, identity: &str) -> CoreResult<()> {
        let schema = Arc::clone(&self.schema);
        let mut scalars = Vec::new();
        let mut sorted_sets = Vec::new();
        for def in schema.attributes() {
            let key = schema.key(identity, def.name());
            if def.is_scalar() {
                scalars.push(key);
            } else {
                sorted_sets.push(key);
            }
        }

        self.pool.with_connection(|conn| {
            conn.delete(&scalars)?;
            for key in &sorted_sets {
                conn.zclear(key)?;
            }
            Ok(())
        })?;

        self.cache.reset_absent();
        debug!(
            owner = %schema.type_name(),
            identity,
            scalars = scalars.len(),
            sorted_sets = sorted_sets.len(),
            "cleared remote attributes"
        );
        Ok(())
    }

    /// Re-reads every scalar attribute when the owner is reloaded.
    ///
    /// This is the way to abandon unsaved changes: they are discarded, not
    /// written. Uses one `multi_get`.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be reached; the cache is left as it was.
    pub fn refresh(&mut self, identity: &str) -> CoreResult<()> {
        let schema = Arc::clone(&self.schema);
        let defs: Vec<&AttributeDefinition> =
            schema.attributes().filter(|def| def.is_scalar()).collect();
        self.load_from_store(identity, &defs)?;
        debug!(owner = %schema.type_name(), identity, attributes = defs.len(), "refreshed remote attributes");
        Ok(())
    }

    /// Forgets every cached value; each is re-read on next access.
    pub fn unload(&mut self) {
        self.cache.unload_all();
    }

    fn ensure_loaded(&mut self, identity: &str, defs: &[&AttributeDefinition]) -> CoreResult<()> {
        let missing: Vec<&AttributeDefinition> = defs
            .iter()
            .copied()
            .filter(|def| !self.cache.is_loaded(def.name()))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        self.load_from_store(identity, &missing)
    }

    fn load_from_store(&mut self, identity: &str, defs: &[&AttributeDefinition]) -> CoreResult<()> {
        if defs.is_empty() {
            return Ok(());
        }

        let raw = if let [def] = defs {
            let key = self.schema.key(identity, def.name());
            vec![self.pool.with_connection(|conn| conn.get(&key))?]
        } else {
            let keys: Vec<String> = defs
                .iter()
                .map(|def| self.schema.key(identity, def.name()))
                .collect();
            self.pool.with_connection(|conn| conn.multi_get(&keys))?
        };

        let mut decoded = Vec::with_capacity(defs.len());
        for (def, raw) in defs.iter().zip(raw) {
            decoded.push(decode(raw.as_deref(), def.kind())?);
        }
        for (def, value) in defs.iter().zip(decoded) {
            self.cache.load(def.name(), value);
        }
        Ok(())
    }

    /// Writes `names` in one batch and marks them persisted once the store
    /// has accepted it.
    fn write_attributes(&mut self, identity: &str, names: &[&str]) -> CoreResult<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let schema = Arc::clone(&self.schema);
        let mut sets = Vec::new();
        let mut deletes = Vec::new();
        for name in names {
            let def = scalar(&schema, name)?;
            let key = schema.key(identity, name);
            match encode(&self.cache.current(def), def.kind())? {
                Some(raw) => sets.push((key, raw)),
                None => deletes.push(key),
            }
        }

        self.write_batch(&sets, &deletes)?;
        for name in names {
            self.cache.mark_persisted(name);
        }
        debug!(
            owner = %schema.type_name(),
            identity,
            sets = sets.len(),
            deletes = deletes.len(),
            "persisted remote attributes"
        );
        Ok(names.iter().map(|name| name.to_string()).collect())
    }

    fn write_batch(&self, sets: &[(String, String)], deletes: &[String]) -> CoreResult<()> {
        self.pool.with_connection(|conn| {
            conn.multi_set(sets)?;
            conn.delete(deletes)?;
            Ok(())
        })?;
        Ok(())
    }
}

fn definition<'a>(schema: &'a AttributeSchema, name: &str) -> CoreResult<&'a AttributeDefinition> {
    schema
        .get(name)
        .ok_or_else(|| CoreError::unknown_attribute(schema.type_name(), name))
}

fn scalar<'a>(schema: &'a AttributeSchema, name: &str) -> CoreResult<&'a AttributeDefinition> {
    let def = definition(schema, name)?;
    if def.is_scalar() {
        Ok(def)
    } else {
        Err(CoreError::not_scalar(name))
    }
}
