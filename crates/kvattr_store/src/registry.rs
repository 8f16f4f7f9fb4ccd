//! Named pool registry.

use crate::config::{PoolConfig, RegistryConfig, DEFAULT_POOL_NAME};
use crate::error::{RegistryError, RegistryResult};
use crate::pool::{Connect, Pool, PoolOptions};
use crate::tcp::TcpConnector;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// A validated name → pool lookup with exactly one default pool.
///
/// Built once from a [`RegistryConfig`] and passed to whatever needs store
/// access. Validation happens in the constructors only; a registry that
/// exists is always well formed.
///
/// # Example
///
/// ```rust
/// use kvattr_store::{MemoryStore, PoolConfig, PoolRegistry, RegistryConfig};
///
/// let store = MemoryStore::new();
/// let config = RegistryConfig::Many(vec![
///     PoolConfig::from_url("redis://a:8888").with_name("main").as_default(),
///     PoolConfig::from_url("redis://b:8888").with_name("stats"),
/// ]);
/// let registry = PoolRegistry::setup_with(config, |_| Ok(Box::new(store.clone()))).unwrap();
/// assert_eq!(registry.default_pool_name(), "main");
/// assert_eq!(registry.resolve(Some("stats")).unwrap().name(), "stats");
/// ```
#[derive(Debug, Clone)]
pub struct PoolRegistry {
    pools: BTreeMap<String, Pool>,
    default: String,
}

impl PoolRegistry {
    /// Builds TCP-backed pools from `config`.
    ///
    /// No connection is opened here; pools connect lazily.
    ///
    /// # Errors
    ///
    /// Fails if the configuration breaks the naming or default rules, or a
    /// pool has an unusable address or size.
    pub fn setup(config: RegistryConfig) -> RegistryResult<Self> {
        Self::setup_with(config, |pool| {
            let connector = TcpConnector::new(pool.address()?, pool.timeout(), pool.dialect);
            Ok(Box::new(connector))
        })
    }

    /// Builds pools from `config`, asking `connector` for the connection
    /// factory of each pool.
    ///
    /// # Errors
    ///
    /// Fails with the first validation error, or the first error returned
    /// by `connector`.
    pub fn setup_with<F>(config: RegistryConfig, mut connector: F) -> RegistryResult<Self>
    where
        F: FnMut(&PoolConfig) -> RegistryResult<Box<dyn Connect>>,
    {
        let (entries, default) = validate(config)?;

        let mut pools = BTreeMap::new();
        for (name, pool_config) in entries {
            let options = pool_config.pool_options()?;
            let pool = Pool::from_boxed(name.clone(), options, connector(&pool_config)?);
            debug!(pool = %name, size = options.size, "registered store pool");
            pools.insert(name, pool);
        }

        Ok(Self { pools, default })
    }

    /// Wraps one already-built pool as the default.
    pub fn single(pool: Pool) -> Self {
        let name = pool.name().to_string();
        let mut pools = BTreeMap::new();
        pools.insert(name.clone(), pool);
        Self {
            pools,
            default: name,
        }
    }

    /// Convenience for a single default pool over `connector`.
    pub fn with_connector(options: PoolOptions, connector: impl Connect + 'static) -> Self {
        Self::single(Pool::new(DEFAULT_POOL_NAME, options, connector))
    }

    /// Returns the pool named `name`, or the default pool for `None`.
    ///
    /// # Errors
    ///
    /// Fails with [`RegistryError::UnknownPool`] if no pool has that name.
    pub fn resolve(&self, name: Option<&str>) -> RegistryResult<Pool> {
        match name {
            Some(name) => self.pool(name),
            None => Ok(self.default_pool()),
        }
    }

    /// Returns the pool named `name`.
    ///
    /// # Errors
    ///
    /// Fails with [`RegistryError::UnknownPool`] if no pool has that name.
    pub fn pool(&self, name: &str) -> RegistryResult<Pool> {
        self.pools
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownPool {
                name: name.to_string(),
            })
    }

    /// Returns the default pool.
    pub fn default_pool(&self) -> Pool {
        // The default name is always a key; checked at construction.
        self.pools
            .get(&self.default)
            .or_else(|| self.pools.values().next())
            .cloned()
            .unwrap_or_else(|| unreachable!("registry without pools"))
    }

    /// Returns the name of the default pool.
    pub fn default_pool_name(&self) -> &str {
        &self.default
    }

    /// Returns every pool name, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    /// Number of pools.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Always false; a registry holds at least one pool.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// Applies the naming and default rules, returning each pool's name and
/// configuration plus the default pool's name.
fn validate(config: RegistryConfig) -> RegistryResult<(Vec<(String, PoolConfig)>, String)> {
    match config {
        RegistryConfig::Single(pool) => {
            let name = pool
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_POOL_NAME.to_string());
            Ok((vec![(name.clone(), pool)], name))
        }
        RegistryConfig::Many(list) => {
            let mut seen = HashSet::new();
            let mut defaults = Vec::new();
            let mut entries = Vec::with_capacity(list.len());

            for (index, pool) in list.into_iter().enumerate() {
                let name = match pool.name.as_deref() {
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => return Err(RegistryError::MissingName { index }),
                };
                if !seen.insert(name.clone()) {
                    return Err(RegistryError::DuplicateName { name });
                }
                if pool.default {
                    defaults.push(name.clone());
                }
                entries.push((name, pool));
            }

            match defaults.len() {
                0 => Err(RegistryError::NoDefault),
                1 => Ok((entries, defaults.remove(0))),
                _ => Err(RegistryError::MultipleDefaults { names: defaults }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn memory(config: impl Into<RegistryConfig>) -> RegistryResult<PoolRegistry> {
        let store = MemoryStore::new();
        PoolRegistry::setup_with(config.into(), move |_| Ok(Box::new(store.clone())))
    }

    fn named(name: &str) -> PoolConfig {
        PoolConfig::from_url(format!("redis://{name}:8888")).with_name(name)
    }

    #[test]
    fn single_pool_is_default() {
        let registry = memory(PoolConfig::from_url("redis://localhost")).unwrap();
        assert_eq!(registry.default_pool_name(), "default");
        assert_eq!(registry.resolve(None).unwrap().name(), "default");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn single_pool_keeps_its_name() {
        let registry = memory(named("main")).unwrap();
        assert_eq!(registry.default_pool_name(), "main");
    }

    #[test]
    fn many_pools_require_a_default() {
        let err = memory(vec![named("a"), named("b")]).unwrap_err();
        assert_eq!(err, RegistryError::NoDefault);
    }

    #[test]
    fn one_element_list_still_needs_default() {
        let err = memory(vec![named("a")]).unwrap_err();
        assert_eq!(err, RegistryError::NoDefault);
    }

    #[test]
    fn many_pools_reject_two_defaults() {
        let err = memory(vec![named("a").as_default(), named("b").as_default()]).unwrap_err();
        assert_eq!(
            err,
            RegistryError::MultipleDefaults {
                names: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn many_pools_require_names() {
        let err = memory(vec![named("a").as_default(), PoolConfig::from_url("redis://x")])
            .unwrap_err();
        assert_eq!(err, RegistryError::MissingName { index: 1 });
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = memory(vec![named("a").as_default(), named("a")]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { ref name } if name == "a"));
    }

    #[test]
    fn resolve_by_name() {
        let registry = memory(vec![named("a"), named("b").as_default()]).unwrap();
        assert_eq!(registry.default_pool_name(), "b");
        assert_eq!(registry.resolve(Some("a")).unwrap().name(), "a");
        assert!(registry.resolve(None).unwrap().ptr_eq(&registry.default_pool()));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(matches!(
            registry.resolve(Some("zzz")),
            Err(RegistryError::UnknownPool { .. })
        ));
    }

    #[test]
    fn tcp_setup_validates_addresses_without_connecting() {
        let registry = PoolRegistry::setup(PoolConfig::from_host("127.0.0.1", 1).into()).unwrap();
        assert_eq!(registry.default_pool().open_connections(), 0);

        let err = PoolRegistry::setup(PoolConfig::default().into()).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidAddress { .. }));
    }

    #[test]
    fn pool_options_come_from_config() {
        let registry = memory(named("a").with_pool_size(2).as_default()).unwrap();
        assert_eq!(registry.default_pool().options().size, 2);

        let err = memory(named("a").with_pool_size(0)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidOption { .. }));
    }

    #[test]
    fn single_wraps_a_pool() {
        let registry = PoolRegistry::with_connector(PoolOptions::default(), MemoryStore::new());
        assert_eq!(registry.default_pool_name(), DEFAULT_POOL_NAME);
        assert!(!registry.is_empty());
    }
}
