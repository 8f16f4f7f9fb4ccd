//! Test fixtures and store helpers.
//!
//! Provides an in-memory store wired into a registry, and two sample owner
//! types that implement [`AttributeHost`].

use kvattr_codec::{AttrKind, Value};
use kvattr_core::{
    AttributeDefinition, AttributeHost, AttributeSchema, RemoteAttributes, Touch,
};
use kvattr_store::{MemoryStore, PoolConfig, PoolRegistry, RegistryConfig};
use std::sync::{Arc, OnceLock};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Installs a test-friendly `tracing` subscriber once per process.
///
/// The filter comes from `RUST_LOG`, defaulting to debug output from the
/// core and store crates.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kvattr_core=debug,kvattr_store=debug,kvattr_codec=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// An in-memory store behind a registry.
pub struct TestStore {
    /// Shared store data and command log.
    pub store: MemoryStore,
    /// Registry whose pools all connect to `store`.
    pub registry: PoolRegistry,
}

impl TestStore {
    /// A single default pool.
    pub fn new() -> Self {
        Self::from_config(PoolConfig::from_url("redis://memory:8888").into())
    }

    /// One pool per name, `default` flagged as the default.
    pub fn with_pools(names: &[&str], default: &str) -> Self {
        let configs = names
            .iter()
            .map(|name| {
                let config = PoolConfig::from_url(format!("redis://{name}:8888")).with_name(*name);
                if *name == default {
                    config.as_default()
                } else {
                    config
                }
            })
            .collect::<Vec<_>>();
        Self::from_config(RegistryConfig::Many(configs))
    }

    /// Builds every configured pool over one shared in-memory store.
    pub fn from_config(config: RegistryConfig) -> Self {
        let store = MemoryStore::new();
        let shared = store.clone();
        let registry = PoolRegistry::setup_with(config, move |_| Ok(Box::new(shared.clone())))
            .expect("Failed to set up test registry");
        Self { store, registry }
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Schema of [`Post`]:
///
/// | name       | kind       | default | touch        |
/// |------------|------------|---------|--------------|
/// | content    | string     | `""`    | timestamps   |
/// | count      | integer    |         |              |
/// | published  | boolean    | `false` |              |
/// | payload    | json       |         | `payload_at` |
/// | rankings   | sorted_set |         |              |
pub fn post_schema() -> Arc<AttributeSchema> {
    static SCHEMA: OnceLock<Arc<AttributeSchema>> = OnceLock::new();
    Arc::clone(SCHEMA.get_or_init(|| {
        Arc::new(
            AttributeSchema::builder("Post")
                .attribute(
                    AttributeDefinition::new("content", AttrKind::String)
                        .default("")
                        .touch(true),
                )
                .attribute(AttributeDefinition::new("count", AttrKind::Integer))
                .attribute(AttributeDefinition::new("published", AttrKind::Boolean).default(false))
                .attribute(AttributeDefinition::new("payload", AttrKind::Json).touch("payload_at"))
                .attribute(AttributeDefinition::new("rankings", AttrKind::SortedSet))
                .build()
                .expect("Invalid post schema"),
        )
    }))
}

/// A sample owner keyed by a numeric id.
#[derive(Debug)]
pub struct Post {
    /// Primary identity.
    pub id: u64,
    /// Remote attributes.
    pub attrs: RemoteAttributes,
    /// Touch hooks received, oldest first.
    pub touched: Vec<Touch>,
}

impl Post {
    /// A post that has not been saved yet.
    pub fn build(id: u64, registry: &PoolRegistry) -> Self {
        Self {
            id,
            attrs: RemoteAttributes::new_record(post_schema(), registry)
                .expect("Failed to build post attributes"),
            touched: Vec::new(),
        }
    }

    /// A post saved and created, as after an insert.
    pub fn create(id: u64, registry: &PoolRegistry) -> Self {
        let mut post = Self::build(id, registry);
        post.on_create().expect("Failed to create post");
        post
    }

    /// An already existing post, loaded lazily.
    pub fn find(id: u64, registry: &PoolRegistry) -> Self {
        Self {
            id,
            attrs: RemoteAttributes::existing(post_schema(), registry)
                .expect("Failed to load post attributes"),
            touched: Vec::new(),
        }
    }

    /// Store key of one of this post's attributes.
    pub fn key(&self, name: &str) -> String {
        self.attrs.schema().key(&self.id.to_string(), name)
    }

    /// Reads an attribute, panicking on failure.
    pub fn read(&mut self, name: &str) -> Value {
        self.read_attribute(name).expect("Failed to read attribute")
    }

    /// Assigns an attribute, panicking on failure.
    pub fn write(&mut self, name: &str, value: impl Into<Value>) {
        self.write_attribute(name, value.into())
            .expect("Failed to write attribute");
    }
}

impl AttributeHost for Post {
    fn remote_attributes(&self) -> &RemoteAttributes {
        &self.attrs
    }

    fn remote_attributes_mut(&mut self) -> &mut RemoteAttributes {
        &mut self.attrs
    }

    fn primary_identity(&self) -> String {
        self.id.to_string()
    }

    fn touch(&mut self, touch: &Touch) {
        self.touched.push(touch.clone());
    }
}

/// A sample owner keyed by a UUID field rather than its primary id, stored
/// in the `stats` pool.
#[derive(Debug)]
pub struct Counter {
    /// Primary identity, not used in keys.
    pub id: u64,
    /// Identity used in keys.
    pub uuid: Uuid,
    /// Remote attributes.
    pub attrs: RemoteAttributes,
}

impl Counter {
    /// Schema of [`Counter`]: `hits` (integer, default 0) and `leaders`
    /// (sorted set).
    pub fn schema() -> Arc<AttributeSchema> {
        Arc::new(
            AttributeSchema::builder("Metrics::Counter")
                .attribute(AttributeDefinition::new("hits", AttrKind::Integer).default(0))
                .attribute(AttributeDefinition::new("leaders", AttrKind::SortedSet))
                .identity_field("uuid")
                .pool("stats")
                .build()
                .expect("Invalid counter schema"),
        )
    }

    /// A new counter with a random UUID.
    pub fn build(id: u64, registry: &PoolRegistry) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            attrs: RemoteAttributes::new_record(Self::schema(), registry)
                .expect("Failed to build counter attributes"),
        }
    }
}

impl AttributeHost for Counter {
    fn remote_attributes(&self) -> &RemoteAttributes {
        &self.attrs
    }

    fn remote_attributes_mut(&mut self) -> &mut RemoteAttributes {
        &mut self.attrs
    }

    fn primary_identity(&self) -> String {
        self.id.to_string()
    }

    fn identity_field(&self, field: &str) -> Option<String> {
        (field == "uuid").then(|| self.uuid.to_string())
    }
}
