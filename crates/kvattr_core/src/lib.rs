//! # kvattr Core
//!
//! Remote attributes: owner fields whose values live in a key-value /
//! sorted-set store instead of the owner's own record.
//!
//! This crate provides:
//! - [`AttributeSchema`]: the typed attributes of an owner type
//! - [`KeyBuilder`]: `{table}:{identity}:{attribute}` store keys
//! - [`AttributeCache`]: per-instance dirty tracking over decoded values
//! - [`RemoteAttributes`]: loading, batched persistence and lifecycle sync
//! - [`SortedSet`]: uncached sorted-set collections
//! - [`AttributeHost`]: the hooks an owner calls on create, commit,
//!   destroy and reload
//!
//! There is no transaction spanning the owner's own store and this one,
//! and no conflict detection between processes; the last write wins.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod error;
mod host;
mod key;
mod schema;
mod sorted_set;
mod sync;

pub use cache::{AttributeCache, CacheEntry};
pub use error::{CoreError, CoreResult, SchemaError, SchemaResult};
pub use host::AttributeHost;
pub use key::{build_key, tableize, KeyBuilder, KEY_SEPARATOR};
pub use schema::{AttributeDefinition, AttributeSchema, AttributeSchemaBuilder, Touch};
pub use sorted_set::SortedSet;
pub use sync::RemoteAttributes;
