//! # kvattr Store
//!
//! Store client trait, connection pools and the pool registry for kvattr.
//!
//! This crate is the lowest layer: clients are **thin string movers** over
//! a key-value / sorted-set service. They know nothing about attributes,
//! kinds or key layout.
//!
//! ## Design Principles
//!
//! - One trait method per store command, one round trip per call
//! - Batches (`multi_get`, `multi_set`, `delete`) never split, never send empty
//! - Every command runs on a connection checked out of a bounded [`Pool`]
//! - Pools are looked up by name in a validated [`PoolRegistry`]
//!
//! ## Available Clients
//!
//! - [`MemoryConnection`] - In-process store with a command log, for testing
//! - [`RespClient`] - Redis-protocol client for SSDB and Redis
//!
//! ## Example
//!
//! ```rust
//! use kvattr_store::{MemoryStore, PoolConfig, PoolRegistry};
//!
//! let store = MemoryStore::new();
//! let registry = PoolRegistry::setup_with(
//!     PoolConfig::from_url("redis://localhost:8888").into(),
//!     |_| Ok(Box::new(store.clone())),
//! )
//! .unwrap();
//!
//! let pool = registry.resolve(None).unwrap();
//! pool.with_connection(|conn| conn.set("posts:1:title", "hello")).unwrap();
//! assert_eq!(store.peek("posts:1:title").as_deref(), Some("hello"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod memory;
mod pool;
mod registry;
mod resp;
mod tcp;

pub use client::StoreClient;
pub use config::{parse_url, Dialect, PoolConfig, RegistryConfig, DEFAULT_POOL_NAME, DEFAULT_PORT};
pub use error::{RegistryError, RegistryResult, StoreError, StoreResult};
pub use memory::{Command, MemoryConnection, MemoryStore};
pub use pool::{Connect, Pool, PoolOptions};
pub use registry::PoolRegistry;
pub use resp::Reply;
pub use tcp::{RespClient, TcpConnector};
