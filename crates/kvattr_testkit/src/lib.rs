//! # kvattr Testkit
//!
//! Test utilities for kvattr.
//!
//! This crate provides:
//! - An in-memory store wired into a pool registry
//! - Sample owner types implementing `AttributeHost`
//! - Property-based test generators using proptest
//! - A `tracing` subscriber for test output
//!
//! ## Usage
//!
//! ```rust
//! use kvattr_codec::Value;
//! use kvattr_core::AttributeHost;
//! use kvattr_testkit::prelude::*;
//!
//! let test = TestStore::new();
//! let mut post = Post::create(1, &test.registry);
//! post.write("count", 5);
//! post.on_commit().unwrap();
//! assert_eq!(test.store.peek("posts:1:count").as_deref(), Some("5"));
//! assert_eq!(post.read("count"), Value::Integer(5));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
