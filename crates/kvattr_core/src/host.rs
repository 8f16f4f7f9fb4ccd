//! Owner integration.

use crate::error::{CoreError, CoreResult};
use crate::schema::Touch;
use crate::sorted_set::SortedSet;
use crate::sync::RemoteAttributes;
use kvattr_codec::Value;

/// An owner object whose remote attributes live in the store.
///
/// Implementors hold a [`RemoteAttributes`] and call the four `on_*` hooks
/// from their own lifecycle code; nothing is dispatched automatically.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use kvattr_codec::{AttrKind, Value};
/// use kvattr_core::{AttributeDefinition, AttributeHost, AttributeSchema, RemoteAttributes};
/// use kvattr_store::{MemoryStore, PoolOptions, PoolRegistry};
///
/// struct Post {
///     id: u64,
///     attrs: RemoteAttributes,
/// }
///
/// impl AttributeHost for Post {
///     fn remote_attributes(&self) -> &RemoteAttributes {
///         &self.attrs
///     }
///     fn remote_attributes_mut(&mut self) -> &mut RemoteAttributes {
///         &mut self.attrs
///     }
///     fn primary_identity(&self) -> String {
///         self.id.to_string()
///     }
/// }
///
/// let store = MemoryStore::new();
/// let registry = PoolRegistry::with_connector(PoolOptions::default(), store.clone());
/// let schema = Arc::new(
///     AttributeSchema::builder("Post")
///         .attribute(AttributeDefinition::new("content", AttrKind::String).default(""))
///         .build()
///         .unwrap(),
/// );
///
/// let mut post = Post { id: 1, attrs: RemoteAttributes::new_record(schema, &registry).unwrap() };
/// post.on_create().unwrap();
/// assert_eq!(store.peek("posts:1:content").as_deref(), Some(""));
///
/// post.write_attribute("content", "hello".into()).unwrap();
/// post.on_commit().unwrap();
/// assert_eq!(post.read_attribute("content").unwrap(), Value::from("hello"));
/// ```
pub trait AttributeHost {
    /// The owner's remote attributes.
    fn remote_attributes(&self) -> &RemoteAttributes;

    /// The owner's remote attributes, mutably.
    fn remote_attributes_mut(&mut self) -> &mut RemoteAttributes;

    /// The owner's primary identity, used in keys by default.
    fn primary_identity(&self) -> String;

    /// Value of an owner field, for schemas that declare an identity field.
    fn identity_field(&self, _field: &str) -> Option<String> {
        None
    }

    /// Called after a persist for each written attribute that has a touch
    /// option.
    fn touch(&mut self, _touch: &Touch) {}

    /// The identity that goes into this owner's keys.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::MissingIdentity`] if the schema names an
    /// identity field the owner has no value for.
    fn attribute_identity(&self) -> CoreResult<String> {
        match self.remote_attributes().schema().identity_field() {
            Some(field) => self
                .identity_field(field)
                .ok_or_else(|| CoreError::MissingIdentity {
                    field: field.to_string(),
                }),
            None => Ok(self.primary_identity()),
        }
    }

    /// Call once the owner has been created.
    fn on_create(&mut self) -> CoreResult<()> {
        let identity = self.attribute_identity()?;
        self.remote_attributes_mut().init_all(&identity)
    }

    /// Call once the owner's own changes have been committed. Returns the
    /// attribute names written.
    fn on_commit(&mut self) -> CoreResult<Vec<String>> {
        let identity = self.attribute_identity()?;
        let written = self.remote_attributes_mut().persist(&identity)?;
        self.touch_written(&written);
        Ok(written)
    }

    /// Call once the owner has been destroyed.
    fn on_destroy(&mut self) -> CoreResult<()> {
        let identity = self.attribute_identity()?;
        self.remote_attributes_mut().clear_all(&identity)
    }

    /// Call when the owner is reloaded. Unsaved attribute changes are
    /// discarded.
    fn on_reload(&mut self) -> CoreResult<()> {
        let identity = self.attribute_identity()?;
        self.remote_attributes_mut().refresh(&identity)
    }

    /// Reads one attribute.
    fn read_attribute(&mut self, name: &str) -> CoreResult<Value> {
        let identity = self.attribute_identity()?;
        self.remote_attributes_mut().get(&identity, name)
    }

    /// Assigns one attribute; written on the next commit.
    fn write_attribute(&mut self, name: &str, value: Value) -> CoreResult<()> {
        let identity = self.attribute_identity()?;
        self.remote_attributes_mut().set(&identity, name, value)
    }

    /// Assigns several attributes and writes them right away, touching as
    /// a commit would. Undeclared names are skipped, and pending changes to
    /// other attributes are left for the next commit.
    fn update_attributes(&mut self, pairs: Vec<(String, Value)>) -> CoreResult<Vec<String>> {
        let identity = self.attribute_identity()?;
        let written = self.remote_attributes_mut().update(&identity, pairs)?;
        self.touch_written(&written);
        Ok(written)
    }

    /// The sorted-set attribute `name`.
    fn sorted_set(&self, name: &str) -> CoreResult<SortedSet> {
        let identity = self.attribute_identity()?;
        self.remote_attributes().sorted_set(&identity, name)
    }

    /// Runs [`AttributeHost::touch`] for the written attributes that carry
    /// a touch option.
    fn touch_written(&mut self, written: &[String]) {
        let touches: Vec<Touch> = {
            let schema = self.remote_attributes().schema();
            written
                .iter()
                .filter_map(|name| schema.get(name))
                .map(|def| def.touch_option().clone())
                .filter(|touch| !touch.is_none())
                .collect()
        };
        for touch in &touches {
            self.touch(touch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeDefinition, AttributeSchema};
    use kvattr_codec::AttrKind;
    use kvattr_store::{MemoryStore, Pool, PoolOptions};
    use std::sync::Arc;

    struct Account {
        id: u64,
        handle: Option<String>,
        attrs: RemoteAttributes,
        touched: Vec<Touch>,
    }

    impl AttributeHost for Account {
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
            match field {
                "handle" => self.handle.clone(),
                _ => None,
            }
        }

        fn touch(&mut self, touch: &Touch) {
            self.touched.push(touch.clone());
        }
    }

    fn account(store: &MemoryStore, handle: Option<&str>) -> Account {
        let schema = AttributeSchema::builder("Account")
            .attribute(AttributeDefinition::new("karma", AttrKind::Integer).touch(true))
            .attribute(AttributeDefinition::new("bio", AttrKind::String).touch("bio_updated_at"))
            .attribute(AttributeDefinition::new("note", AttrKind::String))
            .identity_field("handle")
            .build()
            .unwrap();
        let pool = Pool::new("test", PoolOptions::default(), store.clone());
        Account {
            id: 9,
            handle: handle.map(String::from),
            attrs: RemoteAttributes::with_pool(Arc::new(schema), pool, true),
            touched: Vec::new(),
        }
    }

    #[test]
    fn identity_field_replaces_primary_identity() {
        let store = MemoryStore::new();
        let mut acc = account(&store, Some("ann"));
        acc.write_attribute("note", Value::from("hi")).unwrap();
        acc.on_commit().unwrap();
        assert_eq!(store.peek("accounts:ann:note").as_deref(), Some("hi"));
        assert!(!store.contains("accounts:9:note"));
    }

    #[test]
    fn missing_identity_field_fails() {
        let store = MemoryStore::new();
        let mut acc = account(&store, None);
        assert!(matches!(
            acc.read_attribute("note"),
            Err(CoreError::MissingIdentity { ref field }) if field == "handle"
        ));
    }

    #[test]
    fn commit_touches_written_attributes_only() {
        let store = MemoryStore::new();
        let mut acc = account(&store, Some("ann"));
        acc.write_attribute("karma", Value::Integer(3)).unwrap();
        acc.write_attribute("note", Value::from("x")).unwrap();
        acc.on_commit().unwrap();
        assert_eq!(acc.touched, vec![Touch::Timestamps]);

        acc.update_attributes(vec![("bio".into(), Value::from("hello"))]).unwrap();
        assert_eq!(
            acc.touched,
            vec![Touch::Timestamps, Touch::Columns(vec!["bio_updated_at".into()])]
        );
    }

    struct Plain {
        attrs: RemoteAttributes,
    }

    impl AttributeHost for Plain {
        fn remote_attributes(&self) -> &RemoteAttributes {
            &self.attrs
        }

        fn remote_attributes_mut(&mut self) -> &mut RemoteAttributes {
            &mut self.attrs
        }

        fn primary_identity(&self) -> String {
            "1".to_string()
        }
    }

    #[test]
    fn default_hooks_use_primary_identity_and_skip_touch() {
        let store = MemoryStore::new();
        let schema = AttributeSchema::builder("Plain")
            .attribute(AttributeDefinition::new("karma", AttrKind::Integer).touch(true))
            .build()
            .unwrap();
        let pool = Pool::new("test", PoolOptions::default(), store.clone());
        let mut plain = Plain {
            attrs: RemoteAttributes::with_pool(Arc::new(schema), pool, true),
        };
        assert_eq!(plain.identity_field("karma"), None);

        plain.write_attribute("karma", Value::Integer(2)).unwrap();
        assert_eq!(plain.on_commit().unwrap(), vec!["karma"]);
        assert_eq!(store.peek("plains:1:karma").as_deref(), Some("2"));
    }

    #[test]
    fn failed_commit_does_not_touch() {
        let store = MemoryStore::new();
        let mut acc = account(&store, Some("ann"));
        acc.write_attribute("karma", Value::Integer(1)).unwrap();
        store.set_unavailable(true);
        assert!(acc.on_commit().is_err());
        assert!(acc.touched.is_empty());
    }
}
