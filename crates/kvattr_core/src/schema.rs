//! Attribute declarations.

use crate::error::{SchemaError, SchemaResult};
use crate::key::KeyBuilder;
use kvattr_codec::{coerce, AttrKind, Value};
use std::collections::BTreeMap;

/// What to touch on the owner after an attribute is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Touch {
    /// Nothing.
    #[default]
    None,
    /// The owner's update timestamp.
    Timestamps,
    /// The named columns.
    Columns(Vec<String>),
}

impl Touch {
    /// Returns true for [`Touch::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Touch::None)
    }
}

impl From<bool> for Touch {
    fn from(touch: bool) -> Self {
        if touch {
            Touch::Timestamps
        } else {
            Touch::None
        }
    }
}

impl From<&str> for Touch {
    fn from(column: &str) -> Self {
        Touch::Columns(vec![column.to_string()])
    }
}

impl From<Vec<&str>> for Touch {
    fn from(columns: Vec<&str>) -> Self {
        Touch::Columns(columns.into_iter().map(String::from).collect())
    }
}

/// One declared remote attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    name: String,
    kind: AttrKind,
    default: Value,
    touch: Touch,
}

impl AttributeDefinition {
    /// Declares an attribute with no default and no touch option.
    pub fn new(name: impl Into<String>, kind: AttrKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: Value::Null,
            touch: Touch::None,
        }
    }

    /// Sets the value reported while the store holds nothing.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    /// Sets what to touch on the owner after a persist.
    #[must_use]
    pub fn touch(mut self, touch: impl Into<Touch>) -> Self {
        self.touch = touch.into();
        self
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute kind.
    pub fn kind(&self) -> AttrKind {
        self.kind
    }

    /// Default value, [`Value::Null`] when none was declared.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Touch option.
    pub fn touch_option(&self) -> &Touch {
        &self.touch
    }

    /// Returns true for scalar kinds.
    pub fn is_scalar(&self) -> bool {
        self.kind.is_scalar()
    }

    /// Substitutes the default for a null value.
    pub(crate) fn or_default(&self, value: &Value) -> Value {
        if value.is_null() {
            self.default.clone()
        } else {
            value.clone()
        }
    }

    fn validated(mut self) -> SchemaResult<Self> {
        if self.default.is_null() {
            return Ok(self);
        }
        if !self.kind.is_scalar() {
            return Err(SchemaError::DefaultOnCollection {
                name: self.name,
                kind: self.kind,
            });
        }
        let coerced = coerce(self.default.clone(), self.kind)?;
        if coerced.is_null() {
            return Err(SchemaError::InvalidDefault {
                name: self.name,
                kind: self.kind,
            });
        }
        self.default = coerced;
        Ok(self)
    }
}

/// The remote attributes of one owner type.
///
/// Built once per type with [`AttributeSchema::builder`] and shared as an
/// `Arc` by every instance.
///
/// # Example
///
/// ```rust
/// use kvattr_codec::AttrKind;
/// use kvattr_core::{AttributeDefinition, AttributeSchema};
///
/// let schema = AttributeSchema::builder("Post")
///     .attribute(AttributeDefinition::new("content", AttrKind::String).default(""))
///     .attribute(AttributeDefinition::new("views", AttrKind::Integer).default(0))
///     .attribute(AttributeDefinition::new("rankings", AttrKind::SortedSet))
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.key("1", "views"), "posts:1:views");
/// assert_eq!(schema.scalar_names().count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSchema {
    type_name: String,
    keys: KeyBuilder,
    attributes: BTreeMap<String, AttributeDefinition>,
    identity_field: Option<String>,
    pool: Option<String>,
}

impl AttributeSchema {
    /// Starts declaring the attributes of `type_name`.
    pub fn builder(type_name: impl Into<String>) -> AttributeSchemaBuilder {
        AttributeSchemaBuilder {
            type_name: type_name.into(),
            key_prefix: None,
            definitions: Vec::new(),
            identity_field: None,
            pool: None,
        }
    }

    /// Owner type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Key prefix shared by every attribute of this type.
    pub fn key_prefix(&self) -> &str {
        self.keys.prefix()
    }

    /// Owner field whose value replaces the primary identity in keys.
    pub fn identity_field(&self) -> Option<&str> {
        self.identity_field.as_deref()
    }

    /// Pool name, `None` for the registry default.
    pub fn pool(&self) -> Option<&str> {
        self.pool.as_deref()
    }

    /// Looks up one attribute.
    pub fn get(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(name)
    }

    /// Returns true if `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// All attributes, ordered by name.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.values()
    }

    /// Names of the scalar attributes, ordered.
    pub fn scalar_names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .values()
            .filter(|def| def.is_scalar())
            .map(AttributeDefinition::name)
    }

    /// Number of declared attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Store key of attribute `name` for the owner `identity`.
    pub fn key(&self, identity: &str, name: &str) -> String {
        self.keys.key(identity, name)
    }
}

/// Builder returned by [`AttributeSchema::builder`].
#[derive(Debug, Clone)]
pub struct AttributeSchemaBuilder {
    type_name: String,
    key_prefix: Option<String>,
    definitions: Vec<AttributeDefinition>,
    identity_field: Option<String>,
    pool: Option<String>,
}

impl AttributeSchemaBuilder {
    /// Declares an attribute. Declaring a name again replaces it.
    #[must_use]
    pub fn attribute(mut self, definition: AttributeDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Declares an attribute from a kind name such as `"integer"`.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::UnsupportedKind`] for unknown kind names.
    pub fn attribute_named(self, name: impl Into<String>, kind: &str) -> SchemaResult<Self> {
        let kind = AttrKind::parse(kind)?;
        Ok(self.attribute(AttributeDefinition::new(name, kind)))
    }

    /// Uses the owner field `field` instead of its primary identity in keys.
    #[must_use]
    pub fn identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = Some(field.into());
        self
    }

    /// Stores the attributes in the named pool instead of the default one.
    #[must_use]
    pub fn pool(mut self, name: impl Into<String>) -> Self {
        self.pool = Some(name.into());
        self
    }

    /// Overrides the key prefix derived from the type name.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Validates every declaration and freezes the schema.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid default.
    pub fn build(self) -> SchemaResult<AttributeSchema> {
        let keys = match self.key_prefix {
            Some(prefix) => KeyBuilder::with_prefix(prefix),
            None => KeyBuilder::for_type(&self.type_name),
        };

        let mut attributes = BTreeMap::new();
        for definition in self.definitions {
            let definition = definition.validated()?;
            attributes.insert(definition.name.clone(), definition);
        }

        Ok(AttributeSchema {
            type_name: self.type_name,
            keys,
            attributes,
            identity_field: self.identity_field,
            pool: self.pool,
        })
    }
}
