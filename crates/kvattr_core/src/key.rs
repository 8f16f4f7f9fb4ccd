//! Store key derivation.
//!
//! Keys have the form `{prefix}:{identity}:{attribute}`. The prefix is the
//! owner type name run through [`tableize`], so `BlogPost` with id `7` and
//! attribute `views` lives at `blog_posts:7:views`.
//!
//! The prefix rules are part of the stored data format. Changing them
//! orphans every key written under the old rules.

/// Separator between key segments.
pub const KEY_SEPARATOR: char = ':';

/// Irregular plurals, matched as suffixes in this order. A name already
/// ending in the plural is left alone.
const IRREGULARS: &[(&str, &str)] = &[
    ("zombie", "zombies"),
    ("move", "moves"),
    ("sex", "sexes"),
    ("child", "children"),
    ("man", "men"),
    ("person", "people"),
];

/// Words whose plural is the word itself. They match only as a whole
/// word, so `admin/sheep` is uncountable but `black_sheep` is not.
const UNCOUNTABLES: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
];

/// Converts a type name into its table-style key prefix.
///
/// - `::` becomes `/`
/// - CamelCase becomes snake_case, keeping acronym runs together
/// - the result is pluralized with the ActiveSupport default inflections
///
/// ```
/// use kvattr_core::tableize;
///
/// assert_eq!(tableize("Post"), "posts");
/// assert_eq!(tableize("BlogPost"), "blog_posts");
/// assert_eq!(tableize("Category"), "categories");
/// assert_eq!(tableize("Admin::User"), "admin/users");
/// assert_eq!(tableize("HTTPRequest"), "http_requests");
/// assert_eq!(tableize("Knife"), "knives");
/// ```
pub fn tableize(type_name: &str) -> String {
    pluralize(&underscore(type_name))
}

/// `Admin::BlogPost` → `admin/blog_post`.
fn underscore(name: &str) -> String {
    let name = name.replace("::", "/");
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary {
                out.push('_');
            }
        }
        if c == '-' {
            out.push('_');
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

/// Pluralizes an underscored name. Every rule is anchored at the end of
/// the whole name; a few also require the name to be exactly one word.
fn pluralize(name: &str) -> String {
    if name.is_empty() || is_uncountable(name) {
        return name.to_string();
    }
    irregular(name).unwrap_or_else(|| apply_suffix_rules(name))
}

fn is_uncountable(name: &str) -> bool {
    UNCOUNTABLES.iter().any(|word| {
        name.strip_suffix(word).is_some_and(|head| {
            !head
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
        })
    })
}

fn irregular(name: &str) -> Option<String> {
    IRREGULARS.iter().find_map(|(singular, plural)| {
        if name.ends_with(plural) {
            Some(name.to_string())
        } else {
            name.strip_suffix(singular)
                .map(|head| format!("{head}{plural}"))
        }
    })
}

fn ends_with_any(name: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|suffix| name.ends_with(suffix))
}

/// First match wins.
fn apply_suffix_rules(name: &str) -> String {
    if name.ends_with("quiz") {
        return format!("{name}zes");
    }
    match name {
        "oxen" | "mice" | "lice" => return name.to_string(),
        "ox" => return "oxen".to_string(),
        "mouse" => return "mice".to_string(),
        "louse" => return "lice".to_string(),
        _ => {}
    }
    for end in ["ix", "ex"] {
        if let Some(head) = name.strip_suffix(end) {
            if ends_with_any(head, &["matr", "vert", "ind"]) {
                return format!("{head}ices");
            }
        }
    }
    if ends_with_any(name, &["x", "ch", "ss", "sh"]) {
        return format!("{name}es");
    }
    if let Some(stem) = name.strip_suffix('y') {
        let consonant = stem
            .chars()
            .next_back()
            .is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y'));
        if consonant || stem.ends_with("qu") {
            return format!("{stem}ies");
        }
    }
    if name.ends_with("hive") {
        return format!("{name}s");
    }
    if let Some(head) = name.strip_suffix("fe") {
        if head.chars().next_back().is_some_and(|c| c != 'f') {
            return format!("{head}ves");
        }
    }
    if let Some(head) = name.strip_suffix('f') {
        if head.ends_with(['l', 'r']) {
            return format!("{head}ves");
        }
    }
    if let Some(head) = name.strip_suffix("sis") {
        return format!("{head}ses");
    }
    if ends_with_any(name, &["ta", "ia"]) {
        return name.to_string();
    }
    if let Some(head) = name.strip_suffix("um") {
        if head.ends_with(['t', 'i']) {
            return format!("{head}a");
        }
    }
    if ends_with_any(name, &["buffalo", "tomato", "bus", "alias", "status"]) {
        return format!("{name}es");
    }
    if ends_with_any(name, &["octopi", "viri"]) {
        return name.to_string();
    }
    if let Some(head) = name.strip_suffix("us") {
        if ends_with_any(head, &["octop", "vir"]) {
            return format!("{head}i");
        }
    }
    if let Some(head) = name.strip_suffix("is").filter(|head| matches!(*head, "ax" | "test")) {
        return format!("{head}es");
    }
    if name.ends_with('s') {
        return name.to_string();
    }
    format!("{name}s")
}

/// Builds keys for one owner type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    /// Creates a builder from an owner type name.
    pub fn for_type(type_name: &str) -> Self {
        Self {
            prefix: tableize(type_name),
        }
    }

    /// Creates a builder with an explicit prefix, used as-is.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the key prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the store key of `attribute` for the owner `identity`.
    pub fn key(&self, identity: &str, attribute: &str) -> String {
        let mut key =
            String::with_capacity(self.prefix.len() + identity.len() + attribute.len() + 2);
        key.push_str(&self.prefix);
        key.push(KEY_SEPARATOR);
        key.push_str(identity);
        key.push(KEY_SEPARATOR);
        key.push_str(attribute);
        key
    }
}

/// Builds a key from an owner type name in one call.
///
/// ```
/// assert_eq!(kvattr_core::build_key("Post", "1", "title"), "posts:1:title");
/// ```
pub fn build_key(type_name: &str, identity: &str, attribute: &str) -> String {
    KeyBuilder::for_type(type_name).key(identity, attribute)
}
