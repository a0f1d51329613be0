//! Canonical keys and cached field-index maps.
//!
//! A [`FieldMap`] maps every canonical key of a record type to the path of
//! field positions that reaches it. Maps are built once per record type and
//! configuration and shared process-wide.

use crate::record::{FieldInfo, FieldKind, RecordType, Schema};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Nesting depth beyond which nested records are not traversed.
pub const MAX_DEPTH: usize = 16;

/// Maps a declared field name to its canonical key when no tag is present.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMapper {
    #[default]
    SnakeCase,
    Lowercase,
    Identity,
    #[serde(skip)]
    Custom(fn(&str) -> String),
}

impl NameMapper {
    pub fn apply(&self, name: &str) -> String {
        match self {
            NameMapper::SnakeCase => snake_case(name),
            NameMapper::Lowercase => name.to_lowercase(),
            NameMapper::Identity => name.to_owned(),
            NameMapper::Custom(f) => f(name),
        }
    }

    fn identity(&self) -> (u8, usize) {
        match self {
            NameMapper::SnakeCase => (0, 0),
            NameMapper::Lowercase => (1, 0),
            NameMapper::Identity => (2, 0),
            NameMapper::Custom(f) => (3, *f as usize),
        }
    }
}

impl PartialEq for NameMapper {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for NameMapper {}

impl Hash for NameMapper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for NameMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMapper::SnakeCase => write!(f, "SnakeCase"),
            NameMapper::Lowercase => write!(f, "Lowercase"),
            NameMapper::Identity => write!(f, "Identity"),
            NameMapper::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// `CreatedAt` -> `created_at`, `HTTPServer` -> `http_server`, `user_id` unchanged.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_numeric() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                Some(_) => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Canonical key of a field: a non-empty tag, else the mapped name.
/// `None` for hidden fields (`#[skip]` or tag `-`).
pub fn canonical_key(field: &FieldInfo, tag: &str, mapper: NameMapper) -> Option<String> {
    if matches!(field.kind, FieldKind::Skip) {
        return None;
    }
    match field.tag(tag) {
        Some("-") => None,
        Some(t) if !t.is_empty() => Some(t.to_owned()),
        _ => Some(mapper.apply(field.name)),
    }
}

/// Canonical key to field path for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    type_name: &'static str,
    paths: HashMap<String, Vec<usize>>,
}

impl FieldMap {
    /// Breadth-first walk of `schema`. Outer fields win over embedded ones
    /// with the same key; embedded records are reachable both qualified and
    /// unqualified.
    pub fn build(schema: &'static Schema, tag: &str, mapper: NameMapper, separator: &str) -> Self {
        let mut paths: HashMap<String, Vec<usize>> = HashMap::new();
        let mut queue: VecDeque<(&'static Schema, Vec<usize>, String, usize)> = VecDeque::new();
        queue.push_back((schema, Vec::new(), String::new(), 0));

        while let Some((current, base, prefix, depth)) = queue.pop_front() {
            for (index, field) in current.fields.iter().enumerate() {
                let Some(key) = canonical_key(field, tag, mapper) else {
                    continue;
                };
                let qualified = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}{separator}{key}")
                };
                let mut path = base.clone();
                path.push(index);

                match field.kind {
                    FieldKind::Record { embedded, schema } => {
                        if depth + 1 >= MAX_DEPTH {
                            continue;
                        }
                        let nested = schema();
                        if embedded {
                            queue.push_back((nested, path.clone(), prefix.clone(), depth + 1));
                        }
                        queue.push_back((nested, path, qualified, depth + 1));
                    }
                    _ => {
                        paths.entry(qualified).or_insert(path);
                    }
                }
            }
        }

        FieldMap {
            type_name: schema.name,
            paths,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn path(&self, key: &str) -> Option<&[usize]> {
        self.paths.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }
}

#[derive(PartialEq, Eq, Hash)]
struct CacheKey {
    type_id: TypeId,
    tag: String,
    mapper: NameMapper,
    separator: String,
}

/// Global cache of field maps
static FIELD_MAPS: RwLock<Option<HashMap<CacheKey, Arc<FieldMap>>>> = RwLock::new(None);

/// Returns the field map for `record`, building it on first use.
///
/// Concurrent first uses build it once; every caller receives the same
/// `Arc`.
pub fn field_map(record: RecordType, tag: &str, mapper: NameMapper, separator: &str) -> Arc<FieldMap> {
    let key = CacheKey {
        type_id: record.id,
        tag: tag.to_owned(),
        mapper,
        separator: separator.to_owned(),
    };

    if let Some(map) = FIELD_MAPS.read().as_ref().and_then(|maps| maps.get(&key)) {
        return map.clone();
    }

    let mut guard = FIELD_MAPS.write();
    let maps = guard.get_or_insert_with(HashMap::new);
    if let Some(map) = maps.get(&key) {
        return map.clone();
    }

    let map = Arc::new(FieldMap::build(record.schema, tag, mapper, separator));
    tracing::trace!(
        record = record.name(),
        keys = map.len(),
        separator,
        "built field map"
    );
    maps.insert(key, map.clone());
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_record;
    use crate::Record;

    #[derive(Default)]
    struct Audit {
        created_by: String,
        id: i64,
    }

    impl_record!(Audit {
        created_by: String,
        id: i64,
    });

    #[derive(Default)]
    struct Geo {
        lat: f64,
    }

    impl_record!(Geo { lat: f64 });

    #[derive(Default)]
    struct Address {
        city: String,
        geo: Geo,
    }

    impl_record!(Address {
        city: String,
        #[nested] geo: Geo,
    });

    #[derive(Default)]
    struct Account {
        id: i64,
        display_name: String,
        audit: Audit,
        address: Option<Address>,
        token: String,
        ignored: String,
    }

    impl_record!(Account {
        id: i64,
        display_name: String => "name",
        #[embed] audit: Audit,
        #[nested] address: Option<Address>,
        #[skip] token: String,
        ignored: String => "-",
    });

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("CreatedAt"), "created_at");
        assert_eq!(snake_case("HTTPServer"), "http_server");
        assert_eq!(snake_case("userID"), "user_id");
        assert_eq!(snake_case("already_snake"), "already_snake");
        assert_eq!(snake_case("Id"), "id");
    }

    #[test]
    fn test_field_map_keys_and_paths() {
        let map = FieldMap::build(Account::schema(), "db", NameMapper::SnakeCase, "_");
        assert_eq!(map.path("id"), Some(&[0][..]));
        assert_eq!(map.path("name"), Some(&[1][..]));
        assert_eq!(map.path("display_name"), None);
        // embedded: unqualified and qualified
        assert_eq!(map.path("created_by"), Some(&[2, 0][..]));
        assert_eq!(map.path("audit_created_by"), Some(&[2, 0][..]));
        // outer id wins over the embedded one
        assert_eq!(map.path("audit_id"), Some(&[2, 1][..]));
        assert_eq!(map.path("address_city"), Some(&[3, 0][..]));
        assert_eq!(map.path("address_geo_lat"), Some(&[3, 1, 0][..]));
        assert_eq!(map.path("token"), None);
        assert_eq!(map.path("ignored"), None);
    }

    #[test]
    fn test_field_map_param_separator() {
        let map = FieldMap::build(Account::schema(), "db", NameMapper::SnakeCase, ".");
        assert_eq!(map.path("address.geo.lat"), Some(&[3, 1, 0][..]));
        assert_eq!(map.path("audit.created_by"), Some(&[2, 0][..]));
    }

    #[test]
    fn test_custom_tag_name_ignores_db_tags() {
        let map = FieldMap::build(Account::schema(), "json", NameMapper::SnakeCase, "_");
        assert_eq!(map.path("display_name"), Some(&[1][..]));
        assert_eq!(map.path("ignored"), Some(&[5][..]));
    }

    #[test]
    fn test_field_map_cached_once() {
        let rt = RecordType::of::<Account>();
        let first = field_map(rt, "db", NameMapper::SnakeCase, "_");
        let second = field_map(rt, "db", NameMapper::SnakeCase, "_");
        assert!(Arc::ptr_eq(&first, &second));

        let other = field_map(rt, "db", NameMapper::Lowercase, "_");
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(*first, *other);
    }

    #[test]
    fn test_custom_mapper_identity() {
        fn upper(s: &str) -> String {
            s.to_uppercase()
        }
        let mapper = NameMapper::Custom(upper);
        assert_eq!(mapper, NameMapper::Custom(upper));
        assert_ne!(mapper, NameMapper::SnakeCase);
        assert_eq!(mapper.apply("id"), "ID");
    }
}
