//! Records: structs whose fields can be addressed by position.
//!
//! Rust has no runtime field reflection, so a record describes itself with
//! a static [`Schema`] and exposes index-addressed accessors. The
//! [`impl_record!`](crate::impl_record) macro writes both for a struct;
//! hand-written impls are fine when a field needs tags other than `db`.
//!
//! ```
//! use sqlx_named_scan::impl_record;
//!
//! #[derive(Debug, Default)]
//! struct Audit {
//!     created_by: String,
//! }
//!
//! impl_record!(Audit { created_by: String });
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     audit: Audit,
//!     password_hash: String,
//! }
//!
//! impl_record!(User {
//!     id: i64 => "user_id",
//!     name: String,
//!     #[embed] audit: Audit,
//!     #[skip] password_hash: String,
//! });
//! ```

use crate::scan::Scan;
use crate::value::Value;
use std::any::TypeId;
use std::fmt;

/// Static description of a record type.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldInfo],
}

/// One declared field.
#[derive(Debug)]
pub struct FieldInfo {
    /// Declared field name.
    pub name: &'static str,
    /// `(tag key, tag value)` pairs, e.g. `("db", "user_id")`.
    pub tags: &'static [(&'static str, &'static str)],
    pub kind: FieldKind,
}

impl FieldInfo {
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

#[derive(Clone, Copy)]
pub enum FieldKind {
    /// A single column / parameter value.
    Scalar,
    /// Hidden from mapping in both directions.
    Skip,
    /// A nested record. Embedded records also expose their fields at the
    /// enclosing scope.
    Record {
        embedded: bool,
        schema: fn() -> &'static Schema,
    },
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Scalar => write!(f, "Scalar"),
            FieldKind::Skip => write!(f, "Skip"),
            FieldKind::Record { embedded, schema } => f
                .debug_struct("Record")
                .field("embedded", embedded)
                .field("schema", &schema().name)
                .finish(),
        }
    }
}

/// Read access to a field.
pub enum FieldRef<'a> {
    Value(Value),
    Record(&'a dyn Record),
    /// An optional nested record that is not set.
    Absent,
}

/// Write access to a field.
pub enum FieldMut<'a> {
    Scalar(&'a mut dyn Scan),
    Record(&'a mut dyn Record),
}

/// Type identity plus schema, the key material for field-map caching.
#[derive(Clone, Copy)]
pub struct RecordType {
    pub id: TypeId,
    pub schema: &'static Schema,
}

impl RecordType {
    pub fn of<T: Record>() -> Self {
        RecordType {
            id: TypeId::of::<T>(),
            schema: T::schema(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.schema.name
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecordType {}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordType({})", self.schema.name)
    }
}

/// A composite with named, position-addressable fields.
pub trait Record: Send + Sync + 'static {
    fn schema() -> &'static Schema
    where
        Self: Sized;

    fn record_type(&self) -> RecordType;

    /// Field at `index` in [`Schema::fields`]; `None` for skipped fields.
    fn field(&self, index: usize) -> Option<FieldRef<'_>>;

    /// Mutable field at `index`. Unset optional records are created.
    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>>;
}

/// A field holding a record directly or behind `Option` / `Box`.
pub trait Nested {
    fn nested_schema() -> &'static Schema;

    fn get(&self) -> Option<&dyn Record>;

    fn get_or_init(&mut self) -> &mut dyn Record;
}

impl<T: Record + Default> Nested for Option<T> {
    fn nested_schema() -> &'static Schema {
        T::schema()
    }

    fn get(&self) -> Option<&dyn Record> {
        self.as_ref().map(|r| r as &dyn Record)
    }

    fn get_or_init(&mut self) -> &mut dyn Record {
        self.get_or_insert_with(T::default)
    }
}

impl<T: Record> Nested for Box<T> {
    fn nested_schema() -> &'static Schema {
        T::schema()
    }

    fn get(&self) -> Option<&dyn Record> {
        Some(&**self)
    }

    fn get_or_init(&mut self) -> &mut dyn Record {
        &mut **self
    }
}

/// Reads the field at the end of `path`.
pub fn field_at<'a>(record: &'a dyn Record, path: &[usize]) -> Option<FieldRef<'a>> {
    let (last, parents) = path.split_last()?;
    let mut current = record;
    for &index in parents {
        current = match current.field(index)? {
            FieldRef::Record(r) => r,
            FieldRef::Absent => return Some(FieldRef::Absent),
            FieldRef::Value(_) => return None,
        };
    }
    current.field(*last)
}

/// Walks `path` for writing, creating unset optional records on the way.
pub fn scan_slot<'a>(record: &'a mut dyn Record, path: &[usize]) -> Option<&'a mut dyn Scan> {
    let (last, parents) = path.split_last()?;
    let mut current = record;
    for &index in parents {
        current = match current.field_mut(index)? {
            FieldMut::Record(r) => r,
            FieldMut::Scalar(_) => return None,
        };
    }
    match current.field_mut(*last)? {
        FieldMut::Scalar(slot) => Some(slot),
        FieldMut::Record(_) => None,
    }
}

/// Implements [`Record`], [`Nested`] and [`Target`](crate::Target) for a struct.
///
/// Each field is written `name: Type`, optionally followed by `=> "tag"`
/// (the `db` tag) and optionally preceded by one of `#[embed]`,
/// `#[nested]` or `#[skip]`. Scalar fields must implement
/// [`ToValue`](crate::ToValue) and [`Scan`]; nested and embedded fields
/// must implement [`Nested`] (any record, or `Option`/`Box` of one).
#[macro_export]
macro_rules! impl_record {
    (@kind [] $fty:ty) => {
        $crate::record::FieldKind::Scalar
    };
    (@kind [skip] $fty:ty) => {
        $crate::record::FieldKind::Skip
    };
    (@kind [nested] $fty:ty) => {
        $crate::record::FieldKind::Record {
            embedded: false,
            schema: <$fty as $crate::record::Nested>::nested_schema,
        }
    };
    (@kind [embed] $fty:ty) => {
        $crate::record::FieldKind::Record {
            embedded: true,
            schema: <$fty as $crate::record::Nested>::nested_schema,
        }
    };

    (@get [] $place:expr) => {
        Some($crate::record::FieldRef::Value($crate::ToValue::to_value(&$place)))
    };
    (@get [skip] $place:expr) => {
        None
    };
    (@get [$other:ident] $place:expr) => {
        Some(match $crate::record::Nested::get(&$place) {
            Some(r) => $crate::record::FieldRef::Record(r),
            None => $crate::record::FieldRef::Absent,
        })
    };

    (@get_mut [] $place:expr) => {
        Some($crate::record::FieldMut::Scalar(&mut $place))
    };
    (@get_mut [skip] $place:expr) => {
        None
    };
    (@get_mut [$other:ident] $place:expr) => {
        Some($crate::record::FieldMut::Record(
            $crate::record::Nested::get_or_init(&mut $place),
        ))
    };

    (
        $ty:ident {
            $( $(#[$kind:ident])? $field:ident : $fty:ty $(=> $tag:literal)? ),* $(,)?
        }
    ) => {
        impl $crate::Record for $ty {
            fn schema() -> &'static $crate::record::Schema {
                static SCHEMA: $crate::record::Schema = $crate::record::Schema {
                    name: stringify!($ty),
                    fields: &[
                        $(
                            $crate::record::FieldInfo {
                                name: stringify!($field),
                                tags: &[ $( ("db", $tag) )? ],
                                kind: $crate::impl_record!(@kind [$($kind)?] $fty),
                            },
                        )*
                    ],
                };
                &SCHEMA
            }

            fn record_type(&self) -> $crate::record::RecordType {
                $crate::record::RecordType::of::<Self>()
            }

            #[allow(unused_assignments, unused_mut)]
            fn field(&self, index: usize) -> Option<$crate::record::FieldRef<'_>> {
                let mut position = 0usize;
                $(
                    if index == position {
                        return $crate::impl_record!(@get [$($kind)?] self.$field);
                    }
                    position += 1;
                )*
                None
            }

            #[allow(unused_assignments, unused_mut)]
            fn field_mut(&mut self, index: usize) -> Option<$crate::record::FieldMut<'_>> {
                let mut position = 0usize;
                $(
                    if index == position {
                        return $crate::impl_record!(@get_mut [$($kind)?] self.$field);
                    }
                    position += 1;
                )*
                None
            }
        }

        impl $crate::record::Nested for $ty {
            fn nested_schema() -> &'static $crate::record::Schema {
                <$ty as $crate::Record>::schema()
            }

            fn get(&self) -> Option<&dyn $crate::Record> {
                Some(self)
            }

            fn get_or_init(&mut self) -> &mut dyn $crate::Record {
                self
            }
        }

        impl $crate::Target for $ty {
            fn kind() -> $crate::scan::ShapeKind {
                $crate::scan::ShapeKind::Record($crate::record::RecordType::of::<$ty>())
            }

            fn shape(&mut self) -> $crate::scan::Shape<'_> {
                $crate::scan::Shape::Record(self)
            }
        }
    };
}
