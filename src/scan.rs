//! Destination side of the value layer.
//!
//! [`Scan`] stores one column value into a Rust value. [`Target`] classifies
//! a scan destination into one of the [`Shape`]s the scanner knows how to
//! fill: a scalar, a record, a map, or a list of one of those.

use crate::error::{Error, Result};
use crate::record::{Record, RecordType};
use crate::value::{Map, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Stores a single column value.
///
/// Implement this for custom column types (JSON wrappers, enums stored as
/// text, ...) and register them with [`impl_scalar!`](crate::impl_scalar) so
/// they are scanned as one column even when they are composite.
pub trait Scan: Send {
    fn scan(&mut self, value: Value) -> Result<()>;
}

pub(crate) fn mismatch(expected: &'static str, found: &Value) -> Error {
    Error::Conversion {
        expected,
        found: found.type_name(),
    }
}

impl Scan for Value {
    fn scan(&mut self, value: Value) -> Result<()> {
        *self = value;
        Ok(())
    }
}

impl Scan for bool {
    fn scan(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Bool(b) => b,
            Value::Int(i) => i != 0,
            other => return Err(mismatch("bool", &other)),
        };
        Ok(())
    }
}

macro_rules! scan_int {
    ($($t:ty),*) => {
        $(
            impl Scan for $t {
                fn scan(&mut self, value: Value) -> Result<()> {
                    *self = match value {
                        Value::Int(i) => <$t>::try_from(i).map_err(|_| Error::Conversion {
                            expected: stringify!($t),
                            found: "out-of-range integer",
                        })?,
                        Value::Bool(b) => <$t>::from(b),
                        other => return Err(mismatch(stringify!($t), &other)),
                    };
                    Ok(())
                }
            }
        )*
    };
}

scan_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Scan for f64 {
    fn scan(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Float(f) => f,
            Value::Int(i) => i as f64,
            other => return Err(mismatch("f64", &other)),
        };
        Ok(())
    }
}

impl Scan for f32 {
    fn scan(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Float(f) => f as f32,
            Value::Int(i) => i as f32,
            other => return Err(mismatch("f32", &other)),
        };
        Ok(())
    }
}

impl Scan for String {
    fn scan(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Text(s) => s,
            Value::Bytes(b) => String::from_utf8(b).map_err(|_| Error::Conversion {
                expected: "String",
                found: "non-UTF-8 bytes",
            })?,
            other => return Err(mismatch("String", &other)),
        };
        Ok(())
    }
}

impl Scan for Vec<u8> {
    fn scan(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Bytes(b) => b,
            Value::Text(s) => s.into_bytes(),
            other => return Err(mismatch("Vec<u8>", &other)),
        };
        Ok(())
    }
}

impl Scan for DateTime<Utc> {
    fn scan(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Time(t) => t,
            other => return Err(mismatch("DateTime<Utc>", &other)),
        };
        Ok(())
    }
}

impl Scan for NaiveDateTime {
    fn scan(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Time(t) => t.naive_utc(),
            other => return Err(mismatch("NaiveDateTime", &other)),
        };
        Ok(())
    }
}

impl Scan for NaiveDate {
    fn scan(&mut self, value: Value) -> Result<()> {
        *self = match value {
            Value::Time(t) => t.date_naive(),
            other => return Err(mismatch("NaiveDate", &other)),
        };
        Ok(())
    }
}

impl<T: Scan + Default> Scan for Option<T> {
    fn scan(&mut self, value: Value) -> Result<()> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.scan(value)?;
        *self = Some(inner);
        Ok(())
    }
}

impl<T: Scan + ?Sized> Scan for Box<T> {
    fn scan(&mut self, value: Value) -> Result<()> {
        (**self).scan(value)
    }
}

/// Static classification of a destination element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Scalar,
    Record(RecordType),
    Map,
    List,
}

/// A destination borrowed for one row.
pub enum Shape<'a> {
    Scalar(&'a mut dyn Scan),
    Record(&'a mut dyn Record),
    Map(&'a mut Map),
    List(&'a mut dyn Appender),
}

impl Shape<'_> {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Scalar(_) => ShapeKind::Scalar,
            Shape::Record(r) => ShapeKind::Record(r.record_type()),
            Shape::Map(_) => ShapeKind::Map,
            Shape::List(_) => ShapeKind::List,
        }
    }
}

/// Something rows can be scanned into.
pub trait Target: Send {
    fn kind() -> ShapeKind
    where
        Self: Sized;

    fn shape(&mut self) -> Shape<'_>;
}

/// Append-in-place access to a list destination.
pub trait Appender: Send {
    fn element_kind(&self) -> ShapeKind;

    /// Pushes a fresh element and lends it out for filling.
    fn append(&mut self) -> Shape<'_>;

    /// Drops the element pushed for a row that failed to scan.
    fn discard_last(&mut self);
}

impl<T: Target + Default> Appender for Vec<T> {
    fn element_kind(&self) -> ShapeKind {
        T::kind()
    }

    fn append(&mut self) -> Shape<'_> {
        let index = self.len();
        self.push(T::default());
        self[index].shape()
    }

    fn discard_last(&mut self) {
        self.pop();
    }
}

impl<T: Target + Default> Target for Vec<T> {
    fn kind() -> ShapeKind {
        ShapeKind::List
    }

    fn shape(&mut self) -> Shape<'_> {
        Shape::List(self)
    }
}

impl Target for Map {
    fn kind() -> ShapeKind {
        ShapeKind::Map
    }

    fn shape(&mut self) -> Shape<'_> {
        Shape::Map(self)
    }
}

/// Scalars only. Records have no `Option` target; scan them into `T` or `Box<T>`.
impl<T: Scan + Default> Target for Option<T> {
    fn kind() -> ShapeKind {
        ShapeKind::Scalar
    }

    fn shape(&mut self) -> Shape<'_> {
        Shape::Scalar(self)
    }
}

impl<T: Target> Target for Box<T> {
    fn kind() -> ShapeKind {
        T::kind()
    }

    fn shape(&mut self) -> Shape<'_> {
        (**self).shape()
    }
}

/// Registers types implementing [`Scan`] as single-column scan targets.
///
/// ```
/// use sqlx_named_scan::{impl_scalar, Result, Scan, Value};
///
/// #[derive(Default)]
/// struct Upper(String);
///
/// impl Scan for Upper {
///     fn scan(&mut self, value: Value) -> Result<()> {
///         let mut s = String::new();
///         s.scan(value)?;
///         self.0 = s.to_uppercase();
///         Ok(())
///     }
/// }
///
/// impl_scalar!(Upper);
/// ```
#[macro_export]
macro_rules! impl_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::Target for $t {
                fn kind() -> $crate::scan::ShapeKind {
                    $crate::scan::ShapeKind::Scalar
                }

                fn shape(&mut self) -> $crate::scan::Shape<'_> {
                    $crate::scan::Shape::Scalar(self)
                }
            }
        )*
    };
}

impl_scalar!(
    Value,
    bool,
    i16,
    i32,
    i64,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    Vec<u8>,
    DateTime<Utc>,
    NaiveDateTime,
    NaiveDate,
);
