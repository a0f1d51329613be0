//! Query arguments.
//!
//! A query takes either positional values or exactly one named argument.
//! [`Arg`] is the closed set of argument shapes the rewrite engine accepts.

use crate::record::Record;
use crate::value::{Map, ToValue, Value};
use std::fmt;

/// One query argument.
pub enum Arg<'a> {
    /// A positional value. `Value::List` expands an `IN (?)` placeholder.
    Value(Value),
    /// A named argument whose fields name the template parameters.
    Record(&'a dyn Record),
    /// A named argument keyed by parameter name.
    Map(&'a Map),
    /// A batch of records; the `VALUES (...)` group is repeated per element.
    Records(Vec<&'a dyn Record>),
    /// A batch of maps.
    Maps(&'a [Map]),
}

impl<'a> Arg<'a> {
    pub fn value<T: ToValue>(value: T) -> Self {
        Arg::Value(value.to_value())
    }

    pub fn record<R: Record>(record: &'a R) -> Self {
        Arg::Record(record)
    }

    pub fn records<R: Record>(records: &'a [R]) -> Self {
        Arg::Records(records.iter().map(|r| r as &dyn Record).collect())
    }

    pub fn map(map: &'a Map) -> Self {
        Arg::Map(map)
    }

    pub fn maps(maps: &'a [Map]) -> Self {
        Arg::Maps(maps)
    }

    /// True for arguments that switch a query into named mode.
    pub fn is_named(&self) -> bool {
        !matches!(self, Arg::Value(_))
    }

    /// True for list-of-record and list-of-map arguments.
    pub fn is_batch(&self) -> bool {
        matches!(self, Arg::Records(_) | Arg::Maps(_))
    }

    /// Short description used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Value(v) => v.type_name(),
            Arg::Record(_) => "record",
            Arg::Map(_) => "map",
            Arg::Records(_) => "list of records",
            Arg::Maps(_) => "list of maps",
        }
    }
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::Record(r) => write!(f, "Record({})", r.record_type().name()),
            Arg::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Arg::Records(rs) => write!(f, "Records(len = {})", rs.len()),
            Arg::Maps(ms) => write!(f, "Maps(len = {})", ms.len()),
        }
    }
}

impl From<Value> for Arg<'_> {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl<'a> From<&'a Map> for Arg<'a> {
    fn from(map: &'a Map) -> Self {
        Arg::Map(map)
    }
}

impl<'a> From<&'a [Map]> for Arg<'a> {
    fn from(maps: &'a [Map]) -> Self {
        Arg::Maps(maps)
    }
}

/// Builds a `Vec<Arg>` of positional arguments.
///
/// ```
/// use sqlx_named_scan::params;
///
/// let args = params![42, "alice", vec![1, 2, 3]];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Arg<'_>>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::value($arg)),+]
    };
}

/// Builds a [`Map`](crate::Map) for use as a named argument.
///
/// ```
/// use sqlx_named_scan::{named, Value};
///
/// let arg = named! { ids: vec![2, 3], on: true };
/// assert_eq!(arg["on"], Value::Bool(true));
///
/// let arg = named! { "user.id" => 7 };
/// assert_eq!(arg["user.id"], Value::Int(7));
/// ```
#[macro_export]
macro_rules! named {
    () => {
        $crate::Map::new()
    };
    ($($key:ident : $val:expr),+ $(,)?) => {{
        let mut map = $crate::Map::new();
        $(
            map.insert(
                ::std::string::String::from(stringify!($key)),
                $crate::ToValue::to_value(&$val),
            );
        )+
        map
    }};
    ($($key:literal => $val:expr),+ $(,)?) => {{
        let mut map = $crate::Map::new();
        $(
            map.insert(
                ::std::string::String::from($key),
                $crate::ToValue::to_value(&$val),
            );
        )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Row {
        id: i64,
    }

    crate::impl_record!(Row { id: i64 });

    #[test]
    fn test_params_macro() {
        let args = crate::params![1, "two", vec![3, 4]];
        assert!(matches!(&args[0], Arg::Value(Value::Int(1))));
        assert!(matches!(&args[1], Arg::Value(Value::Text(s)) if s == "two"));
        assert!(matches!(&args[2], Arg::Value(Value::List(items)) if items.len() == 2));
        assert!(crate::params![].is_empty());
    }

    #[test]
    fn test_named_macro_nests_maps() {
        let arg = crate::named! { id: 1, user: crate::named! { name: "bob" } };
        assert_eq!(arg["id"], Value::Int(1));
        match &arg["user"] {
            Value::Map(inner) => assert_eq!(inner["name"], Value::Text("bob".into())),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classification() {
        let rows = vec![Row { id: 1 }, Row { id: 2 }];
        let map = Map::new();
        assert!(!Arg::value(1).is_named());
        assert!(Arg::record(&rows[0]).is_named());
        assert!(!Arg::map(&map).is_batch());
        let batch = Arg::records(&rows);
        assert!(batch.is_batch());
        assert_eq!(batch.kind(), "list of records");
        assert_eq!(format!("{batch:?}"), "Records(len = 2)");
    }
}
