use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;

/// Associative argument / destination: column or parameter name to value.
pub type Map = HashMap<String, Value>;

/// A value exchanged with the driver.
///
/// `List` only ever reaches the rewrite engine, where it is expanded into
/// one placeholder per element. `Map` exists so that nested associative
/// arguments can be addressed with dotted names; neither is bindable.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Time(DateTime<Utc>),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Time(_) => "time",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for values the driver can bind directly.
    pub fn is_bindable(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Map(_))
    }
}

/// Conversion of Rust values into driver values.
///
/// `Vec<T>` and `[T]` become [`Value::List`] (and are expanded by `IN`
/// handling) except for `u8` sequences, which are bytes.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for Map {
    fn to_value(&self) -> Value {
        Value::Map(self.clone())
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! int_to_value {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }
            }
        )*
    };
}

int_to_value!(i8, i16, i32, i64, u16, u32);

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_owned())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Time(*self)
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::Time(self.and_utc())
    }
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        match self.and_hms_opt(0, 0, 0) {
            Some(midnight) => Value::Time(midnight.and_utc()),
            None => Value::Null,
        }
    }
}

macro_rules! value_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    v.to_value()
                }
            }
        )*
    };
}

value_from!(bool, i32, i64, f64, String, &str, Vec<u8>, DateTime<Utc>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_are_not_lists() {
        assert_eq!(vec![1u8, 2, 3].to_value(), Value::Bytes(vec![1, 2, 3]));
        assert_eq!(b"ab"[..].to_value(), Value::Bytes(b"ab".to_vec()));
    }

    #[test]
    fn test_vectors_become_lists() {
        assert_eq!(
            vec![4i64, 8, 16].to_value(),
            Value::List(vec![Value::Int(4), Value::Int(8), Value::Int(16)])
        );
        assert_eq!(
            vec!["a", "b"].to_value(),
            Value::List(vec![Value::Text("a".into()), Value::Text("b".into())])
        );
    }

    #[test]
    fn test_option_maps_to_null() {
        assert_eq!(None::<i32>.to_value(), Value::Null);
        assert_eq!(Some(7i32).to_value(), Value::Int(7));
    }

    #[test]
    fn test_bindable() {
        assert!(Value::Bytes(vec![]).is_bindable());
        assert!(!Value::List(vec![]).is_bindable());
        assert!(!Value::Map(Map::new()).is_bindable());
    }
}
