//! Positional `IN` expansion.

use crate::builder::{rewrite_positional, Repeats};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::value::Value;

/// Expands every list-valued positional argument into one placeholder per
/// element and flattens the values.
///
/// `?` placeholders are rebound to `dialect`. Bytes are a scalar and never
/// expand. A query without list arguments or `?` to rebind is returned
/// untouched.
///
/// ```
/// use sqlx_named_scan::{Dialect, Value};
/// use sqlx_named_scan::expand::expand_in;
///
/// let ids = Value::List(vec![Value::Int(4), Value::Int(8), Value::Int(16)]);
/// let (sql, values) = expand_in(Dialect::Dollar, "SELECT * FROM u WHERE id IN (?)", vec![ids])?;
/// assert_eq!(sql, "SELECT * FROM u WHERE id IN ($1,$2,$3)");
/// assert_eq!(values.len(), 3);
/// # Ok::<(), sqlx_named_scan::Error>(())
/// ```
pub fn expand_in(dialect: Dialect, template: &str, values: Vec<Value>) -> Result<(String, Vec<Value>)> {
    let mut repeats = Repeats::new();
    for (index, value) in values.iter().enumerate() {
        match value {
            Value::List(items) if items.is_empty() => {
                return Err(Error::EmptyList(format!("argument #{}", index + 1)));
            }
            Value::List(items) => {
                repeats.insert(index, items.len());
            }
            Value::Map(_) => {
                return Err(Error::UnsupportedArgumentType(format!(
                    "map as positional argument #{}",
                    index + 1
                )));
            }
            _ => {}
        }
    }

    let rebind = !matches!(dialect, Dialect::Question | Dialect::Unknown) && template.contains('?');
    if repeats.is_empty() && !rebind {
        return Ok((template.to_owned(), values));
    }

    let rewritten = rewrite_positional(template, dialect, &repeats)?;

    let mut flat = Vec::with_capacity(rewritten.placeholders);
    for value in values {
        match value {
            Value::List(items) => {
                for item in items {
                    if !item.is_bindable() {
                        return Err(Error::UnsupportedArgumentType(format!(
                            "{} inside an IN list",
                            item.type_name()
                        )));
                    }
                    flat.push(item);
                }
            }
            other => flat.push(other),
        }
    }

    if rewritten.placeholders != flat.len() {
        return Err(Error::ArgumentCountMismatch {
            placeholders: rewritten.placeholders,
            values: flat.len(),
        });
    }
    Ok((rewritten.sql, flat))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(items: &[i64]) -> Value {
        Value::List(items.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn test_expand_question() {
        let (sql, values) = expand_in(
            Dialect::Question,
            "SELECT * FROM t WHERE a = ? AND b IN (?)",
            vec![Value::Int(1), ints(&[2, 3, 4])],
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a = ? AND b IN (?,?,?)");
        assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]);
    }

    #[test]
    fn test_expand_renumbers() {
        let (sql, values) = expand_in(
            Dialect::Dollar,
            "SELECT * FROM t WHERE a IN ($1) AND b = $2",
            vec![ints(&[1, 2, 3]), Value::Text("x".into())],
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a IN ($1,$2,$3) AND b = $4");
        assert_eq!(values.len(), 4);
        assert_eq!(values[3], Value::Text("x".into()));
    }

    #[test]
    fn test_bytes_pass_through() {
        let (sql, values) = expand_in(
            Dialect::Question,
            "UPDATE t SET data = ? WHERE id = ?",
            vec![Value::Bytes(vec![9, 9]), Value::Int(1)],
        )
        .unwrap();
        assert_eq!(sql, "UPDATE t SET data = ? WHERE id = ?");
        assert_eq!(values[0], Value::Bytes(vec![9, 9]));
    }

    #[test]
    fn test_without_lists_is_untouched() {
        let template = "SELECT  *\n FROM t WHERE a = ?";
        let (sql, values) = expand_in(Dialect::Question, template, vec![Value::Int(1)]).unwrap();
        assert_eq!(sql, template);
        assert_eq!(values, vec![Value::Int(1)]);
    }

    #[test]
    fn test_question_marks_rebound_without_lists() {
        let (sql, values) = expand_in(
            Dialect::Dollar,
            "SELECT * FROM t WHERE a = ? AND b = ?",
            vec![Value::Int(1), Value::Int(2)],
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_empty_list() {
        let err = expand_in(Dialect::Question, "a IN (?)", vec![ints(&[])]).unwrap_err();
        assert!(matches!(err, Error::EmptyList(_)));
    }

    #[test]
    fn test_count_mismatch() {
        let err = expand_in(
            Dialect::Question,
            "a IN (?) AND b = ?",
            vec![ints(&[1, 2])],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::ArgumentCountMismatch {
                placeholders: 3,
                values: 2
            }
        ));
    }

    #[test]
    fn test_nested_list_unsupported() {
        let nested = Value::List(vec![ints(&[1])]);
        let err = expand_in(Dialect::Question, "a IN (?)", vec![nested]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedArgumentType(_)));
    }
}
