use crate::args::Arg;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::expand::expand_in;
use crate::named::bind_named;
use crate::options::Options;
use crate::value::Value;
use tracing::debug;

/// A query ready for the driver: positional SQL plus its values.
///
/// `BoundQuery` is the output of the rewrite engine. A template whose first
/// argument is a record, map, or list of either is treated as a named
/// template; anything else is positional and only has its `IN` lists
/// expanded.
///
/// # Examples
///
/// ```rust
/// use sqlx_named_scan::{named, params, Arg, BoundQuery, Dialect, Options, Value};
///
/// let arg = named! { id: 42 };
/// let query = BoundQuery::compile(
///     Dialect::Dollar,
///     "SELECT name FROM u WHERE id = :id",
///     &[Arg::map(&arg)],
///     &Options::default(),
/// )?;
/// assert_eq!(query.sql, "SELECT name FROM u WHERE id = $1");
/// assert_eq!(query.values, vec![Value::Int(42)]);
///
/// let query = BoundQuery::compile(
///     Dialect::Dollar,
///     "SELECT * FROM u WHERE id IN (?)",
///     &params![vec![4, 8, 16]],
///     &Options::default(),
/// )?;
/// assert_eq!(query.sql, "SELECT * FROM u WHERE id IN ($1,$2,$3)");
/// # Ok::<(), sqlx_named_scan::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub values: Vec<Value>,
}

impl BoundQuery {
    /// Rewrites `template` for `dialect` and orders `args` to match.
    ///
    /// # Arguments
    ///
    /// * `dialect` - Placeholder style of the target driver
    /// * `template` - SQL with `:name` parameters or native placeholders
    /// * `args` - One named argument, or any number of positional values
    /// * `options` - Tag, name mapping and missing-parameter policy
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyArguments`] if a named argument is followed by
    /// more arguments, [`Error::UnsupportedArgumentType`] if a named
    /// argument appears after positional ones, and any rewrite error.
    pub fn compile(dialect: Dialect, template: &str, args: &[Arg<'_>], options: &Options) -> Result<Self> {
        let (sql, values) = match args.first() {
            Some(first) if first.is_named() => {
                if args.len() > 1 {
                    return Err(Error::TooManyArguments(args.len()));
                }
                bind_named(dialect, template, first, options)?
            }
            _ => {
                let values = args
                    .iter()
                    .map(|arg| match arg {
                        Arg::Value(value) => Ok(value.clone()),
                        other => Err(Error::UnsupportedArgumentType(format!(
                            "{} mixed with positional arguments",
                            other.kind()
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                expand_in(dialect, template, values)?
            }
        };

        debug!(sql = %sql, values = values.len(), "compiled query");
        Ok(BoundQuery { sql, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{named, params};

    #[test]
    fn test_named_dispatch() {
        let arg = named! { id: 1 };
        let query = BoundQuery::compile(
            Dialect::At,
            "SELECT * FROM t WHERE id = :id",
            &[Arg::map(&arg)],
            &Options::default(),
        )
        .unwrap();
        assert_eq!(query.sql, "SELECT * FROM t WHERE id = @p1");
    }

    #[test]
    fn test_too_many_named_arguments() {
        let arg = named! { id: 1 };
        let err = BoundQuery::compile(
            Dialect::Question,
            "SELECT * FROM t WHERE id = :id",
            &[Arg::map(&arg), Arg::value(2)],
            &Options::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::TooManyArguments(2)));
    }

    #[test]
    fn test_named_after_positional_is_unsupported() {
        let arg = named! { id: 1 };
        let err = BoundQuery::compile(
            Dialect::Question,
            "SELECT * FROM t WHERE a = ?",
            &[Arg::value(1), Arg::map(&arg)],
            &Options::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedArgumentType(_)));
    }

    #[test]
    fn test_positional_dispatch() {
        let query = BoundQuery::compile(
            Dialect::Dollar,
            "SELECT * FROM u WHERE id IN ($1) AND ok = $2",
            &params![vec![4, 8, 16], true],
            &Options::default(),
        )
        .unwrap();
        assert_eq!(query.sql, "SELECT * FROM u WHERE id IN ($1,$2,$3) AND ok = $4");
        assert_eq!(query.values.len(), 4);
    }

    #[test]
    fn test_no_arguments() {
        let query =
            BoundQuery::compile(Dialect::Question, "SELECT 1", &[], &Options::default()).unwrap();
        assert_eq!(query.sql, "SELECT 1");
        assert!(query.values.is_empty());
    }
}
