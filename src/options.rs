//! Handle configuration.

use crate::dialect::Dialect;
use crate::error::Result;
use crate::mapper::NameMapper;
use serde::{Deserialize, Serialize};

/// Configuration supplied when a [`Db`](crate::Db) handle is built.
///
/// Every field has a default, so a TOML document only needs the keys it
/// changes:
///
/// ```
/// use sqlx_named_scan::{Dialect, Options};
///
/// let options = Options::from_toml_str(r#"
///     dialect = "dollar"
///     ignore_missing_fields = true
///     statement_cache_capacity = 64
/// "#)?;
/// assert_eq!(options.dialect, Some(Dialect::Dollar));
/// assert_eq!(options.tag, "db");
/// # Ok::<(), sqlx_named_scan::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Bypasses the driver-name lookup.
    pub dialect: Option<Dialect>,
    /// Tag key consulted on record fields.
    pub tag: String,
    /// Field name to canonical key when a field has no tag.
    pub name_mapper: NameMapper,
    /// Discard result columns that have no destination field.
    pub ignore_missing_fields: bool,
    /// Bind `NULL` for named parameters the argument does not provide.
    pub missing_params_as_null: bool,
    /// Prepared statements kept per handle; 0 disables the cache.
    ///
    /// Useful for drivers whose [`Stmt`](crate::driver::Stmt) owns a
    /// server-side statement. The MySQL driver leaves statements to SQLx's
    /// per-connection cache, so there this mostly adds a prepare round trip.
    pub statement_cache_capacity: usize,
    /// Joins nested record keys when matching columns.
    pub column_separator: String,
    /// Joins nested record keys when matching named parameters.
    pub param_separator: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            dialect: None,
            tag: "db".to_owned(),
            name_mapper: NameMapper::SnakeCase,
            ignore_missing_fields: false,
            missing_params_as_null: false,
            statement_cache_capacity: 0,
            column_separator: "_".to_owned(),
            param_separator: ".".to_owned(),
        }
    }
}

impl Options {
    /// Parses options from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_name_mapper(mut self, mapper: NameMapper) -> Self {
        self.name_mapper = mapper;
        self
    }

    pub fn with_ignore_missing_fields(mut self, ignore: bool) -> Self {
        self.ignore_missing_fields = ignore;
        self
    }

    pub fn with_missing_params_as_null(mut self, enabled: bool) -> Self {
        self.missing_params_as_null = enabled;
        self
    }

    pub fn with_statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }

    pub fn with_column_separator(mut self, separator: impl Into<String>) -> Self {
        self.column_separator = separator.into();
        self
    }

    pub fn with_param_separator(mut self, separator: impl Into<String>) -> Self {
        self.param_separator = separator.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.dialect, None);
        assert_eq!(options.tag, "db");
        assert_eq!(options.name_mapper, NameMapper::SnakeCase);
        assert!(!options.ignore_missing_fields);
        assert_eq!(options.statement_cache_capacity, 0);
        assert_eq!(options.column_separator, "_");
        assert_eq!(options.param_separator, ".");
    }

    #[test]
    fn test_from_toml() {
        let options = Options::from_toml_str(
            r#"
            tag = "sql"
            name_mapper = "lowercase"
            missing_params_as_null = true
            "#,
        )
        .unwrap();
        assert_eq!(options.tag, "sql");
        assert_eq!(options.name_mapper, NameMapper::Lowercase);
        assert!(options.missing_params_as_null);
        assert_eq!(options.param_separator, ".");
    }

    #[test]
    fn test_from_toml_rejects_bad_values() {
        let err = Options::from_toml_str("dialect = \"backtick\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_builder_setters() {
        let options = Options::default()
            .with_dialect(Dialect::At)
            .with_ignore_missing_fields(true)
            .with_statement_cache_capacity(8)
            .with_column_separator("__");
        assert_eq!(options.dialect, Some(Dialect::At));
        assert!(options.ignore_missing_fields);
        assert_eq!(options.statement_cache_capacity, 8);
        assert_eq!(options.column_separator, "__");
    }
}
