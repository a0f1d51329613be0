//! Placeholder dialects and the driver-name registry.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;

/// The placeholder convention a driver expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `?` (MySQL, SQLite)
    Question,
    /// `$1, $2, ...` (PostgreSQL)
    Dollar,
    /// `@p1, @p2, ...` (SQL Server)
    At,
    /// `:name` (Oracle)
    Named,
    /// No registration for the driver name.
    Unknown,
}

impl Dialect {
    /// Returns true if this dialect numbers its placeholders.
    pub const fn is_numbered(&self) -> bool {
        matches!(self, Dialect::Dollar | Dialect::At)
    }

    /// Appends the placeholder for the `ordinal`-th (1-based) parameter.
    /// `name` is only used by [`Dialect::Named`].
    pub fn write_placeholder(&self, out: &mut String, ordinal: usize, name: &str) {
        match self {
            Dialect::Question | Dialect::Unknown => out.push('?'),
            Dialect::Dollar => {
                let _ = write!(out, "${ordinal}");
            }
            Dialect::At => {
                let _ = write!(out, "@p{ordinal}");
            }
            Dialect::Named => {
                out.push(':');
                if name.is_empty() {
                    let _ = write!(out, "arg{ordinal}");
                } else {
                    out.push_str(name);
                }
            }
        }
    }
}

/// Global driver name -> dialect registrations
static REGISTRY: RwLock<Option<HashMap<String, Dialect>>> = RwLock::new(None);

fn defaults() -> HashMap<String, Dialect> {
    let mut map = HashMap::new();
    for name in ["mysql", "sqlite", "sqlite3", "clickhouse", "nrmysql"] {
        map.insert(name.to_owned(), Dialect::Question);
    }
    for name in ["postgres", "postgresql", "pgx", "pq-timeouts", "cloudsqlpostgres", "cockroach"] {
        map.insert(name.to_owned(), Dialect::Dollar);
    }
    for name in ["sqlserver", "mssql", "azuresql"] {
        map.insert(name.to_owned(), Dialect::At);
    }
    for name in ["oracle", "oci8", "ora", "goracle", "godror"] {
        map.insert(name.to_owned(), Dialect::Named);
    }
    map
}

/// Registers (or replaces) the dialect used for `driver`.
pub fn register(driver: &str, dialect: Dialect) {
    let mut guard = REGISTRY.write();
    guard
        .get_or_insert_with(defaults)
        .insert(driver.to_owned(), dialect);
}

/// Looks up the dialect registered for `driver`; [`Dialect::Unknown`] if none.
pub fn dialect_by_name(driver: &str) -> Dialect {
    if let Some(dialect) = REGISTRY.read().as_ref().and_then(|map| map.get(driver).copied()) {
        return dialect;
    }
    let mut guard = REGISTRY.write();
    guard
        .get_or_insert_with(defaults)
        .get(driver)
        .copied()
        .unwrap_or(Dialect::Unknown)
}
